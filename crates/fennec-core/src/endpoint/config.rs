//! Fluent per-endpoint configuration.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::MethodFilter;

use crate::config::{FileBindingMode, FormOptions};

/// The verbs an endpoint can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// POST, PUT and PATCH carry a request body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }

    pub fn method_filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }

    pub fn to_method(&self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may call a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthRequirement {
    /// Nothing declared; the application-wide default applies.
    #[default]
    Inherit,
    Anonymous,
    Authenticated { policies: Vec<String> },
}

/// A response a route declares it can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducesDeclaration {
    pub status: u16,
    pub type_name: Option<&'static str>,
    pub content_type: Option<String>,
}

/// Metadata attached to a mounted route, readable by host middleware
/// through `Extension<Arc<RouteMetadata>>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMetadata {
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub produces: Vec<ProducesDeclaration>,
    pub auth: AuthRequirement,
    pub accepts: Vec<String>,
    pub antiforgery_disabled: bool,
}

impl RouteMetadata {
    pub fn requires_authorization(&self) -> bool {
        matches!(self.auth, AuthRequirement::Authenticated { .. })
    }

    /// Turn an inherited requirement into "authenticated" when the
    /// application requires authorization globally.
    pub fn apply_global_authorization(&mut self, required: bool) {
        if required && self.auth == AuthRequirement::Inherit {
            self.auth = AuthRequirement::Authenticated {
                policies: Vec::new(),
            };
        }
    }
}

type MetadataFn = Arc<dyn Fn(&mut RouteMetadata) + Send + Sync>;

/// One recorded configuration call, applied in order when the route is
/// mounted.
#[derive(Clone)]
pub enum RouteConfigurator {
    Name(String),
    Tags(Vec<String>),
    Produces(ProducesDeclaration),
    RequireAuthorization(Vec<String>),
    AllowAnonymous,
    Accepts(Vec<String>),
    DisableAntiforgery,
    Custom(MetadataFn),
}

impl RouteConfigurator {
    pub fn apply(&self, metadata: &mut RouteMetadata) {
        match self {
            RouteConfigurator::Name(name) => metadata.name = Some(name.clone()),
            RouteConfigurator::Tags(tags) => {
                for tag in tags {
                    if !metadata.tags.contains(tag) {
                        metadata.tags.push(tag.clone());
                    }
                }
            }
            RouteConfigurator::Produces(declaration) => metadata.produces.push(declaration.clone()),
            RouteConfigurator::RequireAuthorization(policies) => {
                metadata.auth = AuthRequirement::Authenticated {
                    policies: policies.clone(),
                }
            }
            RouteConfigurator::AllowAnonymous => metadata.auth = AuthRequirement::Anonymous,
            RouteConfigurator::Accepts(content_types) => {
                for content_type in content_types {
                    if !metadata.accepts.contains(content_type) {
                        metadata.accepts.push(content_type.clone());
                    }
                }
            }
            RouteConfigurator::DisableAntiforgery => metadata.antiforgery_disabled = true,
            RouteConfigurator::Custom(f) => f(metadata),
        }
    }
}

impl fmt::Debug for RouteConfigurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteConfigurator::Name(name) => f.debug_tuple("Name").field(name).finish(),
            RouteConfigurator::Tags(tags) => f.debug_tuple("Tags").field(tags).finish(),
            RouteConfigurator::Produces(p) => f.debug_tuple("Produces").field(p).finish(),
            RouteConfigurator::RequireAuthorization(p) => {
                f.debug_tuple("RequireAuthorization").field(p).finish()
            }
            RouteConfigurator::AllowAnonymous => f.write_str("AllowAnonymous"),
            RouteConfigurator::Accepts(c) => f.debug_tuple("Accepts").field(c).finish(),
            RouteConfigurator::DisableAntiforgery => f.write_str("DisableAntiforgery"),
            RouteConfigurator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What an endpoint declares about itself in `configure`.
///
/// ```rust,ignore
/// fn configure(route: &mut RouteConfig) {
///     route
///         .patch("/users/{id}/status")
///         .tags(["Users"])
///         .produces(200)
///         .produces(404)
///         .require_authorization(["admin"]);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteConfig {
    route: Option<String>,
    method: Option<HttpMethod>,
    configurators: Vec<RouteConfigurator>,
    form_options: Option<FormOptions>,
    file_binding_mode: Option<FileBindingMode>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the endpoint to `method` on `route`.
    pub fn verb(&mut self, method: HttpMethod, route: impl Into<String>) -> &mut Self {
        self.method = Some(method);
        self.route = Some(route.into());
        self
    }

    pub fn get(&mut self, route: impl Into<String>) -> &mut Self {
        self.verb(HttpMethod::Get, route)
    }

    pub fn post(&mut self, route: impl Into<String>) -> &mut Self {
        self.verb(HttpMethod::Post, route)
    }

    pub fn put(&mut self, route: impl Into<String>) -> &mut Self {
        self.verb(HttpMethod::Put, route)
    }

    pub fn patch(&mut self, route: impl Into<String>) -> &mut Self {
        self.verb(HttpMethod::Patch, route)
    }

    pub fn delete(&mut self, route: impl Into<String>) -> &mut Self {
        self.verb(HttpMethod::Delete, route)
    }

    fn push(&mut self, configurator: RouteConfigurator) -> &mut Self {
        self.configurators.push(configurator);
        self
    }

    /// Route name (defaults to the endpoint type name).
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(RouteConfigurator::Name(name.into()))
    }

    pub fn tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(RouteConfigurator::Tags(tags.into_iter().map(Into::into).collect()))
    }

    /// Declare a status code the route can return.
    pub fn produces(&mut self, status: u16) -> &mut Self {
        self.push(RouteConfigurator::Produces(ProducesDeclaration {
            status,
            type_name: None,
            content_type: None,
        }))
    }

    /// Declare a status code returned with a `T` JSON body.
    pub fn produces_type<T>(&mut self, status: u16) -> &mut Self {
        self.push(RouteConfigurator::Produces(ProducesDeclaration {
            status,
            type_name: Some(std::any::type_name::<T>()),
            content_type: Some("application/json".to_string()),
        }))
    }

    /// Declare a status code returned as problem details.
    pub fn produces_problem(&mut self, status: u16) -> &mut Self {
        self.push(RouteConfigurator::Produces(ProducesDeclaration {
            status,
            type_name: None,
            content_type: Some("application/problem+json".to_string()),
        }))
    }

    /// Require an authenticated caller satisfying every listed policy.
    pub fn require_authorization<I, S>(&mut self, policies: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(RouteConfigurator::RequireAuthorization(
            policies.into_iter().map(Into::into).collect(),
        ))
    }

    pub fn allow_anonymous(&mut self) -> &mut Self {
        self.push(RouteConfigurator::AllowAnonymous)
    }

    pub fn accepts(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.push(RouteConfigurator::Accepts(vec![content_type.into()]))
    }

    /// Accept multipart and urlencoded form bodies.
    pub fn accepts_form_data(&mut self) -> &mut Self {
        self.push(RouteConfigurator::Accepts(vec![
            "multipart/form-data".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        ]))
    }

    pub fn disable_antiforgery(&mut self) -> &mut Self {
        self.push(RouteConfigurator::DisableAntiforgery)
    }

    /// Accept multipart uploads without antiforgery validation.
    pub fn allow_file_uploads(&mut self) -> &mut Self {
        self.push(RouteConfigurator::Accepts(vec!["multipart/form-data".to_string()]))
            .disable_antiforgery()
    }

    /// Override the application's form limits for this endpoint.
    pub fn form_options(&mut self, options: FormOptions) -> &mut Self {
        self.form_options = Some(options);
        self
    }

    pub fn file_binding_mode(&mut self, mode: FileBindingMode) -> &mut Self {
        self.file_binding_mode = Some(mode);
        self
    }

    /// Arbitrary metadata edits, applied in order with the other calls.
    pub fn with_metadata<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut RouteMetadata) + Send + Sync + 'static,
    {
        self.push(RouteConfigurator::Custom(Arc::new(f)))
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn method(&self) -> Option<HttpMethod> {
        self.method
    }

    pub fn configurators(&self) -> &[RouteConfigurator] {
        &self.configurators
    }

    pub fn form_options_override(&self) -> Option<&FormOptions> {
        self.form_options.as_ref()
    }

    pub fn file_binding_mode_override(&self) -> Option<FileBindingMode> {
        self.file_binding_mode
    }

    pub(crate) fn into_parts(self) -> RouteConfigParts {
        RouteConfigParts {
            route: self.route,
            method: self.method,
            configurators: self.configurators,
            form_options: self.form_options,
            file_binding_mode: self.file_binding_mode,
        }
    }
}

pub(crate) struct RouteConfigParts {
    pub route: Option<String>,
    pub method: Option<HttpMethod>,
    pub configurators: Vec<RouteConfigurator>,
    pub form_options: Option<FormOptions>,
    pub file_binding_mode: Option<FileBindingMode>,
}
