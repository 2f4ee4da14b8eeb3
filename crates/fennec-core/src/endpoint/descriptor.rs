use std::any::{TypeId, type_name};
use std::fmt;

use crate::binding::MetadataCache;
use crate::config::{FileBindingMode, FormOptions};
use crate::endpoint::Endpoint;
use crate::endpoint::config::{HttpMethod, RouteConfig, RouteConfigurator, RouteMetadata};
use crate::error::ConfigurationError;

/// Where an endpoint's request value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// The endpoint takes no request.
    None,
    RouteQuery,
    /// JSON body, then route values merged into default fields.
    Body,
    /// Multipart or urlencoded form.
    Form,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param {
        name: String,
        optional: bool,
        catch_all: bool,
        default: Option<String>,
    },
}

/// A validated route template such as `/users/{id:int}/files/{*path}`.
///
/// Constraints (`{id:int}`) are accepted and stripped; the router only
/// sees parameter names. A default (`{page=1}`) makes the segment optional
/// and is kept so dispatch can supply it when the path omits it. A segment marked
/// optional (`{id?}`) or a catch-all must come last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(endpoint: &str, raw: &str) -> Result<Self, ConfigurationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigurationError::MissingRoute {
                endpoint: endpoint.to_string(),
            });
        }
        let template = if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        let invalid = |reason: &str| ConfigurationError::InvalidRoute {
            endpoint: endpoint.to_string(),
            route: template.clone(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut names: Vec<String> = Vec::new();
        for part in template.split('/').skip(1) {
            if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                let segment = parse_param(inner).map_err(|reason| invalid(reason))?;
                if let Segment::Param { name, .. } = &segment {
                    if names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                        return Err(invalid(&format!("parameter '{name}' appears more than once")));
                    }
                    names.push(name.clone());
                }
                segments.push(segment);
            } else if part.contains('{') || part.contains('}') {
                return Err(invalid("route parameters must span a whole path segment"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            if let Segment::Param {
                name,
                optional,
                catch_all,
                ..
            } = segment
                && (*optional || *catch_all)
                && i != last
            {
                return Err(invalid(&format!(
                    "optional or catch-all parameter '{name}' must be the last segment"
                )));
            }
        }

        Ok(RoutePattern { template, segments })
    }

    /// The template as declared, with a leading slash.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in order.
    pub fn parameters(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Param { name, .. } => Some(name.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// `(name, value)` for every parameter declared with a default.
    pub fn defaults(&self) -> impl Iterator<Item = (&str, &str)> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param {
                name,
                default: Some(value),
                ..
            } => Some((name.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// Paths in axum syntax. A trailing optional segment or catch-all
    /// yields a second path without it.
    pub fn axum_paths(&self) -> Vec<String> {
        let full = render(&self.segments);
        match self.segments.last() {
            Some(Segment::Param {
                optional, catch_all, ..
            }) if *optional || *catch_all => {
                vec![full, render(&self.segments[..self.segments.len() - 1])]
            }
            _ => vec![full],
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn parse_param(inner: &str) -> Result<Segment, &'static str> {
    let (catch_all, rest) = if let Some(rest) = inner.strip_prefix("**") {
        (true, rest)
    } else if let Some(rest) = inner.strip_prefix('*') {
        (true, rest)
    } else {
        (false, inner)
    };
    let (rest, optional) = match rest.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (rest, false),
    };
    let (rest, default) = match rest.split_once('=') {
        Some((rest, value)) => (rest, Some(value.to_string())),
        None => (rest, None),
    };
    let name = rest.split(':').next().unwrap_or_default();
    if name.is_empty() {
        return Err("route parameter has no name");
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("route parameter names may only contain letters, digits and '_'");
    }
    Ok(Segment::Param {
        name: name.to_string(),
        optional: optional || default.is_some(),
        catch_all,
        default,
    })
}

fn render(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        match segment {
            Segment::Literal(lit) => path.push_str(lit),
            Segment::Param {
                name, catch_all, ..
            } => {
                if *catch_all {
                    path.push_str(&format!("{{*{name}}}"));
                } else {
                    path.push_str(&format!("{{{name}}}"));
                }
            }
        }
    }
    path
}

/// `my_app::users::GetUser<T>` -> `GetUser`.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Everything the dispatcher needs to know about one endpoint, observed
/// once at startup.
#[derive(Debug, Clone)]
pub struct EndpointDescriptor {
    pub type_name: &'static str,
    pub full_type_name: &'static str,
    pub route: RoutePattern,
    pub method: HttpMethod,
    pub request: Option<&'static str>,
    pub response: Option<&'static str>,
    pub binding_mode: BindingMode,
    pub configurators: Vec<RouteConfigurator>,
    pub form_options: Option<FormOptions>,
    pub file_binding_mode: Option<FileBindingMode>,
}

impl EndpointDescriptor {
    pub fn describe<E: Endpoint>() -> Result<Self, ConfigurationError> {
        let full_type_name = type_name::<E>();
        let short = short_type_name(full_type_name);

        let mut config = RouteConfig::new();
        E::configure(&mut config);
        let parts = config.into_parts();

        let (Some(method), Some(raw_route)) = (parts.method, parts.route) else {
            return Err(ConfigurationError::MissingRoute {
                endpoint: short.to_string(),
            });
        };
        let route = RoutePattern::parse(short, &raw_route)?;

        let request = if TypeId::of::<E::Request>() == TypeId::of::<()>() {
            None
        } else {
            Some(type_name::<E::Request>())
        };
        let response = if TypeId::of::<E::Response>() == TypeId::of::<()>() {
            None
        } else {
            Some(type_name::<E::Response>())
        };

        let binding_mode = match request {
            None => BindingMode::None,
            Some(_) if !method.has_body() => BindingMode::RouteQuery,
            Some(_) if MetadataCache::global().requires_multipart::<E::Request>() => {
                BindingMode::Form
            }
            Some(request_name) => {
                let meta = MetadataCache::global().metadata::<E::Request>();
                if !meta.shape.json_body {
                    return Err(ConfigurationError::BodyNotSupported {
                        endpoint: short.to_string(),
                        request: short_type_name(request_name).to_string(),
                    });
                }
                BindingMode::Body
            }
        };

        Ok(EndpointDescriptor {
            type_name: short,
            full_type_name,
            route,
            method,
            request,
            response,
            binding_mode,
            configurators: parts.configurators,
            form_options: parts.form_options,
            file_binding_mode: parts.file_binding_mode,
        })
    }

    /// Route metadata from the configurator list, in declaration order.
    pub fn metadata(&self, require_authorization: bool) -> RouteMetadata {
        let mut metadata = RouteMetadata::default();
        for configurator in &self.configurators {
            configurator.apply(&mut metadata);
        }
        if metadata.name.is_none() {
            metadata.name = Some(self.type_name.to_string());
        }
        metadata.apply_global_authorization(require_authorization);
        metadata
    }
}
