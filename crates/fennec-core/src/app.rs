use std::fmt;
use std::sync::Arc;

use axum::Router;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{FennecSettings, FileBindingMode, FormOptions};
use crate::di::ServiceProvider;
use crate::dispatch::MountContext;
use crate::endpoint::{
    BindingMode, Endpoint, EndpointRegistration, HttpMethod, describe_all, registered_endpoints,
};
use crate::error::{ConfigurationError, FennecError};

/// Builds a router from endpoint types.
///
/// ```rust,ignore
/// let services = ServiceCollection::new()
///     .add_singleton(Arc::new(UserStore::default()))
///     .build();
///
/// Fennec::from_env(services)
///     .discover()
///     .require_authorization()
///     .serve()
///     .await?;
/// ```
pub struct Fennec {
    services: ServiceProvider,
    settings: FennecSettings,
    registrations: Vec<EndpointRegistration>,
    discover: bool,
    custom_routes: Vec<Router>,
}

impl Fennec {
    /// Create a builder with default settings.
    pub fn new(services: ServiceProvider) -> Self {
        Fennec {
            services,
            settings: FennecSettings::default(),
            registrations: Vec::new(),
            discover: false,
            custom_routes: Vec::new(),
        }
    }

    /// Create a builder with settings read from the environment.
    pub fn from_env(services: ServiceProvider) -> Self {
        Fennec::new(services).settings(FennecSettings::from_env())
    }

    /// Replace all settings.
    pub fn settings(mut self, settings: FennecSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Adjust the default form limits.
    pub fn configure_form_options(mut self, configure: impl FnOnce(&mut FormOptions)) -> Self {
        configure(&mut self.settings.form);
        self
    }

    pub fn file_binding_mode(mut self, mode: FileBindingMode) -> Self {
        self.settings.file_binding_mode = mode;
        self
    }

    /// Require authentication on every route that doesn't declare its own
    /// requirement.
    pub fn require_authorization(mut self) -> Self {
        self.settings.require_authorization = true;
        self
    }

    pub fn max_json_body_size(mut self, bytes: usize) -> Self {
        self.settings.max_json_body_size = bytes;
        self
    }

    /// Add request tracing and `x-request-id` propagation.
    pub fn trace_requests(mut self, enabled: bool) -> Self {
        self.settings.trace_requests = enabled;
        self
    }

    /// Register one endpoint type.
    pub fn endpoint<E: Endpoint>(mut self) -> Self {
        self.registrations.push(EndpointRegistration::new::<E>());
        self
    }

    /// Include every type registered with `register_endpoint!`.
    pub fn discover(mut self) -> Self {
        self.discover = true;
        self
    }

    /// Merge a plain axum router next to the endpoints.
    pub fn routes(mut self, router: Router) -> Self {
        self.custom_routes.push(router);
        self
    }

    /// Describe, validate and mount every endpoint.
    pub fn build(self) -> Result<FennecApp, ConfigurationError> {
        let mut registrations = self.registrations;
        if self.discover {
            registrations.extend(registered_endpoints());
        }
        let endpoints = describe_all(registrations)?;

        let settings = Arc::new(self.settings);
        let cx = MountContext::new(self.services.clone(), settings.clone());
        let mut router = Router::new();
        let mut routes = RouteTable::default();

        for endpoint in &endpoints {
            let descriptor = &endpoint.descriptor;
            let missing = endpoint.registration.plan().missing(&self.services);
            if !missing.is_empty() {
                tracing::warn!(
                    endpoint = descriptor.type_name,
                    "unregistered dependencies: {}; requests will fail until they are added",
                    missing.join(", ")
                );
            }

            let metadata = descriptor.metadata(settings.require_authorization);
            let method_router = endpoint.registration.mount(&cx, descriptor.clone());
            for path in descriptor.route.axum_paths() {
                tracing::info!(
                    "Mapped {} {} -> {}",
                    descriptor.method,
                    path,
                    descriptor.type_name
                );
                router = router.route(&path, method_router.clone());
                routes.entries.push(RouteEntry {
                    method: descriptor.method,
                    path,
                    template: descriptor.route.template().to_string(),
                    endpoint: descriptor.type_name,
                    name: metadata.name.clone().unwrap_or_default(),
                    binding_mode: descriptor.binding_mode,
                    requires_authorization: metadata.requires_authorization(),
                });
            }
        }

        for custom in self.custom_routes {
            router = router.merge(custom);
        }

        if settings.trace_requests {
            use tower_http::LatencyUnit;
            use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse};

            let x_request_id = axum::http::HeaderName::from_static("x-request-id");
            router = router
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(PropagateRequestIdLayer::new(x_request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                        .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                );
        }

        tracing::info!(routes = routes.len(), "Fennec endpoints mounted");
        Ok(FennecApp {
            router,
            routes,
            settings,
        })
    }

    /// Build and return only the router.
    pub fn into_router(self) -> Result<Router, ConfigurationError> {
        Ok(self.build()?.into_router())
    }

    /// Build and serve until Ctrl+C.
    pub async fn serve(self) -> Result<(), FennecError> {
        self.build()?.serve().await
    }
}

/// A built application: the router plus what was mounted on it.
pub struct FennecApp {
    router: Router,
    routes: RouteTable,
    settings: Arc<FennecSettings>,
}

impl FennecApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn settings(&self) -> &FennecSettings {
        &self.settings
    }

    /// Serve on the configured address with graceful shutdown.
    pub async fn serve(self) -> Result<(), FennecError> {
        let addr = self.settings.server_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!("Fennec server running on http://{}", addr);
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down Fennec server...");
}

/// One mounted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: HttpMethod,
    /// Path as given to the router.
    pub path: String,
    /// Route template as declared by the endpoint.
    pub template: String,
    pub endpoint: &'static str,
    pub name: String,
    pub binding_mode: BindingMode,
    pub requires_authorization: bool,
}

/// Every path mounted by [`Fennec::build`].
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|e| e.method == method && e.path == path)
    }

    pub fn by_endpoint(&self, endpoint: &str) -> impl Iterator<Item = &RouteEntry> {
        self.entries.iter().filter(move |e| e.endpoint == endpoint)
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(
                f,
                "{:<7} {:<32} {}",
                entry.method.as_str(),
                entry.path,
                entry.endpoint
            )?;
        }
        Ok(())
    }
}
