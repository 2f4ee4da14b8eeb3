//! Link-time endpoint registration.
//!
//! `register_endpoint!` submits an [`EndpointRegistration`] to an
//! `inventory` collection; [`discover_endpoints`] walks it at startup.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::routing::MethodRouter;

use crate::di::{FactoryCache, InjectionPlan};
use crate::dispatch::{MountContext, mount};
use crate::endpoint::Endpoint;
use crate::endpoint::descriptor::EndpointDescriptor;
use crate::error::ConfigurationError;

type DescribeFn = fn() -> Result<EndpointDescriptor, ConfigurationError>;
type MountFn = fn(&MountContext, Arc<EndpointDescriptor>) -> MethodRouter;
type PlanFn = fn() -> Arc<InjectionPlan>;

/// Type-erased entry points for one endpoint type.
#[derive(Clone, Copy)]
pub struct EndpointRegistration {
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
    describe: DescribeFn,
    mount: MountFn,
    plan: PlanFn,
}

impl EndpointRegistration {
    pub const fn new<E: Endpoint>() -> Self {
        EndpointRegistration {
            type_id: TypeId::of::<E>,
            type_name: std::any::type_name::<E>,
            describe: EndpointDescriptor::describe::<E>,
            mount: mount::<E>,
            plan: plan_of::<E>,
        }
    }

    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    pub fn describe(&self) -> Result<EndpointDescriptor, ConfigurationError> {
        (self.describe)()
    }

    pub fn mount(&self, cx: &MountContext, descriptor: Arc<EndpointDescriptor>) -> MethodRouter {
        (self.mount)(cx, descriptor)
    }

    pub fn plan(&self) -> Arc<InjectionPlan> {
        (self.plan)()
    }
}

impl fmt::Debug for EndpointRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRegistration")
            .field("type_name", &self.type_name())
            .finish()
    }
}

fn plan_of<E: Endpoint>() -> Arc<InjectionPlan> {
    FactoryCache::global().plan::<E>()
}

inventory::collect!(EndpointRegistration);

/// Register endpoint types for discovery.
///
/// ```rust,ignore
/// register_endpoint!(GetUser, CreateUser, DeleteUser);
/// ```
#[macro_export]
macro_rules! register_endpoint {
    ($($endpoint:ty),+ $(,)?) => {
        $(
            $crate::__private::inventory::submit! {
                $crate::endpoint::EndpointRegistration::new::<$endpoint>()
            }
        )+
    };
}

/// An endpoint with its descriptor, ready to mount.
#[derive(Debug, Clone)]
pub struct DiscoveredEndpoint {
    pub registration: EndpointRegistration,
    pub descriptor: Arc<EndpointDescriptor>,
}

/// Every registration submitted with `register_endpoint!`.
pub fn registered_endpoints() -> Vec<EndpointRegistration> {
    inventory::iter::<EndpointRegistration>
        .into_iter()
        .copied()
        .collect()
}

/// Describe and validate every registered endpoint.
pub fn discover_endpoints() -> Result<Vec<DiscoveredEndpoint>, ConfigurationError> {
    describe_all(registered_endpoints())
}

/// Describe `registrations`, dropping repeats of the same type, and reject
/// two endpoints claiming the same method and path.
///
/// The result is ordered by route template, then method.
pub fn describe_all<I>(registrations: I) -> Result<Vec<DiscoveredEndpoint>, ConfigurationError>
where
    I: IntoIterator<Item = EndpointRegistration>,
{
    let mut seen = Vec::new();
    let mut endpoints = Vec::new();
    for registration in registrations {
        let id = registration.type_id();
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        let descriptor = registration.describe()?;
        tracing::debug!(
            endpoint = descriptor.type_name,
            method = %descriptor.method,
            route = %descriptor.route,
            "discovered endpoint"
        );
        endpoints.push(DiscoveredEndpoint {
            registration,
            descriptor: Arc::new(descriptor),
        });
    }

    let mut claimed: HashMap<(String, String), &'static str> = HashMap::new();
    let mut shapes: HashMap<String, (String, &'static str)> = HashMap::new();
    for endpoint in &endpoints {
        let d = &endpoint.descriptor;
        for path in d.route.axum_paths() {
            // The router rejects `/users/{id}` next to `/users/{user_id}`.
            let shape = path_shape(&path);
            match shapes.get(&shape) {
                Some((other, owner)) if *other != path => {
                    return Err(ConfigurationError::InvalidRoute {
                        endpoint: d.type_name.to_string(),
                        route: d.route.template().to_string(),
                        reason: format!(
                            "'{path}' conflicts with '{other}' from '{owner}'; use the same parameter names"
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    shapes.insert(shape, (path.clone(), d.type_name));
                }
            }

            let key = (d.method.as_str().to_string(), path);
            if let Some(first) = claimed.insert(key.clone(), d.type_name) {
                return Err(ConfigurationError::DuplicateRoute {
                    method: key.0,
                    route: key.1,
                    first: first.to_string(),
                    second: d.type_name.to_string(),
                });
            }
        }
    }

    endpoints.sort_by(|a, b| {
        a.descriptor
            .route
            .template()
            .cmp(b.descriptor.route.template())
            .then(a.descriptor.method.cmp(&b.descriptor.method))
    });
    Ok(endpoints)
}

fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.starts_with("{*") {
                "{*}"
            } else if segment.starts_with('{') {
                "{}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
