//! Endpoints: one type per HTTP operation.
//!
//! ```rust,ignore
//! #[derive(Injectable)]
//! pub struct GetUser {
//!     store: Arc<UserStore>,
//! }
//!
//! #[async_trait]
//! impl Endpoint for GetUser {
//!     type Request = GetUserRequest;
//!     type Response = User;
//!
//!     fn configure(route: &mut RouteConfig) {
//!         route.get("/users/{id}").tags(["Users"]).produces(200).produces(404);
//!     }
//!
//!     async fn handle(
//!         &self,
//!         request: GetUserRequest,
//!         _cx: HandlerContext,
//!         send: Responder<User>,
//!     ) -> Result<Sent, FennecError> {
//!         match self.store.get(request.id) {
//!             Some(user) => Ok(send.ok(user)),
//!             None => Ok(send.not_found()),
//!         }
//!     }
//! }
//!
//! register_endpoint!(GetUser);
//! ```

pub mod config;
pub mod descriptor;
pub mod discovery;

use async_trait::async_trait;
use serde::Serialize;

use crate::binding::RequestShape;
use crate::di::Injectable;
use crate::dispatch::{HandlerContext, Responder, Sent};
use crate::error::FennecError;

pub use config::{
    AuthRequirement, HttpMethod, ProducesDeclaration, RouteConfig, RouteConfigurator,
    RouteMetadata,
};
pub use descriptor::{BindingMode, EndpointDescriptor, RoutePattern, short_type_name};
pub use discovery::{
    DiscoveredEndpoint, EndpointRegistration, describe_all, discover_endpoints,
    registered_endpoints,
};

/// A single HTTP operation.
///
/// Use `()` as `Request` for endpoints that bind nothing, and as
/// `Response` for endpoints that never send a JSON body.
#[async_trait]
pub trait Endpoint: Injectable + Sync {
    type Request: RequestShape;
    type Response: Serialize + Send + 'static;

    /// Declare the route, verb and metadata.
    fn configure(route: &mut RouteConfig);

    async fn handle(
        &self,
        request: Self::Request,
        cx: HandlerContext,
        send: Responder<Self::Response>,
    ) -> Result<Sent, FennecError>;
}
