//! Fennec: one type per HTTP operation, bound and dispatched on axum.

extern crate self as fennec_core;

pub mod app;
pub mod binding;
pub mod config;
pub mod di;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod testing;

pub use app::{Fennec, FennecApp, RouteEntry, RouteTable};
pub use binding::{FormFile, FormFiles, StreamFile};
pub use config::{FennecSettings, FileBindingMode, FormOptions};
pub use di::{ServiceCollection, ServiceProvider};
pub use dispatch::{HandlerContext, PROBLEM_CONTENT_TYPE, ProblemDetails, Responder, Sent};
pub use endpoint::{Endpoint, RouteConfig};
pub use error::{BindingError, ConfigurationError, FennecError, ResolveError};
pub use testing::{TestClient, TestResponse, TestServer};

pub use async_trait::async_trait;
pub use fennec_macros::{BindRequest, BindValue, Injectable};

// Re-export axum's router so users don't need a direct dependency.
pub use axum::Router;

#[doc(hidden)]
pub mod __private {
    pub use inventory;
    pub use serde_json;
}
