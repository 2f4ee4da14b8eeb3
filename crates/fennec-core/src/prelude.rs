//! Fennec prelude: everything an endpoint module needs.
//!
//! ```rust,ignore
//! use fennec_core::prelude::*;
//! ```

// ── Core types ─────────────────────────────────────────────────
pub use crate::Fennec;
pub use crate::FennecError;
pub use crate::FennecSettings;
pub use crate::config::{FileBindingMode, FormOptions};

// ── Endpoints ──────────────────────────────────────────────────
pub use crate::endpoint::{Endpoint, HttpMethod, RouteConfig, RouteMetadata};
pub use crate::register_endpoint;
pub use crate::{HandlerContext, ProblemDetails, Responder, Sent};

// ── Binding ────────────────────────────────────────────────────
pub use crate::binding::{FormFile, FormFiles, StreamFile};
pub use crate::error::BindingError;

// ── Dependencies ───────────────────────────────────────────────
pub use crate::di::{Injectable as _, Scope, ServiceCollection, ServiceProvider};

// ── Derives ────────────────────────────────────────────────────
pub use crate::async_trait;
pub use crate::{BindRequest, BindValue, Injectable};

// ── HTTP types ─────────────────────────────────────────────────
pub use axum::http::StatusCode;

// ── Serde (almost every request/response type needs these) ─────
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
