use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

use crate::dispatch::response::ProblemDetails;

/// Standard error type for the Fennec framework.
///
/// Handlers return `Result<Sent, FennecError>`; any `Err` is rendered
/// through [`IntoResponse`] as an `application/problem+json` body.
#[derive(Debug, Error)]
pub enum FennecError {
    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FennecError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            FennecError::Binding(_) => StatusCode::BAD_REQUEST,
            FennecError::BadRequest(_) => StatusCode::BAD_REQUEST,
            FennecError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            FennecError::NotFound(_) => StatusCode::NOT_FOUND,
            FennecError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FennecError::Forbidden(_) => StatusCode::FORBIDDEN,
            FennecError::Conflict(_) => StatusCode::CONFLICT,
            FennecError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            FennecError::Configuration(_)
            | FennecError::Resolve(_)
            | FennecError::Internal(_)
            | FennecError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            FennecError::Binding(_) => "BINDING_ERROR",
            FennecError::Configuration(_) => "CONFIGURATION_ERROR",
            FennecError::Resolve(_) => "RESOLVE_ERROR",
            FennecError::BadRequest(_) => "BAD_REQUEST",
            FennecError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            FennecError::NotFound(_) => "NOT_FOUND",
            FennecError::Unauthorized(_) => "UNAUTHORIZED",
            FennecError::Forbidden(_) => "FORBIDDEN",
            FennecError::Conflict(_) => "CONFLICT",
            FennecError::Cancelled => "CANCELLED",
            FennecError::Internal(_) => "INTERNAL_ERROR",
            FennecError::Io(_) => "IO_ERROR",
        }
    }

    /// Convert into the problem-details body used on the wire.
    pub fn to_problem(&self) -> ProblemDetails {
        match self {
            FennecError::Binding(errors) => ProblemDetails::validation(errors.clone()),
            // Server-side failures never leak their internals to the client.
            FennecError::Configuration(_)
            | FennecError::Resolve(_)
            | FennecError::Internal(_)
            | FennecError::Io(_) => ProblemDetails::for_status(self.status_code()),
            other => ProblemDetails::for_status(other.status_code()).with_detail(other.to_string()),
        }
    }
}

impl IntoResponse for FennecError {
    fn into_response(self) -> Response {
        if self.status_code().is_server_error() {
            tracing::error!(code = self.error_code(), "{}", self);
        }
        self.to_problem().into_response()
    }
}

/// All messages recorded against one request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    pub field: String,
    pub messages: Vec<String>,
}

/// Aggregated per-field binding failures.
///
/// Fields keep the order in which their first error was recorded. Field
/// names compare case-insensitively, so `Age` and `age` share one entry.
///
/// Serializes as a JSON object `{ "field": ["message", ...] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingError {
    errors: Vec<FieldErrors>,
}

impl BindingError {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binding error with exactly one message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut err = Self::new();
        err.add(field, message);
        err
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self
            .errors
            .iter_mut()
            .find(|e| e.field.eq_ignore_ascii_case(&field))
        {
            Some(entry) => entry.messages.push(message),
            None => self.errors.push(FieldErrors {
                field,
                messages: vec![message],
            }),
        }
    }

    /// Fold every entry of `other` into `self`.
    pub fn extend(&mut self, other: BindingError) {
        for entry in other.errors {
            for message in entry.messages {
                self.add(entry.field.clone(), message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of distinct failing fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldErrors> {
        self.errors.iter()
    }

    /// Messages recorded for a field (case-insensitive lookup).
    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.errors
            .iter()
            .find(|e| e.field.eq_ignore_ascii_case(field))
            .map(|e| e.messages.as_slice())
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, BindingError> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request binding failed for {} field(s)", self.errors.len())?;
        for entry in &self.errors {
            write!(f, "; {}: {}", entry.field, entry.messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for BindingError {}

impl Serialize for BindingError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.errors.len()))?;
        for entry in &self.errors {
            map.serialize_entry(&entry.field, &entry.messages)?;
        }
        map.end()
    }
}

/// A raw string could not be converted to the declared field type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        ConversionError {
            message: message.into(),
        }
    }

    /// `'<raw>' is not a valid <what>`
    pub fn invalid(raw: &str, what: &str) -> Self {
        Self::new(format!("'{}' is not a valid {}", raw, what))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A request constructor rejected its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ConstructError(pub String);

impl From<ConversionError> for ConstructError {
    fn from(err: ConversionError) -> Self {
        ConstructError(err.message)
    }
}

/// Startup-fatal endpoint configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Endpoint '{endpoint}' must declare a route and an HTTP method in configure()")]
    MissingRoute { endpoint: String },

    #[error(
        "Endpoint '{endpoint}' binds '{request}' from the JSON body, but the type is not marked #[bind(json)]"
    )]
    BodyNotSupported { endpoint: String, request: String },

    #[error("Route {method} {route} is registered by both '{first}' and '{second}'")]
    DuplicateRoute {
        method: String,
        route: String,
        first: String,
        second: String,
    },

    #[error("Endpoint '{endpoint}' has an invalid route '{route}': {reason}")]
    InvalidRoute {
        endpoint: String,
        route: String,
        reason: String,
    },
}

/// A dependency could not be produced for an endpoint or service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("No service of type '{service}' has been registered")]
    NotRegistered { service: &'static str },

    #[error("Failed to construct '{service}': {message}")]
    Factory {
        service: &'static str,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_error_merges_fields_case_insensitively() {
        let mut err = BindingError::new();
        err.add("Age", "first");
        err.add("age", "second");
        err.add("name", "third");

        assert_eq!(err.len(), 2);
        assert_eq!(
            err.messages("AGE").map(|m| m.to_vec()),
            Some(vec!["first".to_string(), "second".to_string()])
        );
    }

    #[test]
    fn binding_error_serializes_in_insertion_order() {
        let mut err = BindingError::new();
        err.add("zeta", "z");
        err.add("alpha", "a");

        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"zeta":["z"],"alpha":["a"]}"#);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            FennecError::from(BindingError::single("x", "y")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FennecError::PayloadTooLarge("big".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            FennecError::from(ResolveError::NotRegistered { service: "Db" }).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
