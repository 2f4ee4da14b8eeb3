//! The single response a request produces.

use std::marker::PhantomData;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::error::BindingError;

/// Title of the 400 response produced for binding failures.
pub const INVALID_PAYLOAD_TITLE: &str = "Invalid request payload";

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

fn type_link(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "https://tools.ietf.org/html/rfc9110#section-15.5.1",
        401 => "https://tools.ietf.org/html/rfc9110#section-15.5.2",
        403 => "https://tools.ietf.org/html/rfc9110#section-15.5.4",
        404 => "https://tools.ietf.org/html/rfc9110#section-15.5.5",
        408 => "https://tools.ietf.org/html/rfc9110#section-15.5.9",
        409 => "https://tools.ietf.org/html/rfc9110#section-15.5.10",
        413 => "https://tools.ietf.org/html/rfc9110#section-15.5.14",
        500 => "https://tools.ietf.org/html/rfc9110#section-15.6.1",
        _ => "about:blank",
    }
}

/// An RFC 9457 problem-details body.
///
/// ```json
/// {
///   "type": "https://tools.ietf.org/html/rfc9110#section-15.5.1",
///   "title": "Invalid request payload",
///   "status": 400,
///   "errors": { "age": ["'abc' is not a valid i32"] }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BindingError>,
}

impl ProblemDetails {
    pub fn for_status(status: StatusCode) -> Self {
        ProblemDetails {
            kind: type_link(status).to_string(),
            title: status.canonical_reason().unwrap_or("Error").to_string(),
            status: status.as_u16(),
            detail: None,
            instance: None,
            errors: None,
        }
    }

    /// The 400 body listing every failing field.
    pub fn validation(errors: BindingError) -> Self {
        ProblemDetails {
            title: INVALID_PAYLOAD_TITLE.to_string(),
            errors: Some(errors),
            ..Self::for_status(StatusCode::BAD_REQUEST)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match serde_json::to_vec(&self) {
            Ok(bytes) => (
                status,
                [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
                bytes,
            )
                .into_response(),
            Err(_) => (status, "Internal Server Error").into_response(),
        }
    }
}

/// Contents of a file response.
pub enum FileBody {
    Bytes(Bytes),
    Stream(Body),
}

/// The normalized outcome of one request.
pub enum ResponseEnvelope {
    Empty {
        status: StatusCode,
        headers: HeaderMap,
    },
    /// A serialized JSON body.
    Body {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },
    Problem(ProblemDetails),
    File {
        content_type: String,
        file_name: Option<String>,
        body: FileBody,
    },
}

impl ResponseEnvelope {
    pub fn status(&self) -> StatusCode {
        match self {
            ResponseEnvelope::Empty { status, .. } | ResponseEnvelope::Body { status, .. } => *status,
            ResponseEnvelope::Problem(problem) => problem.status_code(),
            ResponseEnvelope::File { .. } => StatusCode::OK,
        }
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> Response {
        match self {
            ResponseEnvelope::Empty { status, headers } => (status, headers).into_response(),
            ResponseEnvelope::Body {
                status,
                mut headers,
                body,
            } => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
                (status, headers, body).into_response()
            }
            ResponseEnvelope::Problem(problem) => problem.into_response(),
            ResponseEnvelope::File {
                content_type,
                file_name,
                body,
            } => {
                let mut headers = HeaderMap::new();
                let content_type = HeaderValue::from_str(&content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
                headers.insert(header::CONTENT_TYPE, content_type);
                if let Some(name) = file_name {
                    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', ""));
                    if let Ok(value) = HeaderValue::from_str(&disposition) {
                        headers.insert(header::CONTENT_DISPOSITION, value);
                    }
                }
                let body = match body {
                    FileBody::Bytes(bytes) => Body::from(bytes),
                    FileBody::Stream(body) => body,
                };
                (StatusCode::OK, headers, body).into_response()
            }
        }
    }
}

/// Proof that a handler produced its response.
///
/// Only a [`Responder`] can create one, and a responder is consumed in the
/// process, so each request yields exactly one `Sent`.
#[must_use = "return the Sent value from the handler"]
pub struct Sent {
    envelope: ResponseEnvelope,
}

impl Sent {
    pub fn status(&self) -> StatusCode {
        self.envelope.status()
    }

    pub fn envelope(&self) -> &ResponseEnvelope {
        &self.envelope
    }

    pub fn into_envelope(self) -> ResponseEnvelope {
        self.envelope
    }
}

impl IntoResponse for Sent {
    fn into_response(self) -> Response {
        self.envelope.into_response()
    }
}

/// The handler's one-shot response builder.
///
/// Every method takes `self`, so a handler can answer at most once.
pub struct Responder<R> {
    _response: PhantomData<fn(R)>,
}

impl<R> Responder<R> {
    pub(crate) fn new() -> Self {
        Responder {
            _response: PhantomData,
        }
    }

    fn send(self, envelope: ResponseEnvelope) -> Sent {
        Sent { envelope }
    }

    fn empty(self, status: StatusCode, headers: HeaderMap) -> Sent {
        self.send(ResponseEnvelope::Empty { status, headers })
    }

    /// 200 with no body.
    pub fn ok_empty(self) -> Sent {
        self.empty(StatusCode::OK, HeaderMap::new())
    }

    /// 201 with a `Location` header and no body.
    pub fn created_at(self, location: impl AsRef<str>) -> Sent {
        self.empty(StatusCode::CREATED, location_header(location.as_ref()))
    }

    pub fn no_content(self) -> Sent {
        self.empty(StatusCode::NO_CONTENT, HeaderMap::new())
    }

    /// A status code with no body.
    pub fn status(self, status: StatusCode) -> Sent {
        self.empty(status, HeaderMap::new())
    }

    pub fn problem(self, problem: ProblemDetails) -> Sent {
        self.send(ResponseEnvelope::Problem(problem))
    }

    pub fn not_found(self) -> Sent {
        self.problem(ProblemDetails::for_status(StatusCode::NOT_FOUND))
    }

    pub fn not_found_message(self, message: impl Into<String>) -> Sent {
        self.problem(ProblemDetails::for_status(StatusCode::NOT_FOUND).with_detail(message))
    }

    pub fn bad_request(self, message: impl Into<String>) -> Sent {
        self.problem(ProblemDetails::for_status(StatusCode::BAD_REQUEST).with_detail(message))
    }

    /// 400 listing field errors, in the same shape as a binding failure.
    pub fn bad_request_problem(self, errors: BindingError) -> Sent {
        self.problem(ProblemDetails::validation(errors))
    }

    pub fn unauthorized(self) -> Sent {
        self.status(StatusCode::UNAUTHORIZED)
    }

    pub fn unauthorized_message(self, message: impl Into<String>) -> Sent {
        self.problem(ProblemDetails::for_status(StatusCode::UNAUTHORIZED).with_detail(message))
    }

    pub fn forbidden(self) -> Sent {
        self.status(StatusCode::FORBIDDEN)
    }

    pub fn forbidden_message(self, message: impl Into<String>) -> Sent {
        self.problem(ProblemDetails::for_status(StatusCode::FORBIDDEN).with_detail(message))
    }

    pub fn conflict(self, message: impl Into<String>) -> Sent {
        self.problem(ProblemDetails::for_status(StatusCode::CONFLICT).with_detail(message))
    }

    /// 200 with the given bytes as a file download.
    pub fn file(
        self,
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
        file_name: Option<&str>,
    ) -> Sent {
        self.send(ResponseEnvelope::File {
            content_type: content_type.into(),
            file_name: file_name.map(str::to_string),
            body: FileBody::Bytes(bytes.into()),
        })
    }

    /// 200 streaming `reader` as a file download.
    pub fn file_stream<S>(self, reader: S, content_type: impl Into<String>, file_name: Option<&str>) -> Sent
    where
        S: AsyncRead + Send + 'static,
    {
        self.send(ResponseEnvelope::File {
            content_type: content_type.into(),
            file_name: file_name.map(str::to_string),
            body: FileBody::Stream(Body::from_stream(ReaderStream::new(reader))),
        })
    }
}

impl<R: Serialize> Responder<R> {
    /// 200 with a JSON body.
    pub fn ok(self, body: R) -> Sent {
        self.json(StatusCode::OK, body)
    }

    /// 201 with a `Location` header and a JSON body.
    pub fn created(self, location: impl AsRef<str>, body: R) -> Sent {
        let headers = location_header(location.as_ref());
        self.json_with_headers(StatusCode::CREATED, headers, body)
    }

    /// Any status with a JSON body.
    pub fn json(self, status: StatusCode, body: R) -> Sent {
        self.json_with_headers(status, HeaderMap::new(), body)
    }

    fn json_with_headers(self, status: StatusCode, headers: HeaderMap, body: R) -> Sent {
        match serde_json::to_vec(&body) {
            Ok(bytes) => self.send(ResponseEnvelope::Body {
                status,
                headers,
                body: Bytes::from(bytes),
            }),
            Err(e) => {
                tracing::error!("failed to serialize response body: {}", e);
                self.problem(ProblemDetails::for_status(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

fn location_header(location: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(location) {
        headers.insert(header::LOCATION, value);
    }
    headers
}
