use std::sync::Arc;

use axum::http::{Extensions, HeaderMap, Method, Uri};
use tokio_util::sync::CancellationToken;

use crate::binding::KeyedValues;
use crate::endpoint::RouteMetadata;

/// Request details handed to an endpoint next to its bound request.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
    route_values: KeyedValues,
    metadata: Arc<RouteMetadata>,
    cancel: CancellationToken,
}

impl HandlerContext {
    pub fn new(method: Method, uri: Uri) -> Self {
        HandlerContext {
            method,
            uri,
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
            route_values: KeyedValues::new(),
            metadata: Arc::new(RouteMetadata::default()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_route_values(mut self, route_values: KeyedValues) -> Self {
        self.route_values = route_values;
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<RouteMetadata>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Request extensions inserted by host middleware.
    pub fn extension<T: Clone + Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// A matched route value by name.
    pub fn route_value(&self, name: &str) -> Option<&str> {
        self.route_values.get(name)
    }

    pub fn metadata(&self) -> &RouteMetadata {
        &self.metadata
    }

    /// Fires when the client goes away.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
