//! Per-request dispatch: bind, build the endpoint in a fresh scope, call
//! the handler, send exactly one response.

pub mod context;
pub mod lifecycle;
pub mod response;

use std::sync::Arc;

use axum::Extension;
use axum::extract::{DefaultBodyLimit, FromRequestParts, RawPathParams, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, on};
use tokio_util::sync::CancellationToken;

use crate::binding::form::is_length_limit;
use crate::binding::{
    BindingSources, FormReadOptions, KeyedValues, PendingForm, RequestShape,
    bind_from_body_and_route, bind_from_form, bind_from_route_and_query,
};
use crate::config::FennecSettings;
use crate::di::{EndpointFactory, ServiceProvider};
use crate::endpoint::{BindingMode, Endpoint, EndpointDescriptor, RouteMetadata};
use crate::error::FennecError;

pub use context::HandlerContext;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use response::{
    FileBody, INVALID_PAYLOAD_TITLE, PROBLEM_CONTENT_TYPE, ProblemDetails, Responder,
    ResponseEnvelope, Sent,
};

/// Shared state every mounted endpoint receives.
#[derive(Debug, Clone)]
pub struct MountContext {
    pub services: ServiceProvider,
    pub settings: Arc<FennecSettings>,
}

impl MountContext {
    pub fn new(services: ServiceProvider, settings: Arc<FennecSettings>) -> Self {
        MountContext { services, settings }
    }
}

struct RouteState<E> {
    descriptor: Arc<EndpointDescriptor>,
    metadata: Arc<RouteMetadata>,
    factory: EndpointFactory<E>,
    services: ServiceProvider,
    settings: Arc<FennecSettings>,
    form: FormReadOptions,
}

/// Build the axum method router for endpoint `E`.
pub fn mount<E: Endpoint>(cx: &MountContext, descriptor: Arc<EndpointDescriptor>) -> MethodRouter {
    let metadata = Arc::new(descriptor.metadata(cx.settings.require_authorization));
    let form = FormReadOptions::new(
        descriptor
            .form_options
            .clone()
            .unwrap_or_else(|| cx.settings.form.clone()),
        descriptor
            .file_binding_mode
            .unwrap_or(cx.settings.file_binding_mode),
    );
    let body_limit = form.limits.multipart_body_length_limit;
    let filter = descriptor.method.method_filter();
    let binding_mode = descriptor.binding_mode;

    let state = Arc::new(RouteState {
        descriptor,
        metadata: metadata.clone(),
        factory: EndpointFactory::<E>::build(),
        services: cx.services.clone(),
        settings: cx.settings.clone(),
        form,
    });

    let router = on(filter, move |req: Request| {
        let state = state.clone();
        async move { dispatch::<E>(&state, req).await }
    })
    .layer(Extension(metadata));

    if binding_mode == BindingMode::Form {
        router.layer(DefaultBodyLimit::max(body_limit))
    } else {
        router
    }
}

async fn dispatch<E: Endpoint>(state: &RouteState<E>, req: Request) -> Response {
    let endpoint = state.descriptor.type_name;
    let cancel = CancellationToken::new();
    // Cancels the token if the host drops this future mid-request.
    let _cancel_on_drop = cancel.clone().drop_guard();
    let mut lifecycle = Lifecycle::new(endpoint);

    let (mut parts, body) = req.into_parts();
    let mut route_values = match RawPathParams::from_request_parts(&mut parts, &()).await {
        Ok(params) => KeyedValues::from_pairs(params.iter()),
        Err(_) => KeyedValues::new(),
    };
    for (name, value) in state.descriptor.route.defaults() {
        if !route_values.contains(name) {
            route_values.insert(name, value);
        }
    }
    let sources = BindingSources::new(
        route_values.clone(),
        parts
            .uri
            .query()
            .map(KeyedValues::parse_urlencoded)
            .unwrap_or_default(),
    );
    let cx = HandlerContext::new(parts.method.clone(), parts.uri.clone())
        .with_headers(parts.headers.clone())
        .with_extensions(parts.extensions.clone())
        .with_route_values(route_values)
        .with_metadata(state.metadata.clone())
        .with_cancellation(cancel.clone());

    let bound: Result<E::Request, FennecError> = match state.descriptor.binding_mode {
        BindingMode::None => E::Request::default_instance()
            .ok_or_else(|| FennecError::Internal(format!("{endpoint} has no request to bind"))),
        BindingMode::RouteQuery => {
            bind_from_route_and_query::<E::Request>(&sources).map_err(FennecError::from)
        }
        BindingMode::Body => {
            let limit = state.settings.max_json_body_size;
            match axum::body::to_bytes(body, limit).await {
                Ok(bytes) => bind_from_body_and_route::<E::Request>(&bytes, &sources.route)
                    .map_err(FennecError::from),
                Err(e) if is_length_limit(&e) => Err(FennecError::PayloadTooLarge(format!(
                    "Request body exceeds the {limit} byte limit"
                ))),
                Err(e) => Err(FennecError::BadRequest(format!(
                    "Failed to read request body: {e}"
                ))),
            }
        }
        BindingMode::Form => {
            let req = Request::from_parts(parts, body);
            match PendingForm::from_request(req).await {
                Ok(form) => bind_from_form::<E::Request>(&sources, form, &state.form, &cancel).await,
                Err(e) => Err(e),
            }
        }
    };

    let request = match bound {
        Ok(request) => {
            lifecycle.bound();
            request
        }
        Err(e) => {
            lifecycle.failed();
            return finish(&mut lifecycle, e.into_response());
        }
    };

    let scoped = match state.factory.create(&state.services) {
        Ok(scoped) => scoped,
        Err(e) => {
            lifecycle.failed();
            return finish(&mut lifecycle, FennecError::from(e).into_response());
        }
    };

    let result = scoped.handle(request, cx, Responder::new()).await;
    drop(scoped);

    let response = match result {
        Ok(sent) => {
            lifecycle.handled();
            sent.into_response()
        }
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "handler returned an error");
            lifecycle.failed();
            e.into_response()
        }
    };
    finish(&mut lifecycle, response)
}

fn finish(lifecycle: &mut Lifecycle, response: Response) -> Response {
    lifecycle.sent(response.status());
    response
}
