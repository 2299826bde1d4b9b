use std::time::Instant;

use axum::{
    body::Body,
    http::{Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// What a console handler did: the resource it touched and how that went.
/// Travels on the response so the access log can report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleAction {
    pub resource: &'static str,
    pub outcome: &'static str,
}

impl ConsoleAction {
    pub fn new(resource: &'static str, outcome: &'static str) -> Self {
        Self { resource, outcome }
    }

    pub fn attach(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    let action = response.extensions().get::<ConsoleAction>().copied();
    let resource = action.map_or("", |action| action.resource);
    let outcome = action.map_or("", |action| action.outcome);

    if status.is_client_error() || status.is_server_error() {
        let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "crudboard::http::response",
                status = status.as_u16(),
                method = %method,
                path = %path,
                resource,
                elapsed_ms,
                source,
                detail = %detail,
                chain = ?messages,
                request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "crudboard::http::response",
                status = status.as_u16(),
                method = %method,
                path = %path,
                resource,
                elapsed_ms,
                source,
                detail = %detail,
                request_id,
                "client request error",
            );
        }
        return response;
    }

    // Form posts log at info; everything else at debug.
    let redirect_to = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    if method == Method::POST && action.is_some() && resource != "toasts" {
        info!(
            target = "crudboard::http::action",
            status = status.as_u16(),
            path = %path,
            resource,
            outcome,
            redirect_to,
            elapsed_ms,
            request_id,
            "console action",
        );
    } else {
        debug!(
            status = status.as_u16(),
            method = %method,
            path = %path,
            resource,
            outcome,
            elapsed_ms,
            request_id,
            "request completed",
        );
    }

    response
}
