//! Optional API-key protection for `/api` routes.
//!
//! When `server.api_key` is set, a request must present it in the
//! `x-functions-key` header, the `code` query parameter, or as a bearer
//! token.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use liveops_core::Error;

use super::error::AppError;
use super::request_id::RequestId;
use crate::context::AppContext;

pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    code: Option<String>,
}

/// Key presented by the caller, if any.
fn presented_key<'a>(headers: &'a HeaderMap, query: Option<&'a str>) -> Option<&'a str> {
    if let Some(key) = headers.get(FUNCTION_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(key);
    }
    if let Some(code) = query {
        return Some(code);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub async fn api_key_middleware(
    State(ctx): State<AppContext>,
    query: Option<Query<KeyQuery>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = ctx.config.server.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let code = query.as_ref().and_then(|q| q.code.as_deref());
    let presented = presented_key(request.headers(), code);
    if presented == Some(expected) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(
        path = %request.uri().path(),
        key_present = presented.is_some(),
        "Rejected API request"
    );
    let message = if presented.is_some() {
        "invalid API key"
    } else {
        "API key required"
    };
    let mut err = AppError::new(Error::Unauthorized(message.into()));
    if let Some(id) = request.extensions().get::<RequestId>() {
        err = err.with_request_id(id.0.clone());
    }
    Err(err)
}
