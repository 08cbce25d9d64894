//! Teardown and health endpoints.

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use tracing::Instrument;
use utoipa::ToSchema;

use liveops_core::Error;
use liveops_teardown::{RawTeardownRequest, TeardownFailure, TeardownReport, TeardownSuccess};

use super::request_id::RequestId;
use crate::context::{AppContext, OPERATIONS_VERSION};

pub fn teardown_routes() -> Router<AppContext> {
    Router::new().route(
        "/delete-live-event-output",
        get(delete_live_event_output).post(delete_live_event_output),
    )
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok"
    pub status: String,
    pub version: String,
    /// Metadata store backend in use
    pub store: String,
}

/// Health check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: OPERATIONS_VERSION.into(),
        store: ctx.store.name().into(),
    })
}

/// Tear down a live event and everything attached to it.
///
/// Parameters come from the JSON body, the query string, or both (body
/// fields win). GET requests use the query string only.
#[utoipa::path(
    post,
    path = "/api/delete-live-event-output",
    tag = "teardown",
    params(
        ("channelName" = Option<String>, Query, description = "Live event name"),
        ("deleteAsset" = Option<bool>, Query, description = "Delete recorded assets (default true)"),
        ("regionSelector" = Option<String>, Query, description = "Region suffix selecting the account"),
    ),
    request_body(content = RawTeardownRequest, description = "Teardown parameters", content_type = "application/json"),
    responses(
        (status = 200, description = "Live event deleted", body = TeardownSuccess),
        (status = 400, description = "Invalid request", body = TeardownFailure),
        (status = 404, description = "Live event not found", body = TeardownFailure),
        (status = 502, description = "Media service call failed", body = TeardownFailure),
        (status = 504, description = "Live event did not stop in time", body = TeardownFailure),
    )
)]
pub async fn delete_live_event_output(
    State(ctx): State<AppContext>,
    request_id: Option<Extension<RequestId>>,
    query: Result<Query<RawTeardownRequest>, QueryRejection>,
    body: Bytes,
) -> (StatusCode, Json<TeardownReport>) {
    let (status, report) = match parse_request(query, &body) {
        Ok(request) => {
            let span = tracing::info_span!(
                "teardown",
                channel = %request.channel_name,
                region = request.region.as_deref().unwrap_or(""),
                request_id = request_id
                    .as_ref()
                    .map(|Extension(RequestId(id))| id.as_str())
                    .unwrap_or(""),
            );
            ctx.teardown(&request).instrument(span).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected teardown request");
            TeardownReport::from_error(&e)
        }
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(report))
}

fn parse_request(
    query: Result<Query<RawTeardownRequest>, QueryRejection>,
    body: &[u8],
) -> liveops_core::Result<liveops_teardown::TeardownRequest> {
    let Query(query) =
        query.map_err(|e| Error::Validation(format!("invalid query string: {e}")))?;
    RawTeardownRequest::from_json(body)?.or(query).validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_fields_override_query() {
        let query = Ok(Query(RawTeardownRequest {
            channel_name: Some("Q".into()),
            delete_asset: Some(false),
            region_selector: None,
        }));
        let request = parse_request(query, br#"{"channelName":"B"}"#).unwrap();
        assert_eq!(request.channel_name, "B");
        assert!(!request.delete_asset);
    }

    #[test]
    fn empty_body_and_query_is_validation_error() {
        let err = parse_request(Ok(Query(RawTeardownRequest::default())), b"").unwrap_err();
        assert_eq!(err.http_status(), 400);
    }
}
