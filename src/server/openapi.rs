//! OpenAPI documentation and Swagger UI integration.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "liveops API",
        version = "0.1.0",
        description = "Teardown of live streaming channels and their dependent media resources",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "/", description = "Default server")
    ),
    paths(
        super::routes::health,
        super::routes::delete_live_event_output,
    ),
    components(
        schemas(
            super::routes::HealthResponse,
            liveops_teardown::RawTeardownRequest,
            liveops_teardown::TeardownSuccess,
            liveops_teardown::TeardownFailure,
            liveops_teardown::DependentOutcome,
            liveops_teardown::DependentKind,
            liveops_teardown::DependentStatus,
            liveops_teardown::TeardownStage,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "teardown", description = "Live event teardown"),
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/docs`, OpenAPI document at `/openapi.json`.
pub fn openapi_routes() -> Router<AppContext> {
    Router::new().merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}
