//! OpenAPI specification builder using utoipa.

use utoipa::OpenApi;

use crate::rest::dto::{HealthResponse, StepPayload, WorkflowPayload};
use crate::rest::error::ErrorResponse;
use crate::store::WorkflowSummary;
use crate::workflow::StepStatus;

/// OpenAPI documentation for the Concierge REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Concierge API",
        version = "0.1.0",
        description = "REST API for travel booking workflows: creation, step progression, and advisory annotations.",
        license(name = "MIT")
    ),
    paths(
        crate::rest::routes::health::health,
        crate::rest::routes::workflows::list,
        crate::rest::routes::workflows::get_one,
        crate::rest::routes::workflows::parse,
        crate::rest::routes::workflows::create,
        crate::rest::routes::workflows::update,
    ),
    components(
        schemas(
            HealthResponse,
            WorkflowPayload,
            StepPayload,
            WorkflowSummary,
            StepStatus,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Workflows", description = "Booking workflow operations"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}
