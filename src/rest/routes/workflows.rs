//! Workflow endpoints: the store's REST surface.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::advisory::annotate_workflow;
use crate::rest::dto::WorkflowPayload;
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::state::ApiState;
use crate::store::WorkflowSummary;
use crate::workflow::{Step, Workflow};

/// List all workflows
#[utoipa::path(
    get,
    path = "/api/workflows",
    tag = "Workflows",
    responses(
        (status = 200, description = "Workflow summaries", body = Vec<WorkflowSummary>)
    )
)]
pub async fn list(State(state): State<ApiState>) -> Result<Json<Vec<WorkflowSummary>>, ApiError> {
    let summaries = state.store.list().await?;
    Ok(Json(summaries))
}

/// Get a single workflow.
///
/// Unfinished workflows are run through the advisory annotator on
/// every read; newly found annotations are persisted so subsequent
/// polls see them without re-running the (potentially expensive)
/// annotation source.
#[utoipa::path(
    get,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    params(
        ("id" = String, Path, description = "Workflow id")
    ),
    responses(
        (status = 200, description = "Workflow document", body = WorkflowPayload),
        (status = 404, description = "Workflow not found", body = ErrorResponse)
    )
)]
pub async fn get_one(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowPayload>, ApiError> {
    let mut workflow = state.store.fetch(&id).await?;

    if !workflow.finished && annotate_workflow(state.annotator.as_ref(), &mut workflow).await {
        state.store.replace(&workflow).await?;
    }

    Ok(Json(WorkflowPayload::from(&workflow)))
}

/// Create a workflow from a free-text booking request
#[utoipa::path(
    post,
    path = "/api/workflows/parse",
    tag = "Workflows",
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 200, description = "Created workflow", body = WorkflowPayload),
        (status = 422, description = "Request could not be parsed", body = ErrorResponse)
    )
)]
pub async fn parse(
    State(state): State<ApiState>,
    request_text: String,
) -> Result<Json<WorkflowPayload>, ApiError> {
    let id = state.store.create(&request_text).await?;
    let mut workflow = state.store.fetch(&id).await?;

    // Annotate immediately so warnings are persisted from the start
    if annotate_workflow(state.annotator.as_ref(), &mut workflow).await {
        state.store.replace(&workflow).await?;
    }

    Ok(Json(WorkflowPayload::from(&workflow)))
}

/// Create a workflow from an explicit document
#[utoipa::path(
    post,
    path = "/api/workflows",
    tag = "Workflows",
    request_body = WorkflowPayload,
    responses(
        (status = 200, description = "Created workflow", body = WorkflowPayload)
    )
)]
pub async fn create(
    State(state): State<ApiState>,
    Json(payload): Json<WorkflowPayload>,
) -> Result<Json<WorkflowPayload>, ApiError> {
    let mut workflow = payload.into_workflow();
    if workflow.id.is_empty() {
        workflow.id = Uuid::new_v4().to_string();
    }
    // Initial setup if steps are empty
    if workflow.steps.is_empty() {
        workflow.steps = vec![
            Step::new("Flight Selection", "Select flight"),
            Step::new("Hotel Booking", "Select hotel"),
            Step::new("Payment", "Complete payment"),
        ];
    }

    annotate_workflow(state.annotator.as_ref(), &mut workflow).await;
    state.store.replace(&workflow).await?;

    Ok(Json(WorkflowPayload::from(&workflow)))
}

/// Replace a workflow document wholesale
#[utoipa::path(
    put,
    path = "/api/workflows/{id}",
    tag = "Workflows",
    params(
        ("id" = String, Path, description = "Workflow id")
    ),
    request_body = WorkflowPayload,
    responses(
        (status = 200, description = "Updated workflow", body = WorkflowPayload),
        (status = 400, description = "Body id does not match the path", body = ErrorResponse)
    )
)]
pub async fn update(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(payload): Json<WorkflowPayload>,
) -> Result<Json<WorkflowPayload>, ApiError> {
    let mut workflow: Workflow = payload.into_workflow();
    if workflow.id.is_empty() {
        workflow.id = id;
    } else if workflow.id != id {
        return Err(ApiError::BadRequest(format!(
            "Body id '{}' does not match path id '{id}'",
            workflow.id
        )));
    }

    state.store.replace(&workflow).await?;
    Ok(Json(WorkflowPayload::from(&workflow)))
}
