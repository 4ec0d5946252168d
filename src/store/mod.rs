//! Workflow store abstraction.
//!
//! The engine never talks to a concrete backend directly; everything
//! goes through [`WorkflowStore`]. `http` provides the client for the
//! remote REST store, `memory` an in-process store used by the
//! reference server and tests.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use http::HttpWorkflowStore;
pub use memory::InMemoryStore;

use crate::workflow::Workflow;

/// Store failures.
/// `NotFound` means "no active workflow" and is not fatal;
/// `Unavailable` is transient and retried on the next sync cycle;
/// `ParseFailure` is surfaced only to the creation flow.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workflow '{0}' not found")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("could not parse booking request: {0}")]
    ParseFailure(String),
}

impl StoreError {
    /// True for transient transport failures that should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Listing entry for a workflow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: String,
    pub customer_name: String,
    pub finished: bool,
    pub total_steps: usize,
    pub completed_steps: usize,
}

impl From<&Workflow> for WorkflowSummary {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id.clone(),
            customer_name: workflow.customer_name.clone(),
            finished: workflow.finished,
            total_steps: workflow.steps.len(),
            completed_steps: workflow.completed_count(),
        }
    }
}

/// Remote authoritative store for workflow documents.
///
/// The workflow is the unit of persistence: reads and writes are always
/// whole documents, last writer wins. `create` delegates free-text
/// parsing to whatever smart-create backend the store wires in.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// List summaries of all stored workflows.
    async fn list(&self) -> Result<Vec<WorkflowSummary>, StoreError>;

    /// Fetch the canonical document for one workflow.
    async fn fetch(&self, id: &str) -> Result<Workflow, StoreError>;

    /// Create a workflow from a free-text booking request, returning
    /// the new workflow's id.
    async fn create(&self, request_text: &str) -> Result<String, StoreError>;

    /// Replace the stored document wholesale, keyed by `workflow.id`.
    async fn replace(&self, workflow: &Workflow) -> Result<(), StoreError>;
}
