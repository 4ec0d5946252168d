//! Data Transfer Objects for the REST API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::workflow::category::classify;
use crate::workflow::model::JsonMap;
use crate::workflow::{Step, StepMetadata, StepStatus, Workflow};

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Wire document for a single step.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepPayload {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: StepStatus,
    /// Flat key/value form data; schema depends on the step category.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

impl From<&Step> for StepPayload {
    fn from(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            name: step.name.clone(),
            description: step.description.clone(),
            status: step.status,
            metadata: step.metadata.to_map(),
            warning: step.warning.clone(),
            alternative: step.alternative.clone(),
        }
    }
}

impl StepPayload {
    fn into_step(self) -> Step {
        let metadata = StepMetadata::from_map(classify(&self.name), self.metadata);
        Step {
            id: self.id,
            name: self.name,
            description: self.description,
            status: self.status,
            metadata,
            warning: self.warning,
            alternative: self.alternative,
        }
    }
}

/// Wire document for a whole workflow.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPayload {
    #[serde(default)]
    pub id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub steps: Vec<StepPayload>,
    #[serde(default)]
    pub finished: bool,
}

impl From<&Workflow> for WorkflowPayload {
    fn from(workflow: &Workflow) -> Self {
        Self {
            id: workflow.id.clone(),
            customer_name: workflow.customer_name.clone(),
            customer_email: workflow.customer_email.clone(),
            source: workflow.source.clone(),
            destination: workflow.destination.clone(),
            travel_date: workflow.travel_date,
            steps: workflow.steps.iter().map(StepPayload::from).collect(),
            finished: workflow.finished,
        }
    }
}

impl WorkflowPayload {
    /// Convert into the domain document, typing each step's metadata by
    /// its category.
    pub fn into_workflow(self) -> Workflow {
        Workflow {
            id: self.id,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            source: self.source,
            destination: self.destination,
            travel_date: self.travel_date,
            steps: self.steps.into_iter().map(StepPayload::into_step).collect(),
            finished: self.finished,
        }
    }
}
