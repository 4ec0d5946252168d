//! Travel advisory annotation.
//!
//! Best-effort, read-only enrichment: an annotator may attach a warning
//! and a suggested alternative to a step before it is shown. Absence of
//! data, or an annotator that cannot answer, leaves the step untouched
//! and never blocks a save or reorder.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workflow::{Step, Workflow};

/// Advisory annotation for a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

/// Source of travel advisory annotations.
///
/// Infallible by construction: an implementation that cannot answer
/// (no data, upstream failure) returns `None`.
#[async_trait]
pub trait AdvisoryAnnotator: Send + Sync {
    async fn annotate(&self, step: &Step) -> Option<Annotation>;
}

/// Annotator with no advisory data; never annotates anything.
#[derive(Debug, Default)]
pub struct NoAdvisories;

#[async_trait]
impl AdvisoryAnnotator for NoAdvisories {
    async fn annotate(&self, _step: &Step) -> Option<Annotation> {
        None
    }
}

/// Keyword-table annotator: a step whose name or description contains a
/// configured keyword (case-insensitive) gets that keyword's
/// annotation. Useful as a reference implementation and test double.
#[derive(Debug, Default)]
pub struct StaticAdvisories {
    by_keyword: HashMap<String, Annotation>,
}

impl StaticAdvisories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an annotation for steps mentioning `keyword`.
    pub fn with_rule(
        mut self,
        keyword: impl Into<String>,
        warning: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        self.by_keyword.insert(
            keyword.into().to_lowercase(),
            Annotation {
                warning: Some(warning.into()),
                alternative: Some(alternative.into()),
            },
        );
        self
    }
}

#[async_trait]
impl AdvisoryAnnotator for StaticAdvisories {
    async fn annotate(&self, step: &Step) -> Option<Annotation> {
        let haystack = format!("{} {}", step.name, step.description).to_lowercase();
        self.by_keyword
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(_, annotation)| annotation.clone())
    }
}

/// Apply advisory annotations to every step of a workflow.
///
/// Only sets fields, never clears them: a step keeps its last known
/// warning when the annotator stops reporting one. Returns whether
/// anything changed, so callers can skip a redundant store write.
pub async fn annotate_workflow(
    annotator: &dyn AdvisoryAnnotator,
    workflow: &mut Workflow,
) -> bool {
    let mut changed = false;
    for step in &mut workflow.steps {
        let Some(annotation) = annotator.annotate(step).await else {
            continue;
        };
        if annotation.warning.is_some() && annotation.warning != step.warning {
            step.warning = annotation.warning;
            changed = true;
        }
        if annotation.alternative.is_some() && annotation.alternative != step.alternative {
            step.alternative = annotation.alternative;
            changed = true;
        }
    }
    if changed {
        debug!(workflow_id = %workflow.id, "advisory annotations updated");
    }
    changed
}
