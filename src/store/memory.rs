//! In-process workflow store.
//!
//! Backs the reference server and the test suite. Carries a few
//! injection knobs (forced failures, fetch delay, fetch counter) so
//! sync behavior can be exercised deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, WorkflowStore, WorkflowSummary};
use crate::parser::{DefaultTemplateParser, ItineraryParser};
use crate::workflow::Workflow;

/// In-memory workflow store.
pub struct InMemoryStore {
    workflows: RwLock<HashMap<String, Workflow>>,
    parser: Arc<dyn ItineraryParser>,
    fail_fetch: AtomicBool,
    fail_replace: AtomicBool,
    fetch_delay: RwLock<Option<Duration>>,
    fetch_count: AtomicUsize,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Empty store with the default template parser for smart-create.
    pub fn new() -> Self {
        Self::with_parser(Arc::new(DefaultTemplateParser))
    }

    /// Store delegating `create` to a custom parser.
    pub fn with_parser(parser: Arc<dyn ItineraryParser>) -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
            parser,
            fail_fetch: AtomicBool::new(false),
            fail_replace: AtomicBool::new(false),
            fetch_delay: RwLock::new(None),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Insert or overwrite a document directly, bypassing `create`.
    pub async fn insert(&self, workflow: Workflow) {
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow);
    }

    /// Force subsequent fetches to fail with `Unavailable`.
    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Force subsequent replaces to fail with `Unavailable`.
    pub fn set_fail_replace(&self, fail: bool) {
        self.fail_replace.store(fail, Ordering::SeqCst);
    }

    /// Delay every fetch, simulating a slow poll response.
    pub async fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.write().await = delay;
    }

    /// Number of fetches attempted so far.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn list(&self) -> Result<Vec<WorkflowSummary>, StoreError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.values().map(WorkflowSummary::from).collect())
    }

    async fn fetch(&self, id: &str) -> Result<Workflow, StoreError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = *self.fetch_delay.read().await {
            tokio::time::sleep(delay).await;
        }
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("fetch failure injected".into()));
        }

        self.workflows
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn create(&self, request_text: &str) -> Result<String, StoreError> {
        let workflow = self
            .parser
            .parse(request_text)
            .await
            .map_err(|e| StoreError::ParseFailure(e.to_string()))?;
        let id = workflow.id.clone();
        self.insert(workflow).await;
        Ok(id)
    }

    async fn replace(&self, workflow: &Workflow) -> Result<(), StoreError> {
        if self.fail_replace.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("replace failure injected".into()));
        }
        self.insert(workflow.clone()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Step;

    #[tokio::test]
    async fn test_create_fetch_replace_roundtrip() {
        let store = InMemoryStore::new();

        let id = store.create("Weekend in Rome").await.unwrap();
        let mut workflow = store.fetch(&id).await.unwrap();
        assert_eq!(workflow.steps.len(), 3);

        workflow.steps.push(Step::new("Visa Application", ""));
        store.replace(&workflow).await.unwrap();

        let fetched = store.fetch(&id).await.unwrap();
        assert_eq!(fetched.steps.len(), 4);

        let summaries = store.list().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].total_steps, 4);
    }

    #[tokio::test]
    async fn test_fetch_unknown_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.fetch("missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_empty_request_is_parse_failure() {
        let store = InMemoryStore::new();
        let err = store.create("").await.unwrap_err();
        assert!(matches!(err, StoreError::ParseFailure(_)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryStore::new();
        let id = store.create("Trip").await.unwrap();

        store.set_fail_fetch(true);
        assert!(matches!(
            store.fetch(&id).await.unwrap_err(),
            StoreError::Unavailable(_)
        ));

        store.set_fail_fetch(false);
        let workflow = store.fetch(&id).await.unwrap();

        store.set_fail_replace(true);
        assert!(matches!(
            store.replace(&workflow).await.unwrap_err(),
            StoreError::Unavailable(_)
        ));
    }
}
