//! Shared state for the REST server.

use std::sync::Arc;

use crate::advisory::AdvisoryAnnotator;
use crate::store::WorkflowStore;

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    /// Backing workflow store
    pub store: Arc<dyn WorkflowStore>,
    /// Travel advisory source applied on reads
    pub annotator: Arc<dyn AdvisoryAnnotator>,
}

impl ApiState {
    pub fn new(store: Arc<dyn WorkflowStore>, annotator: Arc<dyn AdvisoryAnnotator>) -> Self {
        Self { store, annotator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::NoAdvisories;
    use crate::store::InMemoryStore;

    #[test]
    fn test_state_is_cheaply_cloneable() {
        let state = ApiState::new(Arc::new(InMemoryStore::new()), Arc::new(NoAdvisories));
        let clone = state.clone();
        assert!(Arc::ptr_eq(&state.store, &clone.store));
    }
}
