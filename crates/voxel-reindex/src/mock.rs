//! Mock reindex engine client for deterministic testing.
//!
//! Records every call so tests can assert how many network round-trips a
//! code path would have made, which matters for the local-validation
//! contracts ("fails with zero engine calls").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use voxel_core::{Error, OperationStatus, ReindexClient, Result};

#[derive(Debug, Default)]
struct MockState {
    start_result: Option<std::result::Result<String, MockFailure>>,
    statuses: HashMap<String, OperationStatus>,
    start_calls: usize,
    status_calls: usize,
}

#[derive(Debug, Clone)]
enum MockFailure {
    Conflict,
    Transport(u16),
}

/// In-memory stand-in for the orchestration engine.
#[derive(Clone, Default)]
pub struct MockReindexClient {
    state: Arc<Mutex<MockState>>,
}

impl MockReindexClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `start_reindex` succeed with the given operation id.
    pub fn with_start_result(self, operation_id: impl Into<String>) -> Self {
        self.state.lock().unwrap().start_result = Some(Ok(operation_id.into()));
        self
    }

    /// Make `start_reindex` report an overlapping in-flight operation.
    pub fn with_start_conflict(self) -> Self {
        self.state.lock().unwrap().start_result = Some(Err(MockFailure::Conflict));
        self
    }

    /// Make `start_reindex` fail with the given engine status code.
    pub fn with_start_transport_failure(self, status: u16) -> Self {
        self.state.lock().unwrap().start_result = Some(Err(MockFailure::Transport(status)));
        self
    }

    /// Register a known operation for `get_status`.
    pub fn with_status(self, status: OperationStatus) -> Self {
        self.state
            .lock()
            .unwrap()
            .statuses
            .insert(status.operation_id.clone(), status);
        self
    }

    /// How many times `start_reindex` was invoked.
    pub fn start_calls(&self) -> usize {
        self.state.lock().unwrap().start_calls
    }

    /// How many times `get_status` was invoked.
    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }
}

#[async_trait]
impl ReindexClient for MockReindexClient {
    async fn start_reindex(&self, tag_keys: &[i64]) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.start_calls += 1;
        match state.start_result.clone() {
            Some(Ok(id)) => Ok(id),
            Some(Err(MockFailure::Conflict)) => Err(Error::AlreadyExists(format!(
                "a reindex operation is already in flight for tag keys {tag_keys:?}"
            ))),
            Some(Err(MockFailure::Transport(status))) => Err(Error::Transport {
                status,
                message: "mock engine failure".to_string(),
            }),
            None => Ok("mock-operation".to_string()),
        }
    }

    async fn get_status(&self, operation_id: &str) -> Result<Option<OperationStatus>> {
        let mut state = self.state.lock().unwrap();
        state.status_calls += 1;
        Ok(state.statuses.get(operation_id).cloned())
    }
}
