//! Shared application state

use std::sync::Arc;

use crate::registry::WorkerRegistry;

/// State handed to every request handler; cloning is cheap
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Arc<WorkerRegistry>,
}

impl AppState {
    pub fn new(registry: WorkerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}
