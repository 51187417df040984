use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::config::{EngineConfig, ServiceConfig};
use crate::engine::{EngineState, ProcessLauncher};
use crate::pair::LanguagePair;
use crate::session::SessionTransport;
use crate::worker::TranslationWorker;

/// Engine health of one pair, as reported by the API
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub pair: String,
    pub endpoint: String,
    #[serde(flatten)]
    pub state: EngineState,
}

/// Immutable map from pair id (`en-de`) to its worker.
///
/// Built once at startup and shared by reference with the request layer;
/// there is no hot reload.
pub struct WorkerRegistry {
    workers: BTreeMap<String, Arc<TranslationWorker>>,
    languages: BTreeMap<String, Vec<String>>,
}

impl WorkerRegistry {
    /// Create one worker per configured pair and launch its engine.
    ///
    /// Engine launch failures stay inside the affected worker.
    pub fn build(
        services: &ServiceConfig,
        engine: &EngineConfig,
        launcher: Arc<dyn ProcessLauncher>,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        let mut workers = BTreeMap::new();

        for (source, targets) in &services.pairs {
            for (target, entry) in targets {
                let pair = LanguagePair::new(source.as_str(), target.as_str());
                let worker = TranslationWorker::start(
                    pair.clone(),
                    Arc::clone(entry),
                    &engine.binary_path,
                    Arc::clone(&launcher),
                    Arc::clone(&transport),
                );
                info!("{}: worker ready ({})", pair, worker.engine_state());
                workers.insert(pair.id(), Arc::new(worker));
            }
        }

        info!("Worker registry built with {} language pairs", workers.len());
        Self {
            workers,
            languages: services.languages(),
        }
    }

    pub fn lookup(&self, pair: &str) -> Option<Arc<TranslationWorker>> {
        self.workers.get(pair).cloned()
    }

    pub fn lookup_pair(&self, source: &str, target: &str) -> Option<Arc<TranslationWorker>> {
        self.lookup(&LanguagePair::new(source, target).id())
    }

    /// source language -> target languages, independent of engine health
    pub fn list_pairs(&self) -> &BTreeMap<String, Vec<String>> {
        &self.languages
    }

    pub fn workers(&self) -> impl Iterator<Item = &Arc<TranslationWorker>> {
        self.workers.values()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn engine_statuses(&self) -> Vec<EngineStatus> {
        self.workers
            .values()
            .map(|worker| EngineStatus {
                pair: worker.pair().id(),
                endpoint: worker.endpoint(),
                state: worker.engine_state(),
            })
            .collect()
    }

    /// Stop every running engine
    pub async fn shutdown(&self) {
        for worker in self.workers.values() {
            if worker.engine_state().is_running() {
                let state = worker.supervisor().shutdown().await;
                info!("{}: {}", worker.pair(), state);
            }
        }
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("pairs", &self.workers.keys().collect::<Vec<_>>())
            .finish()
    }
}
