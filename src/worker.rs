use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ServiceEntry;
use crate::context::build_batch;
use crate::engine::{EngineState, EngineSupervisor, ProcessLauncher};
use crate::error::{Result, RelayError};
use crate::pair::LanguagePair;
use crate::session::SessionTransport;
use crate::text::{TextProcessor, TextProcessorFactory};

/// Translation worker for one language pair: engine supervision plus the
/// preprocess / frame / exchange / postprocess pipeline
pub struct TranslationWorker {
    pair: LanguagePair,
    entry: Arc<ServiceEntry>,
    supervisor: EngineSupervisor,
    processor: Box<dyn TextProcessor>,
    transport: Arc<dyn SessionTransport>,
}

impl TranslationWorker {
    pub fn new(
        pair: LanguagePair,
        entry: Arc<ServiceEntry>,
        supervisor: EngineSupervisor,
        processor: Box<dyn TextProcessor>,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        Self {
            pair,
            entry,
            supervisor,
            processor,
            transport,
        }
    }

    /// Build the worker and launch its engine
    pub fn start(
        pair: LanguagePair,
        entry: Arc<ServiceEntry>,
        binary_path: &str,
        launcher: Arc<dyn ProcessLauncher>,
        transport: Arc<dyn SessionTransport>,
    ) -> Self {
        let processor = TextProcessorFactory::create_processor(&pair, &entry);
        let supervisor = EngineSupervisor::start(pair.clone(), &entry, binary_path, launcher);
        Self::new(pair, entry, supervisor, processor, transport)
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    pub fn entry(&self) -> &Arc<ServiceEntry> {
        &self.entry
    }

    pub fn supervisor(&self) -> &EngineSupervisor {
        &self.supervisor
    }

    pub fn engine_state(&self) -> EngineState {
        self.supervisor.state()
    }

    pub fn endpoint(&self) -> String {
        self.entry.endpoint()
    }

    /// Translate `source_text` through this pair's engine.
    ///
    /// Fails with `EngineUnavailable` before any connection if the engine is
    /// not running. Transport failures and misaligned replies are returned as
    /// errors, never as partial text.
    pub async fn translate(&self, source_text: &str) -> Result<String> {
        let state = self.supervisor.state();
        if !state.is_running() {
            return Err(RelayError::EngineUnavailable {
                pair: self.pair.id(),
                state,
            });
        }

        let sentences = self.processor.preprocess(source_text);
        if sentences.is_empty() {
            debug!("{}: nothing to translate", self.pair);
            return Ok(String::new());
        }

        let batch = build_batch(&sentences);
        debug!("{}: batch {:?}", self.pair, batch);

        let endpoint = self.endpoint();
        let translated = self
            .transport
            .exchange(&endpoint, &batch)
            .await
            .inspect_err(|e| warn!("{}: session with {} failed: {}", self.pair, endpoint, e))?;

        let translation = self.processor.postprocess(translated);
        info!("{}: translated {} sentences", self.pair, translation.len());
        Ok(translation.join("\n"))
    }
}

impl std::fmt::Debug for TranslationWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationWorker")
            .field("pair", &self.pair)
            .field("endpoint", &self.endpoint())
            .field("supervisor", &self.supervisor)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::engine::fake::FakeLauncher;
    use crate::text::MockTextProcessor;

    /// Engine stand-in that returns the sentence part of every framed line
    #[derive(Default)]
    pub(crate) struct EchoTransport {
        pub(crate) requests: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl EchoTransport {
        pub(crate) fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SessionTransport for EchoTransport {
        async fn exchange(&self, endpoint: &str, lines: &[String]) -> Result<Vec<String>> {
            self.requests
                .lock()
                .unwrap()
                .push((endpoint.to_string(), lines.to_vec()));
            Ok(lines
                .iter()
                .map(|l| l.split('\t').next().unwrap_or_default().to_string())
                .collect())
        }
    }

    struct RefusingTransport;

    #[async_trait]
    impl SessionTransport for RefusingTransport {
        async fn exchange(&self, endpoint: &str, _lines: &[String]) -> Result<Vec<String>> {
            Err(RelayError::Transport(format!("Failed to connect to {}: refused", endpoint)))
        }
    }

    fn entry(configuration: Option<&str>) -> Arc<ServiceEntry> {
        Arc::new(ServiceEntry {
            host: "localhost".into(),
            port: 10001,
            configuration: configuration.map(str::to_string),
            sourcebpe: None,
            targetbpe: None,
            sourcespm: None,
            targetspm: None,
        })
    }

    fn pair() -> LanguagePair {
        LanguagePair::new("en", "de")
    }

    #[tokio::test]
    async fn test_translate_round_trip_keeps_sentence_order() {
        let transport = Arc::new(EchoTransport::default());
        let worker = TranslationWorker::start(
            pair(),
            entry(Some("en-de.yml")),
            "marian-server",
            Arc::new(FakeLauncher::default()),
            transport.clone(),
        );

        let text = "Hello there. How are you? I am fine! See you.";
        let translation = worker.translate(text).await.unwrap();
        assert_eq!(translation, "Hello there.\nHow are you?\nI am fine!\nSee you.");

        let requests = transport.requests.lock().unwrap();
        let (endpoint, lines) = &requests[0];
        assert_eq!(endpoint, "ws://localhost:10001/translate");
        assert_eq!(
            lines,
            &vec![
                "Hello there.\t  ".to_string(),
                "How are you?\tHello there.  ".to_string(),
                "I am fine!\tHow are you? Hello there. ".to_string(),
                "See you.\tI am fine! How are you? Hello there.".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_tabs_in_source_keep_two_column_framing() {
        let transport = Arc::new(EchoTransport::default());
        let worker = TranslationWorker::start(
            pair(),
            entry(Some("en-de.yml")),
            "marian-server",
            Arc::new(FakeLauncher::default()),
            transport.clone(),
        );

        let translation = worker.translate("Name:\tJohn. Age:\t42.").await.unwrap();
        assert_eq!(translation, "Name: John.\nAge: 42.");

        let requests = transport.requests.lock().unwrap();
        let (_, lines) = &requests[0];
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|line| line.matches('\t').count() == 1));
    }

    #[tokio::test]
    async fn test_unconfigured_engine_is_unavailable() {
        let transport = Arc::new(EchoTransport::default());
        let worker = TranslationWorker::start(
            pair(),
            entry(None),
            "marian-server",
            Arc::new(FakeLauncher::default()),
            transport.clone(),
        );

        let err = worker.translate("Hello.").await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::EngineUnavailable { state: EngineState::Unconfigured, .. }
        ));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exited_engine_fails_without_connecting() {
        let launcher = Arc::new(FakeLauncher::default());
        let transport = Arc::new(EchoTransport::default());
        let entry = entry(Some("en-de.yml"));
        let supervisor = EngineSupervisor::start(pair(), &entry, "marian-server", launcher.clone());

        let mut processor = MockTextProcessor::new();
        processor.expect_preprocess().never();
        processor.expect_postprocess().never();

        let worker = TranslationWorker::new(pair(), entry, supervisor, Box::new(processor), transport.clone());

        launcher.exit(0, Some(1));
        worker.supervisor().wait_for_terminal().await;

        let err = worker.translate("Hello.").await.unwrap_err();
        match err {
            RelayError::EngineUnavailable { pair, state } => {
                assert_eq!(pair, "en-de");
                assert!(matches!(state, EngineState::Exited { code: Some(1), .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let worker = TranslationWorker::start(
            pair(),
            entry(Some("en-de.yml")),
            "marian-server",
            Arc::new(FakeLauncher::default()),
            Arc::new(RefusingTransport),
        );

        let err = worker.translate("Hello.").await.unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_empty_text_skips_session() {
        let transport = Arc::new(EchoTransport::default());
        let worker = TranslationWorker::start(
            pair(),
            entry(Some("en-de.yml")),
            "marian-server",
            Arc::new(FakeLauncher::default()),
            transport.clone(),
        );

        assert_eq!(worker.translate("  \n ").await.unwrap(), "");
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_postprocess_output_is_newline_joined() {
        let mut processor = MockTextProcessor::new();
        processor
            .expect_preprocess()
            .returning(|_| vec!["a".to_string(), "b".to_string()]);
        processor
            .expect_postprocess()
            .returning(|lines| lines.into_iter().map(|l| format!("<{}>", l)).collect());

        let launcher = Arc::new(FakeLauncher::default());
        let entry = entry(Some("en-de.yml"));
        let supervisor = EngineSupervisor::start(pair(), &entry, "marian-server", launcher);
        let worker = TranslationWorker::new(
            pair(),
            entry,
            supervisor,
            Box::new(processor),
            Arc::new(EchoTransport::default()),
        );

        assert_eq!(worker.translate("ignored").await.unwrap(), "<a>\n<b>");
    }
}
