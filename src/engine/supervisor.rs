use chrono::Utc;
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};

use crate::config::ServiceEntry;
use crate::error::{Result, RelayError};
use crate::pair::LanguagePair;
use super::{EngineCommand, EngineCommandBuilder, EngineProcess, EngineState, ProcessLauncher};

/// Owns the single engine subprocess of one language pair.
///
/// State changes are published on a watch channel, so `state()` never
/// blocks a translation. There is no automatic restart: once the engine is
/// `Exited` or `LaunchFailed` it stays that way until `restart()` is called.
pub struct EngineSupervisor {
    pair: LanguagePair,
    command: Option<EngineCommand>,
    launcher: Arc<dyn ProcessLauncher>,
    state: Arc<watch::Sender<EngineState>>,
    // Held while launching so two restarts cannot spawn two engines
    kill_switch: Mutex<Option<oneshot::Sender<()>>>,
}

impl EngineSupervisor {
    /// Create the supervisor and launch the engine if the entry has a launch
    /// configuration. Must be called inside a tokio runtime.
    pub fn start(
        pair: LanguagePair,
        entry: &ServiceEntry,
        binary_path: &str,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        let command = entry
            .launch_configuration()
            .map(|configuration| EngineCommandBuilder::new(binary_path).marian_server(configuration, entry.port));

        let initial = if command.is_some() {
            EngineState::Starting
        } else {
            EngineState::Unconfigured
        };
        let (state, _) = watch::channel(initial);

        let supervisor = Self {
            pair,
            command,
            launcher,
            state: Arc::new(state),
            kill_switch: Mutex::new(None),
        };

        match &supervisor.command {
            Some(_) => {
                let mut kill_switch = supervisor.lock_kill_switch();
                supervisor.launch(&mut kill_switch);
            }
            None => info!("{}: no engine configuration, pair is not runnable", supervisor.pair),
        }

        supervisor
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    pub fn command(&self) -> Option<&EngineCommand> {
        self.command.as_ref()
    }

    pub fn state(&self) -> EngineState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Launch a fresh engine after the previous one exited or failed to start
    pub fn restart(&self) -> Result<EngineState> {
        let mut kill_switch = self.lock_kill_switch();

        match self.state() {
            EngineState::Unconfigured => {
                return Err(RelayError::EngineUnavailable {
                    pair: self.pair.id(),
                    state: EngineState::Unconfigured,
                });
            }
            state @ (EngineState::Starting | EngineState::Running { .. }) => {
                return Err(RelayError::Launch(format!(
                    "{}: cannot restart, {}",
                    self.pair, state
                )));
            }
            EngineState::Exited { .. } | EngineState::LaunchFailed { .. } => {}
        }

        info!("{}: restarting engine", self.pair);
        self.launch(&mut kill_switch);
        Ok(self.state())
    }

    /// Stop a running engine and wait until its exit has been observed
    pub async fn shutdown(&self) -> EngineState {
        let kill = self.lock_kill_switch().take();
        if let Some(kill) = kill {
            let _ = kill.send(());
        }
        self.wait_for_terminal().await
    }

    pub async fn wait_for_terminal(&self) -> EngineState {
        let mut rx = self.subscribe();
        let result = rx.wait_for(EngineState::is_terminal).await.map(|s| s.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    fn lock_kill_switch(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.kill_switch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn launch(&self, kill_switch: &mut Option<oneshot::Sender<()>>) {
        let Some(command) = &self.command else {
            return;
        };

        self.state.send_replace(EngineState::Starting);
        info!("{}: launching {} {:?}", self.pair, command.binary_path, command.args);

        match self.launcher.launch(command) {
            Ok(process) => {
                let pid = process.id();
                self.state.send_replace(EngineState::Running {
                    pid,
                    started_at: Utc::now(),
                });
                info!("{}: engine running (pid {:?}, port {})", self.pair, pid, port_of(command));

                let (kill_tx, kill_rx) = oneshot::channel();
                *kill_switch = Some(kill_tx);
                tokio::spawn(watch_process(
                    self.pair.clone(),
                    process,
                    Arc::clone(&self.state),
                    kill_rx,
                ));
            }
            Err(e) => {
                error!("{}: engine failed to launch: {}", self.pair, e);
                *kill_switch = None;
                self.state.send_replace(EngineState::LaunchFailed {
                    reason: e.to_string(),
                });
            }
        }
    }
}

impl std::fmt::Debug for EngineSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSupervisor")
            .field("pair", &self.pair)
            .field("command", &self.command)
            .field("state", &self.state())
            .finish()
    }
}

fn port_of(command: &EngineCommand) -> &str {
    command
        .args
        .iter()
        .position(|a| a == "-p")
        .and_then(|i| command.args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("?")
}

/// Wait for the engine to exit (or for a kill request) and record the exit
async fn watch_process(
    pair: LanguagePair,
    mut process: Box<dyn EngineProcess>,
    state: Arc<watch::Sender<EngineState>>,
    kill: oneshot::Receiver<()>,
) {
    let waited = tokio::select! {
        status = process.wait() => Some(status),
        _ = kill => None,
    };

    let status = match waited {
        Some(status) => status,
        None => {
            info!("{}: stopping engine", pair);
            if let Err(e) = process.kill().await {
                warn!("{}: failed to kill engine: {}", pair, e);
            }
            process.wait().await
        }
    };

    let code = status.unwrap_or_else(|e| {
        warn!("{}: failed to collect engine exit status: {}", pair, e);
        None
    });

    warn!("{}: engine process exited (code {:?}), pair is unavailable", pair, code);
    state.send_replace(EngineState::Exited {
        code,
        exited_at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockProcessLauncher;
    use crate::engine::fake::FakeLauncher;

    fn entry(configuration: Option<&str>) -> ServiceEntry {
        ServiceEntry {
            host: "localhost".into(),
            port: 8001,
            configuration: configuration.map(str::to_string),
            sourcebpe: None,
            targetbpe: None,
            sourcespm: None,
            targetspm: None,
        }
    }

    fn pair() -> LanguagePair {
        LanguagePair::new("en", "de")
    }

    #[tokio::test]
    async fn test_unconfigured_never_launches() {
        let launcher = Arc::new(FakeLauncher::default());
        let supervisor = EngineSupervisor::start(pair(), &entry(Some("  ")), "marian-server", launcher.clone());

        assert_eq!(supervisor.state(), EngineState::Unconfigured);
        assert_eq!(launcher.launch_count(), 0);
        assert!(supervisor.command().is_none());
        assert!(matches!(
            supervisor.restart(),
            Err(RelayError::EngineUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_launch_uses_fixed_flags() {
        let launcher = Arc::new(FakeLauncher::default());
        let supervisor = EngineSupervisor::start(pair(), &entry(Some("cfg.yml")), "/opt/marian-server", launcher.clone());

        assert!(supervisor.state().is_running());
        let commands = launcher.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].binary_path, "/opt/marian-server");
        assert_eq!(
            commands[0].args,
            vec![
                "-c", "cfg.yml", "-p", "8001", "--allow-unk", "--tsv", "-b", "6",
                "--mini-batch", "64", "--normalize", "0.6", "--maxi-batch-sort", "src",
                "--maxi-batch", "100",
            ]
        );
    }

    #[tokio::test]
    async fn test_exit_is_observed_and_terminal() {
        let launcher = Arc::new(FakeLauncher::default());
        let supervisor = EngineSupervisor::start(pair(), &entry(Some("cfg.yml")), "marian-server", launcher.clone());

        launcher.exit(0, Some(139));
        let state = supervisor.wait_for_terminal().await;

        assert!(matches!(state, EngineState::Exited { code: Some(139), .. }));
        assert_eq!(supervisor.state(), state);
        assert_eq!(launcher.launch_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_only_after_exit() {
        let launcher = Arc::new(FakeLauncher::default());
        let supervisor = EngineSupervisor::start(pair(), &entry(Some("cfg.yml")), "marian-server", launcher.clone());

        assert!(matches!(supervisor.restart(), Err(RelayError::Launch(_))));
        assert_eq!(launcher.launch_count(), 1);

        launcher.exit(0, Some(1));
        supervisor.wait_for_terminal().await;

        let state = supervisor.restart().unwrap();
        assert!(state.is_running());
        assert_eq!(launcher.launch_count(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_kills_running_engine() {
        let launcher = Arc::new(FakeLauncher::default());
        let supervisor = EngineSupervisor::start(pair(), &entry(Some("cfg.yml")), "marian-server", launcher.clone());

        let state = supervisor.shutdown().await;
        assert!(matches!(state, EngineState::Exited { code: None, .. }));
    }

    #[tokio::test]
    async fn test_launch_failure_is_contained() {
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .times(1)
            .returning(|_| Err(RelayError::Launch("No such file or directory".into())));

        let supervisor = EngineSupervisor::start(pair(), &entry(Some("cfg.yml")), "missing-binary", Arc::new(launcher));

        match supervisor.state() {
            EngineState::LaunchFailed { reason } => assert!(reason.contains("No such file")),
            other => panic!("unexpected state: {:?}", other),
        }
    }
}
