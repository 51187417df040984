// Engine process management
//
// One marian-server subprocess per language pair:
// - Command: launch argument construction
// - Supervisor: lifecycle state machine and exit detection
//
// Spawning goes through `ProcessLauncher` so the lifecycle can be driven
// without real processes.

pub mod command;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub use command::*;
pub use supervisor::*;

use crate::error::{Result, RelayError};

/// Observed lifecycle state of one engine process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    /// No launch configuration; the pair never gets an engine
    Unconfigured,
    /// Launch requested
    Starting,
    /// Process spawned; the port may not be accepting connections yet
    Running {
        pid: Option<u32>,
        started_at: DateTime<Utc>,
    },
    /// Process terminated
    Exited {
        code: Option<i32>,
        exited_at: DateTime<Utc>,
    },
    /// Process could not be spawned at all
    LaunchFailed { reason: String },
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    /// States with no transition out short of an explicit restart
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Unconfigured | Self::Exited { .. } | Self::LaunchFailed { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Starting => "starting",
            Self::Running { .. } => "running",
            Self::Exited { .. } => "exited",
            Self::LaunchFailed { .. } => "launch_failed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "no engine configured"),
            Self::Starting => write!(f, "engine starting"),
            Self::Running { pid: Some(pid), .. } => write!(f, "engine running (pid {})", pid),
            Self::Running { pid: None, .. } => write!(f, "engine running"),
            Self::Exited { code: Some(code), .. } => write!(f, "engine exited with code {}", code),
            Self::Exited { code: None, .. } => write!(f, "engine terminated by signal"),
            Self::LaunchFailed { reason } => write!(f, "engine failed to launch: {}", reason),
        }
    }
}

/// Handle to a spawned engine process
#[async_trait]
pub trait EngineProcess: Send {
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit and return its exit code, if any
    async fn wait(&mut self) -> Result<Option<i32>>;

    async fn kill(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &EngineCommand) -> Result<Box<dyn EngineProcess>>;
}

/// Launches engines as tokio child processes
#[derive(Debug, Default, Clone)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn launch(&self, command: &EngineCommand) -> Result<Box<dyn EngineProcess>> {
        let child = command.to_process_command().spawn().map_err(|e| {
            RelayError::Launch(format!("Failed to execute {}: {}", command.binary_path, e))
        })?;
        Ok(Box::new(child))
    }
}

#[async_trait]
impl EngineProcess for tokio::process::Child {
    fn id(&self) -> Option<u32> {
        tokio::process::Child::id(self)
    }

    async fn wait(&mut self) -> Result<Option<i32>> {
        let status = tokio::process::Child::wait(self).await?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> Result<()> {
        tokio::process::Child::kill(self).await?;
        Ok(())
    }
}
