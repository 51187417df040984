// In-memory launcher for driving the engine lifecycle in tests

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::oneshot;

use super::{EngineCommand, EngineProcess, ProcessLauncher};
use crate::error::Result;

pub(crate) struct FakeProcess {
    pid: u32,
    exit: oneshot::Receiver<Option<i32>>,
    killed: bool,
}

#[async_trait]
impl EngineProcess for FakeProcess {
    fn id(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn wait(&mut self) -> Result<Option<i32>> {
        if self.killed {
            return Ok(None);
        }
        match (&mut self.exit).await {
            Ok(code) => Ok(code),
            Err(_) => std::future::pending().await,
        }
    }

    async fn kill(&mut self) -> Result<()> {
        self.killed = true;
        Ok(())
    }
}

/// Records every launch and hands out processes whose exit the test controls
#[derive(Default)]
pub(crate) struct FakeLauncher {
    commands: Mutex<Vec<EngineCommand>>,
    exits: Mutex<Vec<Option<oneshot::Sender<Option<i32>>>>>,
    next_pid: AtomicU32,
}

impl FakeLauncher {
    pub(crate) fn commands(&self) -> Vec<EngineCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn launch_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    /// Make the `index`-th launched process exit with `code`
    pub(crate) fn exit(&self, index: usize, code: Option<i32>) {
        if let Some(tx) = self.exits.lock().unwrap()[index].take() {
            let _ = tx.send(code);
        }
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&self, command: &EngineCommand) -> Result<Box<dyn EngineProcess>> {
        let (tx, rx) = oneshot::channel();
        self.commands.lock().unwrap().push(command.clone());
        self.exits.lock().unwrap().push(Some(tx));
        let pid = 1000 + self.next_pid.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeProcess {
            pid,
            exit: rx,
            killed: false,
        }))
    }
}
