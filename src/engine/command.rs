use std::process::Stdio;

/// Decoding and batching flags passed to every marian-server instance
pub const BEAM_SIZE: u32 = 6;
pub const MINI_BATCH: u32 = 64;
pub const NORMALIZE: &str = "0.6";
pub const MAXI_BATCH_SORT: &str = "src";
pub const MAXI_BATCH: u32 = 100;

/// Engine launch command representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub binary_path: String,
    pub args: Vec<String>,
}

impl EngineCommand {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Engine configuration file
    pub fn config_file<S: Into<String>>(self, path: S) -> Self {
        self.arg("-c").arg(path)
    }

    /// WebSocket port the engine listens on
    pub fn port(self, port: u16) -> Self {
        self.arg("-p").arg(port.to_string())
    }

    /// Translate unknown tokens instead of failing
    pub fn allow_unknown(self) -> Self {
        self.arg("--allow-unk")
    }

    /// Accept tab-separated input (sentence, context)
    pub fn tsv(self) -> Self {
        self.arg("--tsv")
    }

    pub fn beam_size(self, size: u32) -> Self {
        self.arg("-b").arg(size.to_string())
    }

    pub fn mini_batch(self, size: u32) -> Self {
        self.arg("--mini-batch").arg(size.to_string())
    }

    /// Length-normalization weight
    pub fn normalize<S: Into<String>>(self, weight: S) -> Self {
        self.arg("--normalize").arg(weight)
    }

    pub fn maxi_batch_sort<S: Into<String>>(self, order: S) -> Self {
        self.arg("--maxi-batch-sort").arg(order)
    }

    pub fn maxi_batch(self, size: u32) -> Self {
        self.arg("--maxi-batch").arg(size.to_string())
    }

    /// Process command ready to spawn; the engine dies with the relay
    pub fn to_process_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Builder for marian-server launch commands
#[derive(Debug, Clone)]
pub struct EngineCommandBuilder {
    binary_path: String,
}

impl EngineCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build the server command for one language pair
    pub fn marian_server<S: Into<String>>(&self, configuration: S, port: u16) -> EngineCommand {
        EngineCommand::new(&self.binary_path)
            .config_file(configuration)
            .port(port)
            .allow_unknown()
            .tsv()
            .beam_size(BEAM_SIZE)
            .mini_batch(MINI_BATCH)
            .normalize(NORMALIZE)
            .maxi_batch_sort(MAXI_BATCH_SORT)
            .maxi_batch(MAXI_BATCH)
    }
}
