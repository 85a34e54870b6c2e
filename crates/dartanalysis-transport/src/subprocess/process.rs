//! Process management for the analysis server subprocess

use crate::error::{Result, TransportError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

/// What to do with the server's stderr
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StderrMode {
    /// Discard it
    #[default]
    Discard,

    /// Forward each line to `tracing` at debug level
    Log,
}

/// Configuration for spawning the server process
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Path to the executable
    pub program: PathBuf,

    /// Arguments to pass to the executable
    pub args: Vec<String>,

    /// Environment variables to set
    pub env: HashMap<String, String>,

    /// Keep the parent's environment instead of starting from an empty one
    pub inherit_env: bool,

    /// Working directory for the process
    pub working_dir: Option<PathBuf>,

    /// Stderr handling
    pub stderr: StderrMode,
}

impl ProcessConfig {
    /// Create a new process configuration
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            inherit_env: false,
            working_dir: None,
            stderr: StderrMode::Discard,
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable
    ///
    /// # Security Note
    ///
    /// Unless [`ProcessConfig::inherit_env`] is set, the parent's environment
    /// is cleared and only the variables set here reach the child.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Keep (or clear) the parent's environment
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set stderr handling
    pub fn with_stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }
}

/// A freshly spawned server with its piped streams
pub(crate) struct SpawnedProcess {
    pub child: Child,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
}

/// Spawn the server process
///
/// The child is killed if its handle is dropped.
pub(crate) fn spawn_process(config: &ProcessConfig) -> Result<SpawnedProcess> {
    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args);

    // SECURITY: only explicitly configured variables unless told otherwise
    if !config.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&config.env);

    if let Some(dir) = &config.working_dir {
        cmd.current_dir(dir);
    }

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(match config.stderr {
        StderrMode::Discard => Stdio::null(),
        StderrMode::Log => Stdio::piped(),
    });
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        TransportError::Process(format!(
            "Failed to spawn {}: {}",
            config.program.display(),
            e
        ))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| TransportError::Process("Failed to get stdin".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TransportError::Process("Failed to get stdout".to_string()))?;
    if let Some(stderr) = child.stderr.take() {
        forward_stderr(stderr);
    }

    tracing::info!(
        program = %config.program.display(),
        pid = child.id(),
        "spawned analysis server"
    );

    Ok(SpawnedProcess {
        child,
        stdin,
        stdout,
    })
}

fn forward_stderr(stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(target: "dartanalysis::server_stderr", "{}", line);
        }
    });
}
