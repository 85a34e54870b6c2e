//! Configuration for launching the analysis server
//!
//! The server runs as `<sdk>/bin/dart <server script> [args...]`.

use crate::error::{AnalysisError, Result};
use dartanalysis_transport::{ProcessConfig, StderrMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Where the server lives and how to start it
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root folder of the Dart SDK
    pub sdk_path: PathBuf,

    /// Script that runs the analysis server
    pub server_script: PathBuf,

    /// Extra arguments after the script
    pub server_args: Vec<String>,

    /// Environment variables for the server process
    pub env: HashMap<String, String>,

    /// Pass the parent environment through (default: false)
    pub inherit_env: bool,

    /// Working directory of the server process
    pub working_dir: Option<PathBuf>,

    /// Forward the server's stderr to `tracing`
    pub log_stderr: bool,
}

impl ServiceConfig {
    /// Create a configuration for `server_script` run by the SDK at `sdk_path`
    pub fn new(sdk_path: impl Into<PathBuf>, server_script: impl Into<PathBuf>) -> Self {
        Self {
            sdk_path: sdk_path.into(),
            server_script: server_script.into(),
            server_args: Vec::new(),
            env: HashMap::new(),
            inherit_env: false,
            working_dir: None,
            log_stderr: false,
        }
    }

    /// Add a server argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.server_args.push(arg.into());
        self
    }

    /// Add several server arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.server_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the server
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Pass the parent environment through to the server
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the server's working directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Forward the server's stderr to `tracing` at debug level
    pub fn with_stderr_logging(mut self, enabled: bool) -> Self {
        self.log_stderr = enabled;
        self
    }

    /// Path of the `dart` executable inside the SDK
    pub fn dart_executable(&self) -> PathBuf {
        let name = if cfg!(windows) { "dart.exe" } else { "dart" };
        self.sdk_path.join("bin").join(name)
    }

    /// Check that the SDK and script exist
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Config`] naming the first missing path.
    pub fn validate(&self) -> Result<()> {
        require_dir(&self.sdk_path, "Dart SDK folder")?;
        require_file(&self.dart_executable(), "dart executable")?;
        require_file(&self.server_script, "analysis server script")?;
        if let Some(dir) = &self.working_dir {
            require_dir(dir, "working directory")?;
        }
        Ok(())
    }

    /// Build the process start descriptor
    pub fn to_process_config(&self) -> ProcessConfig {
        let mut config = ProcessConfig::new(self.dart_executable())
            .with_arg(self.server_script.to_string_lossy())
            .with_args(self.server_args.iter().cloned())
            .inherit_env(self.inherit_env)
            .with_stderr(if self.log_stderr {
                StderrMode::Log
            } else {
                StderrMode::Discard
            });
        for (key, value) in &self.env {
            config = config.with_env(key, value);
        }
        if let Some(dir) = &self.working_dir {
            config = config.with_working_dir(dir);
        }
        config
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the current directory is read first if present.
    /// This will look for:
    /// - `DART_SDK` for the SDK folder (required)
    /// - `DART_ANALYSIS_SERVER` for the server script (required)
    /// - `DART_ANALYSIS_ARGS` for extra, whitespace-separated server arguments
    /// - `DART_ANALYSIS_LOG_STDERR` to forward the server's stderr (`1` or `true`)
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        use std::env;

        dotenvy::dotenv().ok();

        let sdk = env::var("DART_SDK")
            .map_err(|_| AnalysisError::Config("DART_SDK is not set".to_string()))?;
        let script = env::var("DART_ANALYSIS_SERVER")
            .map_err(|_| AnalysisError::Config("DART_ANALYSIS_SERVER is not set".to_string()))?;

        let mut config = Self::new(sdk, script);

        if let Ok(args) = env::var("DART_ANALYSIS_ARGS") {
            config = config.with_args(args.split_whitespace());
        }

        if let Ok(flag) = env::var("DART_ANALYSIS_LOG_STDERR") {
            config.log_stderr = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

fn require_dir(path: &Path, what: &str) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(AnalysisError::Config(format!("{} not found: {}", what, path.display())))
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AnalysisError::Config(format!("{} not found: {}", what, path.display())))
    }
}
