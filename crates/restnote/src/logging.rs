//! Diagnostics setup.
//!
//! restnote crates report connection lifecycle, retries and anomalies
//! through `tracing`. This is separate from the trace stream, which goes
//! to a [`Logger`](restnote_trace::Logger). Notebooks that want to see the
//! diagnostics install a subscriber once:
//!
//! ```rust,no_run
//! use restnote::logging::LoggingConfig;
//!
//! // Stderr only, no guard needed
//! LoggingConfig::stderr("info").init()?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! File output goes through a non-blocking writer. The returned
//! [`LoggingGuard`] flushes it on drop and must be held:
//!
//! ```rust,no_run
//! use restnote::logging::LoggingConfig;
//!
//! let _guard = LoggingConfig::file("/var/log/notebook").init()?;
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! `RUST_LOG` overrides the configured level.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Where diagnostics go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutput {
    /// Nowhere
    None,
    /// Standard error
    #[default]
    Stderr,
    /// A file in [`LoggingConfig::directory`]
    File,
    /// Standard error and a file
    Both,
}

/// Diagnostics configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, such as `info` or `restnote_stomp=debug`
    pub level: String,
    /// Output target
    #[serde(default)]
    pub output: LogOutput,
    /// JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Directory for file output
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// File name of file output
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

fn default_file_name() -> String {
    "restnote.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::stderr("warn")
    }
}

/// Keeps file output flushing; drop it last.
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    _stderr_guard: Option<WorkerGuard>,
}

impl LoggingConfig {
    /// Human-readable diagnostics on stderr at `level`.
    pub fn stderr(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            output: LogOutput::Stderr,
            json: false,
            directory: None,
            file_name: default_file_name(),
        }
    }

    /// `info` diagnostics written to a file in `directory`.
    pub fn file(directory: impl AsRef<Path>) -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::File,
            json: false,
            directory: Some(directory.as_ref().to_path_buf()),
            file_name: default_file_name(),
        }
    }

    /// Switch to JSON lines.
    #[must_use]
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Install the global subscriber.
    ///
    /// Returns a guard for file output, `None` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File output is configured without a directory
    /// - The directory cannot be created
    /// - A global subscriber is already installed
    pub fn init(&self) -> io::Result<Option<LoggingGuard>> {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.output {
            LogOutput::None => Ok(None),
            LogOutput::Stderr => {
                self.install(filter, io::stderr)?;
                Ok(None)
            }
            LogOutput::File => {
                let (writer, guard) = self.file_writer()?;
                self.install(filter, writer)?;
                Ok(Some(LoggingGuard {
                    _file_guard: guard,
                    _stderr_guard: None,
                }))
            }
            LogOutput::Both => {
                let (file, file_guard) = self.file_writer()?;
                let (stderr, stderr_guard) = tracing_appender::non_blocking(io::stderr());
                self.install(filter, file.and(stderr))?;
                Ok(Some(LoggingGuard {
                    _file_guard: file_guard,
                    _stderr_guard: Some(stderr_guard),
                }))
            }
        }
    }

    fn file_writer(&self) -> io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
        let dir = self.directory.as_ref().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "File logging requires a directory",
            )
        })?;
        std::fs::create_dir_all(dir)?;
        let appender = tracing_appender::rolling::never(dir, &self.file_name);
        Ok(tracing_appender::non_blocking(appender))
    }

    fn install<W>(&self, filter: EnvFilter, writer: W) -> io::Result<()>
    where
        W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let subscriber = tracing_subscriber::registry().with(filter);
        if self.json {
            subscriber
                .with(fmt::layer().json().with_writer(writer))
                .try_init()
                .map_err(|e| io::Error::other(e.to_string()))
        } else {
            subscriber
                .with(fmt::layer().with_writer(writer))
                .try_init()
                .map_err(|e| io::Error::other(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_presets() {
        let config = LoggingConfig::stderr("debug");
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.directory.is_none());

        let config = LoggingConfig::file("/tmp/notebook").with_json();
        assert_eq!(config.level, "info");
        assert_eq!(config.output, LogOutput::File);
        assert!(config.json);
        assert_eq!(config.file_name, "restnote.log");

        assert_eq!(LoggingConfig::default().level, "warn");
    }

    #[test]
    fn test_file_output_requires_directory() {
        let config = LoggingConfig {
            output: LogOutput::File,
            ..LoggingConfig::stderr("info")
        };
        assert!(config.init().is_err());
    }

    #[test]
    fn test_none_installs_nothing() {
        let config = LoggingConfig {
            output: LogOutput::None,
            ..LoggingConfig::default()
        };
        assert!(config.init().unwrap().is_none());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: LoggingConfig =
            serde_json::from_str(r#"{"level": "restnote_stomp=debug", "output": "both"}"#)
                .unwrap();
        assert_eq!(config.output, LogOutput::Both);
        assert!(!config.json);
        assert_eq!(config.file_name, "restnote.log");
    }
}
