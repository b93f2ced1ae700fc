//! Structured logging for meshroute nodes
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines for log aggregation (default)
//! - **Node Context Injection**: Attribute spans to the mesh node doing the work
//! - **File Rotation**: Daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use meshroute_logging::{LogConfig, MeshSubscriberBuilder};
//!
//! // JSONL to console
//! let _guard = MeshSubscriberBuilder::new().init();
//!
//! // Pretty human-readable output
//! let _guard = MeshSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init();
//! ```
//!
//! # Node Context
//!
//! ```ignore
//! use meshroute_logging::context::{NodeContextGuard, node_span};
//!
//! let _ctx = NodeContextGuard::new(my_ip);
//! let _span = node_span().entered();
//! tracing::info!("Dijkstra pass finished");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard, node_span};
pub use error::{LoggingError, LoggingResult};
pub use layers::{NodeContextExtension, NodeContextLayer};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};

use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// A type-erased output layer
pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builder for configuring and installing the global subscriber
///
/// By default, console output uses JSONL format. Use
/// [`LogConfig::development()`] for human-readable output.
#[derive(Debug, Clone, Default)]
pub struct MeshSubscriberBuilder {
    config: LogConfig,
}

impl MeshSubscriberBuilder {
    /// Create a builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Assemble the output layers without installing them
    ///
    /// The returned guard, if any, must outlive all logging to files.
    pub fn build_layers(&self) -> LoggingResult<(Vec<BoxedLayer>, Option<WorkerGuard>)> {
        let mut outputs: Vec<BoxedLayer> = vec![NodeContextLayer::new().boxed()];

        if self.config.console.enabled {
            if self.config.console.pretty {
                outputs.push(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(self.config.console.ansi)
                        .with_target(true)
                        .boxed(),
                );
            } else {
                outputs.push(layers::jsonl_layer(&self.config.jsonl, std::io::stdout).boxed());
            }
        }

        let mut guard = None;
        if let Some(file) = &self.config.file {
            let (writer, file_guard) = file_writer(file)?;
            outputs.push(layers::jsonl_layer(&self.config.jsonl, writer).boxed());
            guard = Some(file_guard);
        }

        Ok((outputs, guard))
    }

    /// Install the subscriber globally
    ///
    /// `RUST_LOG` overrides the configured level. Fails if a global
    /// subscriber is already set.
    pub fn try_init(self) -> LoggingResult<Option<WorkerGuard>> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));
        let (outputs, guard) = self.build_layers()?;
        Registry::default().with(outputs).with(filter).try_init()?;
        Ok(guard)
    }

    /// Install the subscriber globally, reporting failure on stderr
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!("Warning: Failed to initialize logging: {}", e);
                None
            }
        }
    }
}

fn file_writer(file: &FileConfig) -> LoggingResult<(NonBlocking, WorkerGuard)> {
    let rotation = match file.rotation {
        RotationStrategy::Never => {
            // single file, truncated on start
            fs::create_dir_all(&file.directory)?;
            let path = file.directory.join(format!("{}.log", file.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file.prefix.clone())
        .filename_suffix("log");
    if let Some(max) = file.max_files {
        builder = builder.max_log_files(max);
    }
    let appender = builder.build(&file.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> Option<WorkerGuard> {
    MeshSubscriberBuilder::new().init()
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() -> Option<WorkerGuard> {
    MeshSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
}

/// Initialize logging for testing (minimal output, repeat calls ignored)
pub fn init_testing() {
    let _ = MeshSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
