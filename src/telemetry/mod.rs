//! Logging setup built on `env_logger`.
//!
//! Log lines are written to stderr with the originating module as target.
//! [`log_with_context`] appends structured `key=value` pairs to a message.

use anyhow::{Context, Result};
use log::{Level, LevelFilter, info};
use std::sync::Once;

static INIT: Once = Once::new();

/// A log message with the module it came from and optional context pairs.
pub struct LogMessage {
    /// The message to log
    pub message: String,

    /// Module name, used as the log target
    pub module: &'static str,

    /// Additional key-value pairs appended to the message
    pub context: Option<Vec<(&'static str, String)>>,
}

impl LogMessage {
    pub fn new(module: &'static str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            module,
            context: None,
        }
    }

    /// Adds a context pair.
    pub fn with(mut self, key: &'static str, value: impl ToString) -> Self {
        self.context
            .get_or_insert_with(Vec::new)
            .push((key, value.to_string()));
        self
    }

    fn render(&self) -> String {
        match &self.context {
            Some(context) if !context.is_empty() => {
                let pairs = context
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} [{}]", self.message, pairs)
            }
            _ => self.message.clone(),
        }
    }
}

/// Initializes logging, honouring `RUST_LOG` and defaulting to `info`.
///
/// Only the first call has an effect; later calls return `Ok(())`.
pub fn init() -> Result<()> {
    init_with_default(LevelFilter::Info)
}

/// Initializes logging with `level` as the default when `RUST_LOG` is unset.
///
/// # Arguments
///
/// * `level` - Level used for every target `RUST_LOG` does not mention
///
/// # Returns
///
/// `Ok(())` once a logger is installed, or the installation error from the
/// first call. Calls after the first always return `Ok(())`.
pub fn init_with_default(level: LevelFilter) -> Result<()> {
    let mut result = Ok(());

    INIT.call_once(|| match setup_logger(level) {
        Ok(()) => info!(target: "telemetry", "Logging initialized with stderr output"),
        Err(e) => {
            // The logger is not available to report its own failure
            eprintln!("Failed to initialize logging: {:#}", e);
            result = Err(e);
        }
    });

    result
}

/// Logs `msg` at `level` with its context pairs appended.
///
/// # Example
///
/// ```
/// use codesearch::telemetry::{LogMessage, log_with_context};
/// use log::Level;
///
/// log_with_context(
///     Level::Info,
///     LogMessage::new("session", "Saved search")
///         .with("file", "todo.code-search")
///         .with("results", 12),
/// );
/// ```
pub fn log_with_context(level: Level, msg: LogMessage) {
    log::log!(target: msg.module, level, "{}", msg.render());
}

fn setup_logger(level: LevelFilter) -> Result<()> {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format_timestamp(None)
        .format_target(true)
        .format_module_path(false)
        .try_init()
        .context("Failed to install env_logger")
}
