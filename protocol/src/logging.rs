//! # Structured Logging
//!
//! The engine only emits `tracing` events. Embedders that have no
//! subscriber of their own can install one here: RUST_LOG picks what is
//! recorded, falling back to [`DEFAULT_DIRECTIVES`], and events are
//! written to stderr as human-readable text or as JSON objects.
//!
//! ```text
//! RUST_LOG=ecobasket=debug                     # selection detail per withdrawal
//! RUST_LOG=ecobasket=warn                      # rejected requests and violations only
//! RUST_LOG=ecobasket::withdraw=debug,ecobasket_protocol=trace
//! ```

use std::io;
use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Committed operations from the engine, warnings from the bank layer.
pub const DEFAULT_DIRECTIVES: &str = "ecobasket=info,ecobasket_protocol=warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line text with source locations.
    #[default]
    Pretty,
    /// One flattened JSON object per event.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format {0:?} (expected \"pretty\" or \"json\")")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(UnknownLogFormat(s.to_string())),
        }
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn output_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_writer(io::stderr)
            .boxed(),
    }
}

/// Parses `directives`, or [`DEFAULT_DIRECTIVES`] when they are malformed.
/// Ignores RUST_LOG.
fn fallback_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber.
///
/// `default_directives` applies when RUST_LOG is unset or unparsable, e.g.
/// `"ecobasket=debug"` while investigating a withdrawal.
///
/// # Errors
///
/// [`TryInitError`] if a global subscriber is already installed.
pub fn init_logging(default_directives: &str, format: LogFormat) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter(default_directives));

    tracing_subscriber::registry()
        .with(output_layer(format))
        .with(filter)
        .try_init()?;

    tracing::debug!(?format, "ecobasket logging installed");
    Ok(())
}
