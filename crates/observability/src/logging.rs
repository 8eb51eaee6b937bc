//! Logging initialization and configuration
//!
//! Sets up the tracing subscriber used by every index crate. The index
//! report is the audit artifact; logs carry the per-stage narrative
//! (dropped reports, rate fallbacks, gate outcomes).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    #[default]
    Pretty,
    /// JSON lines, for shipping runs to a log store
    Json,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown log format: {}", s))
    }
}

/// Initialize the logging system
///
/// The log level is read from `RUST_LOG` and defaults to `info`.
///
/// # Example
///
/// ```ignore
/// use observability::{init_logging, LogFormat};
///
/// init_logging("gpux", LogFormat::Json)?;
/// tracing::info!("Index run started");
/// ```
pub fn init_logging(service_name: &str, format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))?;

    tracing::info!(
        service = service_name,
        format = ?format,
        "Logging initialized"
    );

    Ok(())
}
