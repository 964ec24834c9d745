use crate::config::{LogFormat, TelemetryConfig};
use std::env;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Overrides `APP_LOG_LEVEL` with a full filter directive, e.g. `course_advisor=debug`.
pub const FILTER_ENV: &str = "ADVISOR_LOG";

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter { directive: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { directive, .. } => {
                write!(f, "invalid log filter '{directive}'")
            }
            TelemetryError::Subscriber(err) => write!(f, "failed to install log subscriber: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Picks the filter directive: a non-blank override wins over the configured level.
fn build_filter(
    override_directive: Option<&str>,
    level: &str,
) -> Result<EnvFilter, TelemetryError> {
    let directive = override_directive
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .unwrap_or(level);
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        source,
    })
}

/// Installs the global subscriber. Logs go to stderr so JSON written to stdout stays
/// parseable.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let override_directive = env::var(FILTER_ENV).ok();
    let filter = build_filter(override_directive.as_deref(), &config.log_level)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match config.format {
        LogFormat::Compact => builder.with_target(false).compact().try_init(),
        LogFormat::Json => builder
            .with_target(true)
            .json()
            .with_current_span(false)
            .try_init(),
    }
    .map_err(TelemetryError::Subscriber)
}
