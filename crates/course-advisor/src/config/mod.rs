use std::env;
use std::fmt;

use crate::recommendations::EngineConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the advisor.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("ADVISOR_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw)?,
            Err(_) => LogFormat::default_for(environment),
        };

        let defaults = EngineConfig::default();
        let core_subject_codes = match env::var("ADVISOR_CORE_SUBJECTS") {
            Ok(raw) => parse_subject_codes(&raw)?,
            Err(_) => defaults.core_subject_codes,
        };
        let full_schedule_threshold = match env::var("ADVISOR_FULL_SCHEDULE") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNumber {
                    variable: "ADVISOR_FULL_SCHEDULE",
                    value: raw.clone(),
                })?,
            Err(_) => defaults.full_schedule_threshold,
        };

        let max_concurrency = match env::var("ADVISOR_BATCH_CONCURRENCY") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value >= 1 => value,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        variable: "ADVISOR_BATCH_CONCURRENCY",
                        value: raw,
                    })
                }
            },
            Err(_) => BatchConfig::default().max_concurrency,
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            engine: EngineConfig {
                core_subject_codes,
                full_schedule_threshold,
            },
            batch: BatchConfig { max_concurrency },
        })
    }
}

fn parse_subject_codes(raw: &str) -> Result<Vec<String>, ConfigError> {
    let codes: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();

    if codes.is_empty() {
        return Err(ConfigError::EmptyCoreSubjects);
    }
    Ok(codes)
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub format: LogFormat,
}

/// Shape of emitted log lines; production defaults to JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidLogFormat(raw.to_string())),
        }
    }

    fn default_for(environment: AppEnvironment) -> Self {
        match environment {
            AppEnvironment::Production => Self::Json,
            AppEnvironment::Development | AppEnvironment::Test => Self::Compact,
        }
    }
}

/// Settings for multi-learner generation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
    EmptyCoreSubjects,
    InvalidLogFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a positive integer (got '{value}')")
            }
            ConfigError::EmptyCoreSubjects => {
                write!(f, "ADVISOR_CORE_SUBJECTS must list at least one subject code")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "ADVISOR_LOG_FORMAT must be 'compact' or 'json' (got '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
