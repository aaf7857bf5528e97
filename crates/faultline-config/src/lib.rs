// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for the faultline boundary.
//!
//! [`FaultlineConfig`] holds the runtime settings: logging, debug rendering,
//! rendered cause depth, telemetry buffer size, and which translator groups
//! are enabled. It is loaded from TOML, overridden by `FAULTLINE_*`
//! environment variables, and checked by [`validate_config`], which returns
//! advisory [`ConfigWarning`]s for settings that work but deserve attention.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// An environment override held an unusable value.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Debug rendering exposes diagnostic details to consumers.
    DebugEnabled,
    /// No translator group is enabled; every failure renders as internal.
    NoCapabilities,
    /// The rendered cause chain is unusually deep.
    DeepCauseChain {
        /// Configured depth.
        depth: usize,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::DebugEnabled => {
                f.write_str("debug rendering is enabled; diagnostic details reach consumers")
            }
            ConfigWarning::NoCapabilities => {
                f.write_str("every capability is disabled; all failures will render as internal")
            }
            ConfigWarning::DeepCauseChain { depth } => {
                write!(f, "cause_depth {depth} renders large error bodies")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Translator groups to register at startup.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Schema validation failures.
    pub validation: bool,
    /// Relational persistence failures.
    pub persistence: bool,
    /// Graph resolver failures.
    pub graph: bool,
    /// Token authentication and access control.
    pub auth: bool,
    /// Framework-generated HTTP failures.
    pub http: bool,
    /// Downstream service failures.
    pub upstream: bool,
    /// Records raised directly by business logic.
    pub application: bool,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            validation: true,
            persistence: true,
            graph: true,
            auth: true,
            http: true,
            upstream: true,
            application: true,
        }
    }
}

impl CapabilityConfig {
    fn any_enabled(&self) -> bool {
        self.validation
            || self.persistence
            || self.graph
            || self.auth
            || self.http
            || self.upstream
            || self.application
    }
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct FaultlineConfig {
    /// Log level override (e.g. `"debug"`, `"info"`, `"warn"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,

    /// Render debug-prefixed and internal details.
    #[serde(default)]
    pub debug: bool,

    /// Nested causes included in rendered bodies (0..=10).
    #[serde(default = "default_cause_depth")]
    pub cause_depth: usize,

    /// Capacity of the classification event buffer.
    #[serde(default = "default_telemetry_buffer")]
    pub telemetry_buffer: usize,

    /// Listen address for the reference daemon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Enabled translator groups.
    #[serde(default)]
    pub capabilities: CapabilityConfig,
}

fn default_cause_depth() -> usize {
    DEFAULT_CAUSE_DEPTH
}

fn default_telemetry_buffer() -> usize {
    DEFAULT_TELEMETRY_BUFFER
}

impl Default for FaultlineConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".into()),
            log_format: LogFormat::Text,
            debug: false,
            cause_depth: DEFAULT_CAUSE_DEPTH,
            telemetry_buffer: DEFAULT_TELEMETRY_BUFFER,
            bind: None,
            capabilities: CapabilityConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default rendered cause depth.
pub const DEFAULT_CAUSE_DEPTH: usize = 1;

/// Default event buffer capacity.
pub const DEFAULT_TELEMETRY_BUFFER: usize = 1024;

/// Largest accepted cause depth.
pub const MAX_CAUSE_DEPTH: usize = 10;

/// Depth above which a warning is raised.
const DEEP_CAUSE_THRESHOLD: usize = 3;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`FaultlineConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`FaultlineConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<FaultlineConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|_| ConfigError::FileNotFound {
                path: p.display().to_string(),
            })?;
            parse_toml(&content)?
        }
        None => FaultlineConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Parse a TOML string into a [`FaultlineConfig`].
pub fn parse_toml(content: &str) -> Result<FaultlineConfig, ConfigError> {
    toml::from_str::<FaultlineConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides.
///
/// Recognised variables:
/// - `FAULTLINE_LOG_LEVEL`
/// - `FAULTLINE_DEBUG` (`1`/`true`/`yes`, `0`/`false`/`no`)
/// - `FAULTLINE_CAUSE_DEPTH`
/// - `FAULTLINE_BIND`
pub fn apply_env_overrides(config: &mut FaultlineConfig) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var("FAULTLINE_LOG_LEVEL") {
        config.log_level = Some(val);
    }
    if let Ok(val) = std::env::var("FAULTLINE_DEBUG") {
        config.debug = match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    var: "FAULTLINE_DEBUG",
                    value: val,
                });
            }
        };
    }
    if let Ok(val) = std::env::var("FAULTLINE_CAUSE_DEPTH") {
        config.cause_depth = val.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            var: "FAULTLINE_CAUSE_DEPTH",
            value: val.clone(),
        })?;
    }
    if let Ok(val) = std::env::var("FAULTLINE_BIND") {
        config.bind = Some(val);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (unknown log level, cause depth above the cap, an empty event
/// buffer) are returned as a [`ConfigError::ValidationError`].
pub fn validate_config(config: &FaultlineConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if let Some(ref level) = config.log_level
        && !VALID_LOG_LEVELS.contains(&level.as_str())
    {
        errors.push(format!("invalid log_level '{level}'"));
    }

    if config.cause_depth > MAX_CAUSE_DEPTH {
        errors.push(format!(
            "cause_depth {} out of range (0..={MAX_CAUSE_DEPTH})",
            config.cause_depth
        ));
    } else if config.cause_depth > DEEP_CAUSE_THRESHOLD {
        warnings.push(ConfigWarning::DeepCauseChain {
            depth: config.cause_depth,
        });
    }

    if config.telemetry_buffer == 0 {
        errors.push("telemetry_buffer must be greater than zero".into());
    }

    if config.debug {
        warnings.push(ConfigWarning::DebugEnabled);
    }
    if !config.capabilities.any_enabled() {
        warnings.push(ConfigWarning::NoCapabilities);
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence over `base`.
///
/// Optional fields fall back to `base` when the overlay leaves them unset.
/// Scalar fields and capabilities are taken from the overlay, except that a
/// debug flag set in either config stays set.
pub fn merge_configs(base: FaultlineConfig, overlay: FaultlineConfig) -> FaultlineConfig {
    FaultlineConfig {
        log_level: overlay.log_level.or(base.log_level),
        log_format: overlay.log_format,
        debug: base.debug || overlay.debug,
        cause_depth: overlay.cause_depth,
        telemetry_buffer: overlay.telemetry_buffer,
        bind: overlay.bind.or(base.bind),
        capabilities: overlay.capabilities,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
