//! # Loader Configuration
//!
//! Settings that shape a single template load. Supports loading from
//! environment variables and programmatic defaults.

use crate::{Result, TempleError};
use serde::{Deserialize, Serialize};
use std::env;

/// What to do when a variable marker names an identifier with no binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedPolicy {
    /// Abort the load with [`TempleError::UnresolvedBinding`].
    #[default]
    Fail,

    /// Leave the marker in the output exactly as written.
    PassThrough,
}

/// Configuration for the template loader.
///
/// # Example
/// ```rust
/// use temple_core::{LoaderConfig, UndefinedPolicy};
///
/// // Load from environment
/// let config = LoaderConfig::from_env();
///
/// // Or customize
/// let config = LoaderConfig::default()
///     .with_skip_undefined(true)
///     .with_max_depth(Some(8));
/// assert_eq!(config.undefined, UndefinedPolicy::PassThrough);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Behaviour for unbound variable markers.
    /// Default: Fail, Env: TEMPLE_SKIP_UNDEFINED=true
    pub undefined: UndefinedPolicy,

    /// Fail with a cycle error when an import or a binding value expands
    /// back into itself, instead of recursing forever.
    /// Default: true, Env: TEMPLE_DETECT_CYCLES=false
    pub detect_cycles: bool,

    /// Maximum import nesting depth. `None` means no limit.
    /// Default: None, Env: TEMPLE_MAX_DEPTH=16 (0 or "none" disables)
    pub max_depth: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            undefined: UndefinedPolicy::Fail,
            detect_cycles: true,
            max_depth: None,
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_depth(v: &str) -> Option<Option<usize>> {
    let v = v.trim();
    if v.eq_ignore_ascii_case("none") {
        return Some(None);
    }
    match v.parse::<usize>() {
        Ok(0) => Some(None),
        Ok(n) => Some(Some(n)),
        Err(_) => None,
    }
}

impl LoaderConfig {
    /// Create a new config from environment variables.
    /// Falls back to defaults for missing or malformed variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(skip) = env::var("TEMPLE_SKIP_UNDEFINED").ok().and_then(|v| parse_flag(&v)) {
            config = config.with_skip_undefined(skip);
        }
        if let Some(detect) = env::var("TEMPLE_DETECT_CYCLES").ok().and_then(|v| parse_flag(&v)) {
            config.detect_cycles = detect;
        }
        if let Some(depth) = env::var("TEMPLE_MAX_DEPTH").ok().and_then(|v| parse_depth(&v)) {
            config.max_depth = depth;
        }

        config
    }

    /// Like [`LoaderConfig::from_env`], but reports malformed values.
    pub fn try_from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(v) = env::var("TEMPLE_SKIP_UNDEFINED") {
            let skip = parse_flag(&v).ok_or_else(|| {
                TempleError::ConfigError(format!("TEMPLE_SKIP_UNDEFINED: expected a boolean, got '{}'", v))
            })?;
            config = config.with_skip_undefined(skip);
        }
        if let Ok(v) = env::var("TEMPLE_DETECT_CYCLES") {
            config.detect_cycles = parse_flag(&v).ok_or_else(|| {
                TempleError::ConfigError(format!("TEMPLE_DETECT_CYCLES: expected a boolean, got '{}'", v))
            })?;
        }
        if let Ok(v) = env::var("TEMPLE_MAX_DEPTH") {
            config.max_depth = parse_depth(&v).ok_or_else(|| {
                TempleError::ConfigError(format!("TEMPLE_MAX_DEPTH: expected a number or 'none', got '{}'", v))
            })?;
        }

        Ok(config)
    }

    /// Builder: Set the undefined-variable policy.
    pub fn with_undefined(mut self, policy: UndefinedPolicy) -> Self {
        self.undefined = policy;
        self
    }

    /// Builder: Pass undefined variables through literally instead of failing.
    pub fn with_skip_undefined(mut self, skip: bool) -> Self {
        self.undefined = if skip {
            UndefinedPolicy::PassThrough
        } else {
            UndefinedPolicy::Fail
        };
        self
    }

    /// Builder: Enable or disable import cycle detection.
    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }

    /// Builder: Set the maximum import depth.
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Whether undefined variables are left in the output.
    pub fn skips_undefined(&self) -> bool {
        self.undefined == UndefinedPolicy::PassThrough
    }
}
