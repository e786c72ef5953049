//! # Run Configuration
//!
//! Loaded once at startup from TOML. Every key is optional:
//!
//! ```toml
//! tick_rate_hz = 120      # worker cadence, 0 = unthrottled
//! editor_fps = 60         # editor cadence, 0 = unthrottled
//! max_cycles = 600        # quit after this many sync cycles
//! tick_budget_ms = 8      # warn when a tick takes longer
//! log_level = "debug"     # default filter for the demo binary
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, ConfigResult};

/// Default worker cadence.
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Default editor cadence.
pub const DEFAULT_EDITOR_FPS: u32 = 60;

/// Default tick budget before a warning is logged.
pub const DEFAULT_TICK_BUDGET_MS: u64 = 33;

/// Configuration for one worker/editor run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Worker ticks per second. 0 runs as fast as the handshake allows.
    pub tick_rate_hz: u32,
    /// Editor frames per second. 0 runs as fast as the handshake allows.
    pub editor_fps: u32,
    /// Stop after this many completed sync cycles.
    pub max_cycles: Option<u64>,
    /// Ticks slower than this are logged at `warn`.
    pub tick_budget_ms: u64,
    /// Default log filter directive.
    pub log_level: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            editor_fps: DEFAULT_EDITOR_FPS,
            max_cycles: None,
            tick_budget_ms: DEFAULT_TICK_BUDGET_MS,
            log_level: "info".to_string(),
        }
    }
}

impl RunConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_toml_str(input: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.tick_budget_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_budget_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_cycles == Some(0) {
            return Err(ConfigError::Invalid(
                "max_cycles must be at least 1 when set".to_string(),
            ));
        }
        if let Err(err) = EnvFilter::try_new(&self.log_level) {
            return Err(ConfigError::Invalid(format!(
                "log_level {:?} is not a valid filter: {err}",
                self.log_level
            )));
        }
        Ok(())
    }

    /// Target time per worker tick, or `None` when unthrottled.
    #[must_use]
    pub fn tick_interval(&self) -> Option<Duration> {
        interval(self.tick_rate_hz)
    }

    /// Target time per editor frame, or `None` when unthrottled.
    #[must_use]
    pub fn frame_interval(&self) -> Option<Duration> {
        interval(self.editor_fps)
    }

    /// Tick duration above which a warning is logged.
    #[must_use]
    pub fn tick_budget(&self) -> Duration {
        Duration::from_millis(self.tick_budget_ms)
    }
}

fn interval(rate: u32) -> Option<Duration> {
    (rate > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(rate)))
}
