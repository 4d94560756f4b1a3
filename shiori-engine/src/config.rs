//! Configuration types for the engine

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::retry::BoundedPoll;

/// Timing and tolerance settings for detection, saving and restoration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period before a scheduled position is written
    pub debounce_ms: u64,
    /// Extra delay added on top of the debounce
    pub extra_save_delay_ms: u64,
    /// Save lock applied after a high-trust restore
    pub restore_lock_ms: u64,
    /// Delay after scroll / page events before the edge is recomputed
    pub settle_delay_ms: u64,
    /// Fraction of the viewport (along the reading axis) forming the reading band
    pub reading_band_ratio: f64,
    /// Local offsets at or below this many characters skip precise placement
    pub precise_offset_threshold: usize,
    /// Characters kept on each side of the reading edge in snippets
    pub snippet_radius: usize,
    /// Interval between content-mounted probes
    pub mount_poll_interval_ms: u64,
    /// Maximum content-mounted probes before giving up
    pub mount_poll_max_attempts: u32,
    /// Wait for layout to settle before restoring
    pub layout_settle_ms: u64,
    /// Device id stamped on every saved position
    pub device_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 3_000,
            extra_save_delay_ms: 0,
            restore_lock_ms: 3_000,
            settle_delay_ms: 120,
            reading_band_ratio: 0.15,
            precise_offset_threshold: 5,
            snippet_radius: 20,
            mount_poll_interval_ms: 100,
            mount_poll_max_attempts: 100, // ~10s
            layout_settle_ms: 50,
            device_id: None,
        }
    }
}

impl EngineConfig {
    /// Save and re-detect quickly; suited to fast devices with cheap storage
    pub fn responsive() -> Self {
        Self {
            debounce_ms: 1_000,
            restore_lock_ms: 1_500,
            settle_delay_ms: 60,
            layout_settle_ms: 16,
            ..Self::default()
        }
    }

    /// Write rarely and wait longer for slow renders
    pub fn conservative() -> Self {
        Self {
            debounce_ms: 5_000,
            extra_save_delay_ms: 1_000,
            restore_lock_ms: 5_000,
            settle_delay_ms: 250,
            mount_poll_interval_ms: 200,
            mount_poll_max_attempts: 150,
            layout_settle_ms: 120,
            ..Self::default()
        }
    }

    /// Create a builder starting from the defaults
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Effective delay between the last schedule and the write
    pub fn save_delay_ms(&self) -> u64 {
        self.debounce_ms + self.extra_save_delay_ms
    }

    /// Poll policy for waiting on content to mount
    pub fn mount_poll(&self) -> BoundedPoll {
        BoundedPoll::new(self.mount_poll_max_attempts, self.mount_poll_interval_ms)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.reading_band_ratio > 0.0 && self.reading_band_ratio <= 1.0) {
            return Err(EngineError::ConfigError(format!(
                "reading_band_ratio must be in (0, 1], got {}",
                self.reading_band_ratio
            )));
        }
        if self.mount_poll_max_attempts == 0 {
            return Err(EngineError::ConfigError(
                "mount_poll_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.device_id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(EngineError::ConfigError(
                "device_id cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the save debounce
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    /// Set the extra save delay
    pub fn extra_save_delay_ms(mut self, ms: u64) -> Self {
        self.config.extra_save_delay_ms = ms;
        self
    }

    /// Set the post-restore save lock
    pub fn restore_lock_ms(mut self, ms: u64) -> Self {
        self.config.restore_lock_ms = ms;
        self
    }

    /// Set the settle delay
    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settle_delay_ms = ms;
        self
    }

    /// Set the reading band ratio
    pub fn reading_band_ratio(mut self, ratio: f64) -> Self {
        self.config.reading_band_ratio = ratio;
        self
    }

    /// Set the precise placement threshold
    pub fn precise_offset_threshold(mut self, chars: usize) -> Self {
        self.config.precise_offset_threshold = chars;
        self
    }

    /// Set the snippet radius
    pub fn snippet_radius(mut self, chars: usize) -> Self {
        self.config.snippet_radius = chars;
        self
    }

    /// Set the mount poll policy
    pub fn mount_poll(mut self, max_attempts: u32, interval_ms: u64) -> Self {
        self.config.mount_poll_max_attempts = max_attempts;
        self.config.mount_poll_interval_ms = interval_ms;
        self
    }

    /// Set the layout settle wait
    pub fn layout_settle_ms(mut self, ms: u64) -> Self {
        self.config.layout_settle_ms = ms;
        self
    }

    /// Set the device id
    pub fn device_id(mut self, id: impl Into<String>) -> Self {
        self.config.device_id = Some(id.into());
        self
    }

    /// Use responsive preset
    pub fn responsive(mut self) -> Self {
        self.config = EngineConfig {
            device_id: self.config.device_id.take(),
            ..EngineConfig::responsive()
        };
        self
    }

    /// Use conservative preset
    pub fn conservative(mut self) -> Self {
        self.config = EngineConfig {
            device_id: self.config.device_id.take(),
            ..EngineConfig::conservative()
        };
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
