use std::path::Path;
use std::time::Duration;

use padlink_frame::{FrameConfig, MIN_FRAME_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Default hardware refresh rate in frames per second.
pub const DEFAULT_FRAME_RATE: u32 = 60;

/// Slowest accepted refresh rate.
pub const MIN_FRAME_RATE: u32 = 1;

/// Fastest accepted refresh rate.
pub const MAX_FRAME_RATE: u32 = 120;

/// Transmitted-message count between two performance summaries.
pub const DEFAULT_STATS_LOG_EVERY: u64 = 100;

/// Default hardware grid: 8 columns by 4 rows.
pub const DEFAULT_RING_WIDTH: usize = 8;
pub const DEFAULT_RING_HEIGHT: usize = 4;

/// Clamp a requested frame rate into `MIN_FRAME_RATE..=MAX_FRAME_RATE`.
pub fn clamp_frame_rate(rate: u32) -> u32 {
    rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
}

/// Interval between two flushes at `rate` frames per second (clamped).
pub fn frame_interval_for(rate: u32) -> Duration {
    Duration::from_secs(1) / clamp_frame_rate(rate)
}

/// Coalescing scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Flushes per second; the rate ceiling is `1 / frame_rate`.
    pub frame_rate: u32,
    /// Log a summary every this many transmitted messages (0 disables).
    pub stats_log_every: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_rate: DEFAULT_FRAME_RATE,
            stats_log_every: DEFAULT_STATS_LOG_EVERY,
        }
    }
}

impl SchedulerConfig {
    pub fn frame_interval(&self) -> Duration {
        frame_interval_for(self.frame_rate)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&self.frame_rate) {
            return Err(SyncError::InvalidConfig(format!(
                "frame_rate {} outside {MIN_FRAME_RATE}..={MAX_FRAME_RATE}",
                self.frame_rate
            )));
        }
        Ok(())
    }
}

/// Window size of the session ring, fixed by the hardware grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Visible columns.
    pub width: usize,
    /// Visible rows.
    pub height: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_RING_WIDTH,
            height: DEFAULT_RING_HEIGHT,
        }
    }
}

impl RingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SyncError::ZeroSizedWindow {
                width: self.width,
                height: self.height,
            });
        }
        // Width and height travel as single 7-bit bytes.
        if self.width > 0x7F || self.height > 0x7F {
            return Err(SyncError::InvalidConfig(format!(
                "ring {}x{} exceeds 127x127",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Wire size of one `GRID_CONTENT` frame: six bytes per visible cell.
    pub fn grid_frame_size(&self) -> usize {
        MIN_FRAME_SIZE + self.width * self.height * 6
    }
}

/// Complete configuration, loadable from JSON.
///
/// Every section is optional; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PadlinkConfig {
    pub frame: FrameConfig,
    pub scheduler: SchedulerConfig,
    pub ring: RingConfig,
}

impl PadlinkConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.frame.validate()?;
        self.scheduler.validate()?;
        self.ring.validate()?;
        let grid = self.ring.grid_frame_size();
        if grid > self.frame.max_frame_size {
            return Err(SyncError::InvalidConfig(format!(
                "ring {}x{} needs {grid}-byte grid frames, max_frame_size is {}",
                self.ring.width, self.ring.height, self.frame.max_frame_size
            )));
        }
        Ok(())
    }
}
