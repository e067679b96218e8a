// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime settings, stored as RON.
//!
//! ```ron
//! (
//!     tick_rate_hz: 30,
//!     channel: "tttree_presentation_channel",
//!     channel_capacity: 16,
//!     log_filter: "tttree_graph=info",
//!     media_timeout_ms: 5000,
//! )
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tttree_graph::presentation::{DEFAULT_CHANNEL_CAPACITY, PRESENTATION_CHANNEL};

/// Settings file looked up in the working directory
pub const SETTINGS_FILE_NAME: &str = "tttree.ron";

/// Player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Ticks per second
    pub tick_rate_hz: u32,
    /// Presentation channel to stream
    pub channel: String,
    /// Messages buffered per subscriber
    pub channel_capacity: usize,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
    /// How long to wait for media before the first tick
    pub media_timeout_ms: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30,
            channel: PRESENTATION_CHANNEL.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_filter: "tttree_graph=info,tttree_app=info".to_string(),
            media_timeout_ms: 5000,
        }
    }
}

impl RuntimeSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        ron::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Settings from `explicit`, else from [`SETTINGS_FILE_NAME`] in `dir`,
    /// else the defaults. Only an explicit path that fails is an error.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> std::io::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let local = dir.join(SETTINGS_FILE_NAME);
        if local.is_file() {
            return Ok((Self::load(&local)?, Some(local)));
        }
        Ok((Self::default(), None))
    }

    /// Time between ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }

    /// Media wait before the first tick
    pub fn media_timeout(&self) -> Duration {
        Duration::from_millis(self.media_timeout_ms)
    }
}
