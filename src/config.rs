//! Tunable thresholds and serial settings, loadable from TOML.
//!
//! Every field has a default, so a config file only needs the values it changes:
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//!
//! [follower]
//! dead_band = 40
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub follower: FollowerConfig,
    pub serial: SerialConfig,
    pub handshake: HandshakeConfig,
}

/// Shape and color classifier settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Frames are resized to this resolution before analysis
    pub frame_width: u32,
    pub frame_height: u32,
    /// Neighbourhood size for the adaptive threshold (odd)
    pub adaptive_block_size: u32,
    /// Constant subtracted from the local mean
    pub adaptive_c: f32,
    /// Fixed threshold for high-contrast objects
    pub binary_threshold: u8,
    /// Minimum contour area for the primary shape
    pub min_shape_area: f64,
    /// Minimum blob area for a color detection
    pub min_color_area: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            frame_width: 640,
            frame_height: 480,
            adaptive_block_size: 11,
            adaptive_c: 2.0,
            binary_threshold: 100,
            min_shape_area: 1000.0,
            min_color_area: 500.0,
        }
    }
}

/// Line follower settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FollowerConfig {
    /// Pixels at or below this level count as line
    pub binary_threshold: u8,
    /// Smallest blob accepted as the line
    pub min_line_area: f64,
    /// |deviation| below this drives straight
    pub dead_band: i32,
    /// |deviation| beyond this turns hard
    pub hard_turn: i32,
    /// Pause after the final stop before the link is dropped
    pub stop_delay_ms: u64,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            binary_threshold: 100,
            min_line_area: 500.0,
            dead_band: 50,
            hard_turn: 100,
            stop_delay_ms: 500,
        }
    }
}

impl FollowerConfig {
    pub fn stop_delay(&self) -> Duration {
        Duration::from_millis(self.stop_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    /// Boards reset when the port opens; wait this long before talking
    pub settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115_200,
            timeout_ms: 1000,
            settle_ms: 2000,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[cfg(windows)]
fn default_port() -> &'static str {
    "COM4"
}

#[cfg(not(windows))]
fn default_port() -> &'static str {
    "/dev/ttyUSB0"
}

/// Serial round-trip diagnostic settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Commands probed in order
    pub commands: Vec<String>,
    /// Wait before draining the board's boot messages
    pub initial_wait_ms: u64,
    /// Wait after each probe before reading replies
    pub response_wait_ms: u64,
    /// Pause between probes
    pub gap_ms: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            commands: ["F", "L", "R", "S", "X"].iter().map(|c| c.to_string()).collect(),
            initial_wait_ms: 1000,
            response_wait_ms: 500,
            gap_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Read a TOML file; missing sections and keys fall back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.classifier;
        if c.frame_width < 3 || c.frame_height < 4 {
            anyhow::bail!("Frame size must be at least 3x4, got {}x{}", c.frame_width, c.frame_height);
        }
        if c.adaptive_block_size < 3 || c.adaptive_block_size % 2 == 0 {
            anyhow::bail!("Adaptive block size must be odd and >= 3, got {}", c.adaptive_block_size);
        }

        let f = &self.follower;
        if f.dead_band < 0 {
            anyhow::bail!("Dead band must not be negative, got {}", f.dead_band);
        }
        if f.hard_turn < f.dead_band {
            anyhow::bail!(
                "Hard-turn threshold ({}) must not be below the dead band ({})",
                f.hard_turn,
                f.dead_band
            );
        }

        if self.serial.baud_rate == 0 {
            anyhow::bail!("Baud rate must be greater than 0");
        }
        if self.serial.port.trim().is_empty() {
            anyhow::bail!("Serial port name must not be empty");
        }

        Ok(())
    }
}
