//! Configuration for the mirror host harness.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use mirror_core::input::MIN_POLL_INTERVAL;
use mirror_core::stream::{DEFAULT_SCREEN_ASPECT, StreamConfig};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Capture loop settings.
    pub stream: StreamSection,
    /// Remote input settings.
    pub input: InputSection,
    /// Synthetic renderer and loopback display.
    pub harness: HarnessSection,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Capture loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    /// Longest single wait for a rendered frame, in milliseconds.
    pub mailbox_timeout_ms: u64,
    /// Aspect ratio of the mirrored screen.
    pub screen_aspect_width: u32,
    pub screen_aspect_height: u32,
}

/// Remote input configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    /// Minimum spacing between snapshot fetches, in milliseconds.
    pub poll_interval_ms: u64,
    /// How often the harness samples its input devices, in milliseconds.
    pub sample_interval_ms: u64,
}

/// Harness configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSection {
    /// Resolution the loopback display asks for.
    pub width: u32,
    pub height: u32,
    /// Synthetic render rate.
    pub fps: u32,
    /// Delay before the loopback display connects, in milliseconds.
    pub connect_delay_ms: u64,
    /// Run time in seconds. 0 runs until Ctrl-C.
    pub seconds: u64,
    /// Interval between stats log lines, in seconds.
    pub stats_interval_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            mailbox_timeout_ms: 200,
            screen_aspect_width: DEFAULT_SCREEN_ASPECT.0,
            screen_aspect_height: DEFAULT_SCREEN_ASPECT.1,
        }
    }
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: MIN_POLL_INTERVAL.as_millis() as u64,
            sample_interval_ms: 16,
        }
    }
}

impl Default for HarnessSection {
    fn default() -> Self {
        Self {
            width: 854,
            height: 480,
            fps: 60,
            connect_delay_ms: 500,
            seconds: 10,
            stats_interval_secs: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl HostConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Convert stream and input settings into a [`StreamConfig`].
    pub fn to_stream_config(&self) -> StreamConfig {
        let aspect = match (
            self.stream.screen_aspect_width,
            self.stream.screen_aspect_height,
        ) {
            (0, _) | (_, 0) => DEFAULT_SCREEN_ASPECT,
            pair => pair,
        };
        StreamConfig {
            mailbox_timeout: Duration::from_millis(self.stream.mailbox_timeout_ms.clamp(10, 1000)),
            poll_interval: Duration::from_millis(self.input.poll_interval_ms).max(MIN_POLL_INTERVAL),
            screen_aspect: aspect,
        }
    }

    /// Render interval for the synthetic renderer.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.harness.fps.clamp(1, 240)
    }
}

// ── Tests ────────────────────────────────────────────────────────
