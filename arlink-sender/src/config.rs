//! Configuration for the frame sender.

use std::path::Path;

use serde::{Deserialize, Serialize};

use arlink_core::{CaptureConfig, ImageFormat};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Where frames go.
    pub network: NetworkConfig,
    /// Capture rate, size and codec.
    pub capture: CaptureSection,
    /// The rendered view being streamed.
    pub display: DisplayConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Device host name or address.
    pub peer_host: String,
    /// Device port.
    pub peer_port: u16,
    /// Give up connecting after this many milliseconds.
    pub connect_timeout_ms: u64,
}

/// Capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    /// Upper bound on frames sent per second.
    pub max_fps: f64,
    /// Capture size relative to the display, in (0, 1].
    pub resolution_scale: f64,
    /// Decode every sent frame locally.
    pub debug_preview: bool,
    /// Frame codec: "jpeg" or "zstd".
    pub codec: ImageFormat,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// zstd compression level.
    pub zstd_level: i32,
}

/// Synthetic display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Frame clock rate in Hz.
    pub refresh_hz: f64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            peer_host: "127.0.0.1".into(),
            peer_port: 7400,
            connect_timeout_ms: 5000,
        }
    }
}

impl Default for CaptureSection {
    fn default() -> Self {
        let core = CaptureConfig::default();
        Self {
            max_fps: core.max_fps,
            resolution_scale: core.resolution_scale,
            debug_preview: core.debug_preview,
            codec: ImageFormat::Jpeg,
            jpeg_quality: 75,
            zstd_level: 3,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            refresh_hz: 60.0,
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

impl SenderConfig {
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

    /// Write the default configuration to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Core capture settings. Validated when the sender is built.
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            max_fps: self.capture.max_fps,
            resolution_scale: self.capture.resolution_scale,
            debug_preview: self.capture.debug_preview,
        }
    }
}

impl NetworkConfig {
    /// Override the peer from a `host:port` string.
    pub fn set_peer(&mut self, peer: &str) -> Result<(), String> {
        let (host, port) = peer
            .rsplit_once(':')
            .ok_or_else(|| format!("peer `{peer}` is not host:port"))?;
        if host.is_empty() {
            return Err(format!("peer `{peer}` has no host"));
        }
        self.peer_port = port
            .parse()
            .map_err(|e| format!("peer `{peer}` has a bad port: {e}"))?;
        self.peer_host = host.to_string();
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
