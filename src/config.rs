//! Configuration management for Camera Explorer
//!
//! Provides loading, saving and validation of session options: the
//! resolutions requested when a device opens, the default-selection policies
//! that have no single obvious answer, and where overlay icons live.

use crate::errors::CameraError;
use crate::types::Resolution;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

/// Applied once when a session opens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Preview resolution [width, height], used only if the device lists it
    pub preview_resolution: [u32; 2],
    /// Capture resolution [width, height], used only if the device lists it
    pub capture_resolution: [u32; 2],
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preview_resolution: [640, 480],
            capture_resolution: [640, 480],
        }
    }
}

impl SessionConfig {
    pub fn preview(&self) -> Resolution {
        Resolution::from(self.preview_resolution)
    }

    pub fn capture(&self) -> Resolution {
        Resolution::from(self.capture_resolution)
    }
}

/// Which shutter speed `set_default` picks for exposure time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureTimeDefault {
    /// 1/30 s when available, otherwise the slowest speed
    #[default]
    ThirtiethOrSlowest,
    Slowest,
    Fastest,
}

/// Which preset `set_default` picks for white balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhiteBalanceDefault {
    /// First preset the device lists
    #[default]
    First,
    Last,
    /// Leave the device's current preset alone
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub exposure_time: ExposureTimeDefault,
    #[serde(default)]
    pub white_balance_preset: WhiteBalanceDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Directory joined with each option's overlay file name
    pub icon_directory: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            icon_directory: "Assets/Icons".to_string(),
        }
    }
}

impl ExplorerConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: ExplorerConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(CameraError::ConfigError)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("camera-explorer.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        let [w, h] = self.session.preview_resolution;
        if w == 0 || h == 0 {
            return Err("Invalid preview resolution".to_string());
        }
        let [w, h] = self.session.capture_resolution;
        if w == 0 || h == 0 {
            return Err("Invalid capture resolution".to_string());
        }
        if self.overlay.icon_directory.trim().is_empty() {
            return Err("Overlay icon directory must not be empty".to_string());
        }
        Ok(())
    }
}
