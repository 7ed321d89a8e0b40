//! JSON session configuration.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::catalog::{PartCatalog, DEFAULT_PARTS};
use crate::error::SessionError;
use crate::session::{CalibrationSession, DEFAULT_PHYSICAL_WIDTH};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

fn default_parts() -> Vec<String> {
    DEFAULT_PARTS.iter().map(|s| s.to_string()).collect()
}

fn default_physical_width() -> f64 {
    DEFAULT_PHYSICAL_WIDTH
}

/// Session settings. Every field may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Ordered part names marked on both images.
    #[serde(default = "default_parts")]
    pub parts: Vec<String>,
    /// Real-world width of the full reference image.
    #[serde(default = "default_physical_width")]
    pub physical_width: f64,
    /// Reject calibration corners that do not form a convex quad in click order.
    #[serde(default)]
    pub validate_calibration_order: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            parts: default_parts(),
            physical_width: default_physical_width(),
            validate_calibration_order: false,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn build_catalog(&self) -> Result<PartCatalog, SessionError> {
        PartCatalog::new(self.parts.iter().cloned())
    }

    /// Validate the settings and start an empty session.
    pub fn build_session(&self) -> Result<CalibrationSession, ConfigError> {
        let session = CalibrationSession::new(self.build_catalog()?)
            .with_physical_width(self.physical_width)?
            .with_calibration_order_check(self.validate_calibration_order);
        Ok(session)
    }
}
