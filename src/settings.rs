//! Runtime settings
//!
//! Read from a JSON file by the host. Every field has a default, so a
//! settings file only needs the keys it wants to change.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::Viewport;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum simultaneous visual effects (and damage texts) for this preset
    pub fn max_effects(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }
}

/// How the fire aura's per-tick burn chance relates to frame time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuraTiming {
    /// One roll per tick; higher frame rates burn more often
    #[default]
    PerTick,
    /// Roll probability scaled by frame time against a 60 Hz reference
    FrameRateIndependent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub default_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Fraction of the remaining zoom distance closed per tick
    pub zoom_speed: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            default_zoom: 0.65,
            min_zoom: 0.4,
            max_zoom: 1.5,
            zoom_speed: 0.05,
        }
    }
}

/// Game settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Window size the host renders at
    pub viewport: Viewport,
    /// Run seed; a random one is drawn when absent
    pub seed: Option<u64>,
    pub camera: CameraSettings,
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Particle and damage-text effects
    pub effects: bool,
    pub aura_timing: AuraTiming,
    /// Upgrades offered per level-up
    pub upgrade_choices: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            seed: None,
            camera: CameraSettings::default(),
            quality: QualityPreset::Medium,
            effects: true,
            aura_timing: AuraTiming::PerTick,
            upgrade_choices: 3,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective visual effect cap
    pub fn max_effects(&self) -> usize {
        if !self.effects {
            0
        } else {
            self.quality.max_effects()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&json)?;
        log::info!(
            "Loaded settings from {} ({} quality)",
            path.as_ref().display(),
            settings.quality.as_str()
        );
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("{err}; using default settings");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_round_trip() {
        for preset in [QualityPreset::Low, QualityPreset::Medium, QualityPreset::High] {
            assert_eq!(QualityPreset::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(QualityPreset::from_str("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::from_str("ultra"), None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "quality": "High", "seed": 42 }"#).expect("parse");
        assert_eq!(settings.quality, QualityPreset::High);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.upgrade_choices, 3);
        assert_eq!(settings.viewport, Viewport::new(800.0, 600.0));
        assert_eq!(settings.camera, CameraSettings::default());
        assert_eq!(settings.max_effects(), 2000);
    }

    #[test]
    fn test_effects_off_caps_at_zero() {
        let settings = Settings {
            effects: false,
            ..Settings::from_preset(QualityPreset::High)
        };
        assert_eq!(settings.max_effects(), 0);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            Settings::from_json("{ quality: "),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default("/definitely/not/here/settings.json");
        assert_eq!(settings.quality, QualityPreset::Medium);
        assert!(matches!(
            Settings::load("/definitely/not/here/settings.json"),
            Err(SettingsError::Io(_))
        ));
    }
}
