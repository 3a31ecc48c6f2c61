//! Persistent application settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Shader-facing controls exposed in the side panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Internal bounce budget (1-10).
    pub bounces: u32,
    /// Index of refraction (1-5).
    pub ior: f32,
    /// Per-channel IOR spread when chromatic aberration is on (0-1).
    pub aberration_strength: f32,
    /// Gradient-aware environment lookups for correct mip selection.
    pub correct_mips: bool,
    pub chromatic_aberration: bool,
    /// Tone-mapping exposure.
    pub exposure: f32,
    /// Draw the environment as background instead of the flat color.
    pub show_sky: bool,
    pub background_color: [f32; 4],
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            bounces: 3,
            ior: 2.4,
            aberration_strength: 0.01,
            correct_mips: true,
            chromatic_aberration: true,
            exposure: 1.0,
            show_sky: false,
            background_color: [0.133, 0.133, 0.133, 1.0],
        }
    }
}

impl EffectSettings {
    /// Clamp all values into their UI ranges.
    pub fn clamp(&mut self) {
        self.bounces = self.bounces.clamp(1, 10);
        self.ior = self.ior.clamp(1.0, 5.0);
        self.aberration_strength = self.aberration_strength.clamp(0.0, 1.0);
        self.exposure = self.exposure.clamp(0.1, 10.0);
        for c in &mut self.background_color {
            *c = c.clamp(0.0, 1.0);
        }
    }
}

/// Application settings that persist between sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub effect: EffectSettings,

    // Window
    pub window_width: f32,
    pub window_height: f32,
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,

    // Camera
    pub camera_distance: f32,
    pub camera_yaw: f32,
    pub camera_pitch: f32,

    // Anti-aliasing sample count (requires restart); 1 enables the FXAA pass
    pub antialiasing: u8,

    // Last explicitly opened mesh
    pub last_mesh: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            effect: EffectSettings::default(),
            window_width: 1280.0,
            window_height: 720.0,
            window_x: None,
            window_y: None,
            camera_distance: 92.0,
            camera_yaw: 65.0,
            camera_pitch: -50.0,
            antialiasing: 4,
            last_mesh: None,
        }
    }
}

impl Settings {
    /// Get settings file path
    fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("gemview");
            std::fs::create_dir_all(&p).ok();
            p.push("settings.json");
            p
        })
    }

    /// Load settings from file
    pub fn load() -> Self {
        let mut settings: Self = Self::path()
            .and_then(|p| std::fs::read_to_string(&p).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        if !matches!(settings.antialiasing, 1 | 2 | 4 | 8) {
            settings.antialiasing = 4;
        }
        settings.effect.clamp();

        settings
    }

    /// Save settings to file
    pub fn save(&self) {
        if let Some(path) = Self::path() {
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = std::fs::write(path, json);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_round_trip() {
        let mut settings = Settings::default();
        settings.effect.bounces = 7;
        settings.effect.chromatic_aberration = false;
        settings.camera_distance = 42.0;

        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.effect.bounces, 7);
        assert!(!back.effect.chromatic_aberration);
        assert_eq!(back.camera_distance, 42.0);
    }

    #[test]
    fn unknown_fields_fall_back_to_defaults() {
        let back: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(back.effect.bounces, 3);
        assert_eq!(back.antialiasing, 4);
    }

    #[test]
    fn clamp_pulls_values_into_range() {
        let mut fx = EffectSettings {
            bounces: 99,
            ior: 0.2,
            aberration_strength: 3.0,
            exposure: 100.0,
            ..Default::default()
        };
        fx.clamp();
        assert_eq!(fx.bounces, 10);
        assert_eq!(fx.ior, 1.0);
        assert_eq!(fx.aberration_strength, 1.0);
        assert_eq!(fx.exposure, 10.0);
    }
}
