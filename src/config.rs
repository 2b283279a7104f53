use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_fixed_hz")]
    pub fixed_hz: f32,
    #[serde(default = "RuntimeConfig::default_max_frame_time")]
    pub max_frame_time: f32,
    #[serde(default = "RuntimeConfig::default_gravity")]
    pub gravity: [f32; 2],
    #[serde(default = "RuntimeConfig::default_spatial_cell")]
    pub spatial_cell: f32,
    #[serde(default = "RuntimeConfig::default_correction_factor")]
    pub correction_factor: f32,
    #[serde(default)]
    pub scripts_dir: Option<String>,
    #[serde(default)]
    pub prefabs_dir: Option<String>,
}

impl RuntimeConfig {
    const fn default_fixed_hz() -> f32 {
        60.0
    }
    const fn default_max_frame_time() -> f32 {
        0.25
    }
    // World units are pixels, Y-down; 980 px/s^2 reads as ordinary gravity
    // at the scene scale the editor authors in.
    const fn default_gravity() -> [f32; 2] {
        [0.0, 980.0]
    }
    const fn default_spatial_cell() -> f32 {
        64.0
    }
    // Positional correction overshoots by 1% so float error can't re-sink
    // a resolved body on the next step.
    const fn default_correction_factor() -> f32 {
        1.01
    }

    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.fixed_hz.max(1.0)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Reading config file {}", path.display()))?;
        let config: RuntimeConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("Parsing config file {}", path.display()))?;
        Ok(config)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fixed_hz: Self::default_fixed_hz(),
            max_frame_time: Self::default_max_frame_time(),
            gravity: Self::default_gravity(),
            spatial_cell: Self::default_spatial_cell(),
            correction_factor: Self::default_correction_factor(),
            scripts_dir: None,
            prefabs_dir: None,
        }
    }
}

/// CLI-sourced overrides applied on top of a loaded config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub fixed_hz: Option<f32>,
    pub max_frame_time: Option<f32>,
}

impl RuntimeConfig {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(hz) = overrides.fixed_hz {
            self.fixed_hz = hz;
        }
        if let Some(clamp) = overrides.max_frame_time {
            self.max_frame_time = clamp;
        }
    }
}
