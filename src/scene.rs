//! Scene presets: every per-scene number as data.
//!
//! The three built-in scenes differ only in the values held here; they
//! share one kernel and one projection. Presets can also be loaded from
//! TOML, where missing keys fall back to the shape-shifter preset:
//!
//! ```toml
//! name = "knots"
//! shapes = [
//!     { kind = "torus_knot", radius = 1.2, tube = 0.4 },
//!     { kind = "sphere", radius = 1.5 },
//! ]
//! base_opacity = 0.8
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::capability::{DeviceClass, GridSegments, ParticleSource, RingSegments, SettingsBundle};
use crate::error::ConfigError;
use crate::geometry::{Mesh, Shape};
use crate::responsive::ResponsiveCurve;
use crate::ShaderUniforms;

/// Closed interval sampled per particle with `lerp(min, max, rand)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }
}

/// Start and end color of a shape's lifetime gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub start: Vec3,
    pub end: Vec3,
}

impl Palette {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }
}

/// Parse `#rgb` or `#rrggbb` into linear 0..1 components.
pub fn hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.trim_start_matches('#');
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
    match digits.len() {
        3 => {
            let mut out = [0.0; 3];
            for (i, c) in digits.chars().enumerate() {
                let v = c.to_digit(16)? as f32;
                out[i] = (v * 16.0 + v) / 255.0;
            }
            Some(Vec3::from_array(out))
        }
        6 => Some(Vec3::new(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        )),
        _ => None,
    }
}

fn color(hex: &str) -> Vec3 {
    hex_color(hex).unwrap_or(Vec3::ONE)
}

/// Where particles start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpawnMode {
    /// Uniform in `[min, max]` per axis, plus `offset`; the scene forms
    /// from a scattered cloud.
    Scatter { min: f32, max: f32, offset: Vec3 },
    /// Start on the target field.
    OnTarget,
}

/// Shape-seeking speeds and thresholds, initial vs rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekParams {
    pub initial_speed: f32,
    pub rebuild_speed: f32,
    pub initial_threshold: f32,
    pub rebuild_threshold: f32,
    pub snap_distance: f32,
    pub far_threshold: f32,
    pub rebuild_far_threshold: f32,
    pub initial_extra_pull: f32,
    pub rebuild_extra_pull: f32,
    pub initial_multiplier: f32,
    pub rebuild_multiplier: f32,
}

impl Default for SeekParams {
    fn default() -> Self {
        // Constant per-frame step, no extra pull.
        Self {
            initial_speed: 60.0,
            rebuild_speed: 60.0,
            initial_threshold: 0.01,
            rebuild_threshold: 0.01,
            snap_distance: 0.0,
            far_threshold: 1.0e9,
            rebuild_far_threshold: 1.0e9,
            initial_extra_pull: 0.0,
            rebuild_extra_pull: 0.0,
            initial_multiplier: 0.0,
            rebuild_multiplier: 0.0,
        }
    }
}

impl SeekParams {
    /// Seeking disabled: particles stay where they spawn.
    pub fn still() -> Self {
        Self {
            initial_speed: 0.0,
            rebuild_speed: 0.0,
            ..Self::default()
        }
    }
}

/// Complete description of one particle scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub name: String,
    /// Which settings-bundle count sizes the scene.
    pub source: ParticleSource,
    /// Extra density on mobile-width viewports.
    pub mobile_count_multiplier: f32,
    pub responsive: ResponsiveCurve,

    pub shapes: Vec<Shape>,
    /// One palette per shape, or empty to keep `start_color`/`end_color`.
    pub palettes: Vec<Palette>,
    /// Added to every sampled target.
    pub target_offset: Vec3,
    /// Added at render time only.
    pub scene_offset: Vec3,
    pub spawn: SpawnMode,
    /// Build progress before the choreographer's first build tween.
    pub initial_build_progress: f32,

    pub lifetime: ValueRange,
    pub speed_jitter: ValueRange,
    pub noise_speed: ValueRange,
    /// Blast speed range, `None` for scenes that never blast.
    pub blast_speed: Option<ValueRange>,
    pub seek: SeekParams,

    pub scale: ValueRange,
    pub base_opacity: f32,
    pub blast_opacity: f32,
    pub mask_outer: f32,
    pub mask_inner: f32,
    pub jitter: f32,
    pub start_color: Vec3,
    pub end_color: Vec3,

    pub pointer_radius: f32,
    pub pointer_strength: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::shape_shifter(DeviceClass::Desktop)
    }
}

impl SceneConfig {
    /// Scattered cloud that forms a sphere, blasts apart near the end of its
    /// region and rebuilds on the way back.
    pub fn sphere(class: DeviceClass) -> Self {
        let mobile = class.is_mobile();
        Self {
            name: "sphere".into(),
            source: ParticleSource::Sphere,
            mobile_count_multiplier: 1.4,
            responsive: ResponsiveCurve::Boost,
            shapes: vec![Shape::Sphere {
                radius: 3.5,
                min_segments: Some(if mobile {
                    GridSegments { width: 160, height: 80 }
                } else {
                    GridSegments { width: 180, height: 90 }
                }),
            }],
            palettes: Vec::new(),
            target_offset: Vec3::ZERO,
            scene_offset: Vec3::ZERO,
            spawn: SpawnMode::Scatter {
                min: -8.0,
                max: 8.0,
                offset: Vec3::ZERO,
            },
            initial_build_progress: 0.0,
            lifetime: ValueRange::new(0.1, 6.0),
            speed_jitter: ValueRange::new(1.0, 1.0),
            noise_speed: ValueRange::new(0.1, 0.5),
            blast_speed: Some(ValueRange::new(3.0, 8.0)),
            seek: if mobile {
                SeekParams {
                    initial_speed: 3.5,
                    rebuild_speed: 35.0,
                    initial_threshold: 0.008,
                    rebuild_threshold: 0.3,
                    snap_distance: 0.5,
                    far_threshold: 10.0,
                    rebuild_far_threshold: 3.0,
                    initial_extra_pull: 8.0,
                    rebuild_extra_pull: 70.0,
                    initial_multiplier: 16.0,
                    rebuild_multiplier: 150.0,
                }
            } else {
                SeekParams {
                    initial_speed: 2.0,
                    rebuild_speed: 20.0,
                    initial_threshold: 0.005,
                    rebuild_threshold: 0.2,
                    snap_distance: 0.3,
                    far_threshold: 12.0,
                    rebuild_far_threshold: 3.0,
                    initial_extra_pull: 6.0,
                    rebuild_extra_pull: 50.0,
                    initial_multiplier: 12.0,
                    rebuild_multiplier: 100.0,
                }
            },
            scale: if mobile {
                ValueRange::new(0.002, 0.016)
            } else {
                ValueRange::new(0.001, 0.012)
            },
            base_opacity: if mobile { 0.75 * 1.25 } else { 0.6 },
            blast_opacity: 0.35,
            mask_outer: if mobile { 0.52 } else { 0.5 },
            mask_inner: if mobile { 0.45 } else { 0.47 },
            jitter: if mobile { 0.0003 } else { 0.0008 },
            start_color: color("#D1E40F"),
            end_color: color("#FF6B1A"),
            pointer_radius: 0.0,
            pointer_strength: 0.0,
        }
    }

    /// Static torus cloud that only breathes with noise.
    pub fn torus(class: DeviceClass) -> Self {
        let mobile = class.is_mobile();
        Self {
            name: "torus".into(),
            source: ParticleSource::Torus,
            mobile_count_multiplier: 1.0,
            responsive: ResponsiveCurve::Boost,
            shapes: vec![Shape::Torus {
                radius: 2.5,
                tube: 0.8,
                min_segments: Some(if mobile {
                    RingSegments { radial: 32, tubular: 80 }
                } else {
                    RingSegments { radial: 40, tubular: 100 }
                }),
            }],
            palettes: Vec::new(),
            target_offset: Vec3::new(0.0, 0.0, 5.0),
            scene_offset: if mobile {
                Vec3::new(0.0, 1.4, 2.2)
            } else {
                Vec3::new(0.0, 0.8, 0.0)
            },
            spawn: SpawnMode::OnTarget,
            initial_build_progress: 1.0,
            lifetime: ValueRange::new(0.1, 6.0),
            speed_jitter: ValueRange::new(1.0, 1.0),
            noise_speed: ValueRange::new(0.1, 0.5),
            blast_speed: None,
            seek: SeekParams::still(),
            scale: if mobile {
                ValueRange::new(0.002, 0.016)
            } else {
                ValueRange::new(0.001, 0.012)
            },
            base_opacity: if mobile { 0.75 * 1.25 } else { 0.6 },
            blast_opacity: 0.35,
            mask_outer: if mobile { 0.52 } else { 0.5 },
            mask_inner: if mobile { 0.45 } else { 0.47 },
            jitter: if mobile { 0.0003 } else { 0.0008 },
            start_color: color("#FF6B1A"),
            end_color: color("#D1E40F"),
            pointer_radius: 0.0,
            pointer_strength: 0.0,
        }
    }

    /// Cloud that morphs through a list of shapes as its region scrolls and
    /// reacts to the pointer.
    pub fn shape_shifter(class: DeviceClass) -> Self {
        let y_offset = if class.is_mobile() { -0.25 } else { -0.15 };
        let palette = Palette::new(color("#ffffff"), color("#ffaa44"));
        let shapes = vec![
            Shape::RotatedBox { size: 2.0 },
            Shape::Torus {
                radius: 1.2,
                tube: 0.4,
                min_segments: None,
            },
            Shape::Box { size: 2.0 },
            Shape::Sphere {
                radius: 1.5,
                min_segments: None,
            },
            Shape::Cone {
                radius: 1.2,
                height: 2.5,
            },
        ];
        Self {
            name: "shape-shifter".into(),
            source: ParticleSource::Gpgpu,
            mobile_count_multiplier: 1.0,
            responsive: ResponsiveCurve::Dense,
            palettes: vec![palette; shapes.len()],
            shapes,
            target_offset: Vec3::new(0.0, y_offset, 0.0),
            scene_offset: Vec3::ZERO,
            spawn: SpawnMode::Scatter {
                min: -3.0,
                max: 3.0,
                offset: Vec3::new(0.0, y_offset, 0.0),
            },
            initial_build_progress: 1.0,
            lifetime: ValueRange::new(0.1, 6.0),
            speed_jitter: ValueRange::new(0.01, 0.05),
            noise_speed: ValueRange::new(0.1, 0.5),
            blast_speed: None,
            seek: SeekParams::default(),
            scale: ValueRange::new(0.005, 0.02),
            base_opacity: 0.6,
            blast_opacity: 0.35,
            mask_outer: 0.5,
            mask_inner: 0.49,
            jitter: 0.0,
            start_color: palette.start,
            end_color: palette.end,
            pointer_radius: 1.5,
            pointer_strength: 100.0,
        }
    }

    /// Parse a TOML preset and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML preset from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shapes.is_empty() {
            return Err(ConfigError::Invalid(format!("scene '{}' has no shapes", self.name)));
        }
        if !self.palettes.is_empty() && self.palettes.len() != self.shapes.len() {
            return Err(ConfigError::Invalid(format!(
                "scene '{}' has {} palettes for {} shapes",
                self.name,
                self.palettes.len(),
                self.shapes.len()
            )));
        }
        if self.lifetime.min <= 0.0 || self.lifetime.max < self.lifetime.min {
            return Err(ConfigError::Invalid(format!(
                "lifetime range [{}, {}] must be positive and ordered",
                self.lifetime.min, self.lifetime.max
            )));
        }
        if self.mobile_count_multiplier <= 0.0 {
            return Err(ConfigError::Invalid("mobile_count_multiplier must be positive".into()));
        }
        if self.mask_outer == self.mask_inner {
            return Err(ConfigError::Invalid("sprite mask edges must differ".into()));
        }
        Ok(())
    }

    /// Particle count for this scene under a settings bundle.
    pub fn particle_count(&self, settings: &SettingsBundle, mobile: bool) -> u32 {
        let base = settings.particle_count(self.source) as f32;
        if mobile {
            (base * self.mobile_count_multiplier).floor() as u32
        } else {
            base as u32
        }
    }

    /// Source meshes at the bundle's subdivision.
    pub fn meshes(&self, settings: &SettingsBundle) -> Vec<Mesh> {
        self.shapes.iter().map(|s| s.mesh(settings)).collect()
    }

    /// Palette of shape `index`, falling back to the scene colors.
    pub fn palette(&self, index: usize) -> Palette {
        self.palettes
            .get(index)
            .copied()
            .unwrap_or(Palette::new(self.start_color, self.end_color))
    }

    /// Flatten the constants the kernels read into one uniform block.
    pub fn kernel_params(&self) -> KernelParams {
        let (spawn_on_target, spawn_min, spawn_max, spawn_offset) = match self.spawn {
            SpawnMode::Scatter { min, max, offset } => (false, min, max, offset),
            SpawnMode::OnTarget => (true, 0.0, 0.0, Vec3::ZERO),
        };
        let blast = self.blast_speed.unwrap_or(ValueRange::new(0.0, 0.0));
        KernelParams {
            spawn_offset,
            spawn_min,
            spawn_max,
            spawn_on_target,
            blast_enabled: self.blast_speed.is_some(),
            scene_offset: self.scene_offset,
            lifetime_min: self.lifetime.min,
            lifetime_max: self.lifetime.max,
            jitter_min: self.speed_jitter.min,
            jitter_max: self.speed_jitter.max,
            noise_min: self.noise_speed.min,
            noise_max: self.noise_speed.max,
            blast_min: blast.min,
            blast_max: blast.max,
            initial_speed: self.seek.initial_speed,
            rebuild_speed: self.seek.rebuild_speed,
            initial_threshold: self.seek.initial_threshold,
            rebuild_threshold: self.seek.rebuild_threshold,
            snap_distance: self.seek.snap_distance,
            far_threshold: self.seek.far_threshold,
            rebuild_far_threshold: self.seek.rebuild_far_threshold,
            initial_extra_pull: self.seek.initial_extra_pull,
            rebuild_extra_pull: self.seek.rebuild_extra_pull,
            initial_multiplier: self.seek.initial_multiplier,
            rebuild_multiplier: self.seek.rebuild_multiplier,
            scale_min: self.scale.min,
            scale_max: self.scale.max,
            base_opacity: self.base_opacity,
            blast_opacity: self.blast_opacity,
            mask_outer: self.mask_outer,
            mask_inner: self.mask_inner,
            jitter: self.jitter,
        }
    }
}

/// Scene constants as the kernels see them.
#[derive(ShaderUniforms, Clone, Copy, Debug, PartialEq)]
pub struct KernelParams {
    pub spawn_offset: Vec3,
    pub spawn_min: f32,
    pub scene_offset: Vec3,
    pub spawn_max: f32,
    pub spawn_on_target: bool,
    pub blast_enabled: bool,
    pub lifetime_min: f32,
    pub lifetime_max: f32,
    pub jitter_min: f32,
    pub jitter_max: f32,
    pub noise_min: f32,
    pub noise_max: f32,
    pub blast_min: f32,
    pub blast_max: f32,
    pub initial_speed: f32,
    pub rebuild_speed: f32,
    pub initial_threshold: f32,
    pub rebuild_threshold: f32,
    pub snap_distance: f32,
    pub far_threshold: f32,
    pub rebuild_far_threshold: f32,
    pub initial_extra_pull: f32,
    pub rebuild_extra_pull: f32,
    pub initial_multiplier: f32,
    pub rebuild_multiplier: f32,
    pub scale_min: f32,
    pub scale_max: f32,
    pub base_opacity: f32,
    pub blast_opacity: f32,
    pub mask_outer: f32,
    pub mask_inner: f32,
    pub jitter: f32,
}

/// Guards that must all hold before a rebuild fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RebuildGuards {
    /// Minimum progress change that updates the scroll direction.
    pub direction_threshold: f32,
    /// Distance below the blast start required before rebuilding.
    pub buffer_zone: f32,
    /// Seconds between rebuilds.
    pub min_interval: f32,
    /// Largest per-update progress change that may trigger a rebuild.
    pub velocity_cap: Option<f32>,
}

impl RebuildGuards {
    pub fn for_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Desktop => Self {
                direction_threshold: 0.001,
                buffer_zone: 0.05,
                min_interval: 0.5,
                velocity_cap: None,
            },
            DeviceClass::Mobile => Self {
                direction_threshold: 0.0015,
                buffer_zone: 0.06,
                min_interval: 1.0,
                velocity_cap: None,
            },
            DeviceClass::IPhone => Self {
                direction_threshold: 0.005,
                buffer_zone: 0.10,
                min_interval: 2.0,
                velocity_cap: Some(0.01),
            },
        }
    }
}

/// Scroll thresholds and timings for one scene's choreographer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreographyConfig {
    pub blast_start: f32,
    pub blast_active: f32,
    pub blast_complete: f32,
    pub reset_point: f32,
    /// Seconds between a full reset and the restarted build tween.
    pub reset_delay: f32,
    /// Seconds between mount and the first build tween.
    pub build_delay: f32,
    pub build_duration: f32,
    pub rebuild_duration: f32,
    /// Seconds the rebuild flag stays up after its tween.
    pub rebuild_hold: f32,
    pub guards: RebuildGuards,
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self::for_class(DeviceClass::Desktop)
    }
}

impl ChoreographyConfig {
    pub fn for_class(class: DeviceClass) -> Self {
        let mobile = class.is_mobile();
        Self {
            blast_start: if mobile { 0.85 } else { 0.88 },
            blast_active: if mobile { 0.92 } else { 0.95 },
            blast_complete: if mobile { 0.98 } else { 0.99 },
            reset_point: 0.05,
            reset_delay: 0.1,
            build_delay: 0.3,
            build_duration: if mobile { 1.2 } else { 2.0 },
            rebuild_duration: if mobile { 0.1 } else { 0.2 },
            rebuild_hold: 1.0,
            guards: RebuildGuards::for_class(class),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        if !(config.blast_start < config.blast_complete && config.blast_complete <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "blast_start {} must be below blast_complete {} <= 1",
                config.blast_start, config.blast_complete
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Tier;

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#fff"), Some(Vec3::ONE));
        let c = hex_color("#FF6B1A").unwrap();
        assert!((c.x - 1.0).abs() < 1e-6);
        assert!((c.y - 107.0 / 255.0).abs() < 1e-6);
        assert_eq!(hex_color("#12"), None);
        assert_eq!(hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_presets_validate() {
        for class in [DeviceClass::Desktop, DeviceClass::Mobile, DeviceClass::IPhone] {
            SceneConfig::sphere(class).validate().unwrap();
            SceneConfig::torus(class).validate().unwrap();
            SceneConfig::shape_shifter(class).validate().unwrap();
        }
    }

    #[test]
    fn test_sphere_mobile_multiplier() {
        let settings = SettingsBundle::for_tier(Tier::Low, true);
        let sphere = SceneConfig::sphere(DeviceClass::Mobile);
        assert_eq!(sphere.particle_count(&settings, false), 50_000);
        assert_eq!(sphere.particle_count(&settings, true), 70_000);
        let torus = SceneConfig::torus(DeviceClass::Mobile);
        assert_eq!(torus.particle_count(&settings, true), 30_000);
    }

    #[test]
    fn test_toml_override_keeps_defaults() {
        let text = r#"
name = "knots"
base_opacity = 0.8
shapes = [{ kind = "torus_knot", radius = 1.2, tube = 0.4 }]
palettes = []

[seek]
initial_speed = 30.0
"#;
        let config = SceneConfig::from_toml_str(text).unwrap();
        assert_eq!(config.name, "knots");
        assert_eq!(config.shapes.len(), 1);
        assert_eq!(config.base_opacity, 0.8);
        assert_eq!(config.seek.initial_speed, 30.0);
        assert_eq!(config.seek.initial_threshold, 0.01);
        assert_eq!(config.mask_inner, 0.49);
    }

    #[test]
    fn test_palette_count_mismatch_rejected() {
        let text = r#"shapes = [{ kind = "box", size = 2.0 }]"#;
        let err = SceneConfig::from_toml_str(text).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_empty_shapes_rejected() {
        let err = SceneConfig::from_toml_str("shapes = []\npalettes = []").unwrap_err();
        assert!(err.to_string().contains("no shapes"));
    }

    #[test]
    fn test_kernel_params_layout() {
        assert_eq!(
            std::mem::size_of::<KernelParamsGpu>(),
            KernelParams::SIZE as usize
        );
        let params = SceneConfig::torus(DeviceClass::Desktop).kernel_params();
        assert!(params.spawn_on_target);
        assert!(!params.blast_enabled);
        let gpu = params.to_gpu();
        assert_eq!(gpu.spawn_on_target, 1);
    }

    #[test]
    fn test_choreography_presets() {
        let iphone = ChoreographyConfig::for_class(DeviceClass::IPhone);
        assert_eq!(iphone.blast_start, 0.85);
        assert_eq!(iphone.guards.min_interval, 2.0);
        assert_eq!(iphone.guards.velocity_cap, Some(0.01));
        let desktop = ChoreographyConfig::default();
        assert_eq!(desktop.guards.buffer_zone, 0.05);
        assert_eq!(desktop.build_duration, 2.0);
    }

    #[test]
    fn test_choreography_toml_validation() {
        assert!(ChoreographyConfig::from_toml_str("blast_start = 0.99\nblast_complete = 0.9").is_err());
        let config = ChoreographyConfig::from_toml_str("rebuild_hold = 0.5").unwrap();
        assert_eq!(config.rebuild_hold, 0.5);
    }
}
