//! Device capability profiling.
//!
//! [`detect`] turns a [`HostSnapshot`] into a [`CapabilityProfile`]: a
//! discrete [`Tier`] plus the [`SettingsBundle`] that sizes every scene.
//! The profile is computed once at startup and handed to whatever needs it;
//! there is no global profile.
//!
//! ```ignore
//! let snapshot = HostSnapshot::probe(&adapter, window_width, scale_factor);
//! let profile = capability::detect(&snapshot);
//! let count = profile.settings.particle_count(ParticleSource::Sphere);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete performance class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Bucket a capability score.
    pub fn from_score(score: i32) -> Self {
        if score >= 6 {
            Tier::High
        } else if score >= 3 {
            Tier::Medium
        } else {
            Tier::Low
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Low => write!(f, "low"),
            Tier::Medium => write!(f, "medium"),
            Tier::High => write!(f, "high"),
        }
    }
}

/// Coarse network class, when the host exposes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkClass {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    Cellular2g,
    #[serde(rename = "3g")]
    Cellular3g,
    #[serde(rename = "4g")]
    Cellular4g,
}

impl NetworkClass {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Some(NetworkClass::Slow2g),
            "2g" => Some(NetworkClass::Cellular2g),
            "3g" => Some(NetworkClass::Cellular3g),
            "4g" => Some(NetworkClass::Cellular4g),
            _ => None,
        }
    }
}

/// Device class used to pick tuned preset numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
    IPhone,
}

impl DeviceClass {
    pub fn is_mobile(self) -> bool {
        !matches!(self, DeviceClass::Desktop)
    }
}

/// Everything the profiler looks at, captured once.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSnapshot {
    /// Whether a GPU context could be created at all.
    pub gpu_available: bool,
    /// Adapter / renderer name.
    pub renderer: String,
    /// Set when the adapter reports itself as an integrated GPU.
    pub integrated_gpu_hint: bool,
    pub max_texture_size: u32,
    pub logical_cores: u32,
    pub memory_gb: Option<f32>,
    /// Platform signal string (user agent on the web, OS/arch natively).
    pub user_agent: String,
    pub viewport_width: f32,
    pub device_pixel_ratio: f32,
    pub touch: bool,
    pub network: Option<NetworkClass>,
}

impl Default for HostSnapshot {
    fn default() -> Self {
        Self {
            gpu_available: true,
            renderer: String::new(),
            integrated_gpu_hint: false,
            max_texture_size: 8192,
            logical_cores: 4,
            memory_gb: None,
            user_agent: String::new(),
            viewport_width: 1280.0,
            device_pixel_ratio: 1.0,
            touch: false,
            network: None,
        }
    }
}

impl HostSnapshot {
    /// Snapshot for a host where no GPU context could be created.
    pub fn without_gpu() -> Self {
        Self {
            gpu_available: false,
            max_texture_size: 0,
            ..Self::default()
        }
    }

    /// Build a snapshot from a live adapter and the window metrics.
    pub fn probe(adapter: &wgpu::Adapter, viewport_width: f32, device_pixel_ratio: f32) -> Self {
        let info = adapter.get_info();
        let limits = adapter.limits();
        let logical_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        Self {
            gpu_available: true,
            renderer: info.name.clone(),
            integrated_gpu_hint: info.device_type == wgpu::DeviceType::IntegratedGpu,
            max_texture_size: limits.max_texture_dimension_2d,
            logical_cores,
            memory_gb: None,
            user_agent: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            viewport_width,
            device_pixel_ratio,
            touch: false,
            network: None,
        }
    }

    pub fn is_mobile(&self) -> bool {
        let ua = self.user_agent.to_ascii_lowercase();
        ["mobile", "android", "iphone", "ipad", "touch", "tablet"]
            .iter()
            .any(|s| ua.contains(s))
            || self.viewport_width <= 768.0
            || self.touch
    }

    pub fn is_iphone(&self) -> bool {
        self.user_agent.to_ascii_lowercase().contains("iphone")
    }

    pub fn is_low_end_mobile(&self) -> bool {
        if !self.is_mobile() {
            return false;
        }
        let ua = self.user_agent.to_ascii_lowercase();
        let old_android = after(&ua, "android ")
            .and_then(|version| version.split(['.', ';', ')']).next())
            .and_then(|major| major.trim().parse::<u32>().ok())
            .is_some_and(|major| major <= 5);
        let old_ios = after(&ua, "iphone")
            .and_then(|rest| after(rest, " os "))
            .and_then(|version| version.split('_').next())
            .and_then(|major| major.trim().parse::<u32>().ok())
            .is_some_and(|major| (6..=9).contains(&major));
        old_android
            || old_ios
            || self.logical_cores <= 2
            || self.memory_gb.is_some_and(|gb| gb <= 2.0)
    }

    pub fn is_integrated_gpu(&self) -> bool {
        let renderer = self.renderer.to_ascii_lowercase();
        self.integrated_gpu_hint
            || ["intel", "adreno", "mali", "powervr"]
                .iter()
                .any(|s| renderer.contains(s))
    }

    pub fn device_class(&self) -> DeviceClass {
        if self.is_iphone() {
            DeviceClass::IPhone
        } else if self.is_mobile() {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

fn after<'a>(hay: &'a str, needle: &str) -> Option<&'a str> {
    hay.find(needle).map(|i| &hay[i + needle.len()..])
}

/// Compute the capability score and the reason for every contribution.
pub fn score(snapshot: &HostSnapshot) -> (i32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();

    let cores = match snapshot.logical_cores {
        n if n >= 8 => 3,
        n if n >= 4 => 2,
        n if n >= 2 => 1,
        _ => 0,
    };
    score += cores;
    reasons.push(format!("cores {}: +{}", snapshot.logical_cores, cores));

    if let Some(gb) = snapshot.memory_gb {
        let memory = if gb >= 8.0 {
            3
        } else if gb >= 4.0 {
            2
        } else if gb >= 2.0 {
            1
        } else {
            0
        };
        score += memory;
        reasons.push(format!("memory {gb}GB: +{memory}"));
    }

    let texture = match snapshot.max_texture_size {
        n if n >= 16384 => 2,
        n if n >= 8192 => 1,
        _ => 0,
    };
    score += texture;
    reasons.push(format!("max texture {}: +{}", snapshot.max_texture_size, texture));

    if snapshot.is_mobile() {
        score -= 2;
        reasons.push("mobile: -2".to_string());
    }
    if snapshot.is_low_end_mobile() {
        score -= 2;
        reasons.push("low-end mobile: -2".to_string());
    }
    if snapshot.is_integrated_gpu() {
        score -= 1;
        reasons.push("integrated gpu: -1".to_string());
    }

    match snapshot.network {
        Some(NetworkClass::Slow2g) | Some(NetworkClass::Cellular2g) => {
            score -= 2;
            reasons.push("slow network: -2".to_string());
        }
        Some(NetworkClass::Cellular3g) => {
            score -= 1;
            reasons.push("3g network: -1".to_string());
        }
        _ => {}
    }

    (score, reasons)
}

/// Which per-scene particle count a scene draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleSource {
    Sphere,
    Torus,
    Gpgpu,
}

/// Width x height subdivisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSegments {
    pub width: u32,
    pub height: u32,
}

/// Radial x tubular subdivisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSegments {
    pub radial: u32,
    pub tubular: u32,
}

/// Concrete settings selected for a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsBundle {
    pub sphere_particles: u32,
    pub torus_particles: u32,
    pub gpgpu_particles: u32,

    pub sphere_segments: GridSegments,
    pub torus_segments: RingSegments,
    pub torus_knot_segments: RingSegments,
    pub box_segments: u32,

    pub pixel_ratio_cap: f32,
    pub antialias: bool,
    pub shadow_map_size: u32,
    pub bloom: bool,
    pub post_processing: bool,

    pub scroll_smoothness: f32,
    pub frame_rate_target: u32,
    /// Texture and model quality level.
    pub quality: Tier,

    /// Set when no GPU is available; every particle count reads as zero.
    pub disabled: bool,
}

impl SettingsBundle {
    /// The fixed bundle for a tier, before any mobile adjustment.
    pub fn for_tier(tier: Tier, is_mobile: bool) -> Self {
        match tier {
            Tier::Low => Self {
                sphere_particles: 50_000,
                torus_particles: 30_000,
                gpgpu_particles: 8_000,
                sphere_segments: GridSegments { width: 64, height: 32 },
                torus_segments: RingSegments { radial: 16, tubular: 64 },
                torus_knot_segments: RingSegments { radial: 16, tubular: 64 },
                box_segments: 32,
                pixel_ratio_cap: 1.0,
                antialias: false,
                shadow_map_size: 512,
                bloom: false,
                post_processing: false,
                scroll_smoothness: if is_mobile { 0.3 } else { 0.5 },
                frame_rate_target: 30,
                quality: Tier::Low,
                disabled: false,
            },
            Tier::Medium => Self {
                sphere_particles: 200_000,
                torus_particles: 150_000,
                gpgpu_particles: 25_000,
                sphere_segments: GridSegments { width: 128, height: 64 },
                torus_segments: RingSegments { radial: 32, tubular: 128 },
                torus_knot_segments: RingSegments { radial: 32, tubular: 128 },
                box_segments: 64,
                pixel_ratio_cap: 1.5,
                antialias: true,
                shadow_map_size: 1024,
                bloom: true,
                post_processing: true,
                scroll_smoothness: if is_mobile { 0.6 } else { 0.8 },
                frame_rate_target: 60,
                quality: Tier::Medium,
                disabled: false,
            },
            Tier::High => Self {
                sphere_particles: 400_000,
                torus_particles: 300_000,
                gpgpu_particles: 40_000,
                sphere_segments: GridSegments { width: 256, height: 128 },
                torus_segments: RingSegments { radial: 64, tubular: 256 },
                torus_knot_segments: RingSegments { radial: 64, tubular: 256 },
                box_segments: 128,
                pixel_ratio_cap: 2.0,
                antialias: true,
                shadow_map_size: 2048,
                bloom: true,
                post_processing: true,
                scroll_smoothness: if is_mobile { 0.8 } else { 1.0 },
                frame_rate_target: 60,
                quality: Tier::High,
                disabled: false,
            },
        }
    }

    /// Mobile pass: keep most of the particles, buy back density with
    /// finer geometry.
    pub fn adjust_for_mobile(&mut self, tier: Tier) {
        self.sphere_particles = (self.sphere_particles as f32 * 0.9).floor() as u32;
        self.torus_particles = (self.torus_particles as f32 * 0.8).floor() as u32;
        self.gpgpu_particles = (self.gpgpu_particles as f32 * 0.8).floor() as u32;

        self.pixel_ratio_cap = self.pixel_ratio_cap.min(1.5);
        self.antialias = matches!(tier, Tier::High | Tier::Medium);

        let (min_w, min_h) = match tier {
            Tier::High => (180, 90),
            Tier::Medium => (160, 80),
            Tier::Low => (0, 0),
        };
        self.sphere_segments.width = self.sphere_segments.width.max(min_w);
        self.sphere_segments.height = self.sphere_segments.height.max(min_h);
    }

    /// Particle count for a scene, zero when disabled.
    pub fn particle_count(&self, source: ParticleSource) -> u32 {
        if self.disabled {
            return 0;
        }
        match source {
            ParticleSource::Sphere => self.sphere_particles,
            ParticleSource::Torus => self.torus_particles,
            ParticleSource::Gpgpu => self.gpgpu_particles,
        }
    }

    /// Effective device pixel ratio under this bundle's cap.
    pub fn pixel_ratio(&self, device_pixel_ratio: f32) -> f32 {
        device_pixel_ratio.min(self.pixel_ratio_cap)
    }
}

/// Immutable result of capability detection.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityProfile {
    pub tier: Tier,
    pub score: i32,
    pub reasons: Vec<String>,
    pub is_mobile: bool,
    pub device_class: DeviceClass,
    pub settings: SettingsBundle,
}

impl CapabilityProfile {
    /// Whether scenes should be built at all.
    pub fn enabled(&self) -> bool {
        !self.settings.disabled
    }
}

/// Score the host and pick its tier and settings.
pub fn detect(snapshot: &HostSnapshot) -> CapabilityProfile {
    let is_mobile = snapshot.is_mobile();
    let device_class = snapshot.device_class();

    if !snapshot.gpu_available {
        let mut settings = SettingsBundle::for_tier(Tier::Low, is_mobile);
        settings.disabled = true;
        log::error!("No GPU context available, decorative particles disabled");
        return CapabilityProfile {
            tier: Tier::Low,
            score: 0,
            reasons: vec!["no gpu context".to_string()],
            is_mobile,
            device_class,
            settings,
        };
    }

    let (score, reasons) = score(snapshot);
    let tier = Tier::from_score(score);

    let mut settings = SettingsBundle::for_tier(tier, is_mobile);
    if is_mobile {
        settings.adjust_for_mobile(tier);
    }

    log::info!(
        "Capability tier {} (score {}) for '{}': {}",
        tier,
        score,
        snapshot.renderer,
        reasons.join(", ")
    );

    CapabilityProfile {
        tier,
        score,
        reasons,
        is_mobile,
        device_class,
        settings,
    }
}
