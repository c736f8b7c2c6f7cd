//! # backdrop - scroll-choreographed particle backdrops
//!
//! GPU particle scenes meant to sit behind page content: a swarm assembles
//! into a shape, drifts around it, explodes outward as the viewer scrolls
//! past and re-forms when they scroll back.
//!
//! backdrop handles the GPU side (storage buffers, a target-position
//! texture, the init/update/render kernels) so a host only feeds it events.
//!
//! ## Quick Start
//!
//! ```ignore
//! use backdrop::prelude::*;
//!
//! let profile = backdrop::capability::detect(&HostSnapshot::without_gpu());
//! let scene = SceneConfig::sphere(profile.device_class);
//! let count = scene.particle_count(&profile.settings, profile.is_mobile);
//!
//! let mut choreographer =
//!     Choreographer::new(&scene, ChoreographyConfig::for_class(profile.device_class));
//! let mut sim = CpuSimulation::new(scene, &profile.settings, count, 42, CpuBackend::new());
//!
//! // Each frame:
//! choreographer.handle(SceneEvent::ScrollProgress { value: 0.9 });
//! choreographer.handle(SceneEvent::Tick { now: 1.0, dt: 1.0 / 60.0 });
//! sim.apply(&choreographer.take_update());
//! sim.step(1.0 / 60.0);
//! ```
//!
//! ## Core Concepts
//!
//! ### Capability profile
//!
//! [`capability::detect`] scores the host once and picks a [`Tier`] with a
//! [`SettingsBundle`] of particle counts and mesh resolutions. The lowest
//! tier disables the layer entirely.
//!
//! ### Target field
//!
//! Each particle owns a texel of a square [`TargetField`] holding its
//! destination on the current shape. Switching shapes re-samples the field
//! and the particles glide to their new targets.
//!
//! ### Control surface
//!
//! The kernels read one uniform block, [`ControlSurface`]. The
//! [`Choreographer`] turns scroll, region, pointer and resize events into
//! [`ControlUpdate`]s against it. Nothing else writes to it.
//!
//! ### Backends
//!
//! [`ParticleSimulation`] runs the kernels through a [`simulation::Backend`].
//! [`CpuBackend`] is the reference implementation used by the tests;
//! [`gpu::GpuBackend`] runs the same math as WGSL compute shaders.

pub mod buffers;
pub mod capability;
pub mod choreographer;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod input;
pub mod kernel;
pub mod noise;
pub mod projection;
pub mod responsive;
pub mod scene;
pub mod shader;
pub mod shader_utils;
pub mod simulation;
pub mod target_field;
pub mod time;
pub mod tween;
pub mod uniforms;
pub mod window;

// Lets the derive macro name `backdrop::ShaderUniforms` from inside this crate.
extern crate self as backdrop;

pub use backdrop_derive::ShaderUniforms;
pub use bytemuck;
pub use capability::{CapabilityProfile, DeviceClass, HostSnapshot, SettingsBundle, Tier};
pub use choreographer::{Choreographer, Phase, SceneEvent};
pub use error::{AppError, ConfigError, GpuError};
pub use glam::{Vec2, Vec3, Vec4};
pub use scene::{ChoreographyConfig, KernelParams, Palette, SceneConfig};
pub use simulation::{CpuBackend, CpuSimulation, ParticleSimulation};
pub use target_field::TargetField;
pub use uniforms::{ControlSurface, ControlUpdate, DisplacementMode};

/// Trait implemented by `#[derive(ShaderUniforms)]`.
///
/// Lays a plain struct out as a WGSL uniform block. Every field becomes a
/// scalar or vector in declaration order, with padding inserted so the Rust
/// mirror and the WGSL struct agree byte for byte.
///
/// # Example
///
/// ```ignore
/// #[derive(ShaderUniforms, Clone, Copy)]
/// struct Wind {
///     direction: Vec3,   // vec3<f32>, 16-byte aligned
///     strength: f32,     // packs into the vec3's padding
///     gusty: bool,       // u32 on the GPU
/// }
/// ```
pub trait ShaderUniforms {
    /// `#[repr(C)]` mirror uploaded to the uniform buffer.
    type Gpu: Copy + bytemuck::Pod + bytemuck::Zeroable;

    /// Struct name used in WGSL.
    const WGSL_NAME: &'static str;

    /// WGSL struct declaration matching [`Self::Gpu`].
    const WGSL_STRUCT: &'static str;

    /// Size of the block in bytes, a multiple of 16.
    const SIZE: u32;

    /// Byte offset of every named field.
    const FIELD_OFFSETS: &'static [(&'static str, u32)];

    fn to_gpu(&self) -> Self::Gpu;
}

/// Convenient re-exports for hosts.
pub mod prelude {
    pub use crate::capability::{
        CapabilityProfile, DeviceClass, HostSnapshot, SettingsBundle, Tier,
    };
    pub use crate::choreographer::{Choreographer, Phase, SceneEvent};
    pub use crate::geometry::Shape;
    pub use crate::input::{Input, KeyCode, PointerTracker};
    pub use crate::responsive::{ResizeDebouncer, Viewport};
    pub use crate::scene::{ChoreographyConfig, Palette, SceneConfig};
    pub use crate::simulation::{Backend, CpuBackend, CpuSimulation, ParticleSimulation};
    pub use crate::time::{PerformanceMonitor, Time};
    pub use crate::uniforms::{ControlSurface, ControlUpdate, DisplacementMode};
    pub use crate::ShaderUniforms;
    pub use crate::{Vec2, Vec3, Vec4};
}
