//! CPU reference of the sprite projection.
//!
//! Turns particle state into what the render shader draws: a camera-facing
//! disc per particle whose size shrinks and whose color shifts over its
//! lifetime, and which grows and fades while the scene is blasting.

use glam::{Vec2, Vec3};

use crate::buffers::ParticleBuffers;
use crate::noise::{channel, channels, mix, smoothstep};
use crate::scene::KernelParams;
use crate::uniforms::ControlSurface;

/// One drawable particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub position: Vec3,
    /// Edge length in world units.
    pub scale: f32,
    pub color: Vec3,
    /// Opacity before the circular mask.
    pub alpha: f32,
}

impl Sprite {
    /// Opacity at a point of the sprite quad, `uv` in `[0, 1]^2`.
    pub fn alpha_at(&self, params: &KernelParams, uv: Vec2) -> f32 {
        self.alpha * disc_mask(params, uv)
    }
}

/// Soft circular mask: 1 inside `mask_inner`, 0 beyond `mask_outer`.
pub fn disc_mask(params: &KernelParams, uv: Vec2) -> f32 {
    smoothstep(params.mask_outer, params.mask_inner, (uv - Vec2::splat(0.5)).length())
}

/// Project particle `i`.
pub fn project(
    buffers: &ParticleBuffers,
    params: &KernelParams,
    controls: &ControlSurface,
    i: usize,
) -> Sprite {
    let index = i as u32;
    let seed = buffers.seed();
    let ch = |k: u32| channel(index, seed, k);
    let bp = controls.blast_progress;

    let t = (buffers.age[i] / buffers.lifetime[i]).clamp(0.0, 1.0);
    let t = if t.is_finite() { t } else { 0.0 };

    let jitter = Vec3::new(
        mix(-params.jitter, params.jitter, ch(channels::RENDER_JITTER)),
        mix(-params.jitter, params.jitter, ch(channels::RENDER_JITTER + 1)),
        mix(-params.jitter, params.jitter, ch(channels::RENDER_JITTER + 2)),
    );

    let scale = mix(params.scale_min, params.scale_max, ch(channels::SCALE))
        * controls.responsive_scale
        * smoothstep(1.0, 0.0, t)
        * mix(1.0, 2.0, bp);

    Sprite {
        position: buffers.spawn_position[i]
            + buffers.offset_position[i]
            + jitter
            + params.scene_offset,
        scale,
        color: controls.start_color.lerp(controls.end_color, t),
        alpha: mix(params.base_opacity, params.blast_opacity, bp),
    }
}

/// Project every particle.
pub fn project_all(
    buffers: &ParticleBuffers,
    params: &KernelParams,
    controls: &ControlSurface,
) -> Vec<Sprite> {
    (0..buffers.len())
        .map(|i| project(buffers, params, controls, i))
        .collect()
}
