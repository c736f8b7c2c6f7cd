//! CPU reference of the update kernel.
//!
//! The WGSL in [`crate::shader::compute_shader`] runs the same per-particle
//! steps in the same order:
//!
//! 1. nothing happens while `should_animate` is off
//! 2. shape-seeking toward the target (suppressed during a blast)
//! 3. pointer displacement (suppressed during a blast)
//! 4. liquid velocity integration
//! 5. noise jitter of the offset
//! 6. ballistic blast motion
//! 7. aging, with wrap-around reset
//!
//! No step can fail. Degenerate normalizations give zero.

use glam::Vec3;

use crate::buffers::ParticleBuffers;
use crate::noise::{channel, channels, fbm3_vec, mix, safe_normalize, smoothstep};
use crate::scene::KernelParams;
use crate::target_field::TargetField;
use crate::uniforms::ControlSurface;

/// Blast progress below which shape-seeking and the pointer are active.
pub const SEEK_CUTOFF: f32 = 0.05;
/// Blast progress above which blast motion applies.
pub const BLAST_CUTOFF: f32 = 0.1;
/// Blast velocity multiplier.
pub const BLAST_SCALE: f32 = 8.0;
pub const BLAST_GRAVITY: Vec3 = Vec3::new(0.0, -0.5, 0.0);

/// Pointer falloff: 1 at the pointer, 0 at `radius` and beyond.
#[inline]
pub fn falloff(radius: f32, distance: f32) -> f32 {
    if distance >= radius {
        return 0.0;
    }
    smoothstep(radius, 0.0, distance)
}

/// Weighted sum of the four radial displacement styles for a particle at
/// `to_particle` from the pointer, scaled by `k`.
#[inline]
pub fn displacement(to_particle: Vec3, weights: glam::Vec4, k: f32) -> Vec3 {
    let r = safe_normalize(to_particle);
    let repel = r * k;
    let attract = -repel;
    let swirl = safe_normalize(Vec3::Z.cross(r)) * k;
    let tornado = swirl + Vec3::Z * k;
    repel * weights.x + attract * weights.y + swirl * weights.z + tornado * weights.w
}

/// Formation epsilon currently in effect.
pub fn formation_threshold(params: &KernelParams, controls: &ControlSurface) -> f32 {
    let rb = if controls.is_rebuild { 1.0 } else { 0.0 };
    mix(params.initial_threshold, params.rebuild_threshold, rb)
}

/// Advance every particle by `dt` seconds.
pub fn step(
    buffers: &mut ParticleBuffers,
    field: &TargetField,
    params: &KernelParams,
    controls: &ControlSurface,
    dt: f32,
) {
    if !controls.should_animate {
        return;
    }

    let seed = buffers.seed();
    let bp = controls.blast_progress;
    let rb = if controls.is_rebuild { 1.0 } else { 0.0 };
    let liquid = if controls.is_liquid { 1.0 } else { 0.0 };

    let inverse = smoothstep(1.0, 0.0, bp);
    let build = smoothstep(0.0, 1.0, controls.build_progress);
    let base_speed = mix(params.initial_speed, params.rebuild_speed, rb);
    let threshold = mix(params.initial_threshold, params.rebuild_threshold, rb);
    let far = mix(params.far_threshold, params.rebuild_far_threshold, rb);
    let extra_pull = mix(params.initial_extra_pull, params.rebuild_extra_pull, rb);
    let multiplier = mix(params.initial_multiplier, params.rebuild_multiplier, rb);

    for i in 0..buffers.len() {
        let index = i as u32;
        let ch = |k: u32| channel(index, seed, k);

        let mut spawn = buffers.spawn_position[i];
        let mut offset = buffers.offset_position[i];
        let mut velocity = buffers.velocity[i];
        let mut age = buffers.age[i];

        if bp < SEEK_CUTOFF {
            let target = field.target(index);
            let delta = target - spawn;
            let d = delta.length();
            let dir = safe_normalize(delta);

            let jitter = mix(params.jitter_min, params.jitter_max, ch(channels::SPEED_JITTER));
            let speed = base_speed * jitter * inverse * build;
            if d > threshold {
                spawn += dir * speed.min(d) * dt;
            }
            if rb > 0.5 && d < params.snap_distance {
                spawn = target;
            }
            if d > far {
                spawn += dir * (extra_pull * inverse * build).min(d) * dt * multiplier;
            }

            let to_particle = spawn + offset - controls.pointer_position;
            let dist = to_particle.length();
            if dist < controls.pointer_radius {
                let k = falloff(controls.pointer_radius, dist) * controls.pointer_strength * dt;
                if controls.is_liquid {
                    velocity += safe_normalize(controls.pointer_direction) * k;
                } else {
                    offset += displacement(to_particle, controls.displacement_weights, k);
                }
            }
        }

        velocity -= velocity * controls.liquid_damping * dt * liquid;
        velocity += -offset * controls.liquid_spring * controls.relax_strength * dt * liquid;
        offset += velocity * dt * liquid;

        let noise_speed = mix(params.noise_min, params.noise_max, ch(channels::NOISE_SPEED));
        offset += fbm3_vec(spawn * age) * noise_speed * dt;

        if bp > BLAST_CUTOFF {
            let bp2 = bp * bp;
            spawn += buffers.blast_velocity[i] * bp2 * dt * BLAST_SCALE;
            spawn += BLAST_GRAVITY * bp2 * dt;
        }

        age += dt;
        if age > buffers.lifetime[i] {
            age = 0.0;
            offset = Vec3::ZERO;
            velocity = Vec3::ZERO;
        }

        buffers.spawn_position[i] = spawn;
        buffers.offset_position[i] = offset;
        buffers.velocity[i] = velocity;
        buffers.age[i] = age;
    }
}
