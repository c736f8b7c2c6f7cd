//! Per-particle state as a structure of arrays.
//!
//! Everything here is a pure function of `(index, seed)`: initializing twice
//! with the same seed gives bit-identical arrays. The GPU init kernel in
//! [`crate::shader`] computes the same values.

use glam::Vec3;

use crate::noise::{channel, channels, safe_normalize};
use crate::scene::KernelParams;
use crate::target_field::TargetField;

/// Lifetime of particle `index`, fixed for the life of the buffers.
#[inline]
pub fn lifetime(params: &KernelParams, index: u32, seed: u32) -> f32 {
    let t = channel(index, seed, channels::LIFETIME);
    params.lifetime_min + (params.lifetime_max - params.lifetime_min) * t
}

/// Largest fraction of its lifetime a particle may start at.
pub const AGE_SPAN: f32 = 1.0 - f32::EPSILON;

/// Starting age for a particle, in `[0, life)` for any `t` in `[0, 1]`.
#[inline]
pub fn initial_age(life: f32, t: f32) -> f32 {
    life * t.min(AGE_SPAN)
}

/// CPU copy of every per-particle attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffers {
    pub spawn_position: Vec<Vec3>,
    pub offset_position: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    pub blast_velocity: Vec<Vec3>,
    pub age: Vec<f32>,
    pub lifetime: Vec<f32>,
    seed: u32,
}

impl ParticleBuffers {
    /// Zeroed arrays for `n` particles.
    pub fn allocate(n: u32) -> Self {
        let n = n as usize;
        Self {
            spawn_position: vec![Vec3::ZERO; n],
            offset_position: vec![Vec3::ZERO; n],
            velocity: vec![Vec3::ZERO; n],
            blast_velocity: vec![Vec3::ZERO; n],
            age: vec![0.0; n],
            lifetime: vec![0.0; n],
            seed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.age.len()
    }

    pub fn is_empty(&self) -> bool {
        self.age.is_empty()
    }

    /// Seed of the last [`initialize`](Self::initialize).
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Fill every array from `(index, seed)`.
    pub fn initialize(&mut self, params: &KernelParams, field: &TargetField, seed: u32) {
        self.seed = seed;
        for i in 0..self.len() {
            let index = i as u32;
            let ch = |k: u32| channel(index, seed, k);

            self.spawn_position[i] = if params.spawn_on_target {
                field.target(index)
            } else {
                let span = params.spawn_max - params.spawn_min;
                Vec3::new(
                    params.spawn_min + span * ch(channels::SPAWN),
                    params.spawn_min + span * ch(channels::SPAWN + 1),
                    params.spawn_min + span * ch(channels::SPAWN + 2),
                ) + params.spawn_offset
            };

            self.offset_position[i] = Vec3::ZERO;
            self.velocity[i] = Vec3::ZERO;

            let life = lifetime(params, index, seed);
            self.lifetime[i] = life;
            self.age[i] = initial_age(life, ch(channels::AGE));

            self.blast_velocity[i] = if params.blast_enabled {
                let dir = Vec3::new(
                    -10.0 + 20.0 * ch(channels::BLAST_DIRECTION),
                    -10.0 + 20.0 * ch(channels::BLAST_DIRECTION + 1),
                    -10.0 + 20.0 * ch(channels::BLAST_DIRECTION + 2),
                );
                let speed = params.blast_min
                    + (params.blast_max - params.blast_min) * ch(channels::BLAST_SPEED);
                safe_normalize(dir) * speed
            } else {
                Vec3::ZERO
            };
        }
    }
}
