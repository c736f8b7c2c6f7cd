//! Per-particle target positions sampled from source meshes.
//!
//! The field is laid out as a square float texture so the GPU kernel can
//! fetch texel `i` with integer coordinates `(i % W, i / W)`.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::geometry::Mesh;

/// Side length of the square texture that holds `n` targets.
pub fn field_width(n: u32) -> u32 {
    if n == 0 {
        return 1;
    }
    let w = (n as f64).sqrt().ceil() as u32;
    w.max(1)
}

/// Square grid of RGBA float texels. Texel `i < n` holds particle `i`'s
/// target in xyz with w = 1; the rest stay zero.
#[derive(Debug, Clone)]
pub struct TargetField {
    particle_count: u32,
    width: u32,
    texels: Vec<[f32; 4]>,
    needs_upload: bool,
    generation: u64,
}

impl TargetField {
    /// An all-zero field sized for `n` particles.
    pub fn empty(n: u32) -> Self {
        let width = field_width(n);
        Self {
            particle_count: n,
            width,
            texels: vec![[0.0; 4]; (width * width) as usize],
            needs_upload: true,
            generation: 0,
        }
    }

    /// Sample `n` targets from `meshes`.
    pub fn build(meshes: &[Mesh], n: u32, offset: Vec3, seed: u64) -> Self {
        let mut field = Self::empty(n);
        field.resample(meshes, offset, seed);
        field
    }

    /// Re-sample in place. The texel storage is never reallocated.
    pub fn resample(&mut self, meshes: &[Mesh], offset: Vec3, seed: u64) {
        let sources: Vec<&Mesh> = meshes.iter().filter(|m| !m.is_empty()).collect();
        let mut rng = SmallRng::seed_from_u64(seed);

        for (i, texel) in self.texels.iter_mut().enumerate() {
            if i as u32 >= self.particle_count || sources.is_empty() {
                *texel = [0.0; 4];
                continue;
            }
            let mesh = sources[rng.gen_range(0..sources.len())];
            let vertex = mesh.positions[rng.gen_range(0..mesh.positions.len())] + offset;
            *texel = [vertex.x, vertex.y, vertex.z, 1.0];
        }

        self.needs_upload = true;
        self.generation += 1;
        log::info!(
            "Target field resampled: {} targets from {} meshes (generation {})",
            self.particle_count,
            sources.len(),
            self.generation
        );
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Target of particle `i`. Out-of-range indices read as the origin.
    #[inline]
    pub fn target(&self, i: u32) -> Vec3 {
        if i >= self.particle_count {
            return Vec3::ZERO;
        }
        let t = self.texels[i as usize];
        Vec3::new(t[0], t[1], t[2])
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    /// Called by a backend once the texels are on the device.
    pub fn mark_uploaded(&mut self) {
        self.needs_upload = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        Mesh {
            positions: vec![Vec3::X, Vec3::Y, Vec3::Z],
        }
    }

    #[test]
    fn test_field_width() {
        assert_eq!(field_width(0), 1);
        assert_eq!(field_width(1), 1);
        assert_eq!(field_width(4), 2);
        assert_eq!(field_width(5), 3);
        assert_eq!(field_width(400_000), 633);
    }

    #[test]
    fn test_build_writes_only_first_n() {
        let field = TargetField::build(&[triangle()], 5, Vec3::ZERO, 7);
        assert_eq!(field.width(), 3);
        assert_eq!(field.texels().len(), 9);
        for i in 0..5 {
            assert_eq!(field.texels()[i][3], 1.0);
            assert!((field.target(i as u32).length() - 1.0).abs() < 1e-6);
        }
        for i in 5..9 {
            assert_eq!(field.texels()[i], [0.0; 4]);
        }
    }

    #[test]
    fn test_offset_applied() {
        let offset = Vec3::new(0.0, -0.15, 5.0);
        let field = TargetField::build(&[triangle()], 10, offset, 1);
        for i in 0..10 {
            let base = field.target(i) - offset;
            assert!((base.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_resample_same_seed_is_reproducible() {
        let a = TargetField::build(&[triangle()], 64, Vec3::ZERO, 99);
        let b = TargetField::build(&[triangle()], 64, Vec3::ZERO, 99);
        assert_eq!(a.texels(), b.texels());
    }

    #[test]
    fn test_resample_bumps_generation_and_flags_upload() {
        let mut field = TargetField::build(&[triangle()], 16, Vec3::ZERO, 3);
        let ptr = field.texels().as_ptr();
        field.mark_uploaded();
        assert!(!field.needs_upload());

        field.resample(&[triangle()], Vec3::ONE, 4);
        assert_eq!(field.generation(), 2);
        assert!(field.needs_upload());
        assert_eq!(field.texels().as_ptr(), ptr);
    }

    #[test]
    fn test_empty_meshes_leave_zeros() {
        let field = TargetField::build(&[Mesh::default()], 10, Vec3::ONE, 5);
        assert!(field.texels().iter().all(|t| *t == [0.0; 4]));
        let field = TargetField::build(&[], 10, Vec3::ONE, 5);
        assert!(field.texels().iter().all(|t| *t == [0.0; 4]));
    }
}
