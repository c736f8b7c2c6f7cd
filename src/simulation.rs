//! One particle scene: target field, control surface and a kernel backend.
//!
//! [`ParticleSimulation`] is generic over the [`Backend`] that executes the
//! init and update kernels. [`CpuBackend`] runs the reference kernel in
//! [`crate::kernel`] and is what the tests use; the wgpu backend lives in
//! [`crate::gpu`].
//!
//! ```ignore
//! use backdrop::prelude::*;
//!
//! let settings = SettingsBundle::for_tier(Tier::Medium, false);
//! let scene = SceneConfig::sphere(DeviceClass::Desktop);
//! let count = scene.particle_count(&settings, false);
//! let mut sim = ParticleSimulation::new(scene, &settings, count, 7, CpuBackend::new());
//!
//! sim.apply(&ControlUpdate { build_progress: Some(1.0), ..Default::default() });
//! sim.step(1.0 / 60.0);
//! let sprites = sim.sprites();
//! ```

use crate::buffers::ParticleBuffers;
use crate::capability::SettingsBundle;
use crate::geometry::Mesh;
use crate::kernel;
use crate::projection::{self, Sprite};
use crate::scene::{KernelParams, SceneConfig};
use crate::target_field::TargetField;
use crate::uniforms::{ControlSurface, ControlUpdate};

/// Executor of the init and update kernels.
pub trait Backend {
    /// Resize storage for `particle_count` particles. Contents are
    /// undefined until the next [`initialize`](Self::initialize).
    fn reallocate(&mut self, particle_count: u32);

    /// Copy the target field to wherever the kernels read it.
    fn upload_target_field(&mut self, field: &mut TargetField);

    /// Run the init kernel.
    fn initialize(&mut self, params: &KernelParams, field: &TargetField, seed: u32);

    /// Run the update kernel for `dt` seconds.
    fn step(
        &mut self,
        field: &TargetField,
        params: &KernelParams,
        controls: &ControlSurface,
        dt: f32,
    );

    fn particle_count(&self) -> u32;
}

/// Reference backend running the kernels on the CPU.
#[derive(Debug, Clone, Default)]
pub struct CpuBackend {
    buffers: ParticleBuffers,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers(&self) -> &ParticleBuffers {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut ParticleBuffers {
        &mut self.buffers
    }
}

impl Backend for CpuBackend {
    fn reallocate(&mut self, particle_count: u32) {
        self.buffers = ParticleBuffers::allocate(particle_count);
    }

    fn upload_target_field(&mut self, field: &mut TargetField) {
        // The kernel reads the field in place.
        field.mark_uploaded();
    }

    fn initialize(&mut self, params: &KernelParams, field: &TargetField, seed: u32) {
        self.buffers.initialize(params, field, seed);
    }

    fn step(
        &mut self,
        field: &TargetField,
        params: &KernelParams,
        controls: &ControlSurface,
        dt: f32,
    ) {
        kernel::step(&mut self.buffers, field, params, controls, dt);
    }

    fn particle_count(&self) -> u32 {
        self.buffers.len() as u32
    }
}

/// A scene instance driven by one backend.
pub struct ParticleSimulation<B: Backend> {
    scene: SceneConfig,
    params: KernelParams,
    meshes: Vec<Mesh>,
    field: TargetField,
    controls: ControlSurface,
    seed: u32,
    active_shape: usize,
    backend: B,
}

impl<B: Backend> ParticleSimulation<B> {
    /// Build the target field for the first shape, size the backend and run
    /// the init kernel.
    pub fn new(
        scene: SceneConfig,
        settings: &SettingsBundle,
        particle_count: u32,
        seed: u32,
        backend: B,
    ) -> Self {
        let meshes = scene.meshes(settings);
        let params = scene.kernel_params();
        let palette = scene.palette(0);
        let controls = ControlSurface {
            build_progress: scene.initial_build_progress,
            pointer_radius: scene.pointer_radius,
            pointer_strength: scene.pointer_strength,
            start_color: palette.start,
            end_color: palette.end,
            ..Default::default()
        };
        let field = TargetField::build(
            shape_meshes(&meshes, 0),
            particle_count,
            scene.target_offset,
            field_seed(seed, 0),
        );

        let mut sim = Self {
            scene,
            params,
            meshes,
            field,
            controls,
            seed,
            active_shape: 0,
            backend,
        };
        sim.reinitialize();
        log::info!(
            "Simulation '{}' created: {} particles, target texture {}x{}",
            sim.scene.name,
            particle_count,
            sim.field.width(),
            sim.field.width()
        );
        sim
    }

    /// Apply one frame's control writes.
    pub fn apply(&mut self, update: &ControlUpdate) {
        update.apply(&mut self.controls);
    }

    /// Advance the scene by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if self.field.needs_upload() {
            self.backend.upload_target_field(&mut self.field);
        }
        self.backend.step(&self.field, &self.params, &self.controls, dt);
    }

    /// Re-sample the target field from shape `index`. Out-of-range indices
    /// are ignored.
    pub fn resample(&mut self, index: usize) {
        if index >= self.meshes.len() {
            log::warn!(
                "Scene '{}' has no shape {index} ({} shapes)",
                self.scene.name,
                self.meshes.len()
            );
            return;
        }
        self.active_shape = index;
        self.controls.active_shape_index = index as u32;
        self.field.resample(
            shape_meshes(&self.meshes, index),
            self.scene.target_offset,
            field_seed(self.seed, index),
        );
    }

    /// Change the particle count. Reallocates and re-runs init only when
    /// the count actually changes.
    pub fn resize(&mut self, particle_count: u32) {
        if particle_count == self.field.particle_count() {
            return;
        }
        log::info!(
            "Scene '{}' particle count {} -> {}",
            self.scene.name,
            self.field.particle_count(),
            particle_count
        );
        self.field = TargetField::build(
            shape_meshes(&self.meshes, self.active_shape),
            particle_count,
            self.scene.target_offset,
            field_seed(self.seed, self.active_shape),
        );
        self.reinitialize();
    }

    /// Rebuild every backend resource from scratch, as after a lost
    /// context. Simulation state restarts from `seed`.
    pub fn reinitialize(&mut self) {
        let n = self.field.particle_count();
        if self.backend.particle_count() != n {
            self.backend.reallocate(n);
        }
        self.backend.upload_target_field(&mut self.field);
        self.backend.initialize(&self.params, &self.field, self.seed);
    }

    /// Swap in a fresh backend (e.g. on a rebuilt GPU context) and
    /// re-initialize it.
    pub fn replace_backend(&mut self, backend: B) {
        self.backend = backend;
        self.reinitialize();
    }

    pub fn scene(&self) -> &SceneConfig {
        &self.scene
    }

    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    pub fn controls(&self) -> &ControlSurface {
        &self.controls
    }

    pub fn field(&self) -> &TargetField {
        &self.field
    }

    pub fn particle_count(&self) -> u32 {
        self.field.particle_count()
    }

    pub fn active_shape(&self) -> usize {
        self.active_shape
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// CPU-backed scene.
pub type CpuSimulation = ParticleSimulation<CpuBackend>;

impl ParticleSimulation<CpuBackend> {
    /// Current particle state.
    pub fn buffers(&self) -> &ParticleBuffers {
        self.backend.buffers()
    }

    /// Every particle projected to a sprite.
    pub fn sprites(&self) -> Vec<Sprite> {
        projection::project_all(self.backend.buffers(), &self.params, &self.controls)
    }
}

fn shape_meshes(meshes: &[Mesh], index: usize) -> &[Mesh] {
    meshes.get(index..=index).unwrap_or(&[])
}

fn field_seed(seed: u32, shape: usize) -> u64 {
    ((seed as u64) << 32) | shape as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{DeviceClass, Tier};
    use glam::Vec3;

    fn settings() -> SettingsBundle {
        SettingsBundle::for_tier(Tier::Low, false)
    }

    #[test]
    fn test_new_initializes_backend() {
        let sim = CpuSimulation::new(
            SceneConfig::sphere(DeviceClass::Desktop),
            &settings(),
            256,
            3,
            CpuBackend::new(),
        );
        assert_eq!(sim.particle_count(), 256);
        assert_eq!(sim.buffers().len(), 256);
        assert_eq!(sim.buffers().seed(), 3);
        assert!(!sim.field().needs_upload());
        assert!(sim.buffers().lifetime.iter().all(|l| *l > 0.0));
    }

    #[test]
    fn test_apply_and_step() {
        let mut sim = CpuSimulation::new(
            SceneConfig::sphere(DeviceClass::Desktop),
            &settings(),
            64,
            3,
            CpuBackend::new(),
        );
        let before = sim.buffers().spawn_position.clone();
        sim.apply(&ControlUpdate {
            build_progress: Some(1.0),
            ..Default::default()
        });
        assert_eq!(sim.controls().build_progress, 1.0);
        sim.step(1.0 / 60.0);
        assert_ne!(sim.buffers().spawn_position, before);
    }

    #[test]
    fn test_resample_switches_shape() {
        let mut sim = CpuSimulation::new(
            SceneConfig::shape_shifter(DeviceClass::Desktop),
            &settings(),
            128,
            9,
            CpuBackend::new(),
        );
        let generation = sim.field().generation();
        sim.resample(3);
        assert_eq!(sim.active_shape(), 3);
        assert_eq!(sim.controls().active_shape_index, 3);
        assert_eq!(sim.field().generation(), generation + 1);
        assert!(sim.field().needs_upload());
        sim.step(0.016);
        assert!(!sim.field().needs_upload());

        sim.resample(99);
        assert_eq!(sim.active_shape(), 3);
    }

    #[test]
    fn test_resize_reallocates() {
        let mut sim = CpuSimulation::new(
            SceneConfig::torus(DeviceClass::Desktop),
            &settings(),
            100,
            1,
            CpuBackend::new(),
        );
        sim.resize(100);
        assert_eq!(sim.buffers().len(), 100);
        sim.resize(400);
        assert_eq!(sim.buffers().len(), 400);
        assert_eq!(sim.field().width(), 20);
        // Torus particles start on their targets.
        for i in 0..400 {
            assert_eq!(sim.buffers().spawn_position[i], sim.field().target(i as u32));
        }
    }

    #[test]
    fn test_zero_particles_is_a_no_op() {
        let mut sim = CpuSimulation::new(
            SceneConfig::sphere(DeviceClass::Desktop),
            &settings(),
            0,
            1,
            CpuBackend::new(),
        );
        sim.step(0.016);
        assert!(sim.sprites().is_empty());
    }

    #[test]
    fn test_sprites_use_scene_offset() {
        let sim = CpuSimulation::new(
            SceneConfig::torus(DeviceClass::Desktop),
            &settings(),
            16,
            1,
            CpuBackend::new(),
        );
        let sprites = sim.sprites();
        assert_eq!(sprites.len(), 16);
        let base = sim.buffers().spawn_position[0];
        assert!((sprites[0].position - base - Vec3::new(0.0, 0.8, 0.0)).length() <= sim.params().jitter * 2.0 + 1e-5);
    }
}
