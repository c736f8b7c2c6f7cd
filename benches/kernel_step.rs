//! Benchmarks for the CPU kernel, target-field sampling and shader generation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use backdrop::buffers::ParticleBuffers;
use backdrop::capability::DeviceClass;
use backdrop::geometry::Mesh;
use backdrop::kernel;
use backdrop::scene::SceneConfig;
use backdrop::shader::{compute_shader, render_shader};
use backdrop::target_field::TargetField;
use backdrop::uniforms::{ControlSurface, DisplacementMode};

fn bench_kernel_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_step");
    let params = SceneConfig::sphere(DeviceClass::Desktop).kernel_params();
    let mesh = Mesh::sphere(3.5, 128, 64);

    for count in [1_000u32, 10_000, 50_000] {
        let field = TargetField::build(std::slice::from_ref(&mesh), count, Vec3::ZERO, 1);
        let mut buffers = ParticleBuffers::allocate(count);
        buffers.initialize(&params, &field, 7);

        let forming = ControlSurface {
            build_progress: 1.0,
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("forming", count), &count, |b, _| {
            b.iter(|| kernel::step(&mut buffers, &field, &params, &forming, black_box(1.0 / 60.0)))
        });

        let mut pointer = forming;
        pointer.pointer_position = Vec3::ZERO;
        pointer.pointer_radius = 4.0;
        pointer.set_mode(DisplacementMode::Liquid);
        pointer.pointer_direction = Vec3::X;
        group.bench_with_input(BenchmarkId::new("liquid_pointer", count), &count, |b, _| {
            b.iter(|| kernel::step(&mut buffers, &field, &params, &pointer, black_box(1.0 / 60.0)))
        });

        let blasting = ControlSurface {
            blast_progress: 0.8,
            ..forming
        };
        group.bench_with_input(BenchmarkId::new("blasting", count), &count, |b, _| {
            b.iter(|| kernel::step(&mut buffers, &field, &params, &blasting, black_box(1.0 / 60.0)))
        });
    }

    group.finish();
}

fn bench_target_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_field");
    let meshes = [
        Mesh::sphere(3.5, 180, 90),
        Mesh::torus(2.0, 0.6, 64, 256),
        Mesh::torus_knot(1.6, 0.45, 256, 32),
    ];

    for count in [10_000u32, 100_000] {
        let mut field = TargetField::empty(count);
        group.bench_with_input(BenchmarkId::new("resample", count), &count, |b, _| {
            let mut seed = 0u64;
            b.iter(|| {
                seed += 1;
                field.resample(black_box(&meshes), Vec3::ZERO, seed);
            })
        });
    }

    group.finish();
}

fn bench_shader_gen(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_gen");
    group.bench_function("compute", |b| b.iter(|| black_box(compute_shader())));
    group.bench_function("render", |b| b.iter(|| black_box(render_shader())));
    group.finish();
}

criterion_group!(benches, bench_kernel_step, bench_target_field, bench_shader_gen);
criterion_main!(benches);
