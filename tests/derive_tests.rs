//! Integration tests for `#[derive(ShaderUniforms)]`.
//!
//! These check the generated layout against WGSL's uniform rules by using
//! the derived implementations and validating the emitted structs with naga.

use backdrop::{ControlSurface, KernelParams, ShaderUniforms, Vec2, Vec3, Vec4};

// ============================================================================
// Scalars
// ============================================================================

#[derive(ShaderUniforms, Clone, Copy)]
struct Scalars {
    speed: f32,
    count: u32,
    bias: i32,
    enabled: bool,
}

#[test]
fn test_scalars_pack_tightly() {
    assert_eq!(Scalars::SIZE, 16);
    assert_eq!(
        Scalars::FIELD_OFFSETS,
        &[("speed", 0), ("count", 4), ("bias", 8), ("enabled", 12)]
    );
    assert_eq!(Scalars::WGSL_NAME, "Scalars");
}

#[test]
fn test_scalars_to_gpu() {
    let gpu = Scalars {
        speed: 1.5,
        count: 7,
        bias: -2,
        enabled: true,
    }
    .to_gpu();
    assert_eq!(gpu.speed, 1.5);
    assert_eq!(gpu.count, 7);
    assert_eq!(gpu.bias, -2);
    assert_eq!(gpu.enabled, 1);
}

#[test]
fn test_short_block_is_padded_to_16() {
    #[derive(ShaderUniforms, Clone, Copy)]
    struct One {
        value: f32,
    }
    assert_eq!(One::SIZE, 16);
    assert_eq!(std::mem::size_of::<<One as ShaderUniforms>::Gpu>(), 16);
    assert!(One::WGSL_STRUCT.contains("_pad2: f32"));
}

// ============================================================================
// Vectors
// ============================================================================

#[derive(ShaderUniforms, Clone, Copy)]
struct Vectors {
    flag: bool,
    position: Vec3,
    radius: f32,
    uv: Vec2,
    weights: Vec4,
}

#[test]
fn test_vec3_is_16_aligned_and_shares_its_slot() {
    let offsets: std::collections::HashMap<_, _> = Vectors::FIELD_OFFSETS.iter().copied().collect();
    assert_eq!(offsets["flag"], 0);
    assert_eq!(offsets["position"], 16);
    assert_eq!(offsets["radius"], 28);
    assert_eq!(offsets["uv"], 32);
    assert_eq!(offsets["weights"], 48);
    assert_eq!(Vectors::SIZE, 64);
}

#[test]
fn test_gpu_struct_matches_declared_size() {
    assert_eq!(
        std::mem::size_of::<<Vectors as ShaderUniforms>::Gpu>() as u32,
        Vectors::SIZE
    );
}

#[test]
fn test_vectors_to_gpu() {
    let gpu = Vectors {
        flag: false,
        position: Vec3::new(1.0, 2.0, 3.0),
        radius: 0.5,
        uv: Vec2::new(0.25, 0.75),
        weights: Vec4::new(1.0, 0.0, 0.0, 0.0),
    }
    .to_gpu();
    assert_eq!(gpu.flag, 0);
    assert_eq!(gpu.position, [1.0, 2.0, 3.0]);
    assert_eq!(gpu.radius, 0.5);
    assert_eq!(gpu.uv, [0.25, 0.75]);
    assert_eq!(gpu.weights, [1.0, 0.0, 0.0, 0.0]);
    let bytes = bytemuck::bytes_of(&gpu);
    assert_eq!(bytes.len(), 64);
}

// ============================================================================
// Crate uniform blocks
// ============================================================================

#[test]
fn test_crate_blocks_match_their_gpu_structs() {
    assert_eq!(
        std::mem::size_of::<<ControlSurface as ShaderUniforms>::Gpu>() as u32,
        ControlSurface::SIZE
    );
    assert_eq!(
        std::mem::size_of::<<KernelParams as ShaderUniforms>::Gpu>() as u32,
        KernelParams::SIZE
    );
    assert_eq!(ControlSurface::SIZE % 16, 0);
    assert_eq!(KernelParams::SIZE % 16, 0);
}

#[test]
fn test_control_surface_bytes() {
    let surface = ControlSurface {
        blast_progress: 0.25,
        ..Default::default()
    };
    let gpu = surface.to_gpu();
    let bytes = bytemuck::bytes_of(&gpu);
    let offset = ControlSurface::FIELD_OFFSETS
        .iter()
        .find(|(name, _)| *name == "blast_progress")
        .map(|(_, o)| *o as usize)
        .unwrap();
    let value = f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap());
    assert_eq!(value, 0.25);
}

// ============================================================================
// WGSL Validation Tests
// ============================================================================

/// Validates a generated struct as a uniform block in a minimal shader.
fn validate_uniform_struct(name: &str, wgsl_struct: &str) -> Result<(), String> {
    let shader = format!(
        r#"
{wgsl_struct}

@group(0) @binding(0)
var<uniform> block: {name};

@group(0) @binding(1)
var<storage, read_write> out: array<f32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let b = block;
    out[global_id.x] = f32(global_id.x);
}}
"#
    );

    let module = naga::front::wgsl::parse_str(&shader)
        .map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(())
}

#[test]
fn test_scalars_wgsl_validates() {
    validate_uniform_struct(Scalars::WGSL_NAME, Scalars::WGSL_STRUCT)
        .expect("Scalars WGSL should be valid");
}

#[test]
fn test_vectors_wgsl_validates() {
    validate_uniform_struct(Vectors::WGSL_NAME, Vectors::WGSL_STRUCT)
        .expect("Vectors WGSL should be valid");
}

#[test]
fn test_control_surface_wgsl_validates() {
    validate_uniform_struct(ControlSurface::WGSL_NAME, ControlSurface::WGSL_STRUCT)
        .expect("ControlSurface WGSL should be valid");
}

#[test]
fn test_kernel_params_wgsl_validates() {
    validate_uniform_struct(KernelParams::WGSL_NAME, KernelParams::WGSL_STRUCT)
        .expect("KernelParams WGSL should be valid");
}
