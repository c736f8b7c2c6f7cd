//! The generated WGSL must parse and validate without a GPU.

use backdrop::shader::{compute_shader, render_shader, WORKGROUP_SIZE};
use backdrop::shader_utils::all_utils_wgsl;

fn validate(source: &str) -> naga::Module {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => panic!("WGSL parse error:\n{}", e.emit_to_string(source)),
    };

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    if let Err(e) = validator.validate(&module) {
        panic!("WGSL validation error: {e:?}");
    }
    module
}

fn entry_points(module: &naga::Module) -> Vec<(String, naga::ShaderStage)> {
    module
        .entry_points
        .iter()
        .map(|ep| (ep.name.clone(), ep.stage))
        .collect()
}

#[test]
fn test_compute_shader_validates() {
    let module = validate(&compute_shader());
    let entries = entry_points(&module);
    assert!(entries.contains(&("init_main".to_string(), naga::ShaderStage::Compute)));
    assert!(entries.contains(&("update_main".to_string(), naga::ShaderStage::Compute)));

    for ep in &module.entry_points {
        assert_eq!(ep.workgroup_size, [WORKGROUP_SIZE, 1, 1]);
    }
}

#[test]
fn test_render_shader_validates() {
    let module = validate(&render_shader());
    let entries = entry_points(&module);
    assert!(entries.contains(&("vs_main".to_string(), naga::ShaderStage::Vertex)));
    assert!(entries.contains(&("fs_main".to_string(), naga::ShaderStage::Fragment)));
}

#[test]
fn test_utils_validate_on_their_own() {
    let source = format!(
        r#"{}

@group(0) @binding(0) var<storage, read_write> out: array<f32>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {{
    let p = vec3<f32>(f32(id.x), 0.5, -1.0);
    out[id.x] = noise3(p) + fbm3_vec(p).x + rand(id.x) + channel(id.x, 7u, 3u);
}}
"#,
        all_utils_wgsl()
    );
    validate(&source);
}

#[test]
fn test_generation_is_stable() {
    assert_eq!(compute_shader(), compute_shader());
    assert_eq!(render_shader(), render_shader());
}
