//! WGSL generation for the init, update and render passes.
//!
//! The uniform struct declarations come from `#[derive(ShaderUniforms)]`
//! so the Rust and WGSL layouts cannot drift apart. The kernel bodies follow
//! [`crate::buffers`], [`crate::kernel`] and [`crate::projection`] line by
//! line.
//!
//! # Compute bindings (group 0)
//!
//! | Binding | Resource |
//! |---|---|
//! | 0 | `FrameUniforms` |
//! | 1 | `ControlSurface` |
//! | 2 | `KernelParams` |
//! | 3-6 | spawn, offset, velocity, blast velocity (`array<vec4<f32>>`) |
//! | 7 | age (`array<f32>`) |
//! | 8 | target field (`texture_2d<f32>`, rgba32float) |
//!
//! The render pass binds 0-2 only and reads spawn, offset and age as
//! per-instance vertex attributes.

use crate::buffers::AGE_SPAN;
use crate::noise::channels;
use crate::scene::KernelParams;
use crate::shader_utils::all_utils_wgsl;
use crate::uniforms::ControlSurface;
use crate::ShaderUniforms;

pub const WORKGROUP_SIZE: u32 = 256;

/// Per-frame values written by the backend, not the choreographer.
pub const FRAME_UNIFORMS_WGSL: &str = r#"struct FrameUniforms {
    view_proj: mat4x4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    time: f32,
    delta_time: f32,
    seed: u32,
    particle_count: u32,
    field_width: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}"#;

fn header() -> String {
    format!(
        "{FRAME_UNIFORMS_WGSL}\n\n{}\n\n{}\n\n{}\n",
        ControlSurface::WGSL_STRUCT,
        KernelParams::WGSL_STRUCT,
        all_utils_wgsl()
    )
}

fn lifetime_fn() -> String {
    format!(
        r#"
fn particle_lifetime(index: u32, seed: u32) -> f32 {{
    return mix(params.lifetime_min, params.lifetime_max, channel(index, seed, {lifetime}u));
}}
"#,
        lifetime = channels::LIFETIME
    )
}

/// Init and update kernels: entry points `init_main` and `update_main`.
pub fn compute_shader() -> String {
    format!(
        r#"{header}
@group(0) @binding(0) var<uniform> frame: FrameUniforms;
@group(0) @binding(1) var<uniform> controls: ControlSurface;
@group(0) @binding(2) var<uniform> params: KernelParams;
@group(0) @binding(3) var<storage, read_write> spawn_positions: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read_write> offset_positions: array<vec4<f32>>;
@group(0) @binding(5) var<storage, read_write> velocities: array<vec4<f32>>;
@group(0) @binding(6) var<storage, read_write> blast_velocities: array<vec4<f32>>;
@group(0) @binding(7) var<storage, read_write> ages: array<f32>;
@group(0) @binding(8) var target_field: texture_2d<f32>;
{lifetime_fn}
fn field_target(index: u32) -> vec3<f32> {{
    let w = max(frame.field_width, 1u);
    return textureLoad(target_field, vec2<i32>(i32(index % w), i32(index / w)), 0).xyz;
}}

@compute @workgroup_size({wg})
fn init_main(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let index = gid.x;
    if index >= frame.particle_count {{
        return;
    }}
    let seed = frame.seed;

    var spawn = field_target(index);
    if params.spawn_on_target == 0u {{
        let span = params.spawn_max - params.spawn_min;
        spawn = vec3<f32>(
            params.spawn_min + span * channel(index, seed, {spawn}u),
            params.spawn_min + span * channel(index, seed, {spawn}u + 1u),
            params.spawn_min + span * channel(index, seed, {spawn}u + 2u),
        ) + params.spawn_offset;
    }}
    spawn_positions[index] = vec4<f32>(spawn, 1.0);
    offset_positions[index] = vec4<f32>(0.0);
    velocities[index] = vec4<f32>(0.0);

    let life = particle_lifetime(index, seed);
    ages[index] = life * min(channel(index, seed, {age}u), {age_span:?});

    var blast = vec3<f32>(0.0);
    if params.blast_enabled != 0u {{
        let dir = vec3<f32>(
            -10.0 + 20.0 * channel(index, seed, {blast_dir}u),
            -10.0 + 20.0 * channel(index, seed, {blast_dir}u + 1u),
            -10.0 + 20.0 * channel(index, seed, {blast_dir}u + 2u),
        );
        let speed = mix(params.blast_min, params.blast_max, channel(index, seed, {blast_speed}u));
        blast = safe_normalize(dir) * speed;
    }}
    blast_velocities[index] = vec4<f32>(blast, 0.0);
}}

@compute @workgroup_size({wg})
fn update_main(@builtin(global_invocation_id) gid: vec3<u32>) {{
    let index = gid.x;
    if index >= frame.particle_count {{
        return;
    }}
    if controls.should_animate == 0u {{
        return;
    }}

    let seed = frame.seed;
    let dt = frame.delta_time;
    let bp = controls.blast_progress;
    let rb = select(0.0, 1.0, controls.is_rebuild != 0u);
    let liquid = select(0.0, 1.0, controls.is_liquid != 0u);

    var spawn = spawn_positions[index].xyz;
    var offset = offset_positions[index].xyz;
    var vel = velocities[index].xyz;
    var particle_age = ages[index];

    if bp < 0.05 {{
        let goal = field_target(index);
        let delta = goal - spawn;
        let d = length(delta);
        let dir = safe_normalize(delta);

        let inverse = ease_step(1.0, 0.0, bp);
        let build = ease_step(0.0, 1.0, controls.build_progress);
        let jitter = mix(params.jitter_min, params.jitter_max, channel(index, seed, {speed_jitter}u));
        let speed = mix(params.initial_speed, params.rebuild_speed, rb) * jitter * inverse * build;
        let threshold = mix(params.initial_threshold, params.rebuild_threshold, rb);
        if d > threshold {{
            spawn += dir * min(speed, d) * dt;
        }}
        if rb > 0.5 && d < params.snap_distance {{
            spawn = goal;
        }}
        let far = mix(params.far_threshold, params.rebuild_far_threshold, rb);
        if d > far {{
            let pull = mix(params.initial_extra_pull, params.rebuild_extra_pull, rb) * inverse * build;
            let multiplier = mix(params.initial_multiplier, params.rebuild_multiplier, rb);
            spawn += dir * min(pull, d) * dt * multiplier;
        }}

        let to_particle = spawn + offset - controls.pointer_position;
        let dist = length(to_particle);
        if dist < controls.pointer_radius {{
            let k = ease_step(controls.pointer_radius, 0.0, dist) * controls.pointer_strength * dt;
            if controls.is_liquid != 0u {{
                vel += safe_normalize(controls.pointer_direction) * k;
            }} else {{
                let r = safe_normalize(to_particle);
                let repel = r * k;
                let attract = -repel;
                let swirl = safe_normalize(cross(vec3<f32>(0.0, 0.0, 1.0), r)) * k;
                let tornado = swirl + vec3<f32>(0.0, 0.0, 1.0) * k;
                let w = controls.displacement_weights;
                offset += repel * w.x + attract * w.y + swirl * w.z + tornado * w.w;
            }}
        }}
    }}

    vel -= vel * controls.liquid_damping * dt * liquid;
    vel += -offset * controls.liquid_spring * controls.relax_strength * dt * liquid;
    offset += vel * dt * liquid;

    let noise_speed = mix(params.noise_min, params.noise_max, channel(index, seed, {noise_speed}u));
    offset += fbm3_vec(spawn * particle_age) * noise_speed * dt;

    if bp > 0.1 {{
        let bp2 = bp * bp;
        spawn += blast_velocities[index].xyz * bp2 * dt * 8.0;
        spawn += vec3<f32>(0.0, -0.5, 0.0) * bp2 * dt;
    }}

    particle_age += dt;
    if particle_age > particle_lifetime(index, seed) {{
        particle_age = 0.0;
        offset = vec3<f32>(0.0);
        vel = vec3<f32>(0.0);
    }}

    spawn_positions[index] = vec4<f32>(spawn, 1.0);
    offset_positions[index] = vec4<f32>(offset, 0.0);
    velocities[index] = vec4<f32>(vel, 0.0);
    ages[index] = particle_age;
}}
"#,
        header = header(),
        lifetime_fn = lifetime_fn(),
        wg = WORKGROUP_SIZE,
        spawn = channels::SPAWN,
        age = channels::AGE,
        age_span = AGE_SPAN,
        blast_dir = channels::BLAST_DIRECTION,
        blast_speed = channels::BLAST_SPEED,
        speed_jitter = channels::SPEED_JITTER,
        noise_speed = channels::NOISE_SPEED,
    )
}

/// Instanced billboard sprites: entry points `vs_main` and `fs_main`.
pub fn render_shader() -> String {
    format!(
        r#"{header}
@group(0) @binding(0) var<uniform> frame: FrameUniforms;
@group(0) @binding(1) var<uniform> controls: ControlSurface;
@group(0) @binding(2) var<uniform> params: KernelParams;
{lifetime_fn}
struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) alpha: f32,
}};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) instance: u32,
    @location(0) spawn: vec4<f32>,
    @location(1) offset: vec4<f32>,
    @location(2) particle_age: f32,
) -> VertexOutput {{
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>(-0.5,  0.5),
        vec2<f32>(-0.5,  0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>( 0.5,  0.5),
    );
    let corner = corners[vertex_index];

    let seed = frame.seed;
    let bp = controls.blast_progress;
    let t = clamp(particle_age / particle_lifetime(instance, seed), 0.0, 1.0);

    let j = params.jitter;
    let jitter = vec3<f32>(
        mix(-j, j, channel(instance, seed, {render_jitter}u)),
        mix(-j, j, channel(instance, seed, {render_jitter}u + 1u)),
        mix(-j, j, channel(instance, seed, {render_jitter}u + 2u)),
    );
    let scale = mix(params.scale_min, params.scale_max, channel(instance, seed, {scale}u))
        * controls.responsive_scale
        * ease_step(1.0, 0.0, t)
        * mix(1.0, 2.0, bp);

    let center = spawn.xyz + offset.xyz + jitter + params.scene_offset;
    let world = center + (frame.camera_right.xyz * corner.x + frame.camera_up.xyz * corner.y) * scale;

    var out: VertexOutput;
    out.clip_position = frame.view_proj * vec4<f32>(world, 1.0);
    out.color = mix(controls.start_color, controls.end_color, t);
    out.uv = corner + vec2<f32>(0.5);
    out.alpha = mix(params.base_opacity, params.blast_opacity, bp);
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let mask = ease_step(params.mask_outer, params.mask_inner, length(in.uv - vec2<f32>(0.5)));
    let alpha = in.alpha * mask;
    if alpha <= 0.0 {{
        discard;
    }}
    return vec4<f32>(in.color, alpha);
}}
"#,
        header = header(),
        lifetime_fn = lifetime_fn(),
        render_jitter = channels::RENDER_JITTER,
        scale = channels::SCALE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_age_is_clamped_like_cpu() {
        let wgsl = compute_shader();
        assert!(wgsl.contains(&format!("u), {AGE_SPAN:?});")));
    }

    #[test]
    fn test_compute_shader_entry_points() {
        let wgsl = compute_shader();
        assert!(wgsl.contains("fn init_main"));
        assert!(wgsl.contains("fn update_main"));
        assert!(wgsl.contains("struct ControlSurface"));
        assert!(wgsl.contains("struct KernelParams"));
        assert!(wgsl.contains("@workgroup_size(256)"));
    }

    #[test]
    fn test_channels_are_substituted() {
        let wgsl = compute_shader();
        assert!(wgsl.contains("channel(index, seed, 13u)"));
        assert!(wgsl.contains("channel(index, seed, 20u + 2u)"));
        let render = render_shader();
        assert!(render.contains("channel(instance, seed, 15u)"));
    }

    #[test]
    fn test_render_shader_discards_masked_fragments() {
        let wgsl = render_shader();
        assert!(wgsl.contains("fn vs_main"));
        assert!(wgsl.contains("discard"));
        assert!(!wgsl.contains("var<storage"));
    }
}
