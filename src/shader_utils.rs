//! WGSL utility functions shared by the init, update and render shaders.
//!
//! Every function here has a CPU twin in [`crate::noise`]; keep the two in
//! step when changing either.
//!
//! # Available Functions
//!
//! ## Random & Hash
//! - `hash(n: u32) -> u32` - 32-bit avalanche hash
//! - `rand(seed: u32) -> f32` - Random float in [0, 1]
//! - `rand_range(seed: u32, min: f32, max: f32) -> f32` - Random float in range
//! - `channel(index: u32, seed: u32, k: u32) -> f32` - Per-particle random channel
//!
//! ## Math
//! - `ease_step(e0: f32, e1: f32, x: f32) -> f32` - smoothstep that accepts `e0 > e1`
//! - `safe_normalize(v: vec3<f32>) -> vec3<f32>` - zero for zero-length input
//!
//! ## Noise
//! - `noise3(p: vec3<f32>) -> f32` - 3D simplex noise in [-1, 1]
//! - `fbm3(p: vec3<f32>, octaves: i32) -> f32` - fractal simplex noise
//! - `fbm3_vec(p: vec3<f32>) -> vec3<f32>` - three decorrelated fbm channels

use crate::noise::{FBM_CHANNEL_OFFSETS, FBM_OCTAVES};

/// WGSL code for random/hash functions.
pub const RANDOM_WGSL: &str = r#"
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

fn rand(seed: u32) -> f32 {
    return f32(hash(seed)) / 4294967295.0;
}

fn rand_range(seed: u32, min_val: f32, max_val: f32) -> f32 {
    return min_val + rand(seed) * (max_val - min_val);
}

fn channel(index: u32, seed: u32, k: u32) -> f32 {
    return rand(index + seed + k);
}
"#;

/// WGSL code for small math helpers.
pub const MATH_WGSL: &str = r#"
fn ease_step(e0: f32, e1: f32, x: f32) -> f32 {
    let t = clamp((x - e0) / (e1 - e0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

fn safe_normalize(v: vec3<f32>) -> vec3<f32> {
    let len = length(v);
    if len < 1e-6 {
        return vec3<f32>(0.0);
    }
    return v / len;
}
"#;

/// WGSL code for simplex noise.
pub const NOISE_WGSL: &str = r#"
fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute4(x: vec4<f32>) -> vec4<f32> {
    return mod289_4(((x * 34.0) + 1.0) * x);
}

fn taylor_inv_sqrt4(r: vec4<f32>) -> vec4<f32> {
    return 1.7928429 - 0.8537347 * r;
}

fn noise3(v: vec3<f32>) -> f32 {
    let C = vec2<f32>(1.0 / 6.0, 1.0 / 3.0);

    var i = floor(v + dot(v, vec3<f32>(C.y)));
    let x0 = v - i + dot(i, vec3<f32>(C.x));

    let g = step(x0.yzx, x0.xyz);
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - vec3<f32>(0.5);

    i = mod289_3(i);
    let p = permute4(permute4(permute4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
      + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
      + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    let n_ = 0.14285714;
    let ns = vec3<f32>(2.0 * n_, 0.5 * n_ - 1.0, n_);

    let j = p - 49.0 * floor(p * ns.z * ns.z);

    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);

    let x = x_ * ns.x + ns.yyyy;
    let y = y_ * ns.x + ns.yyyy;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);

    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));

    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    var p0 = vec3<f32>(a0.xy, h.x);
    var p1 = vec3<f32>(a0.zw, h.y);
    var p2 = vec3<f32>(a1.xy, h.z);
    var p3 = vec3<f32>(a1.zw, h.w);

    let norm = taylor_inv_sqrt4(vec4<f32>(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    var m = max(0.6 - vec4<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), vec4<f32>(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4<f32>(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}

fn fbm3(p: vec3<f32>, octaves: i32) -> f32 {
    var value = 0.0;
    var amplitude = 1.0;
    var pos = p;
    for (var i = 0; i < octaves; i++) {
        value += amplitude * noise3(pos);
        pos *= 2.0;
        amplitude *= 0.5;
    }
    return value;
}
"#;

/// WGSL for the three-channel fbm, generated from the CPU constants.
pub fn fbm_vec_wgsl() -> String {
    let [a, b, c] = FBM_CHANNEL_OFFSETS;
    format!(
        r#"
fn fbm3_vec(p: vec3<f32>) -> vec3<f32> {{
    return vec3<f32>(
        fbm3(p + vec3<f32>({:?}, {:?}, {:?}), {octaves}),
        fbm3(p + vec3<f32>({:?}, {:?}, {:?}), {octaves}),
        fbm3(p + vec3<f32>({:?}, {:?}, {:?}), {octaves})
    );
}}
"#,
        a.x,
        a.y,
        a.z,
        b.x,
        b.y,
        b.z,
        c.x,
        c.y,
        c.z,
        octaves = FBM_OCTAVES,
    )
}

/// Get all utility functions combined.
pub fn all_utils_wgsl() -> String {
    format!(
        "// Shared utility functions\n{}\n{}\n{}\n{}\n",
        RANDOM_WGSL,
        MATH_WGSL,
        NOISE_WGSL,
        fbm_vec_wgsl()
    )
}
