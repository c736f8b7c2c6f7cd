//! Hashing and noise on the CPU.
//!
//! These mirror the WGSL in [`crate::shader_utils`] one-to-one so the CPU
//! reference kernel and the GPU kernel draw the same per-particle values.
//! Per-particle randomness is always `rand(index + seed + channel)`, never a
//! stateful generator.

use glam::{Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

/// 32-bit avalanche hash.
#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

/// Random float in `[0, 1]`.
#[inline]
pub fn rand(seed: u32) -> f32 {
    hash(seed) as f32 / 4_294_967_295.0
}

/// Random float in `[min, max]`.
#[inline]
pub fn rand_range(seed: u32, min: f32, max: f32) -> f32 {
    min + rand(seed) * (max - min)
}

/// Random value for particle `index` on a numbered channel.
///
/// Channels keep the different per-particle attributes decorrelated.
#[inline]
pub fn channel(index: u32, seed: u32, channel: u32) -> f32 {
    rand(index.wrapping_add(seed).wrapping_add(channel))
}

/// Random channel numbers. Spawn and blast direction use three
/// consecutive channels starting at the listed one.
pub mod channels {
    pub const SPAWN: u32 = 0;
    pub const AGE: u32 = 11;
    pub const SPEED_JITTER: u32 = 12;
    pub const LIFETIME: u32 = 13;
    pub const NOISE_SPEED: u32 = 14;
    pub const SCALE: u32 = 15;
    pub const BLAST_DIRECTION: u32 = 20;
    pub const BLAST_SPEED: u32 = 23;
    pub const RENDER_JITTER: u32 = 30;
}

/// Hermite smoothstep that accepts reversed edges (`edge0 > edge1`).
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Vectors shorter than this normalize to zero, on the GPU as well.
pub const NORMALIZE_EPSILON: f32 = 1e-6;

/// Normalize, returning zero for degenerate input instead of NaN.
#[inline]
pub fn safe_normalize(v: Vec3) -> Vec3 {
    let len = v.length();
    if len < NORMALIZE_EPSILON {
        return Vec3::ZERO;
    }
    v / len
}

fn mod289_3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn mod289_4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute4(x: Vec4) -> Vec4 {
    mod289_4(((x * 34.0) + Vec4::ONE) * x)
}

fn taylor_inv_sqrt4(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - 0.853_734_7 * r
}

fn step3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::select(x.cmplt(edge), Vec3::ZERO, Vec3::ONE)
}

fn step4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::select(x.cmplt(edge), Vec4::ZERO, Vec4::ONE)
}

/// 3D simplex noise in roughly `[-1, 1]`.
pub fn simplex3(v: Vec3) -> f32 {
    let cx = 1.0 / 6.0;
    let cy = 1.0 / 3.0;

    // First corner
    let mut i = (v + Vec3::splat(v.dot(Vec3::splat(cy)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(cx)));

    // Other corners
    let g = step3(x0.yzx(), x0);
    let l = Vec3::ONE - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + Vec3::splat(cx);
    let x2 = x0 - i2 + Vec3::splat(cy);
    let x3 = x0 - Vec3::splat(0.5);

    // Permutations
    i = mod289_3(i);
    let p = permute4(
        permute4(
            permute4(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + Vec4::splat(i.y)
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients
    let n_ = 0.142_857_14;
    let ns = Vec3::new(2.0 * n_, 0.5 * n_ - 1.0, n_);

    let j = p - 49.0 * (p * ns.z * ns.z).floor();

    let x_ = (j * ns.z).floor();
    let y_ = (j - 7.0 * x_).floor();

    let x = x_ * ns.x + Vec4::splat(ns.y);
    let y = y_ * ns.x + Vec4::splat(ns.y);
    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);

    let s0 = b0.floor() * 2.0 + Vec4::ONE;
    let s1 = b1.floor() * 2.0 + Vec4::ONE;
    let sh = -step4(h, Vec4::ZERO);

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt4(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    let mut m = (Vec4::splat(0.6) - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
        .max(Vec4::ZERO);
    m = m * m;
    42.0 * (m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

/// Offsets that decorrelate the three channels of [`fbm3_vec`].
pub const FBM_CHANNEL_OFFSETS: [Vec3; 3] = [
    Vec3::ZERO,
    Vec3::new(31.416, -47.853, 12.793),
    Vec3::new(-233.145, -113.408, -185.31),
];

pub const FBM_OCTAVES: u32 = 3;

/// Fractal simplex noise: unit starting amplitude, lacunarity 2, gain 0.5.
pub fn fbm3(p: Vec3, octaves: u32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut pos = p;
    for _ in 0..octaves {
        value += amplitude * simplex3(pos);
        pos *= 2.0;
        amplitude *= 0.5;
    }
    value
}

/// Three-channel fractal noise used for offset jitter.
pub fn fbm3_vec(p: Vec3) -> Vec3 {
    Vec3::new(
        fbm3(p + FBM_CHANNEL_OFFSETS[0], FBM_OCTAVES),
        fbm3(p + FBM_CHANNEL_OFFSETS[1], FBM_OCTAVES),
        fbm3(p + FBM_CHANNEL_OFFSETS[2], FBM_OCTAVES),
    )
}
