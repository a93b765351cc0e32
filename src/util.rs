use nalgebra::Vector3;
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeBounds;

/// Uniform random numbers and sphere samples for the path tracer.
///
/// Implementors only need to supply [`RandomSource::next_f32`]; everything else
/// is derived from it, so both tiers produce the same kinds of samples.
pub trait RandomSource {
    /// Uniform float in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    fn next_range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.next_f32()
    }

    /// Uniform point inside the unit ball.
    fn in_unit_sphere(&mut self) -> Vector3<f32> {
        loop {
            let p = Vector3::new(
                self.next_range(-1.0, 1.0),
                self.next_range(-1.0, 1.0),
                self.next_range(-1.0, 1.0),
            );
            if p.magnitude_squared() < 1.0 {
                return p;
            }
        }
    }

    /// Uniform point on the unit sphere.
    fn unit_vector(&mut self) -> Vector3<f32> {
        loop {
            let p = self.in_unit_sphere();
            let length_squared = p.magnitude_squared();
            if length_squared > 1e-8 {
                return p / length_squared.sqrt();
            }
        }
    }
}

pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747796405).wrapping_add(2891336453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277803737);
    (word >> 22) ^ word
}

/// Cheap generator: every draw rehashes the state with [`pcg_hash`].
#[derive(Debug, Clone)]
pub struct FastRandom {
    state: u32,
}

impl FastRandom {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn for_sample(pixel: u32, frame: u32, seed: u32) -> Self {
        Self::new(pcg_hash(
            pixel ^ pcg_hash(frame.wrapping_add(pcg_hash(seed))),
        ))
    }
}

impl RandomSource for FastRandom {
    fn next_f32(&mut self) -> f32 {
        self.state = pcg_hash(self.state);
        // 상위 24비트만 사용해야 1.0이 나오지 않음
        (self.state >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// Slower generator backed by `StdRng`, for when the hash shows patterns.
#[derive(Debug, Clone)]
pub struct QualityRandom {
    rng: StdRng,
}

impl QualityRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn for_sample(pixel: u32, frame: u32, seed: u32) -> Self {
        let key = ((frame as u64) << 32) | pixel as u64;
        Self::new(key ^ (seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}

impl RandomSource for QualityRandom {
    fn next_f32(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }
}

pub fn random_vec<T, R, G>(rng: &mut G, range: R) -> Vector3<T>
where
    T: SampleUniform,
    R: RangeBounds<T> + SampleRange<T> + Clone,
    G: Rng + ?Sized,
{
    Vector3::new(
        rng.gen_range(range.clone()),
        rng.gen_range(range.clone()),
        rng.gen_range(range),
    )
}

/// Clamps a linear color to `[0, 1]`, applies gamma 2 and packs it as RGBA8.
///
/// The packed value has the bytes `r, g, b, a` in memory order on every
/// platform, so a `&[u32]` of these can be cast straight to RGBA bytes.
pub fn color_to_rgba(color: &Vector3<f32>) -> u32 {
    let channel = |c: f32| (c.clamp(0.0, 1.0).sqrt() * 255.0) as u8;
    u32::from_ne_bytes([channel(color.x), channel(color.y), channel(color.z), 0xFF])
}
