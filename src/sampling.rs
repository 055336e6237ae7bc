use crate::point::Point;

use rand::{prelude::*, rngs::SmallRng};
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::{Deserialize, Serialize};

pub fn small_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// Deterministic RNG for the chunk at `chunk`, independent of the order in which chunks are
/// generated.
pub fn chunk_rng(seed: u64, chunk: Point) -> SmallRng {
    // splitmix64 finalizer over the packed coordinate
    let packed = ((chunk.x as u32 as u64) << 32) | chunk.y as u32 as u64;
    let mut z = seed ^ packed.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);

    small_rng(z ^ (z >> 31))
}

/// Inclusive integer range as it appears in configs.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RangeSpec {
    pub min: i32,
    pub max: i32,
}

impl RangeSpec {
    pub fn make(&self) -> Uniform<i32> {
        Uniform::new_inclusive(self.min, self.max)
    }
}

/// Ratio used to stretch an area-based rectangle away from a square.
pub fn aspect_ratio_dist() -> Uniform<f64> {
    Uniform::new_inclusive(2.0 / 3.0, 4.0 / 3.0)
}

/// Rounds `expected` down and resolves the fractional remainder with one weighted coin flip, so
/// the mean count equals `expected`.
pub fn fractional_count<R: Rng>(rng: &mut R, expected: f64) -> usize {
    let expected = expected.max(0.0);
    let whole = expected.floor();
    let remainder = expected - whole;
    let extra = Bernoulli::new(remainder)
        .expect("Remainder must be in [0, 1)")
        .sample(rng);

    whole as usize + extra as usize
}

/// One of the four unit steps, uniformly.
pub fn unit_kick<R: Rng>(rng: &mut R) -> Point {
    *crate::point::FOUR_NEIGHBORS
        .choose(rng)
        .expect("Must have at least one direction")
}

/// Uniform offset in `[-radius, radius]` on both axes.
pub fn jitter<R: Rng>(rng: &mut R, radius: i32) -> Point {
    let dist = Uniform::from(-radius..=radius);

    Point::new(dist.sample(rng), dist.sample(rng))
}
