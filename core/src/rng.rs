//! Seeded random draws for the forecast risk band.
//!
//! RULE: Analytics never touches a platform RNG. The same store state and
//! configured seed always produce the same percentile band.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct ForecastRng {
    inner: Pcg64Mcg,
}

impl ForecastRng {
    pub fn seeded(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    /// Float in [0.0, 1.0) from the top 53 bits of one draw.
    pub fn next_f64(&mut self) -> f64 {
        (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform draw in [lo, hi).
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// `mean` moved by up to `spread` either way.
    pub fn perturb(&mut self, mean: f64, spread: f64) -> f64 {
        mean + (self.next_f64() - 0.5) * 2.0 * spread
    }
}
