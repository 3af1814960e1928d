//! Uniform random primitives, backed by a cryptographic RNG.
//!
//! Both `random_range` and `random_shuffle` are specified against a byte
//! source rather than against a particular RNG type so that tests can swap
//! in a fixed-sequence stub ([`RandomSource`]) to make assertions about
//! specific outcomes without weakening the production generator, which is
//! always [`rand::rngs::OsRng`].

use rand::{CryptoRng, RngCore};

/// Abstracts the byte/float source `random_range`/`random_shuffle` draw
/// from. Production code only ever uses [`CryptoRandomSource`]; the trait
/// exists purely as a test seam.
pub trait RandomSource {
    /// A uniform random byte in `[0, 256)`.
    fn next_byte(&mut self) -> u8;
    /// A uniform random `u64`, used for the 53-bit float-scaling fallback.
    fn next_u64(&mut self) -> u64;
}

/// The production [`RandomSource`], backed by the OS's cryptographic RNG.
#[derive(Default)]
pub struct CryptoRandomSource(rand::rngs::OsRng);

impl RandomSource for CryptoRandomSource {
    fn next_byte(&mut self) -> u8 {
        let mut buf = [0u8; 1];
        self.0.fill_bytes(&mut buf);
        buf[0]
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
}

// Compile-time assertion that OsRng really is a CryptoRng: node selection
// and jitter must be backed by a cryptographic RNG, not a reproducible one.
const _: fn() = || {
    fn assert_crypto_rng<T: CryptoRng>() {}
    assert_crypto_rng::<rand::rngs::OsRng>();
};

/// Largest multiple of `max` that fits in a single byte's range `[0, 256)`,
/// used for the rejection-sampling path.
fn largest_multiple_below_256(max: u32) -> u32 {
    (256 / max) * max
}

/// Returns a uniform integer in `[0, max)`. Panics if `max == 0`.
///
/// Behavior:
/// - `max == 1` always returns `0`.
/// - a power-of-two `max <= 256` is satisfied with bit-masking (no
///   rejection needed).
/// - a small non-power-of-two `max` (rejection rate on a single byte under
///   5%) uses rejection sampling against the largest multiple of `max`
///   that's `<= 256`.
/// - otherwise falls back to 53-bit float scaling with rejection at `max`.
pub fn random_range_with(rng: &mut impl RandomSource, max: u32) -> u32 {
    assert!(max > 0, "random_range: max must be positive");
    if max == 1 {
        return 0;
    }

    if max <= 256 && max.is_power_of_two() {
        let mask = max - 1;
        loop {
            let candidate = rng.next_byte() as u32 & mask;
            if candidate < max {
                return candidate;
            }
        }
    }

    if max <= 256 {
        let bound = largest_multiple_below_256(max);
        let rejection_rate = 1.0 - (bound as f64 / 256.0);
        if rejection_rate < 0.05 {
            loop {
                let candidate = rng.next_byte() as u32;
                if candidate < bound {
                    return candidate % max;
                }
            }
        }
    }

    // 53-bit float scaling: draw a uniform u64, keep the top 53 bits (the
    // full mantissa of an f64), scale into [0, max), reject on the small
    // bias at the top of the range.
    const MANTISSA_BITS: u32 = 53;
    let limit = (u64::MAX >> (64 - MANTISSA_BITS)) + 1;
    let scaled_limit = limit - (limit % max as u64);
    loop {
        let bits = rng.next_u64() >> (64 - MANTISSA_BITS);
        if bits < scaled_limit {
            return (bits % max as u64) as u32;
        }
    }
}

/// Convenience wrapper over [`random_range_with`] using the production
/// cryptographic source.
pub fn random_range(max: u32) -> u32 {
    random_range_with(&mut CryptoRandomSource::default(), max)
}

/// Returns a uniform random permutation of `[0, n)`.
///
/// Specialized for `n in {0, 1, 2}`; uses Fisher-Yates inside-out for
/// everything else.
pub fn random_shuffle_with(rng: &mut impl RandomSource, n: usize) -> Vec<usize> {
    match n {
        0 => return Vec::new(),
        1 => return vec![0],
        2 => {
            return if random_range_with(rng, 2) == 0 {
                vec![0, 1]
            } else {
                vec![1, 0]
            };
        }
        _ => {}
    }

    let mut perm: Vec<usize> = (0..n).collect();
    // Fisher-Yates, inside-out: for i from n-1 down to 1, swap perm[i] with
    // perm[j] for a uniform j in [0, i].
    for i in (1..n).rev() {
        let j = random_range_with(rng, (i + 1) as u32) as usize;
        perm.swap(i, j);
    }
    perm
}

/// Convenience wrapper over [`random_shuffle_with`] using the production
/// cryptographic source.
pub fn random_shuffle(n: usize) -> Vec<usize> {
    random_shuffle_with(&mut CryptoRandomSource::default(), n)
}
