//! Injectable uniform random sources for bracket shuffling.
//!
//! The engine never reaches for a hidden global generator: every shuffle
//! takes a `RandomSource`, so production code passes an entropy-seeded
//! xorshift generator and tests pass a fixed sequence.

use uuid::Uuid;

/// A uniform random source over `[0, 1)`.
pub trait RandomSource {
    /// Next value, uniform in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

// ---------------------------------------------------------------------------
// Production source
// ---------------------------------------------------------------------------

/// xorshift64 generator. Not cryptographic; good enough for pairings.
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    pub fn new(seed: u64) -> Self {
        // xorshift is stuck at zero forever
        let state = if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed };
        Self { state }
    }

    /// Seeded from the OS entropy behind a v4 UUID.
    pub fn from_entropy() -> Self {
        let (hi, lo) = Uuid::new_v4().as_u64_pair();
        Self::new(hi ^ lo.rotate_left(32))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl Default for XorShiftRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for XorShiftRng {
    fn next_unit(&mut self) -> f64 {
        // top 53 bits -> [0, 1)
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

// ---------------------------------------------------------------------------
// Deterministic source
// ---------------------------------------------------------------------------

/// Yields the supplied values in order, then a constant fallback.
///
/// Values outside `[0, 1)` are clamped so a careless fixture can never
/// produce an out-of-range index.
#[derive(Debug, Clone)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
    fallback: f64,
}

impl SequenceRandom {
    pub const DEFAULT_FALLBACK: f64 = 0.5;

    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
            fallback: Self::DEFAULT_FALLBACK,
        }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// How many supplied values have been consumed.
    pub fn consumed(&self) -> usize {
        self.cursor.min(self.values.len())
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&mut self) -> f64 {
        let value = self.values.get(self.cursor).copied().unwrap_or(self.fallback);
        self.cursor += 1;
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}
