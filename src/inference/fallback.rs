//! Placeholder scores used when no real model can answer a request.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::inference::output::OutputTensor;

const POSITIVE_RANGE: std::ops::Range<f32> = 0.6..0.95;

/// Pseudo-random `[[negative, positive]]` scores seeded from the input text.
///
/// Equal texts always produce equal scores, independent of which models were loaded before.
pub fn scores(text: &str) -> OutputTensor {
    let mut rng = StdRng::seed_from_u64(seed(text));
    let positive: f32 = rng.gen_range(POSITIVE_RANGE);
    let negative = 1.0 - positive;

    OutputTensor::new(vec![negative, positive], vec![1, 2])
}

fn seed(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}
