use crate::F;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Chain-local random source. Each chain owns one; nothing is shared.
pub struct ChainRng {
    rng: ChaCha20Rng,
}

impl ChainRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    pub fn from_chain_id(global_seed: u64, chain_id: u64) -> Self {
        // Combine seeds deterministically
        let seed = global_seed.wrapping_add(chain_id.wrapping_mul(0x9e3779b97f4a7c15));
        Self::new(seed)
    }

    /// Uniform draw from `[0, 1)`.
    pub fn uniform(&mut self) -> F {
        self.rng.gen::<F>()
    }

    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Draws an index from the categorical distribution `softmax(logits)`.
    ///
    /// `scratch` is overwritten with the max-shifted exponentials so repeated
    /// calls do not allocate.
    pub fn sample_log_categorical(&mut self, logits: &[F], scratch: &mut Vec<F>) -> usize {
        debug_assert!(!logits.is_empty());
        if logits.len() == 1 {
            return 0;
        }

        let max = logits.iter().copied().fold(F::NEG_INFINITY, F::max);
        scratch.clear();
        scratch.extend(logits.iter().map(|l| (l - max).exp()));
        let total: F = scratch.iter().sum();

        if !(total > 0.0 && total.is_finite()) {
            return self.index(logits.len());
        }

        let u = self.uniform() * total;
        let mut cum = 0.0;
        for (i, &w) in scratch.iter().enumerate() {
            cum += w;
            if u < cum {
                return i;
            }
        }
        scratch.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_chain_id_same_stream() {
        let mut a = ChainRng::from_chain_id(7, 3);
        let mut b = ChainRng::from_chain_id(7, 3);
        for _ in 0..100 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn test_chains_diverge() {
        let mut a = ChainRng::from_chain_id(7, 0);
        let mut b = ChainRng::from_chain_id(7, 1);
        let xs: Vec<F> = (0..10).map(|_| a.uniform()).collect();
        let ys: Vec<F> = (0..10).map(|_| b.uniform()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_categorical_frequencies() {
        let mut rng = ChainRng::new(11);
        let logits = [0.0, (2.0 as F).ln(), F::NEG_INFINITY];
        let mut scratch = Vec::new();
        let mut counts = [0usize; 3];
        let n = 30_000;
        for _ in 0..n {
            counts[rng.sample_log_categorical(&logits, &mut scratch)] += 1;
        }
        let p1 = counts[1] as F / n as F;
        assert_eq!(counts[2], 0);
        assert!((p1 - 2.0 / 3.0).abs() < 0.02, "p1 = {}", p1);
    }

    #[test]
    fn test_large_logits_do_not_overflow() {
        let mut rng = ChainRng::new(1);
        let mut scratch = Vec::new();
        let idx = rng.sample_log_categorical(&[1000.0, 0.0], &mut scratch);
        assert_eq!(idx, 0);
    }
}
