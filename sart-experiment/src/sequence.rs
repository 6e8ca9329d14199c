//! Digit sequences for a block: a fixed share of target digits mixed into a
//! cycled pool of the nine non-targets.

use crate::error::ConfigError;
use rand::Rng;
use rand::seq::SliceRandom;
use sart_core::Digit;

/// Number of target trials in a block of `num_trials`. Truncates toward zero.
pub fn target_count(num_trials: usize, target_probability: f64) -> usize {
    (num_trials as f64 * target_probability).floor() as usize
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceGenerator {
    pub target: Digit,
    pub target_probability: f64,
}

impl SequenceGenerator {
    pub fn new(target: Digit, target_probability: f64) -> Self {
        Self {
            target,
            target_probability,
        }
    }

    /// Builds the shuffled digit list for one block.
    ///
    /// The non-target pool is the cycle 0..=9 without the target, repeated
    /// enough to cover the block, shuffled and truncated. Per-digit counts are
    /// therefore close to even but not exact.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        num_trials: usize,
        rng: &mut R,
    ) -> Result<Vec<Digit>, ConfigError> {
        if !(0.0..=1.0).contains(&self.target_probability) {
            return Err(ConfigError::TargetProbability(self.target_probability));
        }
        if num_trials < 1 {
            return Err(ConfigError::TrialCount {
                block: "block",
                min: 1,
                got: num_trials,
            });
        }

        let n_targets = target_count(num_trials, self.target_probability);
        let n_non_targets = num_trials - n_targets;

        let cycles = n_non_targets / 9 + 1;
        let mut pool: Vec<Digit> = (0..cycles)
            .flat_map(|_| Digit::all())
            .filter(|d| *d != self.target)
            .collect();
        pool.shuffle(rng);
        pool.truncate(n_non_targets);

        let mut digits = vec![self.target; n_targets];
        digits.extend(pool);
        digits.shuffle(rng);

        tracing::debug!(
            num_trials,
            n_targets,
            target = %self.target,
            "generated digit sequence"
        );
        Ok(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn digit(n: u8) -> Digit {
        Digit::new(n).unwrap()
    }

    fn count_of(seq: &[Digit], d: Digit) -> usize {
        seq.iter().filter(|x| **x == d).count()
    }

    #[test]
    fn twenty_trials_at_eleven_percent_have_two_targets() {
        let mut rng = StdRng::seed_from_u64(7);
        let seq = SequenceGenerator::new(digit(3), 0.11)
            .generate(20, &mut rng)
            .unwrap();
        assert_eq!(seq.len(), 20);
        assert_eq!(count_of(&seq, digit(3)), 2);
    }

    #[test]
    fn length_and_target_count_hold_across_sizes() {
        let mut rng = StdRng::seed_from_u64(42);
        for &p in &[0.0, 0.05, 0.11, 0.25, 0.5, 1.0] {
            for n in [1usize, 2, 9, 10, 17, 100, 233] {
                for t in [0u8, 3, 9] {
                    let seq = SequenceGenerator::new(digit(t), p)
                        .generate(n, &mut rng)
                        .unwrap();
                    assert_eq!(seq.len(), n);
                    assert_eq!(count_of(&seq, digit(t)), target_count(n, p), "n={n} p={p}");
                }
            }
        }
    }

    #[test]
    fn non_targets_are_roughly_balanced() {
        let mut rng = StdRng::seed_from_u64(1);
        let seq = SequenceGenerator::new(digit(3), 0.11)
            .generate(100, &mut rng)
            .unwrap();
        // 89 non-targets from a pool of 90: each digit appears 9 or 10 times.
        for d in Digit::all().filter(|d| *d != digit(3)) {
            let c = count_of(&seq, d);
            assert!((9..=10).contains(&c), "digit {d} appeared {c} times");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let generator = SequenceGenerator::new(digit(3), 0.11);
        let a = generator.generate(50, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = generator.generate(50, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            SequenceGenerator::new(digit(3), 1.2).generate(10, &mut rng),
            Err(ConfigError::TargetProbability(_))
        ));
        assert!(matches!(
            SequenceGenerator::new(digit(3), 0.1).generate(0, &mut rng),
            Err(ConfigError::TrialCount { .. })
        ));
    }
}
