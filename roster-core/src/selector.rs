//! Random reviewer selection
//!
//! Selection draws from an injectable [`RandomSource`] so tests can force
//! specific permutations and runs can be reproduced from a seed.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform random indices
pub trait RandomSource: Send + Sync {
    /// Uniform value in `0..bound`. `bound` is always greater than zero.
    fn next_below(&self, bound: usize) -> usize;
}

/// Thread-local entropy, the default for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_below(&self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Deterministic source seeded from a `u64`
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_below(&self, bound: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..bound),
            // A panic elsewhere poisoned the lock; the rng state itself is still usable.
            Err(poisoned) => poisoned.into_inner().gen_range(0..bound),
        }
    }
}

/// Pick up to `count` distinct reviewers.
///
/// When the pool is no larger than `count`, every candidate is returned in
/// the given order. Otherwise a partial Fisher-Yates shuffle of a copy picks
/// `count` entries uniformly. The input is never modified.
pub fn select_reviewers(
    candidates: &[String],
    count: usize,
    rng: &dyn RandomSource,
) -> Vec<String> {
    if candidates.len() <= count {
        return candidates.to_vec();
    }

    let mut pool = candidates.to_vec();
    for i in 0..count {
        let j = i + rng.next_below(pool.len() - i);
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};

    /// Replays fixed offsets, falling back to zero when exhausted
    pub(crate) struct ScriptedRandom {
        values: Mutex<VecDeque<usize>>,
    }

    impl ScriptedRandom {
        pub(crate) fn new(values: &[usize]) -> Self {
            Self {
                values: Mutex::new(values.iter().copied().collect()),
            }
        }
    }

    impl RandomSource for ScriptedRandom {
        fn next_below(&self, bound: usize) -> usize {
            let next = self.values.lock().unwrap().pop_front().unwrap_or(0);
            next % bound
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_small_pool_returned_as_is() {
        let rng = ScriptedRandom::new(&[]);
        assert_eq!(select_reviewers(&ids(&["b", "a"]), 2, &rng), ids(&["b", "a"]));
        assert_eq!(select_reviewers(&ids(&["a"]), 2, &rng), ids(&["a"]));
        assert!(select_reviewers(&[], 2, &rng).is_empty());
    }

    #[test]
    fn test_scripted_permutation() {
        // i=0 picks offset 2 -> "c", i=1 picks offset 0 of the rest -> "b"
        let rng = ScriptedRandom::new(&[2, 0]);
        let picked = select_reviewers(&ids(&["a", "b", "c", "d"]), 2, &rng);
        assert_eq!(picked, ids(&["c", "b"]));
    }

    #[test]
    fn test_input_untouched_and_no_duplicates() {
        let candidates = ids(&["a", "b", "c", "d", "e"]);
        let rng = SeededRandom::new(7);
        for _ in 0..50 {
            let picked = select_reviewers(&candidates, 2, &rng);
            assert_eq!(picked.len(), 2);
            assert_ne!(picked[0], picked[1]);
            assert!(picked.iter().all(|p| candidates.contains(p)));
        }
        assert_eq!(candidates, ids(&["a", "b", "c", "d", "e"]));
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let candidates = ids(&["a", "b", "c", "d", "e", "f"]);
        let first: Vec<_> = {
            let rng = SeededRandom::new(42);
            (0..10).map(|_| select_reviewers(&candidates, 1, &rng)).collect()
        };
        let second: Vec<_> = {
            let rng = SeededRandom::new(42);
            (0..10).map(|_| select_reviewers(&candidates, 1, &rng)).collect()
        };
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_pick_roughly_uniform() {
        let candidates = ids(&["a", "b", "c", "d"]);
        let rng = SeededRandom::new(1);
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..4000 {
            let picked = select_reviewers(&candidates, 1, &rng);
            *counts.entry(picked[0].clone()).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            assert!((800..1200).contains(count), "skewed count {}", count);
        }
    }
}
