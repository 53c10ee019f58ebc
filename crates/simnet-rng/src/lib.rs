// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// simnet: a parallel stochastic simulator for networked CTMC population models.
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

//! Deterministic Mersenne Twister RNG streams.
//!
//! One master stream is seeded from the caller's 64-bit seed. Each worker
//! thread's stream is drawn from the master, once, before any node is
//! stepped — mirroring `gsl_rng_uniform_int(master, gsl_rng_max(master))`
//! seeding the original solver's per-thread streams. Given the same master
//! seed and the same thread count, the sequence of per-thread seeds (and
//! hence every downstream draw) is reproducible bit-for-bit.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Hypergeometric};
use rand_mt::Mt19937GenRand32;
use simnet_error::{SimError, SimResult};

/// A single Mersenne Twister stream and the sampling primitives the solver
/// needs from it: uniform-positive reals, bounded uniform integers, and
/// hypergeometric draws.
pub struct RngStream(Mt19937GenRand32);

impl RngStream {
    fn from_seed_u32(seed: u32) -> Self {
        Self(Mt19937GenRand32::new(seed))
    }

    /// A uniform draw on `(0, 1]`, used for both the exponential
    /// waiting-time draw and the cumulative-rate transition search.
    /// Resamples on the zero outcome so callers never divide by, or take
    /// the log of, zero.
    pub fn uniform_pos(&mut self) -> f64 {
        loop {
            let x = self.0.gen::<f64>();
            if x > 0.0 {
                return x;
            }
        }
    }

    /// A uniform draw on `[0, bound)`. `bound` must be positive.
    pub fn uniform_int(&mut self, bound: u32) -> u32 {
        debug_assert!(bound > 0);
        self.0.gen_range(0..bound)
    }

    /// A hypergeometric draw: the number of type-1 successes in a sample of
    /// size `n` drawn without replacement from a population of `k1`
    /// type-1 and `k2` type-2 individuals. The caller's `node`/`select`
    /// are only used to label the error if the draw is infeasible.
    pub fn hypergeometric(
        &mut self,
        node: usize,
        select: usize,
        k1: u64,
        k2: u64,
        n: u64,
    ) -> SimResult<u64> {
        let dist = Hypergeometric::new(k1 + k2, k1, n).map_err(|_| SimError::SampleSelect {
            node,
            select,
            requested: n as i64,
            available: (k1 + k2) as i64,
        })?;
        Ok(dist.sample(&mut self.0))
    }

    /// Draws the next raw 32-bit word, for callers that need direct access
    /// to the stream (e.g. deriving a child seed).
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }
}

/// Owns the master RNG stream and hands out deterministic per-thread
/// children.
pub struct RngFacility {
    master: RngStream,
}

impl RngFacility {
    /// Seeds the master stream. A zero seed is accepted as-is: unlike the
    /// original solver, this facility never falls back to a wall-clock
    /// seed, so that "seed 0" stays reproducible.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let folded = (seed ^ (seed >> 32)) as u32;
        Self {
            master: RngStream::from_seed_u32(folded),
        }
    }

    /// Draws one child stream per worker thread, in thread order, from the
    /// master stream. Must be called exactly once per run, before any
    /// worker thread starts stepping nodes.
    pub fn spawn_threads(&mut self, nthread: usize) -> SimResult<Vec<RngStream>> {
        if nthread < 1 {
            return Err(SimError::UnsupportedParallelization { nthread });
        }
        Ok((0..nthread)
            .map(|_| RngStream::from_seed_u32(self.master.next_u32()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_child_sequence() {
        let mut a = RngFacility::new(42);
        let mut b = RngFacility::new(42);
        let mut sa = a.spawn_threads(4).unwrap();
        let mut sb = b.spawn_threads(4).unwrap();
        for (sa, sb) in sa.iter_mut().zip(sb.iter_mut()) {
            assert_eq!(sa.uniform_pos(), sb.uniform_pos());
            assert_eq!(sa.uniform_int(1000), sb.uniform_int(1000));
        }
    }

    #[test]
    fn different_threads_diverge() {
        let mut f = RngFacility::new(7);
        let mut streams = f.spawn_threads(2).unwrap();
        let (first, rest) = streams.split_at_mut(1);
        let a = first[0].uniform_pos();
        let b = rest[0].uniform_pos();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_zero_threads() {
        let mut f = RngFacility::new(1);
        let err = f.spawn_threads(0).unwrap_err();
        assert!(matches!(err, SimError::UnsupportedParallelization { nthread: 0 }));
    }

    #[test]
    fn uniform_pos_never_zero() {
        let mut f = RngFacility::new(99);
        let mut s = f.spawn_threads(1).unwrap().remove(0);
        for _ in 0..10_000 {
            assert!(s.uniform_pos() > 0.0);
        }
    }

    #[test]
    fn hypergeometric_mean_matches_theory() {
        let mut f = RngFacility::new(123);
        let mut s = f.spawn_threads(1).unwrap().remove(0);
        let (k1, k2, n) = (50u64, 50u64, 40u64);
        let draws = 20_000;
        let total: u64 = (0..draws)
            .map(|_| s.hypergeometric(0, 0, k1, k2, n).unwrap())
            .sum();
        let mean = total as f64 / draws as f64;
        // Theoretical mean of Hyp(50, 50, 40) is n * k1 / (k1 + k2) = 20.
        assert!((mean - 20.0).abs() < 0.2, "mean {mean} too far from 20.0");
    }
}
