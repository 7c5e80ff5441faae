//! Random load balancing strategy.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

use crate::config::PolicyKind;
use crate::load_balancer::SelectionPolicy;
use crate::registry::node::NodeRecord;

/// Uniform random selector over an injected generator.
///
/// Each instance owns its generator; seed it for reproducible sequences.
#[derive(Debug)]
pub struct Random<R = StdRng> {
    rng: Mutex<R>,
}

impl Random<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl<R: RngCore> Random<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl<R> SelectionPolicy for Random<R>
where
    R: RngCore + Send + Debug,
{
    fn pick<'a>(&self, candidates: &'a [NodeRecord]) -> Option<&'a NodeRecord> {
        if candidates.is_empty() {
            return None;
        }

        let index = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..candidates.len());
        candidates.get(index)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Random
    }
}
