//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::PolicyKind;
use crate::load_balancer::SelectionPolicy;
use crate::registry::node::NodeRecord;

/// Round-robin selector.
/// Stores an internal counter to rotate through candidates.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionPolicy for RoundRobin {
    fn pick<'a>(&self, candidates: &'a [NodeRecord]) -> Option<&'a NodeRecord> {
        if candidates.is_empty() {
            return None;
        }

        // Exactly one increment per call, so concurrent callers get distinct slots.
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates.get(index)
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::RoundRobin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::healthy;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let nodes = vec![healthy(8080), healthy(8081)];

        assert_eq!(lb.pick(&nodes).unwrap().identity().port(), 8080);
        assert_eq!(lb.pick(&nodes).unwrap().identity().port(), 8081);
        assert_eq!(lb.pick(&nodes).unwrap().identity().port(), 8080);
    }

    #[test]
    fn test_single_and_empty() {
        let lb = RoundRobin::new();
        assert!(lb.pick(&[]).is_none());

        let nodes = vec![healthy(1)];
        for _ in 0..5 {
            assert_eq!(lb.pick(&nodes).unwrap().identity().port(), 1);
        }
    }

    #[test]
    fn test_concurrent_picks_are_even() {
        let lb = Arc::new(RoundRobin::new());
        let nodes = Arc::new(vec![healthy(1), healthy(2), healthy(3)]);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lb = lb.clone();
                let nodes = nodes.clone();
                std::thread::spawn(move || {
                    (0..300)
                        .map(|_| lb.pick(&nodes).unwrap().identity().port())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<u16, usize> = HashMap::new();
        for handle in handles {
            for port in handle.join().unwrap() {
                *counts.entry(port).or_default() += 1;
            }
        }
        assert_eq!(counts.values().copied().collect::<Vec<_>>(), vec![400, 400, 400]);
    }
}
