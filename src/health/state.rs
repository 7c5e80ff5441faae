//! Node liveness state machine.
//!
//! # States
//! - Unknown: never probed since registration, not selectable
//! - Healthy: receives traffic
//! - Unhealthy: excluded from selection
//!
//! # State Transitions
//! ```text
//! Unknown   → Healthy:   first successful probe
//! Unknown   → Unhealthy: first failed probe
//! Healthy   → Unhealthy: consecutive failures >= threshold
//! Unhealthy → Healthy:   any successful probe
//! ```
//!
//! Hysteresis only guards the Healthy → Unhealthy edge; a single success
//! always restores a node and resets its failure count.

use crate::registry::node::Liveness;

/// Result of one probe, after timeouts have been folded into failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    Success,
    Failure,
}

/// Compute `(liveness, consecutive_failures)` after one probe.
pub fn next_liveness(
    current: Liveness,
    consecutive_failures: u32,
    verdict: ProbeVerdict,
    failure_threshold: u32,
) -> (Liveness, u32) {
    match verdict {
        ProbeVerdict::Success => (Liveness::Healthy, 0),
        ProbeVerdict::Failure => {
            let failures = consecutive_failures.saturating_add(1);
            let next = match current {
                Liveness::Healthy if failures < failure_threshold.max(1) => Liveness::Healthy,
                _ => Liveness::Unhealthy,
            };
            (next, failures)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_restores_immediately() {
        assert_eq!(
            next_liveness(Liveness::Unhealthy, 7, ProbeVerdict::Success, 3),
            (Liveness::Healthy, 0)
        );
        assert_eq!(
            next_liveness(Liveness::Unknown, 0, ProbeVerdict::Success, 3),
            (Liveness::Healthy, 0)
        );
    }

    #[test]
    fn test_threshold_guards_healthy() {
        let (s, f) = next_liveness(Liveness::Healthy, 0, ProbeVerdict::Failure, 3);
        assert_eq!((s, f), (Liveness::Healthy, 1));
        let (s, f) = next_liveness(s, f, ProbeVerdict::Failure, 3);
        assert_eq!((s, f), (Liveness::Healthy, 2));
        let (s, f) = next_liveness(s, f, ProbeVerdict::Failure, 3);
        assert_eq!((s, f), (Liveness::Unhealthy, 3));
    }

    #[test]
    fn test_isolated_failure_does_not_flap() {
        let threshold = 3;
        let (mut s, mut f) = next_liveness(Liveness::Healthy, 0, ProbeVerdict::Failure, threshold);
        for _ in 0..threshold - 1 {
            (s, f) = next_liveness(s, f, ProbeVerdict::Success, threshold);
            assert_eq!(s, Liveness::Healthy);
        }
        assert_eq!(f, 0);
    }

    #[test]
    fn test_unknown_fails_fast() {
        assert_eq!(
            next_liveness(Liveness::Unknown, 0, ProbeVerdict::Failure, 3),
            (Liveness::Unhealthy, 1)
        );
    }

    #[test]
    fn test_threshold_one() {
        assert_eq!(
            next_liveness(Liveness::Healthy, 0, ProbeVerdict::Failure, 1),
            (Liveness::Unhealthy, 1)
        );
    }
}
