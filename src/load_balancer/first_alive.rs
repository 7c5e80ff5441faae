//! First-alive selection strategy.

use crate::config::PolicyKind;
use crate::load_balancer::SelectionPolicy;
use crate::registry::node::NodeRecord;

/// Always picks the first candidate in registry order.
///
/// Traffic moves to the next node only while the earlier ones are out.
#[derive(Debug, Default)]
pub struct FirstAlive;

impl FirstAlive {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionPolicy for FirstAlive {
    fn pick<'a>(&self, candidates: &'a [NodeRecord]) -> Option<&'a NodeRecord> {
        candidates.first()
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::FirstAlive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_support::healthy;

    #[test]
    fn test_first_alive() {
        let lb = FirstAlive::new();
        let nodes = vec![healthy(2), healthy(1)];
        assert_eq!(lb.pick(&nodes).unwrap().identity().port(), 2);
        assert_eq!(lb.pick(&nodes).unwrap().identity().port(), 2);
        assert!(lb.pick(&[]).is_none());
    }
}
