//! Channel carrying discovered node lists to the scheduler.

use tokio::sync::mpsc;

use crate::config::schema::BalancerConfig;
use crate::registry::node::NodeIdentity;

/// Publishing half, cloneable across discovery sources.
#[derive(Debug, Clone)]
pub struct DiscoveryFeed {
    tx: mpsc::UnboundedSender<Vec<NodeIdentity>>,
}

/// Receiving half, owned by the health scheduler.
#[derive(Debug)]
pub struct DiscoveryUpdates {
    rx: mpsc::UnboundedReceiver<Vec<NodeIdentity>>,
}

/// Create a connected feed/updates pair.
pub fn channel() -> (DiscoveryFeed, DiscoveryUpdates) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DiscoveryFeed { tx }, DiscoveryUpdates { rx })
}

impl DiscoveryFeed {
    /// Publish the complete current node list. Returns false once the
    /// scheduler has gone away.
    pub fn publish(&self, nodes: Vec<NodeIdentity>) -> bool {
        self.tx.send(nodes).is_ok()
    }
}

impl DiscoveryUpdates {
    /// Drain pending lists without waiting and return only the newest.
    pub fn latest(&mut self) -> Option<Vec<NodeIdentity>> {
        let mut newest = None;
        while let Ok(nodes) = self.rx.try_recv() {
            newest = Some(nodes);
        }
        newest
    }
}

/// Turn reloaded configurations into node lists on `feed`.
///
/// Runs until the config channel closes or the scheduler drops its updates.
pub async fn forward_config_updates(
    mut configs: mpsc::UnboundedReceiver<BalancerConfig>,
    feed: DiscoveryFeed,
) {
    while let Some(config) = configs.recv().await {
        match config.balancer.nodes() {
            Ok(nodes) => {
                tracing::info!(count = nodes.len(), "Publishing discovered node list");
                if !feed.publish(nodes) {
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring reloaded endpoint list"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::node::Protocol;

    #[test]
    fn test_latest_keeps_newest() {
        let (feed, mut updates) = channel();
        assert!(updates.latest().is_none());

        feed.publish(vec![NodeIdentity::new(Protocol::Http, "a", 1)]);
        feed.publish(vec![
            NodeIdentity::new(Protocol::Http, "b", 2),
            NodeIdentity::new(Protocol::Http, "c", 3),
        ]);

        let latest = updates.latest().unwrap();
        assert_eq!(latest.len(), 2);
        assert!(updates.latest().is_none());
    }

    #[tokio::test]
    async fn test_forward_config_updates() {
        let (feed, mut updates) = channel();
        let (config_tx, config_rx) = mpsc::unbounded_channel();

        let mut config = BalancerConfig::default();
        config.balancer.endpoints = vec!["tcp://db-9:9000".to_string()];
        config_tx.send(config).unwrap();
        drop(config_tx);

        forward_config_updates(config_rx, feed).await;

        let latest = updates.latest().unwrap();
        assert_eq!(latest, vec![NodeIdentity::new(Protocol::Tcp, "db-9", 9000)]);
    }
}
