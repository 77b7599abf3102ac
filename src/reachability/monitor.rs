use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::reachability::{Reachability, ReachabilityMonitor, RouteTablePoller};

/// Capacity of the state update channel
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Global connectivity as reported by the network backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Unknown,
    /// Not connected to any network
    None,
    /// Behind a captive portal
    Portal,
    /// Connected without access to the full internet
    Limited,
    /// Connected with access to the full internet
    Full,
}

/// Snapshot of the network state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkState {
    pub connectivity: Connectivity,
    /// The active route is metered
    pub metered: bool,
}

impl NetworkState {
    pub fn new(connectivity: Connectivity, metered: bool) -> Self {
        NetworkState { connectivity, metered }
    }

    pub fn reachability(&self) -> Reachability {
        match (self.connectivity, self.metered) {
            (Connectivity::Full, false) => Reachability::Reachable,
            (Connectivity::Full, true) => Reachability::Metered,
            _ => Reachability::Unreachable,
        }
    }
}

/// Reachability monitor fed by network state change notifications.
///
/// A listener task applies updates from a channel to a shared snapshot
/// under a write lock; [`check`](ReachabilityMonitor::check) only takes the
/// read lock. Dropping the monitor stops its background tasks.
pub struct NetworkStateMonitor {
    state: Arc<RwLock<NetworkState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl NetworkStateMonitor {
    /// Start listening for updates on `updates`, beginning at `initial`
    pub fn spawn(initial: NetworkState, mut updates: mpsc::Receiver<NetworkState>) -> Self {
        let state = Arc::new(RwLock::new(initial));
        let shared = Arc::clone(&state);

        let listener = tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                let mut current = shared.write().await;
                if *current != update {
                    info!("Network state changed: {:?} -> {:?}", *current, update);
                    *current = update;
                }
            }
            debug!("Network state listener stopped");
        });

        NetworkStateMonitor {
            state,
            tasks: vec![listener],
        }
    }

    /// Monitor the kernel routing table, polling every `interval`
    pub fn with_route_table(poller: RouteTablePoller, interval: Duration) -> Self {
        let initial = poller.snapshot();
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);

        let mut monitor = NetworkStateMonitor::spawn(initial, rx);
        monitor.tasks.push(poller.spawn(initial, tx, interval));
        monitor
    }

    /// Current, possibly slightly stale, network state
    pub async fn snapshot(&self) -> NetworkState {
        *self.state.read().await
    }
}

impl Drop for NetworkStateMonitor {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[async_trait]
impl ReachabilityMonitor for NetworkStateMonitor {
    async fn check(&self, host: &str) -> Reachability {
        let reachability = self.state.read().await.reachability();
        debug!("Reachability of {}: {:?}", host, reachability);
        reachability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_for(monitor: &NetworkStateMonitor, expected: Reachability) -> bool {
        for _ in 0..100 {
            if monitor.check("example.com").await == expected {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }

    #[test]
    fn test_state_to_reachability() {
        assert_eq!(NetworkState::default().reachability(), Reachability::Unreachable);
        assert_eq!(
            NetworkState::new(Connectivity::Limited, false).reachability(),
            Reachability::Unreachable
        );
        assert_eq!(
            NetworkState::new(Connectivity::Full, false).reachability(),
            Reachability::Reachable
        );
        assert_eq!(
            NetworkState::new(Connectivity::Full, true).reachability(),
            Reachability::Metered
        );
        // A metered flag without a route means nothing.
        assert_eq!(
            NetworkState::new(Connectivity::None, true).reachability(),
            Reachability::Unreachable
        );
    }

    #[tokio::test]
    async fn test_listener_applies_updates() {
        let (tx, rx) = mpsc::channel(4);
        let monitor = NetworkStateMonitor::spawn(NetworkState::default(), rx);

        assert_eq!(monitor.check("example.com").await, Reachability::Unreachable);

        tx.send(NetworkState::new(Connectivity::Full, false)).await.unwrap();
        assert!(wait_for(&monitor, Reachability::Reachable).await);

        tx.send(NetworkState::new(Connectivity::Full, true)).await.unwrap();
        assert!(wait_for(&monitor, Reachability::Metered).await);
    }

    #[tokio::test]
    async fn test_state_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(4);
        let monitor = NetworkStateMonitor::spawn(NetworkState::new(Connectivity::Full, false), rx);
        drop(tx);

        tokio::task::yield_now().await;

        assert_eq!(
            monitor.snapshot().await,
            NetworkState::new(Connectivity::Full, false)
        );
    }
}
