//! Network reachability of the upload destination.
//!
//! Crash data is only sent when the destination is reachable over an
//! unmetered route. The [`ReachabilityMonitor`] capability answers that
//! question; [`NetworkStateMonitor`] backs it with a background listener
//! that keeps a shared snapshot of the network state up to date.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  NetworkState  ┌────────────────────┐
//! │ RouteTablePoller │───── mpsc ────▶│  listener task     │
//! └──────────────────┘                └─────────┬──────────┘
//!                                               │ write lock
//!                                     ┌─────────▼──────────┐
//!                  check(host) ──────▶│ RwLock<NetworkState>│
//!                   read lock         └────────────────────┘
//! ```
//!
//! Readers may observe a slightly stale state until a change notification
//! has been applied.

use async_trait::async_trait;

/// Listener-backed monitor and the network state it tracks
pub mod monitor;

/// Linux routing table backend
pub mod route_table;

pub use monitor::{Connectivity, NetworkState, NetworkStateMonitor};
pub use route_table::RouteTablePoller;

/// How a destination host can currently be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reachability {
    Unreachable,
    /// Reachable over a route without usage charges
    Reachable,
    /// Reachable, but only over a metered route such as WWAN
    Metered,
}

/// Capability reporting whether a host is reachable
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReachabilityMonitor: Send + Sync {
    async fn check(&self, host: &str) -> Reachability;
}

/// Monitor that reports every host as reachable over an unmetered route.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReachable;

#[async_trait]
impl ReachabilityMonitor for AlwaysReachable {
    async fn check(&self, _host: &str) -> Reachability {
        Reachability::Reachable
    }
}

#[async_trait]
impl<T: ReachabilityMonitor + ?Sized> ReachabilityMonitor for std::sync::Arc<T> {
    async fn check(&self, host: &str) -> Reachability {
        (**self).check(host).await
    }
}
