use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::constants::{PROC_NET_IPV6_ROUTE, PROC_NET_ROUTE, SYS_CLASS_NET};
use crate::reachability::{Connectivity, NetworkState};

/// Route is up (RTF_UP from include/uapi/linux/route.h)
const RTF_UP: u32 = 0x0001;

/// Route rejects traffic (RTF_REJECT)
const RTF_REJECT: u32 = 0x0200;

/// Destination of the default route in /proc/net/route
const DEFAULT_DESTINATION: &str = "00000000";

/// `::` in /proc/net/ipv6_route
const DEFAULT_DESTINATION_V6: &str = "00000000000000000000000000000000";

/// Derives the network state from the kernel routing table.
///
/// The destination counts as reachable when an active IPv4 or IPv6
/// default route exists. The route is metered when its interface is a
/// WWAN device.
#[derive(Debug, Clone)]
pub struct RouteTablePoller {
    route_table: PathBuf,
    ipv6_route_table: Option<PathBuf>,
    net_class_dir: PathBuf,
}

/// One default route entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct DefaultRoute {
    interface: String,
    metric: u32,
}

impl Default for RouteTablePoller {
    fn default() -> Self {
        RouteTablePoller::new(PROC_NET_ROUTE, SYS_CLASS_NET)
            .with_ipv6_route_table(PROC_NET_IPV6_ROUTE)
    }
}

impl RouteTablePoller {
    pub fn new(route_table: impl Into<PathBuf>, net_class_dir: impl Into<PathBuf>) -> Self {
        RouteTablePoller {
            route_table: route_table.into(),
            ipv6_route_table: None,
            net_class_dir: net_class_dir.into(),
        }
    }

    /// Also consider default routes from an IPv6 table in `/proc/net/ipv6_route` format
    pub fn with_ipv6_route_table(mut self, path: impl Into<PathBuf>) -> Self {
        self.ipv6_route_table = Some(path.into());
        self
    }

    /// Read the current network state
    pub fn snapshot(&self) -> NetworkState {
        let ipv4 = match fs::read_to_string(&self.route_table) {
            Ok(content) => Some(best_default_route(&content)),
            Err(e) => {
                warn!("Failed to read routing table {}: {}", self.route_table.display(), e);
                None
            }
        };
        let ipv6 = self.ipv6_route_table.as_ref().and_then(|path| match fs::read_to_string(path) {
            Ok(content) => Some(best_default_route_v6(&content)),
            Err(e) => {
                debug!("Failed to read IPv6 routing table {}: {}", path.display(), e);
                None
            }
        });

        if ipv4.is_none() && ipv6.is_none() {
            return NetworkState::default();
        }

        let best = ipv4
            .flatten()
            .into_iter()
            .chain(ipv6.flatten())
            .min_by_key(|route| route.metric);

        match best {
            Some(route) => {
                let metered = self.is_metered(&route.interface);
                debug!("Default route via {} (metered: {})", route.interface, metered);
                NetworkState::new(Connectivity::Full, metered)
            }
            None => NetworkState::new(Connectivity::None, false),
        }
    }

    fn is_metered(&self, interface: &str) -> bool {
        if interface.starts_with("wwan") {
            return true;
        }

        let uevent = self.net_class_dir.join(interface).join("uevent");
        is_wwan_uevent(&uevent)
    }

    /// Poll the routing table every `period`, sending each state change to `tx`.
    ///
    /// `last` is the state the receiver already knows about. The task ends
    /// once the receiving side is gone.
    pub fn spawn(
        self,
        last: NetworkState,
        tx: mpsc::Sender<NetworkState>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut last = last;
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }

                let state = self.snapshot();
                if state != last {
                    if tx.send(state).await.is_err() {
                        break;
                    }
                    last = state;
                }
            }
            debug!("Route table poller stopped");
        })
    }
}

fn is_wwan_uevent(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| content.lines().any(|line| line.trim() == "DEVTYPE=wwan"))
        .unwrap_or(false)
}

/// Pick the active default route with the lowest metric
fn best_default_route(content: &str) -> Option<DefaultRoute> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 7 || columns[1] != DEFAULT_DESTINATION {
                return None;
            }

            let flags = u32::from_str_radix(columns[3], 16).ok()?;
            if flags & RTF_UP == 0 {
                return None;
            }

            Some(DefaultRoute {
                interface: columns[0].to_string(),
                metric: columns[6].parse().unwrap_or(u32::MAX),
            })
        })
        .min_by_key(|route| route.metric)
}

/// Pick the active default route with the lowest metric from the IPv6 table.
///
/// Columns: destination, prefix length, source, source prefix length, next
/// hop, metric, refcount, use count, flags, interface. All numbers are hex.
fn best_default_route_v6(content: &str) -> Option<DefaultRoute> {
    content
        .lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 10 || columns[0] != DEFAULT_DESTINATION_V6 || columns[1] != "00" {
                return None;
            }

            let flags = u32::from_str_radix(columns[8], 16).ok()?;
            if flags & RTF_UP == 0 || flags & RTF_REJECT != 0 || columns[9] == "lo" {
                return None;
            }

            Some(DefaultRoute {
                interface: columns[9].to_string(),
                metric: u32::from_str_radix(columns[5], 16).unwrap_or(u32::MAX),
            })
        })
        .min_by_key(|route| route.metric)
}
