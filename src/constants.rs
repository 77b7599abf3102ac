//! Global constants for the crash agent.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Crash report constants
/// Default directory scanned for crash reports
pub const DEFAULT_CRASH_DIR: &str = "/var/crash";

/// File name suffix identifying crash reports in the crash directory
pub const REPORT_SUFFIX: &str = ".crash";

/// Size cap for fields that are neither always accepted nor always rejected (1MB)
pub const MAX_FIELD_SIZE: usize = 1024 * 1024;

/// Report field carrying the raw core dump
pub const CORE_DUMP_FIELD: &str = "CoreDump";

/// Report field carrying the machine architecture
pub const ARCHITECTURE_FIELD: &str = "Architecture";

/// Free form note attached to a report by the crash handler
pub const ANNOTATION_FIELD: &str = "Annotation";

// Upload constants
/// Default crash intake service
pub const DEFAULT_SUBMIT_URL: &str = "https://daisy.ubuntu.com";

/// Header announcing the agent version to the intake service
pub const AGENT_VERSION_HEADER: &str = "X-Whoopsie-Version";

/// Version reported in the agent version header unless configured otherwise
pub const DEFAULT_AGENT_VERSION: &str = "0.2.49";

/// Content type of both the report and the core dump upload bodies
pub const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

/// Path segment of the core dump follow-up request
pub const SUBMIT_CORE_SEGMENT: &str = "submit-core";

/// Server command confirming the report and carrying the OOPS id
pub const COMMAND_OOPS_ID: &str = "OOPSID";

/// Server command requesting the core dump
pub const COMMAND_CORE: &str = "CORE";

// Timeout constants
/// Default connection timeout in seconds
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Default overall request timeout in seconds (core dumps can be large)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Interval between route table polls in seconds
pub const REACHABILITY_POLL_INTERVAL_SECS: u64 = 10;

// Identity constants
/// Cache file holding the hashed device identity
pub const DEFAULT_IDENTITY_CACHE: &str = "/var/lib/whoopsie/whoopsie-id";

/// Sysfs directory listing network interfaces
pub const SYS_CLASS_NET: &str = "/sys/class/net";

/// DMI product UUID exposed by the firmware
pub const PRODUCT_UUID_PATH: &str = "/sys/class/dmi/id/product_uuid";

/// Vendor serial number exposed by Android USB gadgets
pub const VENDOR_SERIAL_PATH: &str = "/sys/class/android_usb/android0/iSerial";

/// ARPHRD_ETHER from include/uapi/linux/if_arp.h
pub const ARPHRD_ETHER: i32 = 1;

// System collaborator constants
/// Kernel routing table
pub const PROC_NET_ROUTE: &str = "/proc/net/route";

/// Kernel IPv6 routing table
pub const PROC_NET_IPV6_ROUTE: &str = "/proc/net/ipv6_route";

/// dpkg runtime directory
pub const DPKG_RUNTIME_DIR: &str = "/var/lib/dpkg";

/// System log file
pub const SYSLOG_PATH: &str = "/var/log/syslog";

/// Kernel log buffer device
pub const KMSG_PATH: &str = "/dev/kmsg";

/// Buffer size for a single /dev/kmsg record
pub const KMSG_RECORD_SIZE: usize = 8 * 1024;
