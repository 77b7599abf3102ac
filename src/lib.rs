//! # crash_agent
//!
//! A crash-telemetry agent: it tags crash reports with a stable,
//! privacy-preserving device identity and submits them to a crash intake
//! service, sending the core dump only when the server asks for it.
//!
//! ## Overview
//!
//! ```text
//!  crash dir ──▶ sweep ──▶ parse ──▶ field policy ──▶ upload ──▶ intake service
//!                                                       ▲
//!                          identity chain + cache ──────┤
//!                          reachability monitor ────────┘
//! ```
//!
//! Reports are processed one at a time, in directory order. A report that
//! fails to parse or upload never stops the sweep.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use crash_agent::config::AgentConfig;
//! use crash_agent::identity::default_identifier;
//! use crash_agent::reachability::AlwaysReachable;
//! use crash_agent::report::{FieldPolicy, ReportParser};
//! use crash_agent::sweep::{for_each_report_in_dir, UploadVisitor};
//! use crash_agent::upload::{HttpReportPersister, ReqwestTransport};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AgentConfig::default();
//! let persister = HttpReportPersister::new(
//!     &config.submit_url,
//!     config.agent_version.clone(),
//!     FieldPolicy::from_config(&config.policy),
//!     Arc::new(default_identifier(&config.identity)),
//!     Arc::new(ReqwestTransport::new(&config.http)?),
//!     Arc::new(AlwaysReachable),
//! )?;
//!
//! let mut visitor = UploadVisitor::new(persister, &config.crash_dir, false, std::io::stdout());
//! for_each_report_in_dir(&config.crash_dir, ".crash", ReportParser::default(), &mut visitor).await;
//!
//! println!("Uploaded {} reports", visitor.summary().uploaded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: YAML configuration
//! - [`identity`]: Device identity sources, hashing and caching
//! - [`report`]: Crash report model, parser and upload field policy
//! - [`reachability`]: Network reachability of the upload destination
//! - [`upload`]: The upload protocol and its HTTP transport
//! - [`sweep`]: Directory iteration and the upload and listing visitors
//! - [`collectors`]: System and kernel log collectors
//! - [`packaging`]: Package ownership of crashed executables
//! - [`utils`]: Hashing and atomic file writes
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Log collectors
pub mod collectors;

/// Configuration management
pub mod config;

/// Application-wide constants
pub mod constants;

/// Device identity
pub mod identity;

/// Installed package lookup
pub mod packaging;

/// Network reachability
pub mod reachability;

/// Crash report model and field policy
pub mod report;

/// Directory sweep
pub mod sweep;

/// Crash report upload
pub mod upload;

/// Utility functions
pub mod utils;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
