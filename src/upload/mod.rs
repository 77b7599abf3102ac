//! Crash report upload to the crash intake service.
//!
//! ## Protocol
//!
//! ```text
//!  reachability gate ──▶ filter + CBOR encode ──▶ POST <base>
//!                                                    │
//!                    ┌───────────────────────────────┼─────────────────┐
//!                    ▼                               ▼                 ▼
//!               empty body                   "<id> OOPSID"       "<id> CORE"
//!                 done                           done                 │
//!                                                                     ▼
//!                               POST <base>/<id>/submit-core/<arch>/<hex(identity)>
//! ```
//!
//! The second request carries the raw `CoreDump` field and is only made
//! when the server asks for it and the report holds both `CoreDump` and
//! `Architecture`.

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::IdentityError;
use crate::report::CrashReport;

/// The upload protocol
pub mod persister;

/// Interpretation of the intake service reply
pub mod response;

/// HTTP transport abstraction and its reqwest implementation
pub mod transport;

pub use persister::HttpReportPersister;
pub use response::{ServerCommand, ServerReply};
pub use transport::{PostRequest, PostResponse, ReqwestTransport, Transport};

/// Errors ending an upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("invalid upload destination {url}: {reason}")]
    InvalidDestination { url: String, reason: String },

    #[error("{host} is not reachable")]
    NotReachable { host: String },

    #[error("refusing to upload to {host} over a metered route")]
    MeteredRouteRejected { host: String },

    #[error("failed to encode crash report: {0}")]
    Encoding(String),

    #[error("request to {url} failed: {reason}")]
    TransportFailure { url: String, reason: String },

    #[error("request to {url} returned status {status}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("server requested the core dump but the report lacks {field}")]
    MissingCoreFields { field: &'static str },

    #[error("server reply carries an unusable OOPS id {oops_id:?}")]
    ResponseUnparseable { oops_id: String },

    #[error("report architecture {architecture:?} is not a plain URL path segment")]
    InvalidArchitecture { architecture: String },

    #[error("failed to establish device identity: {0}")]
    Identity(#[from] IdentityError),
}

/// Successful upload results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server accepted the report without further instructions
    Accepted,
    /// The server assigned an OOPS id
    OopsId(String),
    /// The server requested and received the core dump
    CoreSubmitted(String),
    /// The server replied with a command this agent does not know
    UnknownCommand { oops_id: String, command: String },
    /// The reply could not be split into an OOPS id and a command
    Unparseable(String),
}

impl UploadOutcome {
    /// OOPS id assigned by the server, if any
    pub fn oops_id(&self) -> Option<&str> {
        match self {
            UploadOutcome::OopsId(id) | UploadOutcome::CoreSubmitted(id) => Some(id),
            UploadOutcome::UnknownCommand { oops_id, .. } => Some(oops_id),
            UploadOutcome::Accepted | UploadOutcome::Unparseable(_) => None,
        }
    }
}

/// Abstracts persisting of crash reports
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportPersister: Send + Sync {
    /// Store `report` for further processing
    async fn persist(&self, report: &CrashReport) -> Result<UploadOutcome, UploadError>;
}
