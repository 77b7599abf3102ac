use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Url;

use crate::constants::{
    AGENT_VERSION_HEADER, ARCHITECTURE_FIELD, CORE_DUMP_FIELD, SUBMIT_CORE_SEGMENT,
    UPLOAD_CONTENT_TYPE,
};
use crate::identity::{Identifier, Identity};
use crate::reachability::{Reachability, ReachabilityMonitor};
use crate::report::{CrashReport, FieldPolicy};
use crate::upload::response::{ServerCommand, ServerReply};
use crate::upload::transport::{PostRequest, PostResponse, Transport};
use crate::upload::{ReportPersister, UploadError, UploadOutcome};

/// Uploads crash reports to the crash intake service over HTTP.
///
/// Reports are only sent when the destination host is reachable over an
/// unmetered route. A failed submission is never followed by a core dump
/// upload, and nothing is retried.
pub struct HttpReportPersister {
    submit_url: String,
    host: String,
    agent_version: String,
    policy: FieldPolicy,
    identifier: Arc<dyn Identifier>,
    transport: Arc<dyn Transport>,
    monitor: Arc<dyn ReachabilityMonitor>,
}

impl HttpReportPersister {
    /// Create a persister for the service at `submit_url`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::InvalidDestination`] if `submit_url` is not an
    /// absolute URL with a host.
    pub fn new(
        submit_url: &str,
        agent_version: impl Into<String>,
        policy: FieldPolicy,
        identifier: Arc<dyn Identifier>,
        transport: Arc<dyn Transport>,
        monitor: Arc<dyn ReachabilityMonitor>,
    ) -> Result<Self, UploadError> {
        let invalid = |reason: String| UploadError::InvalidDestination {
            url: submit_url.to_string(),
            reason,
        };

        let parsed = Url::parse(submit_url).map_err(|e| invalid(e.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();

        Ok(HttpReportPersister {
            submit_url: submit_url.trim_end_matches('/').to_string(),
            host,
            agent_version: agent_version.into(),
            policy,
            identifier,
            transport,
            monitor,
        })
    }

    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// URL receiving the core dump for `oops_id`.
    ///
    /// The OOPS id comes from the server and the architecture from the
    /// report, so both must be plain path segments.
    pub fn core_url(
        &self,
        oops_id: &str,
        architecture: &str,
        identity: &Identity,
    ) -> Result<String, UploadError> {
        if !is_path_segment(oops_id) {
            return Err(UploadError::ResponseUnparseable { oops_id: oops_id.to_string() });
        }
        if !is_path_segment(architecture) {
            return Err(UploadError::InvalidArchitecture {
                architecture: architecture.to_string(),
            });
        }

        Ok(format!(
            "{}/{}/{}/{}/{}",
            self.submit_url,
            oops_id,
            SUBMIT_CORE_SEGMENT,
            architecture,
            identity.to_hex()
        ))
    }

    async fn ensure_reachable(&self) -> Result<(), UploadError> {
        match self.monitor.check(&self.host).await {
            Reachability::Reachable => Ok(()),
            Reachability::Unreachable => {
                info!("Skipping upload, {} is not reachable", self.host);
                Err(UploadError::NotReachable { host: self.host.clone() })
            }
            Reachability::Metered => {
                info!("Skipping upload, route to {} is metered", self.host);
                Err(UploadError::MeteredRouteRejected { host: self.host.clone() })
            }
        }
    }

    /// POST `body` to `url`, treating any non-2xx status as failure
    async fn post(&self, url: String, body: Vec<u8>) -> Result<PostResponse, UploadError> {
        let request = PostRequest::new(url.clone(), body)
            .header(AGENT_VERSION_HEADER, self.agent_version.as_str())
            .header("Content-Type", UPLOAD_CONTENT_TYPE);

        let response = self.transport.post(request).await?;

        if !response.is_success() {
            return Err(UploadError::UnexpectedStatus {
                url,
                status: response.status,
            });
        }

        Ok(response)
    }

    async fn upload_core(&self, report: &CrashReport, oops_id: String) -> Result<UploadOutcome, UploadError> {
        let core = report
            .first_non_empty(CORE_DUMP_FIELD)
            .ok_or(UploadError::MissingCoreFields { field: CORE_DUMP_FIELD })?;
        let architecture = report
            .first_non_empty(ARCHITECTURE_FIELD)
            .ok_or(UploadError::MissingCoreFields { field: ARCHITECTURE_FIELD })?;

        let identity = self.identifier.identify()?;
        let url = self.core_url(&oops_id, architecture, &identity)?;

        debug!("Server requested core dump for {} ({} bytes)", oops_id, core.len());
        self.post(url, core.as_bytes().to_vec()).await?;

        info!("Uploaded core dump for OOPS ID {}", oops_id);
        Ok(UploadOutcome::CoreSubmitted(oops_id))
    }
}

/// Whether `value` can be placed in a URL path without changing its shape
fn is_path_segment(value: &str) -> bool {
    !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}

#[async_trait]
impl ReportPersister for HttpReportPersister {
    async fn persist(&self, report: &CrashReport) -> Result<UploadOutcome, UploadError> {
        self.ensure_reachable().await?;

        let body = self
            .policy
            .encode(report)
            .map_err(|e| UploadError::Encoding(e.to_string()))?;

        let response = self.post(self.submit_url.clone(), body).await?;

        match ServerReply::parse(&response.body) {
            ServerReply::Empty => Ok(UploadOutcome::Accepted),
            ServerReply::Command { oops_id, command } => match command {
                ServerCommand::OopsId => {
                    info!("Server reported OOPS ID: {}", oops_id);
                    Ok(UploadOutcome::OopsId(oops_id))
                }
                ServerCommand::Core => self.upload_core(report, oops_id).await,
                ServerCommand::Other(command) => {
                    warn!("Ignoring unknown server command {} for OOPS ID {}", command, oops_id);
                    Ok(UploadOutcome::UnknownCommand { oops_id, command })
                }
            },
            ServerReply::Unparseable(text) => {
                warn!("Ignoring unparseable server reply: {:?}", text);
                Ok(UploadOutcome::Unparseable(text))
            }
        }
    }
}
