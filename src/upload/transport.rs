use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use crate::config::HttpConfig;
use crate::upload::UploadError;

/// A single HTTP POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl PostRequest {
    pub fn new(url: impl Into<String>, body: Vec<u8>) -> Self {
        PostRequest {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PostResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends POST requests to the intake service.
///
/// Implementations report connection level failures as
/// [`UploadError::TransportFailure`]; any HTTP status is a response.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, request: PostRequest) -> Result<PostResponse, UploadError>;
}

/// reqwest based transport with bounded connect and request times.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> reqwest::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: PostRequest) -> Result<PostResponse, UploadError> {
        let PostRequest { url, headers, body } = request;
        let failure = |e: reqwest::Error| UploadError::TransportFailure {
            url: url.clone(),
            reason: e.to_string(),
        };

        debug!("POST {} ({} bytes)", url, body.len());

        let mut builder = self.client.post(url.as_str());
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(body).send().await.map_err(failure)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(failure)?;

        Ok(PostResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers() {
        let request = PostRequest::new("http://localhost/", vec![1])
            .header("X-Whoopsie-Version", "0.2.49")
            .header("Content-Type", "application/octet-stream");

        assert_eq!(request.header_value("x-whoopsie-version"), Some("0.2.49"));
        assert_eq!(request.header_value("Accept"), None);
    }

    #[test]
    fn test_success_range() {
        assert!(PostResponse { status: 200, body: Vec::new() }.is_success());
        assert!(PostResponse { status: 204, body: Vec::new() }.is_success());
        assert!(!PostResponse { status: 302, body: Vec::new() }.is_success());
        assert!(!PostResponse { status: 500, body: Vec::new() }.is_success());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_failure() {
        let transport = ReqwestTransport::new(&HttpConfig::default()).unwrap();
        // Port 9 (discard) is closed on test machines.
        let err = transport
            .post(PostRequest::new("http://127.0.0.1:9/", Vec::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::TransportFailure { .. }));
    }
}
