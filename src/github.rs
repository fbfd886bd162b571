use async_trait::async_trait;
use reqwest::header::{ACCEPT, LINK};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;

/// Media type returning starred repositories together with `starred_at`
pub const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

/// Media type returning raw file contents
pub const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";

const API_VERSION: &str = "2022-11-28";

/// Errors raised while talking to the GitHub API
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A response reduced to what the sync engine looks at
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status: u16,
    pub link: Option<String>,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated GET against the GitHub API.
///
/// Any HTTP status is returned as `Ok`; only connection, timeout, and body
/// read failures are errors. Callers decide what a status means to them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, accept: &str) -> Result<Response, FetchError>;
}

/// reqwest-backed transport with a bearer token and a per-request timeout
pub struct HttpTransport {
    client: reqwest::Client,
    token: String,
}

impl HttpTransport {
    pub fn new(token: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("starsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            token: token.into(),
        })
    }

    /// Build a transport from configuration, reading the credential from the environment
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let token = config.token()?;
        Self::new(token, config.request_timeout())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, accept: &str) -> Result<Response, FetchError> {
        debug!("GET {}", url);

        let transport_err = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        };

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await
            .map_err(transport_err)?;

        let status = resp.status().as_u16();
        let link = resp
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = resp.text().await.map_err(transport_err)?;

        Ok(Response { status, link, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_sends_credentials_and_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/starred"))
            .and(header("authorization", "Bearer ghp_test"))
            .and(header("accept", STAR_MEDIA_TYPE))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", "<https://x/next>; rel=\"next\"")
                    .set_body_string("[]"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new("ghp_test", Duration::from_secs(10)).unwrap();
        let resp = transport
            .get(&format!("{}/user/starred", server.uri()), STAR_MEDIA_TYPE)
            .await
            .unwrap();

        assert!(resp.is_success());
        assert_eq!(resp.body, "[]");
        assert_eq!(resp.link.as_deref(), Some("<https://x/next>; rel=\"next\""));
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpTransport::new("t", Duration::from_secs(10)).unwrap();
        let resp = transport
            .get(&format!("{}/missing", server.uri()), RAW_MEDIA_TYPE)
            .await
            .unwrap();

        assert_eq!(resp.status, 404);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = HttpTransport::new("t", Duration::from_millis(50)).unwrap();
        let result = transport
            .get(&format!("{}/slow", server.uri()), RAW_MEDIA_TYPE)
            .await;

        assert_matches!(result, Err(FetchError::Transport { .. }));
    }
}
