//! README lookup by fallback probing
//!
//! There is no single canonical README path, so candidates are requested
//! in a fixed order through the contents endpoint until one answers 2xx.

use std::sync::Arc;
use tracing::debug;

use crate::github::{Transport, RAW_MEDIA_TYPE};

/// Paths tried, in order, for every repository
pub const README_CANDIDATES: &[&str] = &[
    "README.md",
    "README.rst",
    "docs/README.md",
    ".github/README.md",
    "README.adoc",
    "README.markdown",
    "README.rdoc",
    "README.txt",
    "README",
    "readme.md",
    "Readme.md",
    "README.MD",
    "readme",
    "Readme",
    "readme.rst",
    "Readme.rst",
    "README.org",
    "Readme.org",
    "readme.org",
    "docs/Readme.md",
    "docs/readme.md",
];

pub struct ReadmeResolver {
    transport: Arc<dyn Transport>,
    api_base: String,
    candidates: Vec<String>,
}

impl ReadmeResolver {
    pub fn new(transport: Arc<dyn Transport>, api_base: impl Into<String>) -> Self {
        Self::with_candidates(
            transport,
            api_base,
            README_CANDIDATES.iter().map(|c| c.to_string()).collect(),
        )
    }

    pub fn with_candidates(
        transport: Arc<dyn Transport>,
        api_base: impl Into<String>,
        candidates: Vec<String>,
    ) -> Self {
        Self {
            transport,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            candidates,
        }
    }

    fn content_url(&self, full_name: &str, candidate: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_base, full_name, candidate)
    }

    /// Return the body of the first candidate that exists, if any.
    ///
    /// Failed probes (error status or transport failure) move on to the
    /// next candidate. An empty body counts as absent.
    pub async fn resolve(&self, full_name: &str) -> Option<String> {
        for candidate in &self.candidates {
            let url = self.content_url(full_name, candidate);

            match self.transport.get(&url, RAW_MEDIA_TYPE).await {
                Ok(resp) if resp.is_success() => {
                    if resp.body.is_empty() {
                        debug!("{} for {} is empty", candidate, full_name);
                        continue;
                    }
                    debug!("Found {} for {}", candidate, full_name);
                    return Some(resp.body);
                }
                Ok(resp) => {
                    debug!("{} for {}: HTTP {}", candidate, full_name, resp.status);
                }
                Err(e) => {
                    debug!("{} for {}: {}", candidate, full_name, e);
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{FetchError, MockTransport, Response};
    use mockall::predicate::eq;
    use mockall::Sequence;

    const API: &str = "https://api.github.com";

    fn status(code: u16) -> Response {
        Response {
            status: code,
            ..Default::default()
        }
    }

    fn expect_probe(
        transport: &mut MockTransport,
        seq: &mut Sequence,
        candidate: &str,
        resp: Result<Response, ()>,
    ) {
        let url = format!("{API}/repos/octocat/hello/contents/{candidate}");
        transport
            .expect_get()
            .with(eq(url), eq(RAW_MEDIA_TYPE))
            .times(1)
            .in_sequence(seq)
            .returning(move |url, _| match &resp {
                Ok(r) => Ok(r.clone()),
                Err(()) => Err(FetchError::Transport {
                    url: url.to_string(),
                    source: "timed out".into(),
                }),
            });
    }

    #[tokio::test]
    async fn test_first_success_wins_after_n_probes() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_probe(&mut transport, &mut seq, "README.md", Ok(status(404)));
        expect_probe(&mut transport, &mut seq, "README.rst", Ok(status(404)));
        expect_probe(
            &mut transport,
            &mut seq,
            "docs/README.md",
            Ok(Response {
                status: 200,
                link: None,
                body: "# Hi".to_string(),
            }),
        );

        // Probing stops at the third candidate; any further call would fail the mock.
        let resolver = ReadmeResolver::new(Arc::new(transport), API);
        assert_eq!(resolver.resolve("octocat/hello").await.as_deref(), Some("# Hi"));
    }

    #[tokio::test]
    async fn test_transport_failure_moves_to_next_candidate() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_probe(&mut transport, &mut seq, "README.md", Err(()));
        expect_probe(
            &mut transport,
            &mut seq,
            "README.rst",
            Ok(Response {
                status: 200,
                link: None,
                body: "Title\n=====".to_string(),
            }),
        );

        let resolver = ReadmeResolver::new(Arc::new(transport), API);
        assert_eq!(
            resolver.resolve("octocat/hello").await.as_deref(),
            Some("Title\n=====")
        );
    }

    #[tokio::test]
    async fn test_exhausted_candidates_return_none() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(README_CANDIDATES.len())
            .returning(|_, _| Ok(status(404)));

        let resolver = ReadmeResolver::new(Arc::new(transport), API);
        assert!(resolver.resolve("octocat/hello").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_body_counts_as_absent() {
        let mut transport = MockTransport::new();
        let mut seq = Sequence::new();
        expect_probe(&mut transport, &mut seq, "a.md", Ok(status(200)));
        expect_probe(&mut transport, &mut seq, "b.md", Ok(status(500)));

        let resolver = ReadmeResolver::with_candidates(
            Arc::new(transport),
            format!("{API}/"),
            vec!["a.md".to_string(), "b.md".to_string()],
        );
        assert!(resolver.resolve("octocat/hello").await.is_none());
    }

    #[test]
    fn test_candidate_order() {
        assert_eq!(README_CANDIDATES[0], "README.md");
        assert_eq!(README_CANDIDATES[1], "README.rst");
        assert_eq!(README_CANDIDATES.last(), Some(&"docs/readme.md"));
        assert_eq!(README_CANDIDATES.len(), 21);
    }
}
