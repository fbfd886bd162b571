//! Cursor pagination over the starred collection
//!
//! GitHub signals pagination through the `Link` response header:
//! `<https://api.github.com/user/starred?per_page=100&page=2>; rel="next", <...&page=7>; rel="last"`.
//! The walker follows `next` until it disappears and reads `last` only to
//! report progress.

use futures::stream::{self, Stream};
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, info};

use crate::github::{FetchError, Transport, STAR_MEDIA_TYPE};
use crate::model::StarredRepo;

/// Related URLs found in a `Link` header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRelations {
    pub next: Option<String>,
    pub last: Option<String>,
}

impl LinkRelations {
    /// Total page count taken from the `page` parameter of the `last` URL
    pub fn last_page(&self) -> Option<u32> {
        let url = Url::parse(self.last.as_deref()?).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    }
}

/// Parse a `Link` header into its `next` and `last` relations
pub fn parse_link_header(link_header: &str) -> LinkRelations {
    let mut relations = LinkRelations::default();

    for part in link_header.split(',') {
        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(value) = segment.strip_prefix("rel=") {
                rel = Some(value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel)) = (url, rel) {
            match rel {
                "next" => relations.next = Some(url.to_string()),
                "last" => relations.last = Some(url.to_string()),
                _ => {}
            }
        }
    }

    relations
}

/// One page of starred repositories, in server order
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based position of this page in the walk
    pub number: u32,
    /// Total page count when the server advertised one
    pub last_page: Option<u32>,
    pub repos: Vec<StarredRepo>,
}

/// Walks the starred collection one request at a time
pub struct PageWalker {
    transport: Arc<dyn Transport>,
    next_url: Option<String>,
    page: u32,
}

impl PageWalker {
    pub fn new(transport: Arc<dyn Transport>, start_url: impl Into<String>) -> Self {
        Self {
            transport,
            next_url: Some(start_url.into()),
            page: 0,
        }
    }

    /// Fetch the page under the cursor.
    ///
    /// Returns `Ok(None)` once the previous page carried no `next` relation.
    /// Any error ends the walk; later calls return `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<Page>, FetchError> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        self.page += 1;

        debug!("Page URL {}", url);
        let resp = self.transport.get(&url, STAR_MEDIA_TYPE).await?;

        if !resp.is_success() {
            return Err(FetchError::Status {
                url,
                status: resp.status,
            });
        }

        let repos: Vec<StarredRepo> =
            serde_json::from_str(&resp.body).map_err(|source| FetchError::Decode {
                url: url.clone(),
                source,
            })?;

        let relations = resp
            .link
            .as_deref()
            .map(parse_link_header)
            .unwrap_or_default();
        let last_page = relations.last_page();

        info!(
            "Fetching stars... (page {}/{})",
            self.page,
            last_page.unwrap_or(self.page)
        );

        self.next_url = relations.next;

        Ok(Some(Page {
            number: self.page,
            last_page,
            repos,
        }))
    }

    /// Turn the walk into a lazy stream of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Page, FetchError>> + Send {
        stream::try_unfold(self, |mut walker| async move {
            let page = walker.next_page().await?;
            Ok::<_, FetchError>(page.map(|page| (page, walker)))
        })
    }
}
