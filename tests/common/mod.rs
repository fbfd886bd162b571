/// Common test utilities and helpers for starsync tests
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use starsync::{
    HttpTransport, PageWalker, ReadmeResolver, Reconciler, SqliteStore, SyncOptions, SyncSummary,
    Transport,
};

pub const TOKEN: &str = "ghp_integration";

/// One `star+json` entry
pub fn starred_json(id: i64, private: bool) -> Value {
    json!({
        "starred_at": format!("2024-01-01T00:{:02}:{:02}Z", (id / 60) % 60, id % 60),
        "repo": {
            "id": id,
            "name": format!("r{id}"),
            "full_name": format!("o/r{id}"),
            "html_url": format!("https://github.com/o/r{id}"),
            "description": format!("Repository {id}"),
            "created_at": "2020-01-01T00:00:00Z",
            "updated_at": "2023-01-01T00:00:00Z",
            "pushed_at": "2023-01-02T00:00:00Z",
            "stargazers_count": id * 10,
            "language": "Rust",
            "topics": ["rust", "cli"],
            "is_template": false,
            "private": private
        }
    })
}

pub fn page_json(ids: impl IntoIterator<Item = i64>) -> Value {
    Value::Array(ids.into_iter().map(|id| starred_json(id, false)).collect())
}

pub fn starred_url(server: &MockServer, page: u32) -> String {
    format!("{}/user/starred?per_page=100&page={}", server.uri(), page)
}

/// Serve `pages` as a Link-paginated starred collection
pub async fn mount_starred_pages(server: &MockServer, pages: Vec<Value>) {
    let total = pages.len() as u32;

    for (i, body) in pages.into_iter().enumerate() {
        let page = i as u32 + 1;
        let mut links = Vec::new();
        if page < total {
            links.push(format!("<{}>; rel=\"next\"", starred_url(server, page + 1)));
            links.push(format!("<{}>; rel=\"last\"", starred_url(server, total)));
        }
        if page > 1 {
            links.push(format!("<{}>; rel=\"first\"", starred_url(server, 1)));
        }

        let mut response = ResponseTemplate::new(200).set_body_json(body);
        if !links.is_empty() {
            response = response.insert_header("link", links.join(", ").as_str());
        }

        Mock::given(method("GET"))
            .and(path("/user/starred"))
            .and(query_param("page", page.to_string()))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

pub fn transport() -> Arc<dyn Transport> {
    Arc::new(HttpTransport::new(TOKEN, Duration::from_secs(10)).expect("Failed to build transport"))
}

/// Run one full synchronization against the mock server
pub async fn sync_once(
    server: &MockServer,
    store: &SqliteStore,
    options: SyncOptions,
) -> anyhow::Result<SyncSummary> {
    let transport = transport();
    let resolver = ReadmeResolver::new(transport.clone(), server.uri());
    let walker = PageWalker::new(transport, starred_url(server, 1));

    Reconciler::new(store, Some(&resolver), options)
        .run(walker.into_stream())
        .await
}
