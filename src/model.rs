//! Repository records as received from the starred endpoint and as stored locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of `GET /user/starred` with the `star+json` media type
#[derive(Debug, Clone, Deserialize)]
pub struct StarredRepo {
    pub starred_at: DateTime<Utc>,
    pub repo: RemoteRepository,
}

/// Repository fields we keep from the GitHub API representation
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRepository {
    pub id: i64,
    pub name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stargazers_count: i64,
    pub language: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub private: bool,
}

/// A starred repository as mirrored in the local store.
///
/// Field order is the export order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub stargazers_count: i64,
    pub language: Option<String>,
    pub full_name: String,
    pub topics: Vec<String>,
    pub is_template: bool,
    pub private: bool,
    pub starred_at: DateTime<Utc>,
    pub readme: Option<String>,
}

impl Repository {
    /// Whether a non-empty README has already been attached
    pub fn has_readme(&self) -> bool {
        self.readme.as_deref().is_some_and(|r| !r.is_empty())
    }
}

impl From<StarredRepo> for Repository {
    fn from(starred: StarredRepo) -> Self {
        let repo = starred.repo;
        Self {
            id: repo.id,
            name: repo.name,
            html_url: repo.html_url,
            description: repo.description,
            created_at: repo.created_at,
            updated_at: repo.updated_at,
            pushed_at: repo.pushed_at,
            stargazers_count: repo.stargazers_count,
            language: repo.language,
            full_name: repo.full_name,
            topics: repo.topics,
            is_template: repo.is_template,
            private: repo.private,
            starred_at: starred.starred_at,
            readme: None,
        }
    }
}

// Topics are persisted as one comma-joined column. Commas and backslashes
// inside a topic are backslash-escaped so the column decodes to the same list.
const TOPIC_DELIMITER: char = ',';
const TOPIC_ESCAPE: char = '\\';

/// Join topics into the single-column storage form
pub fn encode_topics(topics: &[String]) -> String {
    let mut out = String::new();
    for (i, topic) in topics.iter().enumerate() {
        if i > 0 {
            out.push(TOPIC_DELIMITER);
        }
        for c in topic.chars() {
            if c == TOPIC_DELIMITER || c == TOPIC_ESCAPE {
                out.push(TOPIC_ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

/// Split the storage form back into topics
pub fn decode_topics(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }

    let mut topics = Vec::new();
    let mut current = String::new();
    let mut chars = stored.chars();

    while let Some(c) = chars.next() {
        match c {
            TOPIC_ESCAPE => {
                // A trailing lone escape is kept literally.
                current.push(chars.next().unwrap_or(TOPIC_ESCAPE));
            }
            TOPIC_DELIMITER => topics.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    topics.push(current);

    topics
}
