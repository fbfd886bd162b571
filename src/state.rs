//! State Management - SQLite-based persistence for starred repositories
//!
//! One table, `starred_repos`, keyed by the GitHub repository id. Rows are
//! inserted once and afterwards only gain a README.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::model::{decode_topics, encode_topics, Repository};

/// Storage operations the sync engine relies on
pub trait StarStore {
    /// Look up a stored repository by id
    fn find(&self, id: i64) -> Result<Option<Repository>>;

    /// Persist a repository seen for the first time
    fn insert(&self, repo: &Repository) -> Result<()>;

    /// Attach a README to a stored repository that has none.
    ///
    /// Returns whether a row was changed.
    fn update_readme(&self, id: i64, readme: &str) -> Result<bool>;

    /// Every stored repository, most recently starred first
    fn all(&self) -> Result<Vec<Repository>>;
}

/// SQLite-backed star store
pub struct SqliteStore {
    conn: Connection,
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, html_url, description, created_at, updated_at, pushed_at,
           stargazers_count, language, full_name, topics, is_template, private,
           starred_at, readme
    FROM starred_repos
"#;

impl SqliteStore {
    /// Open or create the database at a specific path
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        let db = Self { conn };
        db.initialize()?;

        info!("Star database opened at {}", path.display());
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS starred_repos (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    html_url TEXT NOT NULL,
                    description TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    pushed_at TEXT,
                    stargazers_count INTEGER NOT NULL DEFAULT 0,
                    language TEXT,
                    full_name TEXT NOT NULL,
                    topics TEXT NOT NULL DEFAULT '',
                    is_template INTEGER NOT NULL DEFAULT 0,
                    private INTEGER NOT NULL DEFAULT 0,
                    starred_at TEXT NOT NULL,
                    readme TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_starred_at ON starred_repos(starred_at);
                "#,
            )
            .context("Failed to initialize database schema")?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Number of stored repositories
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM starred_repos", [], |row| row.get(0))
            .context("Failed to count repositories")?;
        Ok(count as u64)
    }

    fn row_to_repo(row: &Row<'_>) -> rusqlite::Result<Repository> {
        Ok(Repository {
            id: row.get(0)?,
            name: row.get(1)?,
            html_url: row.get(2)?,
            description: row.get(3)?,
            created_at: parse_timestamp(row, 4)?,
            updated_at: parse_timestamp(row, 5)?,
            pushed_at: row
                .get::<_, Option<String>>(6)?
                .map(|s| to_utc(&s, 6))
                .transpose()?,
            stargazers_count: row.get(7)?,
            language: row.get(8)?,
            full_name: row.get(9)?,
            topics: decode_topics(&row.get::<_, String>(10)?),
            is_template: row.get(11)?,
            private: row.get(12)?,
            starred_at: parse_timestamp(row, 13)?,
            readme: row.get(14)?,
        })
    }
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    to_utc(&row.get::<_, String>(idx)?, idx)
}

fn to_utc(s: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

impl StarStore for SqliteStore {
    fn find(&self, id: i64) -> Result<Option<Repository>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], Self::row_to_repo)
            .optional()
            .with_context(|| format!("Failed to query repository {}", id))
    }

    fn insert(&self, repo: &Repository) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO starred_repos (
                    id, name, html_url, description, created_at, updated_at, pushed_at,
                    stargazers_count, language, full_name, topics, is_template, private,
                    starred_at, readme
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                "#,
                params![
                    repo.id,
                    repo.name,
                    repo.html_url,
                    repo.description,
                    repo.created_at.to_rfc3339(),
                    repo.updated_at.to_rfc3339(),
                    repo.pushed_at.map(|t| t.to_rfc3339()),
                    repo.stargazers_count,
                    repo.language,
                    repo.full_name,
                    encode_topics(&repo.topics),
                    repo.is_template,
                    repo.private,
                    repo.starred_at.to_rfc3339(),
                    repo.readme,
                ],
            )
            .with_context(|| format!("Failed to insert repository {}", repo.full_name))?;

        debug!("Inserted {} ({})", repo.full_name, repo.id);
        Ok(())
    }

    fn update_readme(&self, id: i64, readme: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                "UPDATE starred_repos SET readme = ?2 WHERE id = ?1 AND (readme IS NULL OR readme = '')",
                params![id, readme],
            )
            .with_context(|| format!("Failed to update README for repository {}", id))?;

        Ok(changed > 0)
    }

    fn all(&self) -> Result<Vec<Repository>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY starred_at DESC, id ASC");
        let mut stmt = self.conn.prepare(&sql)?;

        let repos = stmt
            .query_map([], Self::row_to_repo)
            .context("Failed to query repositories")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect repositories")?;

        Ok(repos)
    }
}
