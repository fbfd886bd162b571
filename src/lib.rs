//! starsync - Mirror your GitHub stars into a local SQLite database
//!
//! Starred repositories are fetched page by page, reconciled against the
//! local store (new stars inserted, missing READMEs filled in, everything
//! else left alone), and can be exported back out as JSON.
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and parsing
//! - [`github`]: Authenticated transport to the GitHub API
//! - [`pagination`]: Cursor pagination over `/user/starred`
//! - [`readme`]: README lookup by fallback probing
//! - [`sync`]: Reconciliation of remote stars with the store
//! - [`state`]: SQLite persistence
//! - [`export`]: JSON export

pub mod config;
pub mod export;
pub mod github;
pub mod model;
pub mod pagination;
pub mod readme;
pub mod state;
pub mod sync;

pub use config::Config;
pub use github::{FetchError, HttpTransport, Transport};
pub use model::{Repository, StarredRepo};
pub use pagination::{Page, PageWalker};
pub use readme::ReadmeResolver;
pub use state::{SqliteStore, StarStore};
pub use sync::{Reconciler, SyncAction, SyncOptions, SyncSummary};
