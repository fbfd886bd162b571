//! Sync Engine - Reconciles starred repositories with the local store
//!
//! Every remote record ends in exactly one of: insert (new star), README
//! update (known star without a README while enrichment is on), or skip.
//! Store and page errors abort the run; whatever was written before stays,
//! so re-running resumes where it stopped.

use anyhow::{Context, Result};
use futures::{Stream, TryStreamExt};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::github::FetchError;
use crate::model::{Repository, StarredRepo};
use crate::pagination::Page;
use crate::readme::ReadmeResolver;
use crate::state::StarStore;

/// Switches that shape reconciliation
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Keep repositories marked private
    pub store_private: bool,
    /// Resolve READMEs for new and README-less stored repositories
    pub fetch_readme: bool,
}

/// What happened to a single starred repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Inserted,
    ReadmeUpdated,
    Skipped,
    SkippedPrivate,
}

/// Results from a complete sync run
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    pub new: usize,
    pub updated: usize,
    pub skipped: usize,
    pub skipped_private: usize,
    pub pages: u32,
    pub duration: Duration,
}

impl SyncSummary {
    fn record(&mut self, action: SyncAction) {
        match action {
            SyncAction::Inserted => self.new += 1,
            SyncAction::ReadmeUpdated => self.updated += 1,
            SyncAction::Skipped => self.skipped += 1,
            SyncAction::SkippedPrivate => self.skipped_private += 1,
        }
    }

    /// Total records seen
    pub fn total(&self) -> usize {
        self.new + self.updated + self.skipped + self.skipped_private
    }
}

/// Applies the insert/update/skip policy against a store
pub struct Reconciler<'a, S: StarStore> {
    store: &'a S,
    readme: Option<&'a ReadmeResolver>,
    options: SyncOptions,
}

impl<'a, S: StarStore> Reconciler<'a, S> {
    /// `readme` is only consulted when `options.fetch_readme` is set
    pub fn new(store: &'a S, readme: Option<&'a ReadmeResolver>, options: SyncOptions) -> Self {
        Self {
            store,
            readme,
            options,
        }
    }

    /// Consume every page and reconcile each record in order
    pub async fn run<P>(&self, pages: P) -> Result<SyncSummary>
    where
        P: Stream<Item = Result<Page, FetchError>>,
    {
        let start_time = Instant::now();
        let mut summary = SyncSummary::default();

        let mut pages = std::pin::pin!(pages);
        while let Some(page) = pages
            .try_next()
            .await
            .context("Failed to fetch starred repositories")?
        {
            summary.pages += 1;
            for starred in page.repos {
                let action = self.reconcile(starred).await?;
                summary.record(action);
            }
        }

        summary.duration = start_time.elapsed();
        info!(
            "Sync completed in {:.2}s: {} new, {} updated, {} unchanged",
            summary.duration.as_secs_f64(),
            summary.new,
            summary.updated,
            summary.skipped
        );

        Ok(summary)
    }

    /// Decide and apply the action for one starred repository
    pub async fn reconcile(&self, starred: StarredRepo) -> Result<SyncAction> {
        let repo = Repository::from(starred);

        if repo.private && !self.options.store_private {
            warn!("Skipping private repository {}", repo.full_name);
            return Ok(SyncAction::SkippedPrivate);
        }

        match self.store.find(repo.id)? {
            None => self.insert(repo).await,
            Some(existing) => self.update_readme(existing).await,
        }
    }

    async fn insert(&self, mut repo: Repository) -> Result<SyncAction> {
        if let Some(resolver) = self.enrichment() {
            repo.readme = resolver.resolve(&repo.full_name).await;
            if repo.readme.is_none() {
                warn!("No README found for {}", repo.full_name);
            }
        }

        self.store.insert(&repo)?;
        debug!("New star: {}", repo.full_name);
        Ok(SyncAction::Inserted)
    }

    async fn update_readme(&self, existing: Repository) -> Result<SyncAction> {
        debug!("Repository {} already exists in the database", existing.full_name);

        let Some(resolver) = self.enrichment() else {
            return Ok(SyncAction::Skipped);
        };
        if existing.has_readme() {
            debug!("README already exists for {}", existing.full_name);
            return Ok(SyncAction::Skipped);
        }

        let Some(readme) = resolver.resolve(&existing.full_name).await else {
            warn!("Failed to fetch README for {}, ignoring", existing.full_name);
            return Ok(SyncAction::Skipped);
        };

        if self.store.update_readme(existing.id, &readme)? {
            debug!("Updated README for {}", existing.full_name);
            Ok(SyncAction::ReadmeUpdated)
        } else {
            Ok(SyncAction::Skipped)
        }
    }

    fn enrichment(&self) -> Option<&ReadmeResolver> {
        self.readme.filter(|_| self.options.fetch_readme)
    }
}
