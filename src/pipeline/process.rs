// src/pipeline/process.rs

//! One pass over the portal.
//!
//! Enumerate, diff against the processed record, then carry every unseen
//! listing through fetch, normalize, notify and commit, one at a time.
//!
//! A listing is committed only after its notification went out. A crash
//! between the two leaves it uncommitted, so the next pass announces it
//! again: delivery is at-least-once.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{ListingId, ListingRecord};
use crate::pipeline::diff::{DiffResult, PendingListing, calculate_diff};
use crate::services::{ListingFetcher, NotificationDispatcher};
use crate::storage::ListingRepository;

/// A listing that did not make it through the pass.
#[derive(Debug, Clone, Serialize)]
pub struct ListingFailure {
    pub id: ListingId,
    pub stage: &'static str,
    pub message: String,
}

/// Summary of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub enumerated: usize,
    pub already_processed: usize,
    pub duplicates: usize,
    pub unusable: usize,
    pub committed: Vec<ListingId>,
    pub failures: Vec<ListingFailure>,
}

impl PassReport {
    fn new(started_at: DateTime<Utc>, enumerated: usize, diff: &DiffResult) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            enumerated,
            already_processed: diff.already_processed,
            duplicates: diff.duplicates,
            unusable: diff.unusable.len(),
            committed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrates a pass over the injected collaborators.
pub struct ListingProcessor<'a> {
    fetcher: &'a dyn ListingFetcher,
    repository: &'a dyn ListingRepository,
    dispatcher: &'a dyn NotificationDispatcher,
    photos_dir: PathBuf,
    marker: String,
}

impl<'a> ListingProcessor<'a> {
    pub fn new(
        fetcher: &'a dyn ListingFetcher,
        repository: &'a dyn ListingRepository,
        dispatcher: &'a dyn NotificationDispatcher,
        photos_dir: impl Into<PathBuf>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            repository,
            dispatcher,
            photos_dir: photos_dir.into(),
            marker: marker.into(),
        }
    }

    /// Enumerate and diff without touching any listing.
    pub async fn pending(&self) -> Result<DiffResult> {
        let (_, diff) = self.discover().await?;
        Ok(diff)
    }

    async fn discover(&self) -> Result<(usize, DiffResult)> {
        let references = self.fetcher.enumerate_listings().await?;
        let processed = self.repository.load_processed().await?;

        let diff = calculate_diff(&references, &processed, &self.marker);
        log::info!(
            "{} listings enumerated: {} new, {} already processed",
            references.len(),
            diff.unseen.len(),
            diff.already_processed
        );
        Ok((references.len(), diff))
    }

    /// Run one full pass.
    ///
    /// Enumeration and repository load failures abort the pass. Any other
    /// failure only skips the rest of the listing it belongs to.
    pub async fn run_pass(&self) -> Result<PassReport> {
        let started_at = Utc::now();
        let (enumerated, diff) = self.discover().await?;
        let mut report = PassReport::new(started_at, enumerated, &diff);

        for pending in &diff.unseen {
            log::info!("Processing listing {}", pending.id);

            let record = match self.build_record(pending).await {
                Ok(record) => record,
                Err(e) => {
                    self.record_failure(&mut report, e);
                    continue;
                }
            };

            if let Err(e) = self.dispatcher.notify(&record).await {
                self.record_failure(&mut report, AppError::listing(pending.id, "notify", e));
                continue;
            }

            if let Err(e) = self.repository.mark_processed(pending.id).await {
                log::error!(
                    "Listing {} was announced but could not be committed, it will be announced again",
                    pending.id
                );
                self.record_failure(&mut report, AppError::listing(pending.id, "commit", e));
                continue;
            }

            log::info!("Listing {} ({}) announced", pending.id, record.display_name);
            report.committed.push(pending.id);
        }

        report.finished_at = Utc::now();
        Ok(report)
    }

    /// Fetch everything for one listing and normalize it.
    async fn build_record(&self, pending: &PendingListing) -> Result<ListingRecord> {
        let id = pending.id;
        let reference = &pending.reference;

        let details = self
            .fetcher
            .fetch_details(reference)
            .await
            .map_err(|e| AppError::listing(id, "details", e))?;
        let description = self
            .fetcher
            .fetch_description(reference)
            .await
            .map_err(|e| AppError::listing(id, "description", e))?;
        let images = self
            .fetcher
            .fetch_image_references(reference)
            .await
            .map_err(|e| AppError::listing(id, "images", e))?;

        let dest_dir = self.photos_dir.join(id.to_string());
        let mut photo_paths = Vec::with_capacity(images.len());
        for locator in &images {
            let path = self
                .fetcher
                .download_image(locator, &dest_dir)
                .await
                .map_err(|e| AppError::listing(id, "download", e))?;
            photo_paths.push(path);
        }

        Ok(ListingRecord::build(id, details, &description, photo_paths))
    }

    fn record_failure(&self, report: &mut PassReport, error: AppError) {
        log::warn!("{}", error);
        if let AppError::Listing { id, stage, message } = error {
            report.failures.push(ListingFailure { id, stage, message });
        }
    }
}
