// src/pipeline/pass.rs

//! Pass entry points wired from configuration.

use chrono::Utc;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::diff::DiffResult;
use crate::pipeline::process::{ListingProcessor, PassReport};
use crate::services::{Notifier, PortalClient};
use crate::storage::LocalRepository;
use crate::utils::http;

/// Run one pass against the live portal and notification channels.
pub async fn run_pass(config: &Config) -> Result<PassReport> {
    log::info!("Pass starting at {}", Utc::now().format("%Y-%m-%d %H:%M:%S"));

    let repository = LocalRepository::open(config.storage.processed_path()).await?;
    let portal = PortalClient::new(config.portal.clone())?;
    let notifier = Notifier::from_config(config, http::create_async_client(&config.portal)?)?;

    let processor = ListingProcessor::new(
        &portal,
        &repository,
        &notifier,
        config.storage.photos_dir(),
        config.portal.listing_marker.clone(),
    );
    let report = processor.run_pass().await?;

    log::info!(
        "Pass finished: {} announced, {} failed, {} already processed",
        report.committed.len(),
        report.failures.len(),
        report.already_processed
    );
    for failure in &report.failures {
        log::warn!(
            "Listing {} failed at {}: {}",
            failure.id,
            failure.stage,
            failure.message
        );
    }

    Ok(report)
}

/// List the listings the next pass would handle, without fetching them.
pub async fn run_pending(config: &Config) -> Result<DiffResult> {
    let repository = LocalRepository::open(config.storage.processed_path()).await?;
    let portal = PortalClient::new(config.portal.clone())?;
    // Never invoked by a preview
    let notifier = Notifier::new(config.portal.base_url.clone());

    let processor = ListingProcessor::new(
        &portal,
        &repository,
        &notifier,
        config.storage.photos_dir(),
        config.portal.listing_marker.clone(),
    );
    processor.pending().await
}
