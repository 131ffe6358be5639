// src/models/mod.rs

//! Domain models for the pool watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod listing;
mod processed;

// Re-export all public types
pub use config::{
    Config, EmailConfig, PortalConfig, PortalSelectors, StorageConfig, TelegramConfig,
};
pub use listing::{
    ListingDetails, ListingId, ListingRecord, ListingReference, NAME_FIELDS, PLATE_FIELD,
    PLATE_SENTINEL, UNKNOWN_NAME, display_name, normalize_plate, title_case,
};
pub use processed::ProcessedSet;
