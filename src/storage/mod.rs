//! Storage abstractions for the processed-id record.
//!
//! The record is an append-only text file with one listing id per line:
//!
//! ```text
//! data/
//! ├── config.toml
//! ├── scraped.txt        # processed ids, insertion order
//! └── photos/
//!     └── {id}/
//!         ├── 1.png
//!         └── 2.png
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ListingId, ProcessedSet};

// Re-export for convenience
pub use local::LocalRepository;

/// Durable record of which listings have been handled.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Load every processed id. Missing storage is created empty.
    ///
    /// Unreadable or corrupt storage is an error the caller must not ignore.
    async fn load_processed(&self) -> Result<ProcessedSet>;

    /// Durably append an id. Appending an id twice is allowed.
    async fn mark_processed(&self, id: ListingId) -> Result<()>;
}
