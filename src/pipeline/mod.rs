//! Pass pipeline.
//!
//! - `diff`: which enumerated listings are still unprocessed
//! - `process`: carry unseen listings through fetch, notify and commit
//! - `pass`: entry points built from configuration

pub mod diff;
mod pass;
pub mod process;

pub use diff::{DiffResult, PendingListing, calculate_diff};
pub use pass::{run_pass, run_pending};
pub use process::{ListingFailure, ListingProcessor, PassReport};
