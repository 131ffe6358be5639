//! Diff between the listings on the portal and the processed record.
//!
//! Only additions matter: a listing that disappears from the portal is
//! simply never seen again, and the processed record is never shrunk.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{ListingId, ListingReference, ProcessedSet};

/// A listing that still has to be fetched, announced and committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingListing {
    pub id: ListingId,
    pub reference: ListingReference,
}

/// Outcome of comparing one enumeration against the processed record.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffResult {
    /// Unseen listings in enumeration order
    pub unseen: Vec<PendingListing>,
    /// References whose id is already processed
    pub already_processed: usize,
    /// Later references repeating an id within this enumeration
    pub duplicates: usize,
    /// References without a usable id
    pub unusable: Vec<ListingReference>,
}

impl DiffResult {
    pub fn has_unseen(&self) -> bool {
        !self.unseen.is_empty()
    }
}

/// Calculate which enumerated listings have not been processed yet.
///
/// The first reference for an id wins; source order is kept.
pub fn calculate_diff(
    references: &[ListingReference],
    processed: &ProcessedSet,
    marker: &str,
) -> DiffResult {
    let mut result = DiffResult::default();
    let mut seen_this_pass: HashSet<ListingId> = HashSet::new();

    for reference in references {
        let Some(id) = reference.listing_id(marker) else {
            log::warn!("No listing id in {}, skipping", reference);
            result.unusable.push(reference.clone());
            continue;
        };

        if !seen_this_pass.insert(id) {
            result.duplicates += 1;
            continue;
        }

        if processed.contains(id) {
            result.already_processed += 1;
            continue;
        }

        result.unseen.push(PendingListing {
            id,
            reference: reference.clone(),
        });
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "VehicleId";

    fn reference(id: &str) -> ListingReference {
        ListingReference::new(format!(
            "https://portal.example.nl/PoolSite/VehicleDetail?VehicleId={id}"
        ))
    }

    fn ids(result: &DiffResult) -> Vec<u64> {
        result.unseen.iter().map(|p| p.id.value()).collect()
    }

    #[test]
    fn test_empty_store_everything_unseen() {
        let refs = vec![reference("3"), reference("1"), reference("2")];
        let result = calculate_diff(&refs, &ProcessedSet::new(), MARKER);
        assert!(result.has_unseen());
        // Source order, not sorted
        assert_eq!(ids(&result), vec![3, 1, 2]);
    }

    #[test]
    fn test_processed_are_skipped() {
        let refs = vec![reference("10"), reference("11"), reference("12")];
        let processed = ProcessedSet::from_lines(["11", "99"]);
        let result = calculate_diff(&refs, &processed, MARKER);
        assert_eq!(ids(&result), vec![10, 12]);
        assert_eq!(result.already_processed, 1);
    }

    #[test]
    fn test_nothing_new() {
        let refs = vec![reference("10")];
        let processed = ProcessedSet::from_lines(["10"]);
        let result = calculate_diff(&refs, &processed, MARKER);
        assert!(!result.has_unseen());
    }

    #[test]
    fn test_duplicates_within_enumeration() {
        let refs = vec![reference("5"), reference("6"), reference("5")];
        let result = calculate_diff(&refs, &ProcessedSet::new(), MARKER);
        assert_eq!(ids(&result), vec![5, 6]);
        assert_eq!(result.duplicates, 1);
    }

    #[test]
    fn test_unusable_references() {
        let refs = vec![
            reference("abc"),
            ListingReference::new("https://portal.example.nl/PoolSite/Help"),
            reference("7"),
        ];
        let result = calculate_diff(&refs, &ProcessedSet::new(), MARKER);
        assert_eq!(ids(&result), vec![7]);
        assert_eq!(result.unusable.len(), 2);
    }
}
