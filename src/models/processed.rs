//! In-memory view of the processed-id store.

use std::collections::HashSet;

use crate::models::ListingId;

/// Set of listing ids already handled, as read from durable storage.
///
/// Membership follows the store format: an id is processed when its decimal
/// form appears as an exact line. Duplicate lines are counted in
/// [`ProcessedSet::entry_count`] but do not affect membership.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    lines: HashSet<String>,
    entries: usize,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from raw store lines. Empty lines are ignored.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for line in lines {
            let line = line.into();
            if !line.is_empty() {
                set.insert_line(line);
            }
        }
        set
    }

    fn insert_line(&mut self, line: String) {
        self.entries += 1;
        self.lines.insert(line);
    }

    pub fn contains(&self, id: ListingId) -> bool {
        self.lines.contains(&id.to_string())
    }

    /// Number of distinct ids.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of lines in the store, duplicates included.
    pub fn entry_count(&self) -> usize {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_line_membership() {
        let set = ProcessedSet::from_lines(["12", "007", "12", ""]);
        assert!(set.contains(ListingId::new(12)));
        // "007" is not the decimal form of 7
        assert!(!set.contains(ListingId::new(7)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.entry_count(), 3);
    }

    #[test]
    fn test_empty_set() {
        let set = ProcessedSet::from_lines(Vec::<String>::new());
        assert!(set.is_empty());
        assert!(!set.contains(ListingId::new(5)));
        assert_eq!(set.entry_count(), 0);
    }
}
