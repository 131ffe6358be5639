// src/models/listing.rs

//! Listing data structures and normalization.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder plate used when the portal value does not look like a plate.
pub const PLATE_SENTINEL: &str = "AB-CD-01";

/// Display name used when none of the name fields contribute.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Detail field holding the license plate.
pub const PLATE_FIELD: &str = "Kenteken";

/// Detail fields concatenated into the display name, in priority order.
pub const NAME_FIELDS: [&str; 3] = ["Merk", "Model", "Uitvoering"];

/// Value the portal shows for an empty field.
const EMPTY_VALUE: &str = "-";

// Three dash-separated groups of letters or digits, matched as a prefix.
static PLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]{1,3}|[0-9]{1,3})-([A-Z]{1,3}|[0-9]{1,3})-([A-Z]{1,3}|[0-9]{1,3})")
        .expect("plate pattern is valid")
});

/// Stable identifier of a listing, the sole dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(u64);

impl ListingId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ListingId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Locator of a listing as currently visible on the portal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingReference(String);

impl ListingReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the listing id carried by this reference.
    pub fn listing_id(&self, marker: &str) -> Option<ListingId> {
        crate::utils::extract_listing_id(&self.0, marker)
    }
}

impl fmt::Display for ListingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Detail fields of a listing in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDetails {
    fields: Vec<(String, String)>,
}

impl ListingDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field; an existing key keeps its position and takes the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ListingDetails {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut details = Self::new();
        for (key, value) in iter {
            details.insert(key, value);
        }
        details
    }
}

/// A normalized listing, ready to be announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRecord {
    pub id: ListingId,
    pub license_plate: String,
    pub display_name: String,
    pub details: ListingDetails,
    pub description: String,
    pub photo_paths: Vec<PathBuf>,
}

impl ListingRecord {
    /// Build a record from raw portal data. Never fails: bad fields become sentinels.
    pub fn build(
        id: ListingId,
        details: ListingDetails,
        description: &str,
        photo_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            id,
            license_plate: normalize_plate(details.get(PLATE_FIELD)),
            display_name: display_name(&details),
            description: description.trim().to_string(),
            details,
            photo_paths,
        }
    }

    /// The photo used for short notifications.
    pub fn primary_photo(&self) -> Option<&PathBuf> {
        self.photo_paths.first()
    }
}

/// Validate a raw plate value, falling back to [`PLATE_SENTINEL`].
pub fn normalize_plate(raw: Option<&str>) -> String {
    match raw {
        Some(plate) if PLATE_PATTERN.is_match(plate) => plate.to_string(),
        _ => PLATE_SENTINEL.to_string(),
    }
}

/// Derive the display name from the prioritized name fields.
pub fn display_name(details: &ListingDetails) -> String {
    let name = NAME_FIELDS
        .iter()
        .filter_map(|field| details.get(field))
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != EMPTY_VALUE)
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    let name = name.trim();
    if name.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Upper-case every letter that follows a non-letter, lower-case the rest.
///
/// Digits and punctuation both start a new word, so `4motion` becomes
/// `4Motion` and `d'ieteren` becomes `D'Ieteren`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut after_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    out
}
