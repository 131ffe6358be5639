//! Human-readable renderings of a listing.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use maud::{DOCTYPE, Markup, html};

use crate::error::Result;
use crate::models::ListingRecord;

/// A photo embedded into an HTML report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePhoto {
    pub mime: &'static str,
    pub data: String,
}

impl InlinePhoto {
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Self {
        Self {
            mime: mime_for(path),
            data: STANDARD.encode(bytes),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.data)
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Read the photos of a listing for inlining.
pub async fn load_photos(paths: &[PathBuf]) -> Result<Vec<InlinePhoto>> {
    let mut photos = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path).await?;
        photos.push(InlinePhoto::from_bytes(path, &bytes));
    }
    Ok(photos)
}

/// One-line chat alert.
pub fn short_alert(record: &ListingRecord, portal_url: &str) -> String {
    format!("New car: {}. Check {}", record.display_name, portal_url)
}

pub fn subject(record: &ListingRecord) -> String {
    format!("New car available - {}", record.license_plate)
}

/// Plain-text report: name, detail lines, description.
pub fn plain_body(record: &ListingRecord) -> String {
    let mut body = format!("{}\n\n", record.display_name);
    for (key, value) in record.details.iter() {
        body.push_str(&format!("{key}: {value}\n"));
    }
    body.push('\n');
    body.push_str(&record.description);
    body
}

/// HTML report with the detail table and inlined photos.
pub fn html_body(record: &ListingRecord, photos: &[InlinePhoto]) -> String {
    render(record, photos).into_string()
}

fn render(record: &ListingRecord, photos: &[InlinePhoto]) -> Markup {
    html! {
        (DOCTYPE)
        html {
            body {
                h1 { (record.display_name) }
                h2 { "Details" }
                table {
                    @for (key, value) in record.details.iter() {
                        tr {
                            td { (key) }
                            td { (value) }
                        }
                    }
                }
                h2 { "Description" }
                p {
                    @for (i, line) in record.description.lines().enumerate() {
                        @if i > 0 { br; }
                        (line)
                    }
                }
                h2 { "Photos" }
                p {
                    @for photo in photos {
                        img src=(photo.data_uri());
                        br;
                    }
                }
            }
        }
    }
}
