// src/error.rs

//! Unified error handling for the pool watcher.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::ListingId;

/// Result type alias for pool watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Processed-id store is unreadable or corrupt
    #[error("Repository error at {}: {message}", .path.display())]
    Repository { path: PathBuf, message: String },

    /// Portal login or enumeration failed
    #[error("Portal error: {0}")]
    Portal(String),

    /// Expected content missing from a portal page
    #[error("Extraction error for {context}: {message}")]
    Extract { context: String, message: String },

    /// A notification channel rejected or failed a message
    #[error("Notification via {channel} failed: {message}")]
    Notify { channel: String, message: String },

    /// One listing could not be carried through a stage
    #[error("Listing {id} failed during {stage}: {message}")]
    Listing {
        id: ListingId,
        stage: &'static str,
        message: String,
    },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a repository error for the store at `path`.
    pub fn repository(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Repository {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }

    /// Create a portal error.
    pub fn portal(message: impl Into<String>) -> Self {
        Self::Portal(message.into())
    }

    /// Create an extraction error with context.
    pub fn extract(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Extract {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error for the named channel.
    pub fn notify(channel: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notify {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    /// Wrap an error raised while handling one listing.
    pub fn listing(id: ListingId, stage: &'static str, source: impl fmt::Display) -> Self {
        Self::Listing {
            id,
            stage,
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_message() {
        let err = AppError::repository("data/scraped.txt", "line 3 is not a listing id");
        assert_eq!(
            err.to_string(),
            "Repository error at data/scraped.txt: line 3 is not a listing id"
        );
    }

    #[test]
    fn test_listing_error_message() {
        let err = AppError::listing(ListingId::new(42), "notify", "mail rejected");
        assert_eq!(
            err.to_string(),
            "Listing 42 failed during notify: mail rejected"
        );
    }
}
