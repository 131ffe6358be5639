//! Local filesystem repository.
//!
//! Keeps processed ids in a newline-terminated text file. Writes only ever
//! append; nothing is rewritten or compacted.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::{AppError, Result};
use crate::models::{ListingId, ProcessedSet};
use crate::storage::ListingRepository;

/// File-backed processed-id repository.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    path: PathBuf,
}

impl LocalRepository {
    /// Create or open the store at `path`.
    ///
    /// Idempotent: creates parent directories and an empty file when missing,
    /// and terminates a last line left unterminated by an interrupted append.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let repo = Self { path: path.into() };
        repo.ensure_file().await?;
        repo.repair_tail().await?;
        Ok(repo)
    }

    /// Location of the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_file(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::repository(&self.path, e))?;
            }
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::repository(&self.path, e))?;
        Ok(())
    }

    async fn repair_tail(&self) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::repository(&self.path, e))?;

        let len = file
            .metadata()
            .await
            .map_err(|e| AppError::repository(&self.path, e))?
            .len();
        if len == 0 {
            return Ok(());
        }

        file.seek(std::io::SeekFrom::Start(len - 1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        if last[0] != b'\n' {
            log::warn!(
                "{} does not end with a newline, terminating last entry",
                self.path.display()
            );
            file.write_all(b"\n").await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    /// Parse store content, rejecting anything that is not one id per line.
    fn parse(&self, bytes: Vec<u8>) -> Result<ProcessedSet> {
        let content = String::from_utf8(bytes)
            .map_err(|e| AppError::repository(&self.path, format!("not valid UTF-8: {e}")))?;

        for (index, line) in content.lines().enumerate() {
            if !line.is_empty() && line.parse::<ListingId>().is_err() {
                return Err(AppError::repository(
                    &self.path,
                    format!("line {} is not a listing id: {:?}", index + 1, line),
                ));
            }
        }

        Ok(ProcessedSet::from_lines(content.lines()))
    }
}

#[async_trait]
impl ListingRepository for LocalRepository {
    async fn load_processed(&self) -> Result<ProcessedSet> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => self.parse(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No processed record at {}, starting empty",
                    self.path.display()
                );
                self.ensure_file().await?;
                Ok(ProcessedSet::new())
            }
            Err(e) => Err(AppError::repository(&self.path, e)),
        }
    }

    async fn mark_processed(&self, id: ListingId) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::repository(&self.path, e))?;

        file.write_all(format!("{id}\n").as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;

        log::debug!("Marked listing {} as processed", id);
        Ok(())
    }
}
