//! Reference photo storage
//!
//! One file per user, `reference_{user_id}.jpg`, overwritten by each new
//! upload. Files are never cleaned up.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::chat::{ChatTransport, PhotoVariant, UserId};
use crate::error::BotError;

/// Directory of per-user reference photos
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    dir: PathBuf,
}

impl ReferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic path of the user's reference photo
    pub fn path_for(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("reference_{}.jpg", user_id))
    }

    /// Highest-resolution variant; file size breaks ties
    pub fn largest(variants: &[PhotoVariant]) -> Option<&PhotoVariant> {
        variants
            .iter()
            .max_by_key(|v| (v.area(), v.file_size.unwrap_or(0)))
    }

    /// Download the largest variant to the user's reference path
    pub async fn save<T: ChatTransport + ?Sized>(
        &self,
        transport: &T,
        user_id: UserId,
        variants: &[PhotoVariant],
    ) -> Result<PathBuf, BotError> {
        let photo = Self::largest(variants).ok_or(BotError::EmptyPhoto)?;
        let path = self.path_for(user_id);

        transport.download_file(&photo.file_id, &path).await?;

        info!(
            "Stored {}x{} reference for user {} at {}",
            photo.width,
            photo.height,
            user_id,
            path.display()
        );
        Ok(path)
    }
}
