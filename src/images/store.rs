//! Generated image storage
//!
//! Each run writes `{index}-{tag}.jpg` where `tag` is a 4-digit number
//! shared by all outputs of the run. Picking a tag creates its first
//! file, and a tag is re-drawn while that file already exists, so runs
//! (including concurrent ones) do not overwrite each other.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{debug, warn};

/// Draws before giving up on finding an unused tag
const TAG_ATTEMPTS: usize = 32;

/// Directory of generated outputs
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of output `index` in run `tag`
    pub fn path_for(&self, index: usize, tag: u16) -> PathBuf {
        self.dir.join(format!("{}-{}.jpg", index, tag))
    }

    fn random_tag() -> u16 {
        rand::rng().random_range(1000..=9999)
    }

    /// Pick a free tag and reserve it by creating its first output file
    pub async fn pick_tag(&self) -> std::io::Result<u16> {
        let mut tag = Self::random_tag();
        for _ in 1..TAG_ATTEMPTS {
            let reserved = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.path_for(0, tag))
                .await;
            match reserved {
                Ok(_) => return Ok(tag),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Session tag {} already used, drawing again", tag);
                    tag = Self::random_tag();
                }
                Err(e) => return Err(e),
            }
        }
        warn!("No free session tag after {} draws, reusing {}", TAG_ATTEMPTS, tag);
        Ok(tag)
    }

    /// Drop the reservation made by [`OutputStore::pick_tag`] when nothing
    /// was written under `tag`
    pub async fn release(&self, tag: u16) {
        let path = self.path_for(0, tag);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }

    /// Write one output and return its path
    pub async fn write(&self, index: usize, tag: u16, data: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.path_for(index, tag);
        tokio::fs::write(&path, data).await?;
        debug!("Wrote {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }
}
