//! Image generation pipeline
//!
//! 1. Build the model input (reads the reference photo, if any)
//! 2. Run the backend under the global concurrency limit
//! 3. Read each output once, write it to disk, send it to the chat
//!
//! Outputs already sent stay sent if a later one fails.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::chat::{ChatId, ChatTransport};
use crate::error::{BotError, GenerationError};
use crate::images::OutputStore;
use crate::prompt::{GenerationRequest, PredictionInput};

/// One produced image, not yet downloaded. Reading consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageOutput {
    pub url: String,
}

/// Hosted image-generation backend
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Run the model to completion and return its outputs in order
    async fn run(&self, input: &PredictionInput) -> Result<Vec<ImageOutput>, GenerationError>;

    /// Fetch the bytes of one output
    async fn read(&self, output: ImageOutput) -> Result<Vec<u8>, GenerationError>;
}

/// Files written by one run
#[derive(Debug, Clone)]
pub struct Generated {
    pub tag: u16,
    pub paths: Vec<PathBuf>,
}

/// Generate images for `request` and deliver them to `chat_id`
pub async fn generate_images<T, G>(
    transport: &T,
    generator: &G,
    outputs: &OutputStore,
    limiter: &Semaphore,
    chat_id: ChatId,
    request: GenerationRequest,
) -> Result<Generated, BotError>
where
    T: ChatTransport + ?Sized,
    G: ImageGenerator + ?Sized,
{
    let has_reference = request.reference_path.is_some();
    let input = request.into_input().await?;

    let _permit = limiter.acquire().await.map_err(|_| BotError::LimiterClosed)?;
    debug!(
        "Running generation for chat {} (reference: {})",
        chat_id, has_reference
    );
    let results = generator.run(&input).await?;

    let tag = outputs.pick_tag().await?;
    let mut paths = Vec::with_capacity(results.len());

    for (index, output) in results.into_iter().enumerate() {
        let data = match generator.read(output).await {
            Ok(data) => data,
            Err(e) => {
                if index == 0 {
                    outputs.release(tag).await;
                }
                return Err(e.into());
            }
        };
        let path = outputs.write(index, tag, &data).await?;
        transport.send_photo(chat_id, &path).await?;
        paths.push(path);
    }

    info!(
        "Delivered {} images to chat {} (tag {})",
        paths.len(),
        chat_id,
        tag
    );
    Ok(Generated { tag, paths })
}
