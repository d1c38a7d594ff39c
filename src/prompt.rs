//! Generation request composition
//!
//! Turns the user's free text and optional reference photo into the
//! `input` object sent to the model.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;

use crate::error::BotError;

/// Text placed before the user's description
pub const PROMPT_PREFIX: &str = "a photo of TOK adult woman ";

/// Images requested per prediction
pub const NUM_OUTPUTS: u32 = 2;

pub const OUTPUT_FORMAT: &str = "jpg";

/// Model variant selector understood by the fine-tuned model
pub const MODEL_VARIANT: &str = "dev";

/// Model input as sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionInput {
    pub prompt: String,
    pub num_outputs: u32,
    pub output_format: String,
    pub model: String,
    /// Reference photo as a data URI; absent without a reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A prompt plus optional reference, before the reference is read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub reference_path: Option<PathBuf>,
}

impl GenerationRequest {
    /// Interpolate `text` verbatim into the fixed template
    pub fn compose(text: &str, reference_path: Option<&Path>) -> Self {
        Self {
            prompt: format!("{}{}", PROMPT_PREFIX, text),
            reference_path: reference_path.map(Path::to_path_buf),
        }
    }

    /// Read the reference (if any) and build the model input
    pub async fn into_input(self) -> Result<PredictionInput, BotError> {
        let image = match self.reference_path {
            Some(path) => Some(data_uri(&path).await?),
            None => None,
        };

        Ok(PredictionInput {
            prompt: self.prompt,
            num_outputs: NUM_OUTPUTS,
            output_format: OUTPUT_FORMAT.to_string(),
            model: MODEL_VARIANT.to_string(),
            image,
        })
    }
}

async fn data_uri(path: &Path) -> Result<String, BotError> {
    let data = tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BotError::MissingReference(path.to_path_buf())
        } else {
            BotError::Io(e)
        }
    })?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(data)))
}
