//! Replicate integration
//!
//! Runs the fine-tuned image model through the predictions API:
//! create a prediction, poll until it settles, then download outputs.
//! There are no retries; every failure is returned to the caller.

mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::GenerationError;
use crate::images::{ImageGenerator, ImageOutput};
use crate::prompt::PredictionInput;
pub use types::{Prediction, PredictionStatus};
use types::CreatePrediction;

/// Seconds Replicate may hold the create request open before replying
const PREFER_WAIT_SECS: u64 = 60;

/// Replicate API client bound to one model version
#[derive(Debug, Clone)]
pub struct ReplicateClient {
    client: Client,
    api_url: String,
    api_token: String,
    model: String,
    version: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl ReplicateClient {
    pub fn new(config: &Config) -> Result<Self, GenerationError> {
        Ok(Self {
            client: Client::builder().timeout(config.http_timeout()).build()?,
            api_url: config.replicate_api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
            version: config.model_version.clone(),
            poll_interval: config.prediction_poll_interval(),
            timeout: config.prediction_timeout(),
        })
    }

    /// `owner/name:version`
    pub fn model_ref(&self) -> String {
        format!("{}:{}", self.model, self.version)
    }

    fn prefer_wait_secs(&self) -> u64 {
        PREFER_WAIT_SECS.min(self.timeout.as_secs()).max(1)
    }

    /// Turn non-2xx responses into [`GenerationError::Api`]
    async fn check(response: Response) -> Result<Response, GenerationError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!("Replicate API error: {} - {}", status, body);
        Err(GenerationError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn create(&self, input: &PredictionInput) -> Result<Prediction, GenerationError> {
        let request = CreatePrediction {
            version: &self.version,
            input,
        };

        debug!("Creating prediction on {}", self.model_ref());

        // The wait window can outlast the client-wide timeout; only the
        // prediction timeout bounds this call.
        let response = self
            .client
            .post(format!("{}/predictions", self.api_url))
            .bearer_auth(&self.api_token)
            .header("Prefer", format!("wait={}", self.prefer_wait_secs()))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn get(&self, url: &str) -> Result<Prediction, GenerationError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    /// Create a prediction and poll it until it succeeds or fails
    async fn run_to_completion(
        &self,
        input: &PredictionInput,
    ) -> Result<Prediction, GenerationError> {
        let mut prediction = self.create(input).await?;

        loop {
            match prediction.status {
                PredictionStatus::Succeeded => return Ok(prediction),
                status if status.is_failure() => {
                    return Err(GenerationError::Failed(prediction.failure_reason()))
                }
                _ => {}
            }

            let poll_url = prediction
                .urls
                .get
                .clone()
                .ok_or(GenerationError::MissingPollUrl)?;

            debug!(
                "Prediction {} is {:?}, polling again",
                prediction.id, prediction.status
            );
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.get(&poll_url).await?;
        }
    }
}

#[async_trait]
impl ImageGenerator for ReplicateClient {
    async fn run(&self, input: &PredictionInput) -> Result<Vec<ImageOutput>, GenerationError> {
        let prediction = tokio::time::timeout(self.timeout, self.run_to_completion(input))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;

        let outputs: Vec<ImageOutput> = prediction
            .output_urls()
            .into_iter()
            .map(|url| ImageOutput { url })
            .collect();

        if outputs.is_empty() {
            return Err(GenerationError::NoOutput);
        }

        info!(
            "Prediction {} succeeded with {} outputs",
            prediction.id,
            outputs.len()
        );
        Ok(outputs)
    }

    async fn read(&self, output: ImageOutput) -> Result<Vec<u8>, GenerationError> {
        debug!("Downloading output {}", output.url);

        let response = self.client.get(&output.url).send().await?;
        let data = Self::check(response).await?.bytes().await?;
        Ok(data.to_vec())
    }
}
