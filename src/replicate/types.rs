//! Replicate predictions API wire types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prompt::PredictionInput;

/// Body of POST /predictions
#[derive(Debug, Serialize)]
pub struct CreatePrediction<'a> {
    pub version: &'a str,
    pub input: &'a PredictionInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    /// Failed, canceled or aborted
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Failed | PredictionStatus::Canceled | PredictionStatus::Aborted
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

/// A prediction as returned by create and get
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub urls: PredictionUrls,
}

impl Prediction {
    /// Output URLs in model order. Models return either one URL or a list.
    pub fn output_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        match &self.output {
            Some(Value::String(url)) => urls.push(url.clone()),
            Some(Value::Array(items)) => {
                urls.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
            }
            _ => {}
        }
        urls
    }

    /// Human-readable failure reason
    pub fn failure_reason(&self) -> String {
        match &self.error {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Null) | None => format!("prediction {} {:?}", self.id, self.status),
            Some(other) => other.to_string(),
        }
    }
}
