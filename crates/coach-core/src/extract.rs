//! Plan extraction from photos of printed plans.
//!
//! The extraction model itself is an external service behind
//! [`PlanExtractor`]. This module owns the request shape and turns the
//! model's raw text into a [`CandidatePlan`] a trainer can review and then
//! submit through the normal create-version path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use coach_db::models::{NewExercise, NewMeal};

use crate::kind::PlanType;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("plan extraction is not configured")]
    Unavailable,

    #[error("plan extraction failed: {0}")]
    Failed(String),

    #[error("extraction returned malformed plan JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// An image to extract a plan from.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRequest {
    /// Base64 image data, optionally as a `data:image/...;base64,` URL.
    pub image: String,
    #[serde(rename = "type")]
    pub kind: PlanType,
}

impl ExtractionRequest {
    /// The base64 payload without any data-URL header.
    pub fn image_data(&self) -> &str {
        strip_data_url(&self.image)
    }
}

fn strip_data_url(image: &str) -> &str {
    match image.split_once(";base64,") {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => image,
    }
}

/// Produces raw model text describing the plan in an image.
#[async_trait]
pub trait PlanExtractor: Send + Sync {
    async fn extract(&self, image_base64: &str, kind: PlanType) -> Result<String, ExtractError>;
}

/// Extractor used when no extraction service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredExtractor;

#[async_trait]
impl PlanExtractor for UnconfiguredExtractor {
    async fn extract(&self, _image_base64: &str, _kind: PlanType) -> Result<String, ExtractError> {
        Err(ExtractError::Unavailable)
    }
}

/// A proposed plan for review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate<N> {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "Vec::new", alias = "meals", alias = "exercises")]
    pub items: Vec<N>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CandidatePlan {
    Diet(Candidate<NewMeal>),
    Workout(Candidate<NewExercise>),
}

/// Parse raw model output, tolerating a Markdown code fence around it.
pub fn parse_extraction(raw: &str, kind: PlanType) -> Result<CandidatePlan, ExtractError> {
    let json = strip_code_fence(raw);
    Ok(match kind {
        PlanType::Diet => CandidatePlan::Diet(serde_json::from_str(json)?),
        PlanType::Workout => CandidatePlan::Workout(serde_json::from_str(json)?),
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Ask `extractor` for a plan and parse what it returns.
pub async fn extract_plan(
    extractor: &dyn PlanExtractor,
    request: &ExtractionRequest,
) -> Result<CandidatePlan, ExtractError> {
    let raw = extractor.extract(request.image_data(), request.kind).await?;
    parse_extraction(&raw, request.kind)
}
