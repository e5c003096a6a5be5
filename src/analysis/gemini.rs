use std::env;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::{FrameAnalysis, PerformanceType, SessionHistory, SkillLevel};

use super::Analyzer;

const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fast model for per-frame analysis, stronger model for the narrative report.
const FRAME_MODEL: &str = "gemini-2.5-flash";
const REPORT_MODEL: &str = "gemini-2.5-pro";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for the Gemini generative-AI API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Read the API key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(GEMINI_API_KEY_ENV)
            .map_err(|_| anyhow!("{GEMINI_API_KEY_ENV} environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    fn build_url(&self, model: &str) -> String {
        format!("{API_BASE_URL}/models/{model}:generateContent?key={}", self.api_key)
    }

    async fn generate(&self, model: &str, request: &GeminiRequest) -> Result<String> {
        let url = self.build_url(model);

        debug!("sending generateContent request to {model}");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("gemini request failed")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read gemini response body")?;

        if !status.is_success() {
            error!("gemini API returned {status}");
            bail!("gemini API error ({status}): {body}");
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&body).context("failed to parse gemini response envelope")?;

        if let Some(error) = parsed.error {
            bail!("gemini API error: {}", error.message);
        }

        extract_text(&parsed).ok_or_else(|| anyhow!("gemini response contained no text"))
    }
}

fn extract_text(response: &GeminiResponse) -> Option<String> {
    response
        .candidates
        .as_ref()?
        .first()?
        .content
        .as_ref()?
        .parts
        .as_ref()?
        .iter()
        .find_map(|part| part.text.clone())
}

fn frame_prompt(performance_type: PerformanceType, skill_level: SkillLevel) -> String {
    format!(
        "Act as an expert performance technique analyst. Analyze this frame from a {} performance.\n\
         Skill level of performer: {}.\n\n\
         Focus on:\n\
         1. Body alignment and posture.\n\
         2. Movement quality or instrument technique.\n\
         3. Timing and rhythmic precision (if applicable to the frame).\n\
         4. Emotional expression.\n\n\
         Provide actionable feedback and specific coordinate-based markers (normalized 0-100) for issues.",
        performance_type.as_str(),
        skill_level.as_str()
    )
}

/// Structured-output schema for per-frame analysis. The required fields here
/// are the contract the rest of the engine relies on.
fn frame_response_schema() -> Value {
    let marker = json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING" },
            "x": { "type": "NUMBER" },
            "y": { "type": "NUMBER" },
            "color": { "type": "STRING" },
            "label": { "type": "STRING" }
        },
        "required": ["x", "y", "color", "label"]
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "overall_score": { "type": "NUMBER" },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "technique_issues": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "category": { "type": "STRING" },
                        "severity": { "type": "STRING", "enum": ["low", "medium", "high"] },
                        "description": { "type": "STRING" },
                        "correction": { "type": "STRING" },
                        "visual_marker": marker
                    },
                    "required": ["category", "severity", "description", "correction"]
                }
            }
        },
        "required": ["overall_score", "strengths", "technique_issues"]
    })
}

fn report_prompt(history: &[SessionHistory]) -> Result<String> {
    let serialized = serde_json::to_string(history).context("failed to serialize history")?;
    Ok(format!(
        "As a world-class performance coach, analyze this user's history of practice sessions:\n\
         {serialized}\n\n\
         Identify:\n\
         1. Long-term progress trends.\n\
         2. Priority areas for improvement.\n\
         3. A specific 30-minute practice plan for the next session.\n\n\
         Provide the response in Markdown format with encouraging but professional tone."
    ))
}

#[async_trait]
impl Analyzer for GeminiClient {
    async fn analyze_frame(
        &self,
        jpeg: &[u8],
        performance_type: PerformanceType,
        skill_level: SkillLevel,
    ) -> Result<FrameAnalysis> {
        let request = GeminiRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: BASE64.encode(jpeg),
                        },
                    },
                    RequestPart::Text {
                        text: frame_prompt(performance_type, skill_level),
                    },
                ],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: Some(frame_response_schema()),
            }),
        };

        let text = self.generate(FRAME_MODEL, &request).await?;
        serde_json::from_str(text.trim()).context("failed to parse frame analysis")
    }

    async fn generate_report(&self, history: &[SessionHistory]) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart::Text {
                    text: report_prompt(history)?,
                }],
            }],
            generation_config: None,
        };

        self.generate(REPORT_MODEL, &request).await
    }
}
