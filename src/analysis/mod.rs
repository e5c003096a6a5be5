use anyhow::Result;
use async_trait::async_trait;

use crate::models::{FrameAnalysis, PerformanceType, SessionHistory, SkillLevel};

mod gemini;

pub use gemini::GeminiClient;

/// Boundary to the remote coaching model. One implementation talks to
/// Gemini; tests substitute scripted analyzers.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze one encoded still frame in the context of the session's
    /// category and skill level.
    async fn analyze_frame(
        &self,
        jpeg: &[u8],
        performance_type: PerformanceType,
        skill_level: SkillLevel,
    ) -> Result<FrameAnalysis>;

    /// Produce a narrative coaching report over past session history.
    async fn generate_report(&self, history: &[SessionHistory]) -> Result<String>;
}
