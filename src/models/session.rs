use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PerformanceType {
    Ballet,
    Contemporary,
    #[serde(rename = "Hip-hop")]
    HipHop,
    Piano,
    Violin,
    Vocals,
}

impl PerformanceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceType::Ballet => "Ballet",
            PerformanceType::Contemporary => "Contemporary",
            PerformanceType::HipHop => "Hip-hop",
            PerformanceType::Piano => "Piano",
            PerformanceType::Violin => "Violin",
            PerformanceType::Vocals => "Vocals",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Ballet" => Some(PerformanceType::Ballet),
            "Contemporary" => Some(PerformanceType::Contemporary),
            "Hip-hop" => Some(PerformanceType::HipHop),
            "Piano" => Some(PerformanceType::Piano),
            "Violin" => Some(PerformanceType::Violin),
            "Vocals" => Some(PerformanceType::Vocals),
            _ => None,
        }
    }
}

impl Default for PerformanceType {
    fn default() -> Self {
        PerformanceType::Ballet
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Professional => "Professional",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Beginner" => Some(SkillLevel::Beginner),
            "Intermediate" => Some(SkillLevel::Intermediate),
            "Advanced" => Some(SkillLevel::Advanced),
            "Professional" => Some(SkillLevel::Professional),
            _ => None,
        }
    }
}

impl Default for SkillLevel {
    fn default() -> Self {
        SkillLevel::Intermediate
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// No session has run yet, or the last one finished. Live-state only,
    /// never persisted.
    Idle,
    Recording,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Recording => "Recording",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
        }
    }
}

/// Persisted row for one practice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub performance_type: PerformanceType,
    pub skill_level: SkillLevel,
    pub overall_score: f64,
    pub technique_score: f64,
    pub timing_score: f64,
    pub expression_score: f64,
    pub issue_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
