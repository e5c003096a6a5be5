use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Positioned annotation overlaid on the live view. Coordinates are
/// normalized to 0-100; the presentation layer scales them to pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackMarker {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechniqueIssue {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub correction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_marker: Option<FeedbackMarker>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingAnalysis {
    pub beat_offset_ms: f64,
    pub tempo_drift_bpm: f64,
    pub rhythmic_accuracy_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpressionAnalysis {
    pub emotional_authenticity_score: f64,
    pub stage_presence_score: f64,
}

/// Parsed response for one analyzed frame. Consumed once to update session
/// and feedback state, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameAnalysis {
    pub overall_score: f64,
    pub strengths: Vec<String>,
    pub technique_issues: Vec<TechniqueIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_analysis: Option<TimingAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_analysis: Option<ExpressionAnalysis>,
}

/// A technique issue as it sits in the session log: the remote model never
/// supplies the timestamp, it is stamped at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggedIssue {
    #[serde(flatten)]
    pub issue: TechniqueIssue,
    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_analysis_with_marker() {
        let raw = r##"{
            "overall_score": 7.2,
            "strengths": ["Strong extension"],
            "technique_issues": [{
                "category": "Posture",
                "severity": "medium",
                "description": "Shoulders uneven",
                "correction": "Level shoulders",
                "visual_marker": {"type": "posture", "x": 40, "y": 30, "color": "#ef4444", "label": "Shoulder"}
            }]
        }"##;

        let analysis: FrameAnalysis = serde_json::from_str(raw).unwrap();
        assert_eq!(analysis.overall_score, 7.2);
        assert_eq!(analysis.technique_issues.len(), 1);
        let issue = &analysis.technique_issues[0];
        assert_eq!(issue.severity, Severity::Medium);
        let marker = issue.visual_marker.as_ref().unwrap();
        assert_eq!(marker.kind, "posture");
        assert_eq!((marker.x, marker.y), (40.0, 30.0));
        assert!(analysis.timing_analysis.is_none());
    }

    #[test]
    fn issue_without_marker_is_valid() {
        let raw = r#"{
            "overall_score": 5.0,
            "strengths": [],
            "technique_issues": [{
                "category": "Timing",
                "severity": "low",
                "description": "Slightly behind the beat",
                "correction": "Count out loud"
            }]
        }"#;

        let analysis: FrameAnalysis = serde_json::from_str(raw).unwrap();
        assert!(analysis.technique_issues[0].visual_marker.is_none());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let raw = r#"{"strengths": [], "technique_issues": []}"#;
        assert!(serde_json::from_str::<FrameAnalysis>(raw).is_err());
    }
}
