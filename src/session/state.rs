use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{FrameAnalysis, LoggedIssue, PerformanceType, SessionStatus, SkillLevel};

/// Issue log entries kept per session; oldest entries are dropped past this.
pub const ISSUE_LOG_CAP: usize = 50;

/// Live state for the current practice session. Mutated only through the
/// operations below; everything else sees cloned snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: SessionStatus,
    pub session_id: Option<String>,
    pub performance_type: PerformanceType,
    pub skill_level: SkillLevel,
    pub started_at: Option<DateTime<Utc>>,
    pub current_score: f64,
    pub issue_log: Vec<LoggedIssue>,
    pub latest_strengths: Vec<String>,
    pub timing_score: Option<f64>,
    pub expression_score: Option<f64>,
    pub analyses_received: u64,
    /// Bumped on every start. In-flight work captures the generation at
    /// dispatch and results are ignored unless it still matches.
    #[serde(skip)]
    pub generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: SessionStatus::Idle,
            session_id: None,
            performance_type: PerformanceType::default(),
            skill_level: SkillLevel::default(),
            started_at: None,
            current_score: 0.0,
            issue_log: Vec::new(),
            latest_strengths: Vec::new(),
            timing_score: None,
            expression_score: None,
            analyses_received: 0,
            generation: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.status == SessionStatus::Recording
    }

    /// Begin a fresh session: accumulators reset, generation advances.
    pub fn begin_session(
        &mut self,
        session_id: String,
        performance_type: PerformanceType,
        skill_level: SkillLevel,
        started_at: DateTime<Utc>,
    ) -> u64 {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            status: SessionStatus::Recording,
            session_id: Some(session_id),
            performance_type,
            skill_level,
            started_at: Some(started_at),
            generation,
            ..Self::default()
        };
        generation
    }

    /// Stop recording. The log and score stay visible until the next start.
    pub fn stop(&mut self) {
        self.status = SessionStatus::Idle;
    }

    /// Apply one analysis result. Returns false without touching state when
    /// the session is not recording or the result belongs to an older
    /// generation (a late completion from before a stop or restart).
    pub fn ingest(
        &mut self,
        generation: u64,
        analysis: &FrameAnalysis,
        observed_at: DateTime<Utc>,
    ) -> bool {
        if !self.is_recording() || generation != self.generation {
            return false;
        }

        self.current_score = analysis.overall_score;
        self.latest_strengths = analysis.strengths.clone();
        if let Some(timing) = &analysis.timing_analysis {
            self.timing_score = Some(timing.rhythmic_accuracy_score);
        }
        if let Some(expression) = &analysis.expression_analysis {
            self.expression_score = Some(expression.stage_presence_score);
        }
        self.analyses_received += 1;

        let stamped = analysis.technique_issues.iter().map(|issue| LoggedIssue {
            issue: issue.clone(),
            observed_at,
        });
        // Newest first: this result's issues ahead of everything already
        // logged, then cap the log.
        let mut log = Vec::with_capacity(self.issue_log.len() + analysis.technique_issues.len());
        log.extend(stamped);
        log.append(&mut self.issue_log);
        log.truncate(ISSUE_LOG_CAP);
        self.issue_log = log;

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, TechniqueIssue};

    fn issue(category: &str) -> TechniqueIssue {
        TechniqueIssue {
            category: category.to_string(),
            severity: Severity::Medium,
            description: "Shoulders uneven".to_string(),
            correction: "Level shoulders".to_string(),
            visual_marker: None,
        }
    }

    fn analysis(score: f64, issues: Vec<TechniqueIssue>) -> FrameAnalysis {
        FrameAnalysis {
            overall_score: score,
            strengths: vec!["Good lines".to_string()],
            technique_issues: issues,
            timing_analysis: None,
            expression_analysis: None,
        }
    }

    fn recording_state() -> (SessionState, u64) {
        let mut state = SessionState::new();
        let generation = state.begin_session(
            "s1".to_string(),
            PerformanceType::Ballet,
            SkillLevel::Intermediate,
            Utc::now(),
        );
        (state, generation)
    }

    #[test]
    fn begin_session_resets_accumulators() {
        let (mut state, generation) = recording_state();
        assert!(state.ingest(generation, &analysis(7.2, vec![issue("Posture")]), Utc::now()));
        assert_eq!(state.current_score, 7.2);
        assert_eq!(state.issue_log.len(), 1);

        let next = state.begin_session(
            "s2".to_string(),
            PerformanceType::Piano,
            SkillLevel::Advanced,
            Utc::now(),
        );
        assert_eq!(state.current_score, 0.0);
        assert!(state.issue_log.is_empty());
        assert!(state.latest_strengths.is_empty());
        assert_eq!(next, generation + 1);
    }

    #[test]
    fn ingest_is_noop_when_not_recording() {
        let (mut state, generation) = recording_state();
        state.stop();
        assert!(!state.ingest(generation, &analysis(8.0, vec![issue("Posture")]), Utc::now()));
        assert_eq!(state.current_score, 0.0);
        assert!(state.issue_log.is_empty());
    }

    #[test]
    fn stale_generation_is_rejected() {
        let (mut state, old_generation) = recording_state();
        state.begin_session(
            "s2".to_string(),
            PerformanceType::Ballet,
            SkillLevel::Intermediate,
            Utc::now(),
        );
        assert!(!state.ingest(old_generation, &analysis(9.0, vec![]), Utc::now()));
        assert_eq!(state.current_score, 0.0);
    }

    #[test]
    fn issue_log_is_newest_first_and_capped() {
        let (mut state, generation) = recording_state();
        for i in 0..13 {
            let applied = state.ingest(
                generation,
                &analysis(5.0, vec![issue(&format!("issue-{i}"))]),
                Utc::now(),
            );
            assert!(applied);
        }
        assert_eq!(state.issue_log.len(), 13);
        assert_eq!(state.issue_log[0].issue.category, "issue-12");
        assert_eq!(state.issue_log[12].issue.category, "issue-0");

        for i in 13..60 {
            state.ingest(
                generation,
                &analysis(5.0, vec![issue(&format!("issue-{i}"))]),
                Utc::now(),
            );
        }
        assert_eq!(state.issue_log.len(), ISSUE_LOG_CAP);
        assert_eq!(state.issue_log[0].issue.category, "issue-59");
        // Oldest surviving entry is the 50th most recent.
        assert_eq!(state.issue_log[49].issue.category, "issue-10");
    }

    #[test]
    fn multi_issue_result_keeps_wire_order_at_front() {
        let (mut state, generation) = recording_state();
        state.ingest(generation, &analysis(6.0, vec![issue("old")]), Utc::now());
        state.ingest(
            generation,
            &analysis(6.5, vec![issue("a"), issue("b")]),
            Utc::now(),
        );
        let categories: Vec<&str> = state
            .issue_log
            .iter()
            .map(|logged| logged.issue.category.as_str())
            .collect();
        assert_eq!(categories, vec!["a", "b", "old"]);
    }

    #[test]
    fn sub_scores_persist_across_results_without_them() {
        let (mut state, generation) = recording_state();
        let mut with_timing = analysis(7.0, vec![]);
        with_timing.timing_analysis = Some(crate::models::TimingAnalysis {
            beat_offset_ms: 12.0,
            tempo_drift_bpm: 0.4,
            rhythmic_accuracy_score: 8.1,
        });
        state.ingest(generation, &with_timing, Utc::now());
        state.ingest(generation, &analysis(7.5, vec![]), Utc::now());
        assert_eq!(state.timing_score, Some(8.1));
        assert_eq!(state.current_score, 7.5);
    }
}
