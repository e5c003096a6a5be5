use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio::time::Duration;
use uuid::Uuid;

use crate::analysis::Analyzer;
use crate::capture::FrameSource;
use crate::db::Database;
use crate::feedback::{FeedbackController, DEFAULT_DISPLAY_WINDOW};
use crate::models::{
    sample_history, FeedbackMarker, PerformanceType, SessionRecord, SessionStatus, SkillLevel,
};
use crate::sampling::{SamplerContext, SamplerController, DEFAULT_CAPTURE_INTERVAL};

use super::state::SessionState;

/// Shown in place of the coach report when generation fails.
const REPORT_FALLBACK: &str = "Error generating report.";

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Period between capture-and-analyze cycles.
    pub capture_interval: Duration,
    /// How long published markers stay visible.
    pub display_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capture_interval: DEFAULT_CAPTURE_INTERVAL,
            display_window: DEFAULT_DISPLAY_WINDOW,
        }
    }
}

/// Public facade of the coaching engine. Owns the session state machine and
/// tears the sampler and marker board up and down around it. Cheap to clone;
/// clones share state.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    /// Serializes start/stop transitions. Without it, two concurrent starts
    /// both pass the recording check and the loser strands a Recording row
    /// whose sampler carries a stale generation.
    lifecycle: Arc<Mutex<()>>,
    db: Database,
    feedback: FeedbackController,
    sampler: Arc<Mutex<SamplerController>>,
    source: Arc<dyn FrameSource>,
    analyzer: Arc<dyn Analyzer>,
    capture_interval: Duration,
}

impl SessionController {
    pub fn new(
        db: Database,
        source: Arc<dyn FrameSource>,
        analyzer: Arc<dyn Analyzer>,
        config: EngineConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            lifecycle: Arc::new(Mutex::new(())),
            db,
            feedback: FeedbackController::new(config.display_window),
            sampler: Arc::new(Mutex::new(SamplerController::new())),
            source,
            analyzer,
            capture_interval: config.capture_interval,
        }
    }

    /// Begin a practice session. A session already recording is cancelled
    /// first, so repeated starts behave as an idempotent reset.
    pub async fn start_session(
        &self,
        performance_type: PerformanceType,
        skill_level: SkillLevel,
    ) -> Result<SessionState> {
        let _transition = self.lifecycle.lock().await;

        if self.state.lock().await.is_recording() {
            warn!("start requested while recording; restarting session");
            self.teardown_active(SessionStatus::Cancelled).await?;
        }

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let record = SessionRecord {
            id: session_id.clone(),
            started_at,
            stopped_at: None,
            status: SessionStatus::Recording,
            performance_type,
            skill_level,
            overall_score: 0.0,
            technique_score: 0.0,
            timing_score: 0.0,
            expression_score: 0.0,
            issue_count: 0,
            created_at: started_at,
            updated_at: started_at,
        };
        self.db.insert_session(&record).await?;

        let generation = {
            let mut state = self.state.lock().await;
            state.begin_session(session_id.clone(), performance_type, skill_level, started_at)
        };

        self.sampler.lock().await.start(SamplerContext {
            session_id: session_id.clone(),
            generation,
            performance_type,
            skill_level,
            source: Arc::clone(&self.source),
            analyzer: Arc::clone(&self.analyzer),
            state: Arc::clone(&self.state),
            feedback: self.feedback.clone(),
            interval: self.capture_interval,
        })?;

        info!(
            "session {session_id} started ({} / {})",
            performance_type.as_str(),
            skill_level.as_str()
        );

        Ok(self.snapshot().await)
    }

    /// End the current session. Sampling stops, markers clear immediately,
    /// and the session row plus its logged issues are persisted. Stopping
    /// while idle is a no-op.
    pub async fn stop_session(&self) -> Result<Option<SessionRecord>> {
        let _transition = self.lifecycle.lock().await;

        if !self.state.lock().await.is_recording() {
            info!("stop requested with no active session");
            return Ok(None);
        }

        self.teardown_active(SessionStatus::Completed).await
    }

    /// Cancel sampling, clear markers, finalize the row, persist the issue
    /// log. Callers have already checked a session is recording, but the
    /// state is re-read under the lock in case a racing stop got there first.
    async fn teardown_active(&self, final_status: SessionStatus) -> Result<Option<SessionRecord>> {
        // Stop the loop before touching state so no cycle ingests mid-teardown.
        self.sampler.lock().await.stop().await?;
        self.feedback.clear_now().await;

        let stopped_at = Utc::now();
        let (record, issues) = {
            let mut state = self.state.lock().await;
            if !state.is_recording() {
                return Ok(None);
            }
            state.stop();

            let session_id = state
                .session_id
                .clone()
                .context("recording session is missing an id")?;
            let started_at = state.started_at.unwrap_or(stopped_at);
            let overall = state.current_score;

            let record = SessionRecord {
                id: session_id,
                started_at,
                stopped_at: Some(stopped_at),
                status: final_status,
                performance_type: state.performance_type,
                skill_level: state.skill_level,
                overall_score: overall,
                technique_score: overall,
                timing_score: state.timing_score.unwrap_or(overall),
                expression_score: state.expression_score.unwrap_or(overall),
                issue_count: state.issue_log.len() as u64,
                created_at: started_at,
                updated_at: stopped_at,
            };

            (record, state.issue_log.clone())
        };

        self.db.finalize_session(&record).await?;
        if let Err(err) = self.db.insert_issues(&record.id, &issues).await {
            error!("failed to persist issue log for session {}: {err:?}", record.id);
        }

        info!(
            "session {} {} with score {:.1} ({} issues logged)",
            record.id,
            record.status.as_str().to_lowercase(),
            record.overall_score,
            record.issue_count
        );

        Ok(Some(record))
    }

    /// Narrative coaching report over recent completed sessions. Never
    /// fails: report-generation errors degrade to a fixed message, and a
    /// fresh database falls back to the bundled sample history.
    pub async fn generate_coach_report(&self) -> String {
        let history = match self.db.recent_history(20).await {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => sample_history(),
            Err(err) => {
                error!("failed to load session history: {err:?}");
                sample_history()
            }
        };

        match self.analyzer.generate_report(&history).await {
            Ok(report) => report,
            Err(err) => {
                error!("coach report generation failed: {err:?}");
                REPORT_FALLBACK.to_string()
            }
        }
    }

    /// Read-only snapshot of the live session for the presentation layer.
    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Markers currently in their display window.
    pub async fn active_markers(&self) -> Vec<FeedbackMarker> {
        self.feedback.active_markers().await
    }
}
