use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::analysis::Analyzer;
use crate::capture::FrameSource;
use crate::feedback::FeedbackController;
use crate::models::{PerformanceType, SkillLevel};
use crate::session::SessionState;

mod controller;
mod loop_worker;

pub use controller::SamplerController;

/// Seconds between capture-and-analyze cycles.
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_secs(4);

/// Everything one sampling loop needs, captured at session start. The
/// generation pins results to the session that dispatched them.
pub struct SamplerContext {
    pub session_id: String,
    pub generation: u64,
    pub performance_type: PerformanceType,
    pub skill_level: SkillLevel,
    pub source: Arc<dyn FrameSource>,
    pub analyzer: Arc<dyn Analyzer>,
    pub state: Arc<Mutex<SessionState>>,
    pub feedback: FeedbackController,
    pub interval: Duration,
}
