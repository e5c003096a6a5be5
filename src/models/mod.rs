pub mod analysis;
pub mod history;
pub mod session;

pub use analysis::{
    ExpressionAnalysis, FeedbackMarker, FrameAnalysis, LoggedIssue, Severity, TechniqueIssue,
    TimingAnalysis,
};
pub use history::{sample_history, SessionHistory};
pub use session::{PerformanceType, SessionRecord, SessionStatus, SkillLevel};
