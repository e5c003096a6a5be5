pub mod analysis;
pub mod capture;
pub mod db;
pub mod feedback;
pub mod models;
pub mod sampling;
pub mod session;
pub mod settings;
pub mod utils;

pub use analysis::{Analyzer, GeminiClient};
pub use capture::{FrameSource, RawFrame, SyntheticSource};
pub use db::Database;
pub use feedback::FeedbackController;
pub use models::{
    FeedbackMarker, FrameAnalysis, LoggedIssue, PerformanceType, SessionHistory, SessionStatus,
    Severity, SkillLevel, TechniqueIssue,
};
pub use session::{EngineConfig, SessionController, SessionState};
pub use settings::{SessionDefaults, SettingsStore};
