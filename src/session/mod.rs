pub mod controller;
pub mod state;

pub use controller::{EngineConfig, SessionController};
pub use state::{SessionState, ISSUE_LOG_CAP};
