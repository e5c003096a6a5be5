mod controller;

pub use controller::{FeedbackController, DEFAULT_DISPLAY_WINDOW};
