use serde::{Deserialize, Serialize};

use super::session::PerformanceType;

/// One completed session as the dashboard and coach report see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistory {
    pub id: String,
    pub date: String,
    pub performance_type: PerformanceType,
    pub score: f64,
    pub technique: f64,
    pub timing: f64,
    pub expression: f64,
}

/// Seed history shown before any real session has completed, so the
/// dashboard and coach report are never empty on a fresh install.
pub fn sample_history() -> Vec<SessionHistory> {
    let rows = [
        ("1", "Oct 20", 6.2, 5.8, 6.5, 7.0),
        ("2", "Oct 22", 6.5, 6.0, 6.8, 7.2),
        ("3", "Oct 25", 7.1, 6.5, 7.5, 7.5),
        ("4", "Oct 28", 7.4, 7.2, 7.2, 8.0),
        ("5", "Nov 02", 7.8, 7.5, 8.1, 7.8),
    ];

    rows.iter()
        .map(|(id, date, score, technique, timing, expression)| SessionHistory {
            id: (*id).to_string(),
            date: (*date).to_string(),
            performance_type: PerformanceType::Ballet,
            score: *score,
            technique: *technique,
            timing: *timing,
            expression: *expression,
        })
        .collect()
}
