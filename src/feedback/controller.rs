use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::models::FeedbackMarker;

/// Default time markers stay on screen before being cleared to avoid clutter.
pub const DEFAULT_DISPLAY_WINDOW: Duration = Duration::from_secs(2);

struct MarkerBoard {
    markers: Vec<FeedbackMarker>,
    /// Bumped on every publish and forced clear. A scheduled clear only
    /// fires if the epoch it captured is still current, so a stale timer
    /// can never erase markers from a newer publish.
    epoch: u64,
}

/// Owns the set of markers currently overlaid on the live view. Each publish
/// replaces the set and schedules its own expiry; stopping a session clears
/// the board synchronously.
#[derive(Clone)]
pub struct FeedbackController {
    board: Arc<Mutex<MarkerBoard>>,
    display_window: Duration,
}

impl FeedbackController {
    pub fn new(display_window: Duration) -> Self {
        Self {
            board: Arc::new(Mutex::new(MarkerBoard {
                markers: Vec::new(),
                epoch: 0,
            })),
            display_window,
        }
    }

    /// Replace the active marker set and schedule its expiry.
    pub async fn publish(&self, markers: Vec<FeedbackMarker>) {
        let epoch = {
            let mut board = self.board.lock().await;
            board.epoch = board.epoch.wrapping_add(1);
            board.markers = markers;
            board.epoch
        };

        let board = Arc::clone(&self.board);
        let delay = self.display_window;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut guard = board.lock().await;
            if guard.epoch == epoch {
                guard.markers.clear();
            }
        });
    }

    /// Clear immediately and invalidate any pending scheduled clears.
    pub async fn clear_now(&self) {
        let mut board = self.board.lock().await;
        board.epoch = board.epoch.wrapping_add(1);
        board.markers.clear();
    }

    /// Read-only snapshot for the presentation layer.
    pub async fn active_markers(&self) -> Vec<FeedbackMarker> {
        self.board.lock().await.markers.clone()
    }
}

impl Default for FeedbackController {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(label: &str) -> FeedbackMarker {
        FeedbackMarker {
            kind: "posture".to_string(),
            x: 40.0,
            y: 30.0,
            color: "#ef4444".to_string(),
            label: label.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn markers_visible_then_cleared_after_window() {
        let feedback = FeedbackController::new(Duration::from_secs(2));
        feedback.publish(vec![marker("Shoulder")]).await;
        assert_eq!(feedback.active_markers().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(feedback.active_markers().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(feedback.active_markers().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_clear_does_not_erase_newer_publish() {
        let feedback = FeedbackController::new(Duration::from_secs(2));
        feedback.publish(vec![marker("first")]).await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        feedback.publish(vec![marker("second")]).await;

        // First publish's clear fires now; second set must survive it.
        tokio::time::sleep(Duration::from_millis(600)).await;
        let markers = feedback.active_markers().await;
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].label, "second");

        // After the second window the board is empty.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(feedback.active_markers().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_now_empties_and_supersedes_pending_clear() {
        let feedback = FeedbackController::new(Duration::from_secs(2));
        feedback.publish(vec![marker("one")]).await;
        feedback.clear_now().await;
        assert!(feedback.active_markers().await.is_empty());

        // Publish again before the first scheduled clear would have fired;
        // that stale clear must not touch the new set.
        feedback.publish(vec![marker("two")]).await;
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(feedback.active_markers().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_publish_replaces_previous_markers() {
        let feedback = FeedbackController::new(Duration::from_secs(2));
        feedback.publish(vec![marker("one")]).await;
        feedback.publish(Vec::new()).await;
        assert!(feedback.active_markers().await.is_empty());
    }
}
