use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::{encode_frame_jpeg, JPEG_QUALITY};

use super::SamplerContext;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Hard bound on one capture-and-analyze cycle. Cycles are awaited in the
/// tick arm, so this also caps analyses in flight at one; a slow cycle
/// delays the next tick instead of overlapping it.
const CYCLE_TIMEOUT_SECS: u64 = 10;

enum CycleOutcome {
    Applied { issues: usize, markers: usize },
    NoFrame,
    Discarded,
}

pub async fn sampling_loop(ctx: SamplerContext, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(ctx.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick fires immediately; skip it so the first
    // capture lands one full period after start.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = run_cycle(&ctx);
                match tokio::time::timeout(Duration::from_secs(CYCLE_TIMEOUT_SECS), fut).await {
                    Ok(Ok(CycleOutcome::Applied { issues, markers })) => {
                        log_info!(
                            "analysis applied for session {}: {} issues, {} markers",
                            ctx.session_id, issues, markers
                        );
                    }
                    Ok(Ok(CycleOutcome::NoFrame)) => {
                        log_info!("no frame available for session {}, skipping cycle", ctx.session_id);
                    }
                    Ok(Ok(CycleOutcome::Discarded)) => {
                        log_warn!(
                            "analysis result discarded for session {} (session no longer current)",
                            ctx.session_id
                        );
                    }
                    Ok(Err(err)) => {
                        log_error!("capture cycle failed for session {}: {err:?}", ctx.session_id);
                    }
                    Err(_) => {
                        log_warn!(
                            "capture cycle timeout (> {}s) for session {}",
                            CYCLE_TIMEOUT_SECS, ctx.session_id
                        );
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down for session {}", ctx.session_id);
                break;
            }
        }
    }
}

async fn run_cycle(ctx: &SamplerContext) -> Result<CycleOutcome> {
    let Some(frame) = ctx.source.latest_frame().context("frame source failed")? else {
        return Ok(CycleOutcome::NoFrame);
    };

    let jpeg = tokio::task::spawn_blocking(move || encode_frame_jpeg(&frame, JPEG_QUALITY))
        .await
        .context("frame encoding worker join failed")??;

    let analysis = ctx
        .analyzer
        .analyze_frame(&jpeg, ctx.performance_type, ctx.skill_level)
        .await
        .context("frame analysis failed")?;

    let observed_at = Utc::now();
    let applied = {
        let mut state = ctx.state.lock().await;
        state.ingest(ctx.generation, &analysis, observed_at)
    };

    if !applied {
        return Ok(CycleOutcome::Discarded);
    }

    let markers: Vec<_> = analysis
        .technique_issues
        .iter()
        .filter_map(|issue| issue.visual_marker.clone())
        .collect();
    let marker_count = markers.len();
    ctx.feedback.publish(markers).await;

    Ok(CycleOutcome::Applied {
        issues: analysis.technique_issues.len(),
        markers: marker_count,
    })
}
