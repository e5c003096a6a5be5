use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};

use artemis::{
    Database, EngineConfig, GeminiClient, SessionController, SettingsStore, SyntheticSource,
};

fn data_dir() -> PathBuf {
    std::env::var("ARTEMIS_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".artemis"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let dir = data_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data dir {}", dir.display()))?;

    let settings = SettingsStore::new(dir.join("settings.json"))?;
    let db = Database::new(dir.join("artemis.sqlite3"))?;

    // Sessions left open by a crash never complete; mark them cancelled.
    let orphaned = db.cancel_dangling_sessions(Utc::now()).await?;
    if orphaned > 0 {
        warn!("cancelled {orphaned} session(s) left recording by a previous run");
    }

    let analyzer = Arc::new(GeminiClient::from_env()?);
    // Camera acquisition lives outside this crate; the demo runs against a
    // synthetic 720p source.
    let source = Arc::new(SyntheticSource::new(1280, 720));

    let controller = SessionController::new(db, source, analyzer, EngineConfig::default());

    let defaults = settings.session_defaults();
    controller
        .start_session(defaults.performance_type, defaults.skill_level)
        .await?;
    info!("recording; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    if let Some(record) = controller.stop_session().await? {
        let snapshot = controller.snapshot().await;
        println!(
            "Session {} finished: score {:.1}, {} issue(s) logged",
            record.id,
            record.overall_score,
            snapshot.issue_log.len()
        );
        for logged in snapshot.issue_log.iter().take(10) {
            println!(
                "  [{}] {}: {} ({})",
                logged.issue.severity.as_str(),
                logged.issue.category,
                logged.issue.description,
                logged.issue.correction
            );
        }
    }

    println!("\nCoach report:\n{}", controller.generate_coach_report().await);

    Ok(())
}
