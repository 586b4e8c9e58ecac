use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use dotenv::dotenv;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schedule_cell::{
    HttpAvailabilityStore, ScheduleAvailabilityController, ScheduleMonitor, ScheduleSnapshot,
    SystemClock,
};
use shared_backend::{sign_in, PortalApiClient};
use shared_config::PortalConfig;
use shared_models::auth::Role;
use shared_utils::session;

/// Headless availability agent: keeps a doctor's schedule state machine
/// running against the portal backend and logs every prompt it raises.
#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CarePulse availability agent");

    let config = PortalConfig::from_env();
    if !config.is_configured() {
        return Err(anyhow!(
            "PORTAL_API_URL, PORTAL_EMAIL and PORTAL_PASSWORD must be set"
        ));
    }

    let api = PortalApiClient::new(&config);
    let session = sign_in(&api, &config.portal_email, &config.portal_password).await?;

    if session.user.role != Role::Doctor {
        return Err(anyhow!(
            "The availability agent needs a doctor account, got {:?}",
            session.user.role
        ));
    }
    session::ensure_fresh(session.token(), chrono::Utc::now())?;

    let doctor_id = session.user.id;
    let store = HttpAvailabilityStore::new(api, session.access_token.clone());
    let mut controller = ScheduleAvailabilityController::new(doctor_id, store, SystemClock);

    // Pick up where the last run left off, if the snapshot is still fresh.
    let snapshot_path = PathBuf::from(&config.snapshot_path);
    match ScheduleSnapshot::load_from(&snapshot_path) {
        Ok(Some(snapshot)) => match controller.restore(snapshot) {
            Ok(state) => info!("Restored local snapshot, state {:?}", state),
            Err(e) => warn!("Ignoring local snapshot: {}", e),
        },
        Ok(None) => {}
        Err(e) => warn!("Could not read local snapshot: {}", e),
    }

    // The backend copy wins over anything restored locally.
    match controller.initialize().await {
        Ok(state) => info!("Schedule state after reconcile: {:?}", state),
        Err(e) => warn!(
            "Could not load today's schedule, continuing with local state: {}",
            e
        ),
    }
    for prompt in controller.drain_prompts() {
        info!("{}", prompt);
    }

    let controller = Arc::new(Mutex::new(controller));
    let (prompt_tx, mut prompt_rx) = mpsc::channel(32);
    let monitor = ScheduleMonitor::new(
        Arc::clone(&controller),
        Duration::from_secs(config.monitor_tick_seconds),
        prompt_tx,
    );
    let handle = monitor.handle();
    let monitor_task = tokio::spawn(monitor.run());

    loop {
        tokio::select! {
            prompt = prompt_rx.recv() => {
                match prompt {
                    Some(prompt) => info!("{}", prompt),
                    None => break,
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for shutdown signal")?;
                info!("Shutdown signal received");
                break;
            }
        }
    }

    handle.shutdown().await;
    if let Err(e) = monitor_task.await {
        error!("Monitor task failed: {}", e);
    }

    // Persist the machine so the next run inside the 24h window can resume.
    let snapshot = controller.lock().await.snapshot();
    if let Err(e) = snapshot.save_to(&snapshot_path) {
        warn!("Could not write snapshot: {}", e);
    }

    info!("Availability agent stopped");
    Ok(())
}
