use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::controller::ScheduleAvailabilityController;
use crate::models::SchedulePrompt;
use crate::store::AvailabilityStore;

/// Remote control for a running monitor; lets the owning session stop the
/// timer on teardown so no tick acts on stale state after logout.
#[derive(Clone)]
pub struct MonitorHandle {
    is_shutdown: Arc<RwLock<bool>>,
}

impl MonitorHandle {
    pub async fn shutdown(&self) {
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    pub async fn is_shutdown(&self) -> bool {
        *self.is_shutdown.read().await
    }
}

/// Drives the controller's level-triggered transitions: samples the clock
/// on a fixed interval, re-evaluates, and forwards any prompts to the
/// embedding layer over a channel.
///
/// The controller sits behind a mutex shared with user-triggered actions,
/// so ticks and button presses serialize onto one logical writer.
pub struct ScheduleMonitor<S, C> {
    controller: Arc<Mutex<ScheduleAvailabilityController<S, C>>>,
    tick_interval: Duration,
    prompt_tx: mpsc::Sender<SchedulePrompt>,
    is_shutdown: Arc<RwLock<bool>>,
}

impl<S, C> ScheduleMonitor<S, C>
where
    S: AvailabilityStore + 'static,
    C: Clock + 'static,
{
    pub fn new(
        controller: Arc<Mutex<ScheduleAvailabilityController<S, C>>>,
        tick_interval: Duration,
        prompt_tx: mpsc::Sender<SchedulePrompt>,
    ) -> Self {
        Self {
            controller,
            tick_interval,
            prompt_tx,
            is_shutdown: Arc::new(RwLock::new(false)),
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            is_shutdown: Arc::clone(&self.is_shutdown),
        }
    }

    pub async fn run(self) {
        info!(
            "Schedule monitor started (tick every {:?})",
            self.tick_interval
        );
        let mut interval = tokio::time::interval(self.tick_interval);

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                break;
            }

            let prompts = {
                let mut controller = self.controller.lock().await;
                controller.tick().await;
                controller.drain_prompts()
            };

            for prompt in prompts {
                if self.prompt_tx.send(prompt).await.is_err() {
                    debug!("Prompt receiver dropped, stopping monitor");
                    return;
                }
            }
        }

        info!("Schedule monitor stopped");
    }
}
