//! Background loop
//!
//! Waits on either a timer tick or the periodic liveness tick. A timer tick
//! runs one round; every wake reports liveness.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::controller::{Liveness, Shared};

pub(crate) async fn run<C: Send + Sync + 'static>(
    shared: Arc<Shared<C>>,
    mut ticks: mpsc::Receiver<Instant>,
    cancel: CancellationToken,
) {
    let liveness = &shared.liveness;
    let watchdog_name = liveness.watchdog_name();

    report_still_running(liveness, &watchdog_name).await;
    if let Err(err) = liveness.registrar.register_watchdog(&watchdog_name).await {
        warn!(watchdog = %watchdog_name, error = %err, "failed to register watchdog");
    }

    let period = liveness.still_running_interval;
    let mut still_running = interval_at(Instant::now() + period, period);
    still_running.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(watchdog = %watchdog_name, "deferred queue task running");

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("deferred queue task cancelled");
                break;
            }
            tick = ticks.recv() => {
                if tick.is_none() {
                    debug!("deferred timer closed");
                    break;
                }
                let started = Instant::now();
                if !shared.handle_deferred().await {
                    info!("some deferred items remain to be sent");
                }
                liveness.registrar.check_max_time(
                    &liveness.agent_name,
                    &liveness.context_name,
                    started.elapsed(),
                    liveness.warning_time,
                    liveness.error_time,
                );
            }
            _ = still_running.tick() => {}
        }
        report_still_running(liveness, &watchdog_name).await;
    }
}

async fn report_still_running(liveness: &Liveness, watchdog_name: &str) {
    if let Err(err) = liveness
        .registrar
        .still_running(watchdog_name, liveness.warning_time, liveness.error_time)
        .await
    {
        warn!(watchdog = %watchdog_name, error = %err, "failed to report liveness");
    }
}
