//! Scheduled mode: run a cycle at every configured slot until Ctrl-C.

use miette::Result;
use tokio::sync::watch;
use tracing::info;

use jobwatch_scheduler::{Schedule, Scheduler, SystemClock};

use crate::cycle::Monitor;

pub async fn run(monitor: Monitor, schedule: Schedule) -> Result<()> {
    for slot in schedule.slots() {
        info!(%slot, "configured slot");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Handle shutdown signals
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::new(schedule, SystemClock);
    let monitor = &monitor;

    // A failed cycle is logged inside run_logged; the loop carries on.
    scheduler
        .run(shutdown_rx, move |trigger| async move {
            info!(slot = %trigger.slot, "starting scheduled cycle");
            monitor.run_logged().await;
        })
        .await;

    Ok(())
}
