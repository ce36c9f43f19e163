//! Scheduled cycle loop.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{Clock, Schedule, Trigger};

/// Minimum sleep duration between clock checks.
const MIN_SLEEP_SECS: u64 = 1;

/// Maximum sleep duration between clock checks.
///
/// Waits are chunked so a suspended host or a wall-clock jump is noticed
/// within a minute instead of after a multi-day timer.
const MAX_SLEEP_SECS: u64 = 60;

/// Runs one cycle per trigger, strictly sequentially.
pub struct Scheduler<C> {
    schedule: Schedule,
    clock: C,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(schedule: Schedule, clock: C) -> Self {
        Self { schedule, clock }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// The next trigger from the clock's current time.
    pub fn next_trigger(&self) -> Option<Trigger> {
        self.schedule.next_trigger(self.clock.now())
    }

    /// Run the scheduler loop until shutdown.
    ///
    /// Computes the nearest trigger across all slots, waits for it, runs the
    /// cycle to completion, and repeats. The trigger being waited on fires
    /// once, late, if the host slept through it. Slots that pass while the
    /// host is asleep or while a cycle is still running are skipped, never
    /// replayed.
    pub async fn run<F, Fut>(&self, mut shutdown_rx: watch::Receiver<bool>, mut cycle: F)
    where
        F: FnMut(Trigger) -> Fut,
        Fut: Future<Output = ()>,
    {
        info!(slots = self.schedule.slots().len(), "scheduler starting");

        let mut after = self.clock.now();
        loop {
            if *shutdown_rx.borrow() {
                info!("scheduler shutting down");
                break;
            }

            let Some(trigger) = self.schedule.next_trigger(after) else {
                error!("could not determine next run time");
                break;
            };

            let wait_hours = (trigger.at - self.clock.now()).num_minutes() as f64 / 60.0;
            info!(
                next_run = %trigger.local().format("%A %Y-%m-%d at %I:%M %p %Z"),
                slot = %trigger.slot,
                in_hours = wait_hours,
                "waiting for next run"
            );

            if !self.wait_until(trigger.at, &mut shutdown_rx).await {
                info!("scheduler received shutdown signal");
                break;
            }

            info!(slot = %trigger.slot, "trigger fired");
            cycle(trigger).await;

            after = self.clock.now().max(trigger.at);
        }

        info!("scheduler shut down gracefully");
    }

    /// Sleep until `at`. Returns false if shutdown was requested first.
    async fn wait_until(&self, at: DateTime<Utc>, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
        let mut signals_open = true;

        loop {
            let now = self.clock.now();
            if now >= at {
                return true;
            }

            let duration = sleep_duration(at - now);
            debug!(secs = duration.as_secs(), "sleeping");

            if signals_open {
                tokio::select! {
                    changed = shutdown_rx.changed() => match changed {
                        Ok(()) if *shutdown_rx.borrow() => return false,
                        Ok(()) => {}
                        // Sender gone: nobody can ask us to stop any more.
                        Err(_) => signals_open = false,
                    },
                    _ = self.clock.sleep(duration) => {}
                }
            } else {
                self.clock.sleep(duration).await;
            }
        }
    }
}

/// Clamp a remaining wait to the check interval.
fn sleep_duration(remaining: chrono::Duration) -> Duration {
    let secs = remaining.num_seconds().max(MIN_SLEEP_SECS as i64) as u64;
    Duration::from_secs(secs.min(MAX_SLEEP_SECS))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{ManualClock, ScheduleSlot};
    use pretty_assertions::assert_eq;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn weekend_schedule() -> Schedule {
        Schedule::new(vec![
            ScheduleSlot::parse("sat", "08:00", "America/Los_Angeles").unwrap(),
            ScheduleSlot::parse("sun", "08:00", "America/Los_Angeles").unwrap(),
            ScheduleSlot::parse("mon", "17:00", "America/Los_Angeles").unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_sleep_bounds() {
        assert_eq!(MIN_SLEEP_SECS, 1);
        assert_eq!(MAX_SLEEP_SECS, 60);
        assert_eq!(sleep_duration(chrono::Duration::days(3)).as_secs(), 60);
        assert_eq!(sleep_duration(chrono::Duration::seconds(-5)).as_secs(), 1);
        assert_eq!(sleep_duration(chrono::Duration::seconds(30)).as_secs(), 30);
    }

    #[test]
    fn test_next_trigger_uses_clock() {
        let clock = ManualClock::new(utc("2024-11-01T12:00:00-07:00"));
        let scheduler = Scheduler::new(weekend_schedule(), clock);
        assert_eq!(
            scheduler.next_trigger().unwrap().at,
            utc("2024-11-02T15:00:00Z")
        );
    }

    #[tokio::test]
    async fn test_run_fires_each_slot_in_order() {
        let clock = ManualClock::new(utc("2024-11-01T12:00:00-07:00"));
        let scheduler = Scheduler::new(weekend_schedule(), clock);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);
        let fired = Arc::new(Mutex::new(Vec::new()));

        scheduler
            .run(shutdown_rx, |trigger| {
                let fired = Arc::clone(&fired);
                let shutdown_tx = Arc::clone(&shutdown_tx);
                async move {
                    let mut fired = fired.lock().unwrap();
                    fired.push(trigger.at);
                    if fired.len() == 3 {
                        shutdown_tx.send(true).unwrap();
                    }
                }
            })
            .await;

        assert_eq!(
            *fired.lock().unwrap(),
            vec![
                utc("2024-11-02T15:00:00Z"),
                utc("2024-11-03T16:00:00Z"),
                utc("2024-11-05T01:00:00Z"),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_before_trigger() {
        let clock = ManualClock::new(utc("2024-11-01T12:00:00-07:00"));
        let scheduler = Scheduler::new(weekend_schedule(), clock);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let mut runs = 0;
        scheduler
            .run(shutdown_rx, |_| {
                runs += 1;
                async {}
            })
            .await;
        assert_eq!(runs, 0);
    }

    #[tokio::test]
    async fn test_slots_passed_during_a_cycle_are_skipped() {
        let clock = Arc::new(ManualClock::new(utc("2024-11-01T12:00:00-07:00")));
        let scheduler = Scheduler::new(weekend_schedule(), Arc::clone(&clock));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);
        let fired = Arc::new(Mutex::new(Vec::new()));

        scheduler
            .run(shutdown_rx, |trigger| {
                let fired = Arc::clone(&fired);
                let shutdown_tx = Arc::clone(&shutdown_tx);
                let clock = Arc::clone(&clock);
                async move {
                    let mut fired = fired.lock().unwrap();
                    fired.push(trigger.at);
                    if fired.len() == 1 {
                        // A cycle that overruns past Sunday's and Monday's slots.
                        clock.advance(chrono::Duration::days(3));
                    } else {
                        shutdown_tx.send(true).unwrap();
                    }
                }
            })
            .await;

        let fired = fired.lock().unwrap();
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0], utc("2024-11-02T15:00:00Z"));
        // Next Saturday, not a replay of the skipped slots.
        assert_eq!(fired[1], utc("2024-11-09T16:00:00Z"));
    }
}
