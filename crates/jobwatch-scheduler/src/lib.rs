//! Weekly wall-clock scheduler for jobwatch.
//!
//! This crate provides:
//! - Schedule slots as (weekday, local time, IANA timezone)
//! - DST-aware next-trigger computation across all slots
//! - An injectable clock so trigger logic runs without real sleeping
//! - A strictly sequential loop that runs one cycle per trigger

mod clock;
mod error;
mod scheduler;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SchedulerError;
pub use scheduler::Scheduler;
pub use types::{Schedule, ScheduleSlot, SlotSpec, Trigger};
