//! Schedule types.

use std::fmt;

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::SchedulerError;

/// A weekly trigger in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SlotSpec", into = "SlotSpec")]
pub struct ScheduleSlot {
    weekday: Weekday,
    time: NaiveTime,
    timezone: Tz,
}

/// The user-editable form of a slot, e.g.
/// `{ day = "sat", time = "08:00", timezone = "America/Los_Angeles" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotSpec {
    pub day: String,
    pub time: String,
    pub timezone: String,
}

impl TryFrom<SlotSpec> for ScheduleSlot {
    type Error = SchedulerError;

    fn try_from(spec: SlotSpec) -> Result<Self, Self::Error> {
        Self::parse(&spec.day, &spec.time, &spec.timezone)
    }
}

impl From<ScheduleSlot> for SlotSpec {
    fn from(slot: ScheduleSlot) -> Self {
        Self {
            day: slot.weekday.to_string(),
            time: slot.time.format("%H:%M").to_string(),
            timezone: slot.timezone.name().to_string(),
        }
    }
}

impl ScheduleSlot {
    pub fn new(weekday: Weekday, time: NaiveTime, timezone: Tz) -> Self {
        Self {
            weekday,
            time,
            timezone,
        }
    }

    /// Parse a slot from its config strings (`"sat"`, `"08:00"`, `"America/Los_Angeles"`).
    pub fn parse(day: &str, time: &str, timezone: &str) -> Result<Self, SchedulerError> {
        let weekday = day
            .trim()
            .parse::<Weekday>()
            .map_err(|_| SchedulerError::InvalidWeekday(day.to_string()))?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .map_err(|_| SchedulerError::InvalidTime(time.to_string()))?;
        let timezone = timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| SchedulerError::UnknownTimezone(timezone.to_string()))?;
        Ok(Self::new(weekday, time, timezone))
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn time(&self) -> NaiveTime {
        self.time
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The first instant strictly after `now` at which this slot fires.
    ///
    /// Local times skipped by a spring-forward transition fire one hour
    /// later (on the shifted wall clock); local times repeated by a fall-back
    /// transition fire at their first occurrence.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&self.timezone).date_naive();

        // Two weeks covers any weekday plus a slot already past today.
        (0..14)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter(|date| date.weekday() == self.weekday)
            .filter_map(|date| self.resolve(date))
            .find(|at| *at > now)
    }

    /// Map this slot's wall-clock time on `date` to an instant.
    fn resolve(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let local = date.and_time(self.time);
        let resolved = match self.timezone.from_local_datetime(&local) {
            LocalResult::Single(at) => Some(at),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => self
                .timezone
                .from_local_datetime(&(local + Duration::hours(1)))
                .earliest(),
        };
        resolved.map(|at| at.with_timezone(&Utc))
    }
}

impl fmt::Display for ScheduleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.weekday,
            self.time.format("%H:%M"),
            self.timezone.name()
        )
    }
}

/// A set of independent weekly slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    slots: Vec<ScheduleSlot>,
}

/// The next firing of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub at: DateTime<Utc>,
    pub slot: ScheduleSlot,
}

impl Trigger {
    /// The trigger instant in the slot's own timezone.
    pub fn local(&self) -> DateTime<Tz> {
        self.at.with_timezone(&self.slot.timezone)
    }
}

impl Schedule {
    pub fn new(slots: Vec<ScheduleSlot>) -> Result<Self, SchedulerError> {
        if slots.is_empty() {
            return Err(SchedulerError::EmptySchedule);
        }
        Ok(Self { slots })
    }

    pub fn slots(&self) -> &[ScheduleSlot] {
        &self.slots
    }

    /// The nearest trigger strictly after `now` across all slots.
    ///
    /// Slots that coincide produce a single trigger.
    pub fn next_trigger(&self, now: DateTime<Utc>) -> Option<Trigger> {
        self.slots
            .iter()
            .filter_map(|slot| slot.next_after(now).map(|at| Trigger { at, slot: *slot }))
            .min_by_key(|trigger| trigger.at)
    }

    /// The next `count` triggers after `now`, in order.
    pub fn upcoming(&self, now: DateTime<Utc>, count: usize) -> Vec<Trigger> {
        let mut triggers = Vec::with_capacity(count);
        let mut after = now;
        while triggers.len() < count {
            let Some(trigger) = self.next_trigger(after) else {
                break;
            };
            after = trigger.at;
            triggers.push(trigger);
        }
        triggers
    }
}
