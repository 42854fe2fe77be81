//! crates/mind_brain_core/src/schedule.rs
//!
//! The canonical scheduling representation of a todo or action item, and the
//! adapter to the string fields used on the wire.
//!
//! Stored records carry two overlapping field sets: `startDate`/`startTime`/
//! `endDate`/`endTime` and the older `scheduledDate`/`scheduledTime`. Reading
//! prefers the former; writing fills both so older clients keep working.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::lenient_opt_text;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Invalid date '{0}', expected yyyy-MM-dd")]
    InvalidDate(String),
    #[error("Invalid time '{0}', expected HH:mm")]
    InvalidTime(String),
    #[error("End date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ScheduleError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ScheduleError::InvalidDate(raw.to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ScheduleError::InvalidTime(raw.to_string()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// When a task happens. A missing end date means a single-day item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub start_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_date: Option<NaiveDate>,
    pub end_time: Option<NaiveTime>,
}

impl Schedule {
    pub fn new(
        start_date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_date: Option<NaiveDate>,
        end_time: Option<NaiveTime>,
    ) -> Result<Self, ScheduleError> {
        if let Some(end) = end_date {
            if end < start_date {
                return Err(ScheduleError::EndBeforeStart { start: start_date, end });
            }
        }
        Ok(Self { start_date, start_time, end_date, end_time })
    }

    /// Builds a schedule from the wire strings. Empty strings count as absent.
    pub fn parse(
        start_date: &str,
        start_time: Option<&str>,
        end_date: Option<&str>,
        end_time: Option<&str>,
    ) -> Result<Self, ScheduleError> {
        fn present(value: Option<&str>) -> Option<&str> {
            value.filter(|v| !v.trim().is_empty())
        }
        Self::new(
            parse_date(start_date)?,
            present(start_time).map(parse_time).transpose()?,
            present(end_date).map(parse_date).transpose()?,
            present(end_time).map(parse_time).transpose()?,
        )
    }

    pub fn on(date: NaiveDate) -> Self {
        Self { start_date: date, start_time: None, end_date: None, end_time: None }
    }

    pub fn at(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self { start_date: date, start_time: time, end_date: None, end_time: None }
    }

    pub fn end_day(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    pub fn is_multi_day(&self) -> bool {
        self.end_day() != self.start_date
    }

    /// Whether the item shows up on `date` at all.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_day()
    }

    /// Whether the item occupies the hour bucket `hour` on `date`.
    ///
    /// Single-day items sit in exactly the bucket of their start hour. A
    /// multi-day item fills its start day from the start hour on, its end day
    /// up to and including the end hour (23 without an end time), and every
    /// hour of the days in between. Items without a start time have no slot.
    pub fn occupies_hour(&self, date: NaiveDate, hour: u32) -> bool {
        let Some(start_time) = self.start_time else {
            return false;
        };
        let start_hour = start_time.hour();

        if !self.is_multi_day() {
            return date == self.start_date && hour == start_hour;
        }

        let end_hour = self.end_time.map(|t| t.hour()).unwrap_or(23);
        if date == self.start_date {
            hour >= start_hour
        } else if date == self.end_day() {
            hour <= end_hour
        } else {
            date > self.start_date && date < self.end_day()
        }
    }
}

//=========================================================================================
// Wire Adapters
//=========================================================================================

/// The four modern schedule fields as optional strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFields {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_text")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_text")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_text")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_text")]
    pub end_time: Option<String>,
}

impl ScheduleFields {
    pub fn from_schedule(schedule: Option<&Schedule>) -> Self {
        match schedule {
            None => Self::default(),
            Some(s) => Self {
                start_date: Some(format_date(s.start_date)),
                start_time: s.start_time.map(format_time),
                end_date: s.end_date.map(format_date),
                end_time: s.end_time.map(format_time),
            },
        }
    }

    pub fn to_schedule(&self) -> Option<Schedule> {
        read_schedule(
            self.start_date.as_deref(),
            self.start_time.as_deref(),
            self.end_date.as_deref(),
            self.end_time.as_deref(),
        )
    }
}

/// Modern fields plus the legacy `scheduled*` pair, as stored for todos.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    #[serde(flatten)]
    pub fields: ScheduleFields,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_text")]
    pub scheduled_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_opt_text")]
    pub scheduled_time: Option<String>,
}

impl ScheduleRecord {
    pub fn from_schedule(schedule: Option<&Schedule>) -> Self {
        let fields = ScheduleFields::from_schedule(schedule);
        Self {
            scheduled_date: fields.start_date.clone(),
            scheduled_time: fields.start_time.clone(),
            fields,
        }
    }

    pub fn to_schedule(&self) -> Option<Schedule> {
        let has_modern = self.fields.start_date.as_deref().is_some_and(|d| !d.trim().is_empty());
        if has_modern {
            return self.fields.to_schedule();
        }
        read_schedule(
            self.scheduled_date.as_deref(),
            self.scheduled_time.as_deref(),
            None,
            None,
        )
    }
}

/// Lenient read used for stored data: unparseable parts are dropped rather
/// than failing the whole record.
fn read_schedule(
    start_date: Option<&str>,
    start_time: Option<&str>,
    end_date: Option<&str>,
    end_time: Option<&str>,
) -> Option<Schedule> {
    let start_date = parse_date(start_date.filter(|d| !d.trim().is_empty())?).ok()?;
    let start_time = start_time.and_then(|t| parse_time(t).ok());
    let mut end_date = end_date.and_then(|d| parse_date(d).ok());
    let end_time = end_time.and_then(|t| parse_time(t).ok());

    if let Some(end) = end_date {
        if end < start_date {
            warn!(%start_date, %end, "Dropping end date that precedes the start date");
            end_date = None;
        }
    }

    Some(Schedule { start_date, start_time, end_date, end_time })
}
