//! crates/mind_brain_core/src/calendar.rs
//!
//! Month, week and day calendar views over the todo collection, plus the two
//! ways of rescheduling a todo from a calendar: drag-and-drop and
//! click-to-schedule.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::{Bucket, Todo};
use crate::schedule::{format_time, Schedule, ScheduleError};

/// Days shown by the month grid: six full Monday-first weeks.
pub const MONTH_GRID_DAYS: usize = 42;

/// The hours offered by the drag-and-drop week grid.
pub const DRAG_GRID_HOURS: std::ops::RangeInclusive<u32> = 8..=18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Month,
    Week,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Prev,
    Next,
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

pub fn default_start_time() -> NaiveTime {
    hour(9)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Mon).first_day()
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// The dates a view mode covers around `anchor`.
pub fn display_dates(mode: ViewMode, anchor: NaiveDate) -> Vec<NaiveDate> {
    match mode {
        ViewMode::Month => {
            let first = month_start(anchor);
            first.iter_days().take_while(|d| d.month() == first.month()).collect()
        }
        ViewMode::Week => week_start(anchor).iter_days().take(7).collect(),
        ViewMode::Day => vec![anchor],
    }
}

/// 42 days starting on the Monday of the week holding the 1st of the month.
pub fn month_grid(anchor: NaiveDate) -> Vec<NaiveDate> {
    week_start(month_start(anchor)).iter_days().take(MONTH_GRID_DAYS).collect()
}

pub fn navigate(mode: ViewMode, anchor: NaiveDate, direction: Direction) -> NaiveDate {
    let moved = match (mode, direction) {
        (ViewMode::Month, Direction::Next) => anchor.checked_add_months(Months::new(1)),
        (ViewMode::Month, Direction::Prev) => anchor.checked_sub_months(Months::new(1)),
        (ViewMode::Week, Direction::Next) => anchor.checked_add_signed(Duration::weeks(1)),
        (ViewMode::Week, Direction::Prev) => anchor.checked_sub_signed(Duration::weeks(1)),
        (ViewMode::Day, Direction::Next) => anchor.succ_opt(),
        (ViewMode::Day, Direction::Prev) => anchor.pred_opt(),
    };
    moved.unwrap_or(anchor)
}

/// Hour slots for a mode: the whole day for the timetable, office hours for
/// the week grid, none for the month grid.
pub fn slot_hours(mode: ViewMode) -> Vec<u32> {
    match mode {
        ViewMode::Day => (0..24).collect(),
        ViewMode::Week => DRAG_GRID_HOURS.collect(),
        ViewMode::Month => Vec::new(),
    }
}

//=========================================================================================
// Placement
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSlot {
    pub time: String,
    pub todos: Vec<Todo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    /// Everything scheduled on this date, timed or not.
    pub todos: Vec<Todo>,
    pub slots: Vec<HourSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub mode: ViewMode,
    pub anchor: NaiveDate,
    pub days: Vec<DayCell>,
    pub available: Vec<Todo>,
    pub action_list: Vec<Todo>,
}

/// The todos occupying `hour` on `date`.
pub fn todos_in_slot<'a>(todos: &'a [Todo], date: NaiveDate, hour: u32) -> Vec<&'a Todo> {
    todos
        .iter()
        .filter(|t| t.schedule.is_some_and(|s| s.occupies_hour(date, hour)))
        .collect()
}

pub fn build_view(todos: &[Todo], mode: ViewMode, anchor: NaiveDate) -> CalendarView {
    let dates = match mode {
        ViewMode::Month => month_grid(anchor),
        _ => display_dates(mode, anchor),
    };
    let hours = slot_hours(mode);

    let days = dates
        .into_iter()
        .map(|date| DayCell {
            date,
            in_month: date.month() == anchor.month() && date.year() == anchor.year(),
            todos: todos
                .iter()
                .filter(|t| t.schedule.is_some_and(|s| s.covers(date)))
                .cloned()
                .collect(),
            slots: hours
                .iter()
                .map(|&h| HourSlot {
                    time: format_time(hour(h)),
                    todos: todos_in_slot(todos, date, h).into_iter().cloned().collect(),
                })
                .collect(),
        })
        .collect();

    let in_bucket = |bucket: Bucket| -> Vec<Todo> {
        todos.iter().filter(|t| t.bucket() == bucket).cloned().collect()
    };

    CalendarView {
        mode,
        anchor,
        days,
        available: in_bucket(Bucket::Available),
        action_list: in_bucket(Bucket::ActionList),
    }
}

//=========================================================================================
// Rescheduling
//=========================================================================================

/// Tracks the todo currently being dragged.
#[derive(Debug, Clone, Default)]
pub struct DragState {
    dragged: Option<String>,
}

impl DragState {
    pub fn start(&mut self, todo_id: impl Into<String>) {
        self.dragged = Some(todo_id.into());
    }

    pub fn cancel(&mut self) {
        self.dragged = None;
    }

    pub fn dragged(&self) -> Option<&str> {
        self.dragged.as_deref()
    }

    /// Ends the drag on a cell. Month cells carry no time, so the item lands at 09:00.
    pub fn drop_on(&mut self, date: NaiveDate, time: Option<NaiveTime>) -> Option<(String, Schedule)> {
        let id = self.dragged.take()?;
        Some((id, Schedule::at(date, Some(time.unwrap_or_else(default_start_time)))))
    }
}

/// The editable values of the schedule dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDraft {
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_date: NaiveDate,
    pub end_time: NaiveTime,
}

impl ScheduleDraft {
    pub fn confirm(&self) -> Result<Schedule, ScheduleError> {
        Schedule::new(self.start_date, Some(self.start_time), Some(self.end_date), Some(self.end_time))
    }
}

/// Click-to-schedule: a todo or suggestion is armed first, then a cell is clicked.
#[derive(Debug, Clone, Default)]
pub struct ArmedSelection {
    armed: Option<String>,
}

impl ArmedSelection {
    pub fn arm(&mut self, id: impl Into<String>) {
        self.armed = Some(id.into());
    }

    pub fn armed(&self) -> Option<&str> {
        self.armed.as_deref()
    }

    pub fn disarm(&mut self) -> Option<String> {
        self.armed.take()
    }

    /// Opens the dialog for the armed item, or does nothing when none is armed.
    pub fn click_cell(&self, date: NaiveDate, time: Option<NaiveTime>) -> Option<ScheduleDraft> {
        self.armed.as_ref()?;
        Some(ScheduleDraft {
            start_date: date,
            start_time: time.unwrap_or_else(default_start_time),
            end_date: date,
            end_time: time.unwrap_or_else(|| hour(10)),
        })
    }
}
