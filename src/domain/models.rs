use crate::domain::interval_math::{HOURS_PER_DAY, MIN_DURATION_HOURS, TimeRange};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Generates a process-unique identifier such as `blk-1718000000000000-7`.
pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_KEY_FORMAT).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    EmptyName,
    EmptyPriorityText,
    NonFiniteTime,
    StartBeforeMidnight,
    EndNotAfterStart,
    EndAfterMidnight,
    DurationTooShort,
    PriorityIndexOutOfRange,
    MinuteOutOfRange,
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::EmptyName => "task name cannot be empty",
            Self::EmptyPriorityText => "priority text cannot be empty",
            Self::NonFiniteTime => "start and end must be finite hours",
            Self::StartBeforeMidnight => "start time cannot be before midnight",
            Self::EndNotAfterStart => "end time must be after start time",
            Self::EndAfterMidnight => "end time cannot be after midnight",
            Self::DurationTooShort => "task must last at least 15 minutes",
            Self::PriorityIndexOutOfRange => "priority index is out of range",
            Self::MinuteOutOfRange => "minutes must be between 0 and 59",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: ValidationReason,
}

impl From<ValidationReason> for ValidationError {
    fn from(reason: ValidationReason) -> Self {
        Self { reason }
    }
}

/// A named time block on the 24h axis of one date.
///
/// `id` is model identity only. Whatever handles a renderer keeps for the
/// drawn bar live on the renderer's side, keyed by this id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub start: f64,
    pub end: f64,
}

impl Task {
    pub fn from_input(input: &TaskInput) -> Result<Self, ValidationError> {
        let valid = input.validate()?;
        Ok(Self {
            id: next_id("blk"),
            name: valid.name,
            start: valid.range.start,
            end: valid.range.end,
        })
    }

    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    pub fn set_range(&mut self, range: TimeRange) {
        self.start = range.start;
        self.end = range.end;
    }

    pub fn to_record(&self) -> TimeBlockRecord {
        TimeBlockRecord {
            name: self.name.clone(),
            start_time: self.start,
            end_time: self.end,
        }
    }

    /// Rebuilds a task from its stored form, assigning a fresh id. Stored
    /// records go through the same validation as user input.
    pub fn try_from_record(record: &TimeBlockRecord) -> Result<Self, ValidationError> {
        Self::from_input(&TaskInput::new(
            record.name.clone(),
            record.start_time,
            record.end_time,
        ))
    }
}

/// Raw user input from an add or edit dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInput {
    pub name: String,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidTaskInput {
    pub name: String,
    pub range: TimeRange,
}

impl TaskInput {
    pub fn new(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Builds input from the hour/minute pickers of a task dialog.
    pub fn from_clock(
        name: impl Into<String>,
        start_hour: u32,
        start_minute: u32,
        end_hour: u32,
        end_minute: u32,
    ) -> Result<Self, ValidationError> {
        if start_minute >= 60 || end_minute >= 60 {
            return Err(ValidationReason::MinuteOutOfRange.into());
        }
        Ok(Self::new(
            name,
            f64::from(start_hour) + f64::from(start_minute) / 60.0,
            f64::from(end_hour) + f64::from(end_minute) / 60.0,
        ))
    }

    /// Shared validation for both creating and editing a task.
    pub fn validate(&self) -> Result<ValidTaskInput, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationReason::EmptyName.into());
        }
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ValidationReason::NonFiniteTime.into());
        }
        if self.start < 0.0 {
            return Err(ValidationReason::StartBeforeMidnight.into());
        }
        if self.end <= self.start {
            return Err(ValidationReason::EndNotAfterStart.into());
        }
        if self.end > HOURS_PER_DAY {
            return Err(ValidationReason::EndAfterMidnight.into());
        }
        if self.end - self.start < MIN_DURATION_HOURS {
            return Err(ValidationReason::DurationTooShort.into());
        }
        Ok(ValidTaskInput {
            name: name.to_string(),
            range: TimeRange::new(self.start, self.end),
        })
    }
}

/// Stored form of a time block: `{name, start_time, end_time}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBlockRecord {
    pub name: String,
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTask {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl PriorityTask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: false,
        }
    }
}
