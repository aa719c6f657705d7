//! Event domain model.
//!
//! # Responsibility
//! - Define the canonical timed-event record and its draft input shape.
//! - Collect per-field validation errors instead of failing on the first.
//! - Derive event duration from date, times and an explicit time zone.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another event.
//! - `end_time`, when set, is never earlier than `start_time`.
//! - `duration` is `None` until an end time exists.
//! - `is_deleted` is the source of truth for tombstone state.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use crate::model::user::UserId;

/// Stable identifier for every event record.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EventId = Uuid;

/// Maximum accepted description length, counted in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Field addressed by one validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventField {
    Date,
    StartTime,
    EndTime,
    Description,
}

impl EventField {
    /// Returns the snake_case field name used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::StartTime => "start_time",
            Self::EndTime => "end_time",
            Self::Description => "description",
        }
    }
}

/// Reason one field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// Required value is absent or blank.
    Missing,
    /// Value does not parse as a calendar date.
    InvalidDate,
    /// Value does not parse as a time of day.
    InvalidTime,
    /// End time is earlier than the start time on the same date.
    EndBeforeStart,
    /// Text exceeds the accepted length.
    TooLong { max: usize, actual: usize },
}

impl Display for FieldErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "is required"),
            Self::InvalidDate => write!(f, "is not a valid calendar date"),
            Self::InvalidTime => write!(f, "is not a valid time of day"),
            Self::EndBeforeStart => write!(f, "must be at or after start_time"),
            Self::TooLong { max, actual } => {
                write!(f, "is too long ({actual} characters; maximum is {max})")
            }
        }
    }
}

/// One field-level validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: EventField,
    pub kind: FieldErrorKind,
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.field.as_str(), self.kind)
    }
}

/// Full validation outcome: every failing field is reported.
///
/// An invalid event is rejected in full; there is no partial success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventValidationError {
    pub errors: Vec<FieldError>,
}

impl EventValidationError {
    /// Returns whether any error is attached to the given field.
    pub fn contains(&self, field: EventField) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid event: ")?;
        for (index, error) in self.errors.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl Error for EventValidationError {}

/// Raw user input for creating or replacing an event.
///
/// Dates and times arrive as strings and are parsed during validation, so
/// malformed input surfaces as field errors rather than type errors at the
/// call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    /// Owner of the event. Immutable after creation.
    pub user_id: UserId,
    /// Calendar date, `%Y-%m-%d`.
    pub date: String,
    /// Wall-clock start, `%H:%M` or `%H:%M:%S`.
    pub start_time: String,
    /// Optional wall-clock end; blank is treated as absent.
    pub end_time: Option<String>,
    /// Markdown description, 1..=1000 characters.
    pub description: String,
    /// When true at creation time, closes the owner's latest open event on
    /// the same date. Never persisted; ignored on update.
    pub ends_previous: bool,
}

impl EventDraft {
    /// Creates a draft with no end time and the chain flag off.
    pub fn new(
        user_id: UserId,
        date: impl Into<String>,
        start_time: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            date: date.into(),
            start_time: start_time.into(),
            end_time: None,
            description: description.into(),
            ends_previous: false,
        }
    }

    /// Validates the draft, collecting every field error.
    ///
    /// # Errors
    /// - `Missing` for blank `date`, `start_time` or `description`.
    /// - `InvalidDate` / `InvalidTime` for unparseable values.
    /// - `EndBeforeStart` when both times parse and the end is earlier.
    /// - `TooLong` when the description exceeds [`MAX_DESCRIPTION_CHARS`].
    pub fn validate(&self) -> Result<ParsedDraft, EventValidationError> {
        let mut errors = Vec::new();

        let date_input = self.date.trim();
        let date = if date_input.is_empty() {
            errors.push(FieldError {
                field: EventField::Date,
                kind: FieldErrorKind::Missing,
            });
            None
        } else {
            match NaiveDate::parse_from_str(date_input, DATE_FORMAT) {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    errors.push(FieldError {
                        field: EventField::Date,
                        kind: FieldErrorKind::InvalidDate,
                    });
                    None
                }
            }
        };

        let start_input = self.start_time.trim();
        let start_time = if start_input.is_empty() {
            errors.push(FieldError {
                field: EventField::StartTime,
                kind: FieldErrorKind::Missing,
            });
            None
        } else {
            match parse_time_of_day(start_input) {
                Some(parsed) => Some(parsed),
                None => {
                    errors.push(FieldError {
                        field: EventField::StartTime,
                        kind: FieldErrorKind::InvalidTime,
                    });
                    None
                }
            }
        };

        let end_input = self
            .end_time
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let end_time = match end_input {
            None => None,
            Some(raw) => match parse_time_of_day(raw) {
                Some(parsed) => Some(parsed),
                None => {
                    errors.push(FieldError {
                        field: EventField::EndTime,
                        kind: FieldErrorKind::InvalidTime,
                    });
                    None
                }
            },
        };

        if let (Some(start), Some(end)) = (start_time, end_time) {
            if end < start {
                errors.push(FieldError {
                    field: EventField::EndTime,
                    kind: FieldErrorKind::EndBeforeStart,
                });
            }
        }

        if self.description.trim().is_empty() {
            errors.push(FieldError {
                field: EventField::Description,
                kind: FieldErrorKind::Missing,
            });
        } else {
            let actual = self.description.chars().count();
            if actual > MAX_DESCRIPTION_CHARS {
                errors.push(FieldError {
                    field: EventField::Description,
                    kind: FieldErrorKind::TooLong {
                        max: MAX_DESCRIPTION_CHARS,
                        actual,
                    },
                });
            }
        }

        match (date, start_time, errors.is_empty()) {
            (Some(date), Some(start_time), true) => Ok(ParsedDraft {
                date,
                start_time,
                end_time,
                description: self.description.clone(),
            }),
            _ => Err(EventValidationError { errors }),
        }
    }
}

/// Typed view of a draft that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDraft {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub description: String,
}

/// Canonical event record as persisted.
///
/// The rendering and duration fields are derived; services keep them in
/// sync with `description` and the time fields on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Stable global ID used for linking and auditing.
    pub uuid: EventId,
    /// Owner reference, required.
    pub user_uuid: UserId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    /// Whole minutes between start and end; `None` while open-ended.
    pub duration: Option<i64>,
    /// Raw markdown source text.
    pub description: String,
    /// HTML rendering of `description`.
    pub html_description: String,
    /// Plain-text rendering of `description`.
    pub text_description: String,
    /// Soft delete tombstone to preserve history.
    pub is_deleted: bool,
    /// Epoch milliseconds of logical deletion.
    pub deleted_at: Option<i64>,
}

impl Event {
    /// Creates a new open-ended event with a generated stable ID.
    ///
    /// Derived fields start empty; callers populate them before persisting.
    pub fn new(
        user_uuid: UserId,
        date: NaiveDate,
        start_time: NaiveTime,
        description: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            user_uuid,
            date,
            start_time,
            end_time: None,
            duration: None,
            description: description.into(),
            html_description: String::new(),
            text_description: String::new(),
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// Marks this event as softly deleted at the given epoch-ms instant.
    pub fn soft_delete(&mut self, deleted_at_ms: i64) {
        self.is_deleted = true;
        self.deleted_at = Some(deleted_at_ms);
    }

    /// Clears the soft delete tombstone.
    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.deleted_at = None;
    }

    /// Returns whether this event should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Re-checks record invariants before persistence.
    ///
    /// Write paths call this so a record bypassing draft validation is still
    /// rejected before SQL mutations.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        let mut errors = Vec::new();

        if self.description.trim().is_empty() {
            errors.push(FieldError {
                field: EventField::Description,
                kind: FieldErrorKind::Missing,
            });
        } else {
            let actual = self.description.chars().count();
            if actual > MAX_DESCRIPTION_CHARS {
                errors.push(FieldError {
                    field: EventField::Description,
                    kind: FieldErrorKind::TooLong {
                        max: MAX_DESCRIPTION_CHARS,
                        actual,
                    },
                });
            }
        }

        if let Some(end_time) = self.end_time {
            if end_time < self.start_time {
                errors.push(FieldError {
                    field: EventField::EndTime,
                    kind: FieldErrorKind::EndBeforeStart,
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(EventValidationError { errors })
        }
    }
}

/// Computes whole elapsed minutes between two times of day on one date.
///
/// Both endpoints are the event's `date` combined with the respective time
/// of day, resolved in the explicit `tz`. Ambiguous local times (clocks
/// rolled back) resolve to their earliest mapping; when either endpoint
/// falls inside a clocks-forward gap, the naive same-date difference is
/// used instead.
pub fn duration_minutes(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime, tz: Tz) -> i64 {
    let start_local = resolve_local(tz, date.and_time(start_time));
    let end_local = resolve_local(tz, date.and_time(end_time));
    match (start_local, end_local) {
        (Some(start), Some(end)) => end.signed_duration_since(start).num_minutes(),
        _ => date
            .and_time(end_time)
            .signed_duration_since(date.and_time(start_time))
            .num_minutes(),
    }
}

fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(resolved) => Some(resolved),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => None,
    }
}

fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}
