/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structured error types for the exam timetable engine.
//!
//! [`EngineError`] is the single error returned by every engine operation.
//! Its variants are the five outcomes a caller must be able to tell apart:
//!
//! | Variant | Raised when |
//! |---|---|
//! | `NotFound` | timetable / entry / conflict / referenced directory record absent |
//! | `Validation` | bad date range, bad time window, empty required set, room outside venue |
//! | `ImmutableState` | mutation on a published / completed / archived timetable, or deleting a non-empty / non-draft one |
//! | `PermissionDenied` | actor lacks the capability for one field group |
//! | `ConflictState` | lifecycle precondition failed (not approved, blocking conflicts, empty timetable, illegal transition) |
//!
//! The detail enums ([`ValidationReason`], [`StateReason`]) carry exact values
//! so callers can log or forward them without parsing the message.

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::ids::{RoomId, TimetableId, UserId, VenueId};
use crate::model::{Severity, TimetableStatus};

pub type EngineResult<T> = Result<T, EngineError>;

// ── Detail enums ──────────────────────────────────────────────────────────────

/// Kind of record a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Timetable,
    Entry,
    Conflict,
    Course,
    Program,
    Venue,
    Room,
    AcademicPeriod,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Timetable => "timetable",
            Resource::Entry => "entry",
            Resource::Conflict => "conflict",
            Resource::Course => "course",
            Resource::Program => "program",
            Resource::Venue => "venue",
            Resource::Room => "room",
            Resource::AcademicPeriod => "academic period",
        })
    }
}

/// Field groups checked independently by the permission resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldGroup {
    Course,
    Date,
    Time,
    Venue,
    Invigilators,
    /// Student count, status, notes, special requirements.
    Details,
    /// Deleting the entry as a whole.
    Delete,
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldGroup::Course => "course",
            FieldGroup::Date => "exam date",
            FieldGroup::Time => "exam time",
            FieldGroup::Venue => "venue/rooms",
            FieldGroup::Invigilators => "invigilators",
            FieldGroup::Details => "entry details",
            FieldGroup::Delete => "delete",
        })
    }
}

/// Why an input failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// `start_date > end_date` on a timetable.
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// Entry `end_time <= start_time`.
    EndNotAfterStart,

    /// Entry date lies outside the timetable's `[start, end]`.
    DateOutsideTimetable {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// A timetable range change would strand an existing entry.
    RangeExcludesEntries { count: usize },

    /// A required id set (programs, rooms) was empty.
    EmptySet { field: &'static str },

    RoomNotInVenue { room: RoomId, venue: VenueId },

    /// Duration of zero minutes.
    ZeroDuration,

    /// A required text field was blank.
    EmptyField { field: &'static str },
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationReason::InvalidDateRange { start, end } => {
                write!(f, "start date {} is after end date {}", start, end)
            }
            ValidationReason::EndNotAfterStart => {
                write!(f, "end time must be after start time")
            }
            ValidationReason::DateOutsideTimetable { date, start, end } => write!(
                f,
                "exam date {} is outside the timetable range {}..{}",
                date, start, end
            ),
            ValidationReason::RangeExcludesEntries { count } => write!(
                f,
                "{} existing entr{} would fall outside the new date range",
                count,
                if *count == 1 { "y" } else { "ies" }
            ),
            ValidationReason::EmptySet { field } => write!(f, "{} must not be empty", field),
            ValidationReason::RoomNotInVenue { room, venue } => {
                write!(f, "room {} does not belong to venue {}", room, venue)
            }
            ValidationReason::ZeroDuration => write!(f, "duration must be positive"),
            ValidationReason::EmptyField { field } => write!(f, "{} must not be blank", field),
        }
    }
}

/// Why a lifecycle precondition failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateReason {
    /// Publish attempted before approval.
    NotApproved,

    /// Unresolved conflicts at or above the blocking severity exist.
    BlockingConflicts { count: usize, threshold: Severity },

    /// Submit attempted on a timetable with no entries.
    EmptyTimetable,

    /// The action is not defined for the current status.
    InvalidTransition {
        from: TimetableStatus,
        action: &'static str,
    },
}

impl fmt::Display for StateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateReason::NotApproved => write!(f, "timetable is not approved"),
            StateReason::BlockingConflicts { count, threshold } => write!(
                f,
                "{} unresolved conflict(s) of severity {} or higher",
                count, threshold
            ),
            StateReason::EmptyTimetable => write!(f, "timetable has no entries"),
            StateReason::InvalidTransition { from, action } => {
                write!(f, "cannot {} a timetable in state {}", action, from)
            }
        }
    }
}

// ── Top-level error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{resource} {id} not found")]
    NotFound { resource: Resource, id: u64 },

    #[error("validation failed: {0}")]
    Validation(ValidationReason),

    /// The timetable's status forbids the requested change.
    #[error("timetable {timetable} is {status}: {action} not allowed")]
    ImmutableState {
        timetable: TimetableId,
        status: TimetableStatus,
        action: &'static str,
    },

    #[error("actor {actor} is not permitted to change {field}")]
    PermissionDenied { actor: UserId, field: FieldGroup },

    #[error("timetable {timetable}: {reason}")]
    ConflictState {
        timetable: TimetableId,
        reason: StateReason,
    },
}

impl EngineError {
    pub(crate) fn not_found(resource: Resource, id: impl Into<u64>) -> Self {
        EngineError::NotFound {
            resource,
            id: id.into(),
        }
    }
}

impl From<ValidationReason> for EngineError {
    fn from(reason: ValidationReason) -> Self {
        EngineError::Validation(reason)
    }
}
