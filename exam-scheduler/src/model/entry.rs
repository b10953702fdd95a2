/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exam entry record and the create / update payloads.
//!
//! ```text
//! caller ──(EntryDraft)──►  store::build_entry  ──►  Entry  ◄──(EntryPatch)── caller
//!                             ↑ validation + capacity          ↑ store::apply_patch
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, EntryId, IdSet, TimetableId, UserId, VenueId};

/// Per-exam status, independent of the owning timetable's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Draft,
    #[default]
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

/// One scheduled examination.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: EntryId,
    pub timetable_id: TimetableId,

    // ── What ──────────────────────────────────────────────────────────────────
    pub course_id: CourseId,
    /// Never empty.
    pub program_ids: IdSet,
    pub level: Option<u16>,

    // ── When ──────────────────────────────────────────────────────────────────
    pub exam_date: NaiveDate,
    pub start_time: NaiveTime,
    /// Strictly after `start_time`.
    pub end_time: NaiveTime,
    /// Minutes.
    pub duration: u32,

    // ── Where ─────────────────────────────────────────────────────────────────
    pub venue_id: VenueId,
    /// Never empty; every room belongs to `venue_id`.
    pub room_ids: IdSet,
    /// Sum of the current capacities of `room_ids`.
    pub seating_capacity: u32,

    // ── Who ───────────────────────────────────────────────────────────────────
    pub invigilator_ids: IdSet,
    pub chief_invigilator_id: Option<UserId>,
    pub student_count: Option<u32>,

    // ── Conflict flags (owned by the conflict detector) ───────────────────────
    pub has_conflicts: bool,
    pub conflict_details: Option<String>,

    pub status: EntryStatus,
    pub notes: Option<String>,
    pub special_requirements: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// Half-open `[start, end)` intersection on the same calendar day.
    pub fn overlaps_in_time(&self, other: &Entry) -> bool {
        self.exam_date == other.exam_date
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

/// Input for `create_entry`.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryDraft {
    pub course_id: CourseId,
    pub program_ids: IdSet,
    #[serde(default)]
    pub level: Option<u16>,
    pub exam_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Derived from the time window when absent.
    #[serde(default)]
    pub duration: Option<u32>,
    pub venue_id: VenueId,
    pub room_ids: IdSet,
    #[serde(default)]
    pub invigilator_ids: IdSet,
    #[serde(default)]
    pub chief_invigilator_id: Option<UserId>,
    #[serde(default)]
    pub student_count: Option<u32>,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
}

/// Partial update for `update_entry`.  `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    // course group
    pub course_id: Option<CourseId>,
    pub program_ids: Option<IdSet>,
    pub level: Option<Option<u16>>,
    // date group
    pub exam_date: Option<NaiveDate>,
    // time group
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration: Option<u32>,
    // venue group
    pub venue_id: Option<VenueId>,
    pub room_ids: Option<IdSet>,
    // invigilator group
    pub invigilator_ids: Option<IdSet>,
    pub chief_invigilator_id: Option<Option<UserId>>,
    // details
    pub student_count: Option<Option<u32>>,
    pub status: Option<EntryStatus>,
    pub notes: Option<Option<String>>,
    pub special_requirements: Option<Option<String>>,
}
