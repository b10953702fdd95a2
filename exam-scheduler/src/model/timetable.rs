/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timetable record, its lifecycle enums and the create / update payloads.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FacultyId, InstitutionId, TimetableId, UserId};

// ── Status enums ──────────────────────────────────────────────────────────────

/// Lifecycle state of a timetable.
///
/// Declaration order follows the forward path of the lifecycle, so the
/// derived `Ord` can be used for "at or past" comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimetableStatus {
    #[default]
    Draft,
    PendingApproval,
    Approved,
    Published,
    Completed,
    Archived,
}

impl TimetableStatus {
    /// Entries may be created, edited or deleted only in these states.
    pub fn is_editable(self) -> bool {
        matches!(
            self,
            TimetableStatus::Draft | TimetableStatus::PendingApproval | TimetableStatus::Approved
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimetableStatus::Draft => "draft",
            TimetableStatus::PendingApproval => "pending_approval",
            TimetableStatus::Approved => "approved",
            TimetableStatus::Published => "published",
            TimetableStatus::Completed => "completed",
            TimetableStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for TimetableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the approval workflow, tracked separately from the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

// ── Scope ─────────────────────────────────────────────────────────────────────

/// Institutional scope a timetable belongs to.
///
/// Year / semester / period ids are validated against the directory when the
/// timetable is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicScope {
    pub institution_id: InstitutionId,
    /// `None` for institution-wide timetables.
    #[serde(default)]
    pub faculty_id: Option<FacultyId>,
    pub academic_year_id: u32,
    pub semester_id: u32,
    #[serde(default)]
    pub academic_period_id: Option<u32>,
}

// ── Timetable ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Timetable {
    pub id: TimetableId,
    pub scope: AcademicScope,
    pub title: String,
    pub description: Option<String>,

    // ── Date range (inclusive) ────────────────────────────────────────────────
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    // ── Lifecycle ─────────────────────────────────────────────────────────────
    pub status: TimetableStatus,
    pub approval_status: ApprovalStatus,

    // ── Planning flags ────────────────────────────────────────────────────────
    pub allow_overlaps: bool,
    pub auto_resolve_conflicts: bool,
    /// Minutes.
    pub default_exam_duration: u32,

    // ── Counters (refreshed after every mutation) ─────────────────────────────
    pub total_exams: usize,
    pub total_conflicts: usize,

    // ── Audit ─────────────────────────────────────────────────────────────────
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub published_by: Option<UserId>,
    pub published_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Timetable {
    /// `true` if `date` lies inside `[start_date, end_date]`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Stays `true` once the timetable has been published, including after
    /// completion and archival.
    pub fn is_published(&self) -> bool {
        self.status >= TimetableStatus::Published
    }
}

// ── Payloads ──────────────────────────────────────────────────────────────────

/// Input for `create_timetable`.
#[derive(Debug, Clone, Deserialize)]
pub struct TimetableDraft {
    pub scope: AcademicScope,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub allow_overlaps: bool,
    #[serde(default)]
    pub auto_resolve_conflicts: bool,
    /// Falls back to the engine setting when absent.
    #[serde(default)]
    pub default_exam_duration: Option<u32>,
    pub created_by: UserId,
}

/// Partial update for `update_timetable`.  `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TimetablePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub allow_overlaps: Option<bool>,
    pub auto_resolve_conflicts: Option<bool>,
    pub default_exam_duration: Option<u32>,
}
