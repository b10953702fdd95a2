/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Conflict record produced by the conflict detector.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ids::{ConflictId, EntryId, IdSet, TimetableId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    VenueOverlap,
    StudentOverlap,
    InvigilatorOverlap,
    CapacityExceeded,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::VenueOverlap => "venue_overlap",
            ConflictKind::StudentOverlap => "student_overlap",
            ConflictKind::InvigilatorOverlap => "invigilator_overlap",
            ConflictKind::CapacityExceeded => "capacity_exceeded",
        })
    }
}

/// Ordinal urgency: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        })
    }
}

/// The entries a conflict is about.
///
/// Pair conflicts are stored with the smaller id first so that two scans of
/// the same entry set describe a pair identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSubject {
    Pair(EntryId, EntryId),
    Single(EntryId),
}

impl ConflictSubject {
    pub fn pair(a: EntryId, b: EntryId) -> Self {
        if a <= b {
            ConflictSubject::Pair(a, b)
        } else {
            ConflictSubject::Pair(b, a)
        }
    }

    pub fn entry1(&self) -> EntryId {
        match *self {
            ConflictSubject::Pair(a, _) => a,
            ConflictSubject::Single(e) => e,
        }
    }

    /// Equal to [`entry1`](Self::entry1) for single-entry conflicts.
    pub fn entry2(&self) -> EntryId {
        match *self {
            ConflictSubject::Pair(_, b) => b,
            ConflictSubject::Single(e) => e,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub timetable_id: TimetableId,
    pub kind: ConflictKind,
    pub severity: Severity,
    pub subject: ConflictSubject,
    pub description: String,
    /// Programs sitting both exams; only filled for student overlaps.
    pub affected_programs: Option<IdSet>,
    pub can_auto_resolve: bool,
    pub suggested_resolution: String,
    pub detected_at: DateTime<Utc>,

    pub is_resolved: bool,
    pub resolved_by: Option<UserId>,
    pub resolved_at: Option<DateTime<Utc>>,
}
