/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Read-only timetable statistics.
//!
//! [`aggregate`] derives everything from the entry and conflict records it is
//! handed and has no side effects.  [`refresh_counters`] is the only writer:
//! it keeps `Timetable::total_exams` and `total_conflicts` in step after each
//! mutation.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::conflict::blocking_count;
use crate::ids::TimetableId;
use crate::model::{Conflict, ConflictKind, Entry, EntryStatus, Severity, Timetable};

/// Resolved / unresolved split for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConflictTally {
    pub unresolved: usize,
    pub resolved: usize,
}

impl ConflictTally {
    pub fn total(&self) -> usize {
        self.unresolved + self.resolved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimetableStatistics {
    pub timetable_id: TimetableId,
    pub total_exams: usize,
    pub exams_by_status: BTreeMap<EntryStatus, usize>,

    pub unique_venues: usize,
    pub unique_courses: usize,
    pub unique_dates: usize,
    /// `total_exams / unique_dates`, `0.0` when there are no entries.
    pub average_exams_per_day: f64,

    pub total_seats: u64,
    pub total_students: u64,
    /// `total_students / total_seats * 100`, `0.0` when there are no seats.
    pub utilization_rate: f64,

    pub conflicts_by_severity: BTreeMap<Severity, ConflictTally>,
    pub conflicts_by_kind: BTreeMap<ConflictKind, ConflictTally>,
    pub unresolved_conflicts: usize,
    pub resolved_conflicts: usize,

    /// No unresolved conflict at or above the configured blocking severity.
    pub publishable: bool,
}

/// Compute statistics for one timetable.
pub fn aggregate<'a>(
    timetable_id: TimetableId,
    entries: impl IntoIterator<Item = &'a Entry>,
    conflicts: impl IntoIterator<Item = &'a Conflict>,
    blocking_severity: Severity,
) -> TimetableStatistics {
    let entries: Vec<&Entry> = entries.into_iter().collect();
    let conflicts: Vec<&Conflict> = conflicts.into_iter().collect();

    let mut exams_by_status = BTreeMap::new();
    let mut venues = BTreeSet::new();
    let mut courses = BTreeSet::new();
    let mut dates = BTreeSet::new();
    let mut total_seats = 0u64;
    let mut total_students = 0u64;

    for e in &entries {
        *exams_by_status.entry(e.status).or_insert(0) += 1;
        venues.insert(e.venue_id);
        courses.insert(e.course_id);
        dates.insert(e.exam_date);
        total_seats += u64::from(e.seating_capacity);
        total_students += u64::from(e.student_count.unwrap_or(0));
    }

    let mut conflicts_by_severity: BTreeMap<Severity, ConflictTally> = BTreeMap::new();
    let mut conflicts_by_kind: BTreeMap<ConflictKind, ConflictTally> = BTreeMap::new();
    let mut unresolved = 0;
    for c in &conflicts {
        let bump = |t: &mut ConflictTally| {
            if c.is_resolved {
                t.resolved += 1;
            } else {
                t.unresolved += 1;
            }
        };
        bump(conflicts_by_severity.entry(c.severity).or_default());
        bump(conflicts_by_kind.entry(c.kind).or_default());
        if !c.is_resolved {
            unresolved += 1;
        }
    }

    let average_exams_per_day = if dates.is_empty() {
        0.0
    } else {
        entries.len() as f64 / dates.len() as f64
    };
    let utilization_rate = if total_seats == 0 {
        0.0
    } else {
        total_students as f64 / total_seats as f64 * 100.0
    };

    TimetableStatistics {
        timetable_id,
        total_exams: entries.len(),
        exams_by_status,
        unique_venues: venues.len(),
        unique_courses: courses.len(),
        unique_dates: dates.len(),
        average_exams_per_day,
        total_seats,
        total_students,
        utilization_rate,
        conflicts_by_severity,
        conflicts_by_kind,
        unresolved_conflicts: unresolved,
        resolved_conflicts: conflicts.len() - unresolved,
        publishable: blocking_count(conflicts.iter().copied(), blocking_severity) == 0,
    }
}

/// Bring the timetable's stored counters in line with its records.
pub fn refresh_counters<'a>(
    timetable: &mut Timetable,
    entry_count: usize,
    conflicts: impl IntoIterator<Item = &'a Conflict>,
) {
    timetable.total_exams = entry_count;
    timetable.total_conflicts = conflicts.into_iter().filter(|c| !c.is_resolved).count();
}

// ── Tests ─────────────────────────────────────────────────────────────────────
