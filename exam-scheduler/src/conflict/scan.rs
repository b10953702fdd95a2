/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure conflict scan: `entries -> findings`.
//!
//! No ids, timestamps or storage are involved, so the scan can be exercised
//! against literal fixtures and two scans of the same entry set always return
//! identical findings in identical order.
//!
//! # Pair sweep
//! Entries are sorted by `(exam_date, start_time, id)`.  For each entry the
//! inner loop walks forward only while the next entry is on the same date and
//! starts before the current one ends; once an entry starts at or after the
//! current end, every later entry does too.  Worst case is still O(n²) (all
//! exams in one slot) but a typical day of staggered sessions touches only
//! its true neighbours.

use tracing::debug;

use crate::ids::IdSet;
use crate::model::{ConflictKind, ConflictSubject, Entry, Severity};

/// One detected violation, before it is given an id and persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub subject: ConflictSubject,
    pub description: String,
    pub affected_programs: Option<IdSet>,
    pub can_auto_resolve: bool,
    pub suggested_resolution: String,
}

/// Scan every overlapping pair and every over-subscribed entry.
pub fn scan<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Vec<Finding> {
    let mut sorted: Vec<&Entry> = entries.into_iter().collect();
    sorted.sort_by_key(|e| (e.exam_date, e.start_time, e.id));

    let mut findings = Vec::new();

    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if b.exam_date != a.exam_date || b.start_time >= a.end_time {
                break;
            }
            if a.overlaps_in_time(b) {
                check_pair(a, b, &mut findings);
            }
        }
    }

    // Single-entry checks in id order.
    sorted.sort_by_key(|e| e.id);
    for entry in &sorted {
        if let Some(f) = check_capacity(entry) {
            findings.push(f);
        }
    }

    debug!(entries = sorted.len(), findings = findings.len(), "scan complete");
    findings
}

fn window(e: &Entry) -> String {
    format!(
        "{} {}-{}",
        e.exam_date,
        e.start_time.format("%H:%M"),
        e.end_time.format("%H:%M")
    )
}

fn check_pair(a: &Entry, b: &Entry, out: &mut Vec<Finding>) {
    let subject = ConflictSubject::pair(a.id, b.id);

    // Venue: same venue and at least one shared room.
    if a.venue_id == b.venue_id && a.room_ids.intersects(&b.room_ids) {
        out.push(Finding {
            kind: ConflictKind::VenueOverlap,
            severity: Severity::High,
            subject,
            description: format!(
                "entries {} and {} both use room(s) {} of venue {} at {}",
                a.id,
                b.id,
                a.room_ids.intersection(&b.room_ids),
                a.venue_id,
                window(a)
            ),
            affected_programs: None,
            can_auto_resolve: true,
            suggested_resolution: "Move one exam to a free room or another time slot".to_string(),
        });
    }

    // Students: a program sitting both exams.
    let programs = a.program_ids.intersection(&b.program_ids);
    if !programs.is_empty() {
        out.push(Finding {
            kind: ConflictKind::StudentOverlap,
            severity: Severity::Critical,
            subject,
            description: format!(
                "program(s) {} sit entries {} and {} at the same time on {}",
                programs, a.id, b.id, a.exam_date
            ),
            affected_programs: Some(programs),
            can_auto_resolve: true,
            suggested_resolution: "Reschedule one exam to a slot free for the affected programs"
                .to_string(),
        });
    }

    // Staff: anyone supervising both, chief or assistant.
    let same_chief = a.chief_invigilator_id.is_some()
        && a.chief_invigilator_id == b.chief_invigilator_id;
    let staff_a = staff(a);
    let staff_b = staff(b);
    if same_chief || staff_a.intersects(&staff_b) {
        let description = if same_chief {
            format!(
                "chief invigilator {} is assigned to entries {} and {} at overlapping times",
                a.chief_invigilator_id.unwrap_or_default(),
                a.id,
                b.id
            )
        } else {
            format!(
                "invigilator(s) {} are assigned to entries {} and {} at overlapping times",
                staff_a.intersection(&staff_b),
                a.id,
                b.id
            )
        };
        out.push(Finding {
            kind: ConflictKind::InvigilatorOverlap,
            severity: Severity::Medium,
            subject,
            description,
            affected_programs: None,
            can_auto_resolve: true,
            suggested_resolution: "Assign a different invigilator to one of the exams".to_string(),
        });
    }
}

/// Assistants plus the chief.
fn staff(e: &Entry) -> IdSet {
    let mut set = e.invigilator_ids.clone();
    if let Some(chief) = e.chief_invigilator_id {
        set.insert(chief);
    }
    set
}

fn check_capacity(e: &Entry) -> Option<Finding> {
    let students = e.student_count?;
    if students <= e.seating_capacity {
        return None;
    }
    Some(Finding {
        kind: ConflictKind::CapacityExceeded,
        severity: Severity::High,
        subject: ConflictSubject::Single(e.id),
        description: format!(
            "entry {} has {} students but only {} seats",
            e.id, students, e.seating_capacity
        ),
        affected_programs: None,
        can_auto_resolve: false,
        suggested_resolution: format!(
            "Add rooms providing at least {} more seats or split the sitting",
            students - e.seating_capacity
        ),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
