/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Conflict detector.
//!
//! Detection is a full recomputation, never an incremental patch:
//!
//! 1. drop every unresolved conflict of the timetable (resolved ones are
//!    history and stay untouched),
//! 2. run the pure [`scan::scan`] over all entries,
//! 3. persist the findings as new [`Conflict`] records,
//! 4. rewrite `has_conflicts` / `conflict_details` on every entry.
//!
//! [`rescan`] operates on the timetable's own maps and is called with the
//! timetable lock held, so it always sees a fully-applied entry set.

pub mod scan;

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::ids::{ConflictId, EntryId, TimetableId};
use crate::model::{Conflict, Entry, Severity};

pub use scan::{scan, Finding};

/// Counts reported by one [`rescan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanSummary {
    /// Unresolved conflicts dropped before the scan.
    pub discarded: usize,
    /// Conflicts created by the scan.
    pub detected: usize,
    /// Entries now flagged `has_conflicts`.
    pub flagged_entries: usize,
}

/// Recompute the unresolved conflict set of one timetable.
///
/// `next_id` hands out ids for the new records.
pub fn rescan(
    timetable_id: TimetableId,
    entries: &mut BTreeMap<EntryId, Entry>,
    conflicts: &mut BTreeMap<ConflictId, Conflict>,
    mut next_id: impl FnMut() -> ConflictId,
    now: DateTime<Utc>,
) -> RescanSummary {
    let before = conflicts.len();
    conflicts.retain(|_, c| c.is_resolved);
    let discarded = before - conflicts.len();

    let findings = scan(entries.values());

    let mut details: HashMap<EntryId, Vec<String>> = HashMap::new();
    for finding in &findings {
        let a = finding.subject.entry1();
        let b = finding.subject.entry2();
        details.entry(a).or_default().push(finding.description.clone());
        if b != a {
            details.entry(b).or_default().push(finding.description.clone());
        }
    }

    let detected = findings.len();
    for finding in findings {
        let id = next_id();
        debug!(
            timetable = timetable_id,
            conflict = id,
            kind = %finding.kind,
            severity = %finding.severity,
            "conflict recorded"
        );
        conflicts.insert(
            id,
            Conflict {
                id,
                timetable_id,
                kind: finding.kind,
                severity: finding.severity,
                subject: finding.subject,
                description: finding.description,
                affected_programs: finding.affected_programs,
                can_auto_resolve: finding.can_auto_resolve,
                suggested_resolution: finding.suggested_resolution,
                detected_at: now,
                is_resolved: false,
                resolved_by: None,
                resolved_at: None,
            },
        );
    }

    for entry in entries.values_mut() {
        match details.remove(&entry.id) {
            Some(lines) => {
                entry.has_conflicts = true;
                entry.conflict_details = Some(lines.join("; "));
            }
            None => {
                entry.has_conflicts = false;
                entry.conflict_details = None;
            }
        }
    }

    let summary = RescanSummary {
        discarded,
        detected,
        flagged_entries: entries.values().filter(|e| e.has_conflicts).count(),
    };
    info!(
        timetable = timetable_id,
        entries = entries.len(),
        discarded = summary.discarded,
        detected = summary.detected,
        flagged = summary.flagged_entries,
        "conflict rescan complete"
    );
    summary
}

/// Number of unresolved conflicts at or above `threshold`.
pub fn blocking_count<'a>(
    conflicts: impl IntoIterator<Item = &'a Conflict>,
    threshold: Severity,
) -> usize {
    conflicts
        .into_iter()
        .filter(|c| !c.is_resolved && c.severity >= threshold)
        .count()
}

/// Display order: unresolved first, then severity descending, then most
/// recently detected first (newer ids break timestamp ties).
pub fn display_order(a: &Conflict, b: &Conflict) -> Ordering {
    a.is_resolved
        .cmp(&b.is_resolved)
        .then_with(|| b.severity.cmp(&a.severity))
        .then_with(|| b.detected_at.cmp(&a.detected_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Clone `conflicts` into a vector sorted by [`display_order`].
pub fn sorted_for_display<'a>(conflicts: impl IntoIterator<Item = &'a Conflict>) -> Vec<Conflict> {
    let mut list: Vec<Conflict> = conflicts.into_iter().cloned().collect();
    list.sort_by(display_order);
    list
}

// ── Tests ─────────────────────────────────────────────────────────────────────
