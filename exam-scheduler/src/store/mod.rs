/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Entry store: turns drafts and patches into validated [`Entry`] records.
//!
//! Nothing here writes to shared state.  [`build_entry`] and [`apply_patch`]
//! return a complete new `Entry` (or an error) and the engine swaps it in
//! under the timetable lock, so a failed validation never leaves a
//! half-updated record behind.
//!
//! Seating capacity is always recomputed from the directory's current room
//! capacities when the room set is written.

pub mod validate;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::directory::Directory;
use crate::error::{EngineResult, FieldGroup};
use crate::ids::EntryId;
use crate::lifecycle::ensure_editable;
use crate::model::{Entry, EntryDraft, EntryPatch, Timetable};

use validate::{check_course, check_placement, check_timing};

/// Validate `draft` against `timetable` and the directory and build a new
/// entry.  `next_id` is called only once validation has passed.
///
/// # Errors
/// `ImmutableState` if the timetable is not editable, `NotFound` for an
/// unknown course / program / venue / room, `Validation` for bad timing or
/// empty sets.
pub fn build_entry(
    dir: &dyn Directory,
    timetable: &Timetable,
    draft: EntryDraft,
    now: DateTime<Utc>,
    next_id: impl FnOnce() -> EntryId,
) -> EngineResult<Entry> {
    ensure_editable(timetable, "create entry")?;

    check_course(dir, draft.course_id, &draft.program_ids)?;
    let seating_capacity = check_placement(dir, draft.venue_id, &draft.room_ids)?;
    let duration = check_timing(
        timetable,
        draft.exam_date,
        draft.start_time,
        draft.end_time,
        draft.duration,
    )?;

    let id = next_id();
    debug!(
        timetable = timetable.id,
        entry = id,
        course = draft.course_id,
        seats = seating_capacity,
        "entry validated"
    );

    Ok(Entry {
        id,
        timetable_id: timetable.id,
        course_id: draft.course_id,
        program_ids: draft.program_ids,
        level: draft.level,
        exam_date: draft.exam_date,
        start_time: draft.start_time,
        end_time: draft.end_time,
        duration,
        venue_id: draft.venue_id,
        room_ids: draft.room_ids,
        seating_capacity,
        invigilator_ids: draft.invigilator_ids,
        chief_invigilator_id: draft.chief_invigilator_id,
        student_count: draft.student_count,
        has_conflicts: false,
        conflict_details: None,
        status: draft.status,
        notes: draft.notes,
        special_requirements: draft.special_requirements,
        created_at: now,
        updated_at: now,
    })
}

/// Field groups whose value `patch` would actually change.
///
/// A field that is present but equal to the stored value is not a change,
/// so clients resubmitting a whole form only need rights for what differs.
pub fn touched_groups(current: &Entry, patch: &EntryPatch) -> BTreeSet<FieldGroup> {
    fn differs<T: PartialEq>(new: &Option<T>, old: &T) -> bool {
        new.as_ref().is_some_and(|v| v != old)
    }

    let mut groups = BTreeSet::new();

    if differs(&patch.course_id, &current.course_id)
        || differs(&patch.program_ids, &current.program_ids)
        || differs(&patch.level, &current.level)
    {
        groups.insert(FieldGroup::Course);
    }
    if differs(&patch.exam_date, &current.exam_date) {
        groups.insert(FieldGroup::Date);
    }
    if differs(&patch.start_time, &current.start_time)
        || differs(&patch.end_time, &current.end_time)
        || differs(&patch.duration, &current.duration)
    {
        groups.insert(FieldGroup::Time);
    }
    if differs(&patch.venue_id, &current.venue_id) || differs(&patch.room_ids, &current.room_ids) {
        groups.insert(FieldGroup::Venue);
    }
    if differs(&patch.invigilator_ids, &current.invigilator_ids)
        || differs(&patch.chief_invigilator_id, &current.chief_invigilator_id)
    {
        groups.insert(FieldGroup::Invigilators);
    }
    if differs(&patch.student_count, &current.student_count)
        || differs(&patch.status, &current.status)
        || differs(&patch.notes, &current.notes)
        || differs(&patch.special_requirements, &current.special_requirements)
    {
        groups.insert(FieldGroup::Details);
    }

    groups
}

/// Produce the updated copy of `current` with `patch` applied and every
/// affected invariant re-validated.
pub fn apply_patch(
    dir: &dyn Directory,
    timetable: &Timetable,
    current: &Entry,
    patch: EntryPatch,
    now: DateTime<Utc>,
) -> EngineResult<Entry> {
    ensure_editable(timetable, "update entry")?;

    let mut next = current.clone();

    if patch.course_id.is_some() || patch.program_ids.is_some() {
        next.course_id = patch.course_id.unwrap_or(current.course_id);
        if let Some(programs) = patch.program_ids {
            next.program_ids = programs;
        }
        check_course(dir, next.course_id, &next.program_ids)?;
    }
    if let Some(level) = patch.level {
        next.level = level;
    }

    if patch.venue_id.is_some() || patch.room_ids.is_some() {
        next.venue_id = patch.venue_id.unwrap_or(current.venue_id);
        if let Some(rooms) = patch.room_ids {
            next.room_ids = rooms;
        }
        next.seating_capacity = check_placement(dir, next.venue_id, &next.room_ids)?;
    }

    // Timing is always re-validated: the timetable range may have been
    // narrowed since the entry was written.
    let window_changed = patch.start_time.is_some() || patch.end_time.is_some();
    if let Some(date) = patch.exam_date {
        next.exam_date = date;
    }
    if let Some(start) = patch.start_time {
        next.start_time = start;
    }
    if let Some(end) = patch.end_time {
        next.end_time = end;
    }
    let explicit_duration = match patch.duration {
        Some(d) => Some(d),
        None if window_changed => None,
        None => Some(current.duration),
    };
    next.duration = check_timing(
        timetable,
        next.exam_date,
        next.start_time,
        next.end_time,
        explicit_duration,
    )?;

    if let Some(invigilators) = patch.invigilator_ids {
        next.invigilator_ids = invigilators;
    }
    if let Some(chief) = patch.chief_invigilator_id {
        next.chief_invigilator_id = chief;
    }
    if let Some(count) = patch.student_count {
        next.student_count = count;
    }
    if let Some(status) = patch.status {
        next.status = status;
    }
    if let Some(notes) = patch.notes {
        next.notes = notes;
    }
    if let Some(req) = patch.special_requirements {
        next.special_requirements = req;
    }

    next.updated_at = now;
    Ok(next)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
