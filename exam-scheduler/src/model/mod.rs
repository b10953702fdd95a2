/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Records owned by the engine: timetables, their exam entries, and the
//! conflicts detected between entries.

pub mod conflict;
pub mod entry;
pub mod timetable;

pub use conflict::{Conflict, ConflictKind, ConflictSubject, Severity};
pub use entry::{Entry, EntryDraft, EntryPatch, EntryStatus};
pub use timetable::{
    AcademicScope, ApprovalStatus, Timetable, TimetableDraft, TimetablePatch, TimetableStatus,
};
