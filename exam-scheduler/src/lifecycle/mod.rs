/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timetable lifecycle state machine.
//!
//! ```text
//!            submit            approve           publish            complete           archive
//!  Draft ───────────► Pending ─────────► Approved ───────► Published ────────► Completed ───────► Archived
//!    ▲                Approval                │
//!    └──── reject ───────┘                    │ submit (re-submission after edits)
//!                        ▲────────────────────┘
//! ```
//!
//! Every function here checks its precondition against the current status,
//! mutates the [`Timetable`] in place only on success, and never touches
//! entries or conflicts.  The caller holds the timetable's lock and supplies
//! the facts the transition depends on (entry count, blocking conflicts).
//!
//! [`ensure_editable`] is the single editability gate; the entry store calls
//! it before every entry write and the engine calls it before timetable
//! edits, so both paths reject mutations with the same error.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{EngineError, EngineResult, StateReason, ValidationReason};
use crate::ids::UserId;
use crate::model::{ApprovalStatus, Severity, Timetable, TimetableStatus};

/// Fails with `ImmutableState` once the timetable is published or later.
pub fn ensure_editable(timetable: &Timetable, action: &'static str) -> EngineResult<()> {
    if timetable.status.is_editable() {
        Ok(())
    } else {
        Err(EngineError::ImmutableState {
            timetable: timetable.id,
            status: timetable.status,
            action,
        })
    }
}

/// Only an empty draft may be deleted.
pub fn ensure_deletable(timetable: &Timetable, entry_count: usize) -> EngineResult<()> {
    if timetable.status == TimetableStatus::Draft && entry_count == 0 {
        Ok(())
    } else {
        Err(EngineError::ImmutableState {
            timetable: timetable.id,
            status: timetable.status,
            action: "delete",
        })
    }
}

fn invalid(timetable: &Timetable, action: &'static str) -> EngineError {
    EngineError::ConflictState {
        timetable: timetable.id,
        reason: StateReason::InvalidTransition {
            from: timetable.status,
            action,
        },
    }
}

/// Any editable state → `PendingApproval`.
pub fn submit(timetable: &mut Timetable, entry_count: usize, now: DateTime<Utc>) -> EngineResult<()> {
    ensure_editable(timetable, "submit")?;
    if entry_count == 0 {
        return Err(EngineError::ConflictState {
            timetable: timetable.id,
            reason: StateReason::EmptyTimetable,
        });
    }

    timetable.status = TimetableStatus::PendingApproval;
    timetable.approval_status = ApprovalStatus::Pending;
    timetable.updated_at = now;

    info!(timetable = timetable.id, entries = entry_count, "submitted for approval");
    Ok(())
}

/// `PendingApproval` → `Approved`.
pub fn approve(timetable: &mut Timetable, approver: UserId, now: DateTime<Utc>) -> EngineResult<()> {
    if timetable.status != TimetableStatus::PendingApproval {
        return Err(invalid(timetable, "approve"));
    }

    timetable.status = TimetableStatus::Approved;
    timetable.approval_status = ApprovalStatus::Approved;
    timetable.approved_by = Some(approver);
    timetable.approved_at = Some(now);
    timetable.rejection_reason = None;
    timetable.updated_at = now;

    info!(timetable = timetable.id, approver = approver, "approved");
    Ok(())
}

/// `PendingApproval` → `Draft` with a mandatory reason.
pub fn reject(timetable: &mut Timetable, reason: &str, now: DateTime<Utc>) -> EngineResult<()> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationReason::EmptyField { field: "reason" }.into());
    }
    if timetable.status != TimetableStatus::PendingApproval {
        return Err(invalid(timetable, "reject"));
    }

    timetable.status = TimetableStatus::Draft;
    timetable.approval_status = ApprovalStatus::Rejected;
    timetable.rejection_reason = Some(reason.to_string());
    timetable.updated_at = now;

    info!(timetable = timetable.id, reason = %reason, "rejected");
    Ok(())
}

/// `Approved` → `Published`.
///
/// `blocking` is the number of unresolved conflicts at or above `threshold`.
pub fn publish(
    timetable: &mut Timetable,
    publisher: UserId,
    blocking: usize,
    threshold: Severity,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if timetable.approval_status != ApprovalStatus::Approved {
        return Err(EngineError::ConflictState {
            timetable: timetable.id,
            reason: StateReason::NotApproved,
        });
    }
    if timetable.status != TimetableStatus::Approved {
        return Err(invalid(timetable, "publish"));
    }
    if blocking > 0 {
        return Err(EngineError::ConflictState {
            timetable: timetable.id,
            reason: StateReason::BlockingConflicts {
                count: blocking,
                threshold,
            },
        });
    }

    timetable.status = TimetableStatus::Published;
    timetable.published_by = Some(publisher);
    timetable.published_at = Some(now);
    timetable.updated_at = now;

    info!(timetable = timetable.id, publisher = publisher, "published");
    Ok(())
}

/// `Published` → `Completed`.
pub fn complete(timetable: &mut Timetable, now: DateTime<Utc>) -> EngineResult<()> {
    if timetable.status != TimetableStatus::Published {
        return Err(invalid(timetable, "complete"));
    }
    timetable.status = TimetableStatus::Completed;
    timetable.updated_at = now;
    info!(timetable = timetable.id, "completed");
    Ok(())
}

/// `Completed` → `Archived`.
pub fn archive(timetable: &mut Timetable, now: DateTime<Utc>) -> EngineResult<()> {
    if timetable.status != TimetableStatus::Completed {
        return Err(invalid(timetable, "archive"));
    }
    timetable.status = TimetableStatus::Archived;
    timetable.updated_at = now;
    info!(timetable = timetable.id, "archived");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
