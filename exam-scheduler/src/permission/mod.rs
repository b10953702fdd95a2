/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Field-level modification rights for an actor on one entry.
//!
//! Resolution happens in two steps, both on every call:
//!
//! 1. classify the actor: role → [`RoleTier`], then compare the actor's
//!    directory scope with the entry's timetable faculty (faculty tier) or
//!    the course's department (department tier) → [`ScopeMatch`];
//! 2. look the `(tier, match)` pair up in [`grant`].
//!
//! Nothing is cached.  An actor moved to another department is judged by the
//! new assignment on the very next request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::directory::Directory;
use crate::error::FieldGroup;
use crate::ids::UserId;
use crate::model::{Entry, Timetable};

// ── Roles ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    InstitutionAdmin,
    ExamsOfficer,
    Dean,
    FacultyAdmin,
    HeadOfDepartment,
    Lecturer,
    Invigilator,
    Student,
    /// Any role string this engine does not recognise.
    Other,
}

impl Role {
    pub fn tier(self) -> RoleTier {
        match self {
            Role::SuperAdmin | Role::InstitutionAdmin | Role::ExamsOfficer => RoleTier::Admin,
            Role::Dean | Role::FacultyAdmin => RoleTier::Faculty,
            Role::HeadOfDepartment => RoleTier::Department,
            Role::Lecturer | Role::Invigilator | Role::Student | Role::Other => RoleTier::Unprivileged,
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    /// Case-insensitive; accepts `-`, `_` or space as separators.  Unknown
    /// strings map to [`Role::Other`] rather than failing, because an unknown
    /// role simply has no rights.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Ok(match norm.as_str() {
            "super_admin" | "superadmin" => Role::SuperAdmin,
            "institution_admin" | "admin" => Role::InstitutionAdmin,
            "exams_officer" | "exam_officer" => Role::ExamsOfficer,
            "dean" => Role::Dean,
            "faculty_admin" => Role::FacultyAdmin,
            "head_of_department" | "hod" => Role::HeadOfDepartment,
            "lecturer" => Role::Lecturer,
            "invigilator" => Role::Invigilator,
            "student" => Role::Student,
            _ => Role::Other,
        })
    }
}

/// Caller identity attached to a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}

// ── Decision table keys ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleTier {
    Admin,
    Faculty,
    Department,
    Unprivileged,
}

/// Whether the actor's assignment covers the entry, for tiers where that
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMatch {
    Matched,
    Mismatched,
    /// Tier does not depend on scope (admin, unprivileged).
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionScope {
    All,
    Faculty,
    Department,
    None,
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PermissionScope::All => "ALL",
            PermissionScope::Faculty => "FACULTY",
            PermissionScope::Department => "DEPARTMENT",
            PermissionScope::None => "NONE",
        })
    }
}

/// Capability set returned by `get_modification_permissions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModificationPermissions {
    pub can_modify_time: bool,
    pub can_modify_date: bool,
    pub can_modify_venue: bool,
    pub can_modify_invigilators: bool,
    pub can_modify_course: bool,
    pub can_delete: bool,
    pub scope: PermissionScope,
}

impl ModificationPermissions {
    const NONE: Self = Self {
        can_modify_time: false,
        can_modify_date: false,
        can_modify_venue: false,
        can_modify_invigilators: false,
        can_modify_course: false,
        can_delete: false,
        scope: PermissionScope::None,
    };

    const ALL: Self = Self {
        can_modify_time: true,
        can_modify_date: true,
        can_modify_venue: true,
        can_modify_invigilators: true,
        can_modify_course: true,
        can_delete: true,
        scope: PermissionScope::All,
    };

    const fn venue_and_invigilators(scope: PermissionScope) -> Self {
        Self {
            can_modify_venue: true,
            can_modify_invigilators: true,
            scope,
            ..Self::NONE
        }
    }

    /// Whether this capability set allows changing `group`.
    ///
    /// Detail fields (student count, status, notes) carry no capability of
    /// their own; any actor with a non-`NONE` scope may edit them.
    pub fn allows(&self, group: FieldGroup) -> bool {
        match group {
            FieldGroup::Course => self.can_modify_course,
            FieldGroup::Date => self.can_modify_date,
            FieldGroup::Time => self.can_modify_time,
            FieldGroup::Venue => self.can_modify_venue,
            FieldGroup::Invigilators => self.can_modify_invigilators,
            FieldGroup::Details => self.scope != PermissionScope::None,
            FieldGroup::Delete => self.can_delete,
        }
    }
}

/// The decision table.
pub fn grant(tier: RoleTier, scope: ScopeMatch) -> ModificationPermissions {
    match (tier, scope) {
        (RoleTier::Admin, _) => ModificationPermissions::ALL,
        (RoleTier::Faculty, ScopeMatch::Matched) => {
            ModificationPermissions::venue_and_invigilators(PermissionScope::Faculty)
        }
        (RoleTier::Department, ScopeMatch::Matched) => {
            ModificationPermissions::venue_and_invigilators(PermissionScope::Department)
        }
        _ => ModificationPermissions::NONE,
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Resolve `actor`'s rights on `entry` (owned by `timetable`).
///
/// An actor unknown to the directory, or a scope id missing on either side,
/// counts as a mismatch.
pub fn resolve(
    dir: &dyn Directory,
    actor: Actor,
    timetable: &Timetable,
    entry: &Entry,
) -> ModificationPermissions {
    let tier = actor.role.tier();
    let scope = match tier {
        RoleTier::Admin | RoleTier::Unprivileged => ScopeMatch::NotApplicable,
        RoleTier::Faculty => {
            let actor_faculty = dir.actor_scope(actor.id).and_then(|s| s.faculty_id);
            matched(actor_faculty.is_some() && actor_faculty == timetable.scope.faculty_id)
        }
        RoleTier::Department => {
            let actor_dept = dir.actor_scope(actor.id).and_then(|s| s.department_id);
            let course_dept = dir.course(entry.course_id).map(|c| c.department_id);
            matched(actor_dept.is_some() && actor_dept == course_dept)
        }
    };

    let perms = grant(tier, scope);
    debug!(
        actor = actor.id,
        role = ?actor.role,
        entry = entry.id,
        scope = %perms.scope,
        "permissions resolved"
    );
    perms
}

fn matched(ok: bool) -> ScopeMatch {
    if ok {
        ScopeMatch::Matched
    } else {
        ScopeMatch::Mismatched
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
