/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Identifier aliases and the [`IdSet`] association type.
//!
//! Programs, rooms and invigilators are exchanged as ordered sets of integer
//! identifiers.  They are decoded once into an [`IdSet`] at the serde boundary
//! and every consumer (validation, conflict scan, statistics) works with the
//! typed set instead of re-parsing a list.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Engine-owned identifiers ──────────────────────────────────────────────────

pub type TimetableId = u64;
pub type EntryId = u64;
pub type ConflictId = u64;

// ── Identifiers owned by external collaborators ───────────────────────────────

pub type CourseId = u32;
pub type ProgramId = u32;
pub type VenueId = u32;
pub type RoomId = u32;
pub type UserId = u32;
pub type FacultyId = u32;
pub type DepartmentId = u32;
pub type InstitutionId = u32;

// ── IdSet ─────────────────────────────────────────────────────────────────────

/// Ordered, duplicate-free set of external identifiers.
///
/// Backed by a `BTreeSet` so iteration (and therefore every description or
/// serialised form built from it) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSet(BTreeSet<u32>);

impl IdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.0.contains(&id)
    }

    pub fn insert(&mut self, id: u32) -> bool {
        self.0.insert(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Ids present in both sets.
    pub fn intersection(&self, other: &IdSet) -> IdSet {
        IdSet(self.0.intersection(&other.0).copied().collect())
    }

    /// `true` if at least one id is shared.  Cheaper than building the
    /// intersection when only the answer matters.
    pub fn intersects(&self, other: &IdSet) -> bool {
        // Walk the smaller set, probe the larger one.
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.0.iter().any(|id| large.0.contains(id))
    }

    pub fn union(&self, other: &IdSet) -> IdSet {
        IdSet(self.0.union(&other.0).copied().collect())
    }
}

impl FromIterator<u32> for IdSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        IdSet(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[u32; N]> for IdSet {
    fn from(ids: [u32; N]) -> Self {
        ids.into_iter().collect()
    }
}

impl fmt::Display for IdSet {
    /// Renders as `[1, 2, 3]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "]")
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
