/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Read-only lookups into the institutional directory.
//!
//! Courses, programs, venues, rooms, user scope assignments and the academic
//! calendar are owned by other services.  The engine only ever asks the
//! questions in [`Directory`]; [`CatalogDirectory`] is the in-process
//! implementation filled from the YAML configuration (or directly by tests).
//!
//! Answers are never cached by the engine: room capacities and actor scope
//! assignments may change between two calls and the next call must see it.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use crate::ids::{CourseId, DepartmentId, FacultyId, ProgramId, RoomId, UserId, VenueId};

// ── Lookup results ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseInfo {
    pub id: CourseId,
    pub code: String,
    pub department_id: DepartmentId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomInfo {
    pub id: RoomId,
    pub venue_id: VenueId,
    pub capacity: u32,
}

/// Where in the institution an actor is assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ActorScope {
    #[serde(default)]
    pub faculty_id: Option<FacultyId>,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
}

// ── Directory trait ───────────────────────────────────────────────────────────

pub trait Directory: Send + Sync {
    fn course(&self, id: CourseId) -> Option<CourseInfo>;

    fn program_exists(&self, id: ProgramId) -> bool;

    fn venue_exists(&self, id: VenueId) -> bool;

    fn room(&self, id: RoomId) -> Option<RoomInfo>;

    /// `None` if the user is unknown.
    fn actor_scope(&self, id: UserId) -> Option<ActorScope>;

    /// `true` if the semester (and period, when given) belong to the year.
    fn academic_scope_exists(&self, year: u32, semester: u32, period: Option<u32>) -> bool;
}

// ── CatalogDirectory ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Catalog {
    courses: HashMap<CourseId, CourseInfo>,
    programs: HashSet<ProgramId>,
    venues: HashSet<VenueId>,
    rooms: HashMap<RoomId, RoomInfo>,
    actors: HashMap<UserId, ActorScope>,
    /// year → (semesters, periods)
    academic_years: HashMap<u32, (HashSet<u32>, HashSet<u32>)>,
}

/// In-memory [`Directory`] with interior mutability so that scope and
/// capacity changes made while the engine is running are visible on the
/// next lookup.
#[derive(Debug, Default)]
pub struct CatalogDirectory {
    inner: RwLock<Catalog>,
}

impl CatalogDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, id: CourseId, code: impl Into<String>, department_id: DepartmentId) {
        let code = code.into();
        debug!(course = id, code = %code, department = department_id, "course registered");
        self.inner.write().courses.insert(
            id,
            CourseInfo {
                id,
                code,
                department_id,
            },
        );
    }

    pub fn add_program(&self, id: ProgramId) {
        self.inner.write().programs.insert(id);
    }

    pub fn add_venue(&self, id: VenueId) {
        self.inner.write().venues.insert(id);
    }

    /// Registers (or replaces) a room.  The venue is registered implicitly.
    pub fn add_room(&self, id: RoomId, venue_id: VenueId, capacity: u32) {
        let mut inner = self.inner.write();
        inner.venues.insert(venue_id);
        inner.rooms.insert(
            id,
            RoomInfo {
                id,
                venue_id,
                capacity,
            },
        );
    }

    /// Returns `false` if the room is unknown.
    pub fn set_room_capacity(&self, id: RoomId, capacity: u32) -> bool {
        match self.inner.write().rooms.get_mut(&id) {
            Some(room) => {
                room.capacity = capacity;
                true
            }
            None => false,
        }
    }

    pub fn remove_room(&self, id: RoomId) -> bool {
        self.inner.write().rooms.remove(&id).is_some()
    }

    /// Registers a user or changes their scope assignment.
    pub fn assign_actor(&self, id: UserId, scope: ActorScope) {
        self.inner.write().actors.insert(id, scope);
    }

    pub fn add_academic_year(
        &self,
        year: u32,
        semesters: impl IntoIterator<Item = u32>,
        periods: impl IntoIterator<Item = u32>,
    ) {
        self.inner.write().academic_years.insert(
            year,
            (semesters.into_iter().collect(), periods.into_iter().collect()),
        );
    }

    pub fn course_count(&self) -> usize {
        self.inner.read().courses.len()
    }

    pub fn room_count(&self) -> usize {
        self.inner.read().rooms.len()
    }
}

impl Directory for CatalogDirectory {
    fn course(&self, id: CourseId) -> Option<CourseInfo> {
        self.inner.read().courses.get(&id).cloned()
    }

    fn program_exists(&self, id: ProgramId) -> bool {
        self.inner.read().programs.contains(&id)
    }

    fn venue_exists(&self, id: VenueId) -> bool {
        self.inner.read().venues.contains(&id)
    }

    fn room(&self, id: RoomId) -> Option<RoomInfo> {
        self.inner.read().rooms.get(&id).copied()
    }

    fn actor_scope(&self, id: UserId) -> Option<ActorScope> {
        self.inner.read().actors.get(&id).copied()
    }

    fn academic_scope_exists(&self, year: u32, semester: u32, period: Option<u32>) -> bool {
        let inner = self.inner.read();
        let Some((semesters, periods)) = inner.academic_years.get(&year) else {
            return false;
        };
        semesters.contains(&semester) && period.map_or(true, |p| periods.contains(&p))
    }
}
