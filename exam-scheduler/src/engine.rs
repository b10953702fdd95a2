/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! [`TimetableEngine`]: the operations exposed to callers.
//!
//! # Locking model
//! Each timetable lives in its own shard behind a `parking_lot::Mutex`:
//!
//! ```text
//! shards: RwLock<HashMap<TimetableId, Arc<Mutex<Shard>>>>
//!                                          └─ timetable + entries + conflicts
//! entry_index:    RwLock<HashMap<EntryId, TimetableId>>
//! conflict_index: RwLock<HashMap<ConflictId, TimetableId>>
//! ```
//!
//! A mutation locks exactly one shard and, while holding it, validates,
//! writes, re-runs the conflict scan and refreshes the counters.  Two writers
//! on the same timetable are therefore serialised and a scan never sees a
//! half-applied edit; writers on different timetables never contend.
//!
//! Lock order is always *shard → index*.  The outer maps are only read long
//! enough to clone an `Arc` or look up an id, and are never held while
//! waiting for a shard.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{ConfigManager, EngineSettings};
use crate::conflict;
use crate::directory::Directory;
use crate::error::{EngineError, EngineResult, FieldGroup, Resource, ValidationReason};
use crate::ids::{ConflictId, EntryId, TimetableId, UserId};
use crate::lifecycle;
use crate::model::{
    ApprovalStatus, Conflict, Entry, EntryDraft, EntryPatch, Timetable, TimetableDraft,
    TimetablePatch, TimetableStatus,
};
use crate::permission::{self, Actor, ModificationPermissions, Role};
use crate::stats::{self, TimetableStatistics};
use crate::store::{self, validate};

// ── Shard ─────────────────────────────────────────────────────────────────────

/// Everything owned by one timetable.
struct Shard {
    timetable: Timetable,
    entries: BTreeMap<EntryId, Entry>,
    /// Resolved history plus the current unresolved set.
    conflicts: BTreeMap<ConflictId, Conflict>,
    /// Set when the timetable is deleted; a caller that cloned the `Arc`
    /// before removal sees `NotFound` instead of writing to an orphan.
    removed: bool,
}

// ── TimetableEngine ───────────────────────────────────────────────────────────

pub struct TimetableEngine {
    directory: Arc<dyn Directory>,
    settings: EngineSettings,

    shards: RwLock<HashMap<TimetableId, Arc<Mutex<Shard>>>>,
    entry_index: RwLock<HashMap<EntryId, TimetableId>>,
    conflict_index: RwLock<HashMap<ConflictId, TimetableId>>,

    next_timetable: AtomicU64,
    next_entry: AtomicU64,
    next_conflict: AtomicU64,
}

impl TimetableEngine {
    pub fn new(directory: Arc<dyn Directory>, settings: EngineSettings) -> Self {
        Self {
            directory,
            settings,
            shards: RwLock::new(HashMap::new()),
            entry_index: RwLock::new(HashMap::new()),
            conflict_index: RwLock::new(HashMap::new()),
            next_timetable: AtomicU64::new(0),
            next_entry: AtomicU64::new(0),
            next_conflict: AtomicU64::new(0),
        }
    }

    /// Engine backed by a loaded configuration's directory and settings.
    pub fn from_config(config: &ConfigManager) -> Self {
        Self::new(config.directory(), config.settings())
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    // ── Shard access ──────────────────────────────────────────────────────────

    /// Run `f` with the timetable's shard locked.
    fn with_shard<R>(
        &self,
        id: TimetableId,
        f: impl FnOnce(&mut Shard) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let shard = self
            .shards
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(Resource::Timetable, id))?;

        let mut guard = shard.lock();
        if guard.removed {
            return Err(EngineError::not_found(Resource::Timetable, id));
        }
        f(&mut guard)
    }

    fn timetable_of_entry(&self, entry: EntryId) -> EngineResult<TimetableId> {
        self.entry_index
            .read()
            .get(&entry)
            .copied()
            .ok_or_else(|| EngineError::not_found(Resource::Entry, entry))
    }

    /// Run `f` with the entry's shard locked.  `f` receives the entry id
    /// already checked to exist in that shard.
    fn with_entry_shard<R>(
        &self,
        entry: EntryId,
        f: impl FnOnce(&mut Shard) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let timetable = self.timetable_of_entry(entry)?;
        self.with_shard(timetable, |shard| {
            // Deleted between the index lookup and acquiring the lock.
            if !shard.entries.contains_key(&entry) {
                return Err(EngineError::not_found(Resource::Entry, entry));
            }
            f(shard)
        })
    }

    /// Capacity refresh, full conflict rescan and counter refresh.
    ///
    /// Infallible by construction: it runs after a write has been accepted,
    /// so nothing here may leave the shard half-updated.
    fn refresh(&self, shard: &mut Shard) {
        let Shard {
            timetable,
            entries,
            conflicts,
            ..
        } = shard;
        let now = Utc::now();

        for entry in entries.values_mut() {
            let live = validate::live_capacity(self.directory.as_ref(), &entry.room_ids);
            if live != entry.seating_capacity {
                debug!(
                    entry = entry.id,
                    old = entry.seating_capacity,
                    new = live,
                    "seating capacity refreshed"
                );
                entry.seating_capacity = live;
            }
        }

        let stale: Vec<ConflictId> = conflicts
            .values()
            .filter(|c| !c.is_resolved)
            .map(|c| c.id)
            .collect();

        let next_conflict = &self.next_conflict;
        conflict::rescan(
            timetable.id,
            entries,
            conflicts,
            || next_conflict.fetch_add(1, Ordering::Relaxed) + 1,
            now,
        );

        {
            let mut index = self.conflict_index.write();
            for id in &stale {
                index.remove(id);
            }
            for c in conflicts.values().filter(|c| !c.is_resolved) {
                index.insert(c.id, timetable.id);
            }
        }

        stats::refresh_counters(timetable, entries.len(), conflicts.values());
        timetable.updated_at = now;
    }

    /// Room capacities are owned by the directory and may change between
    /// calls.  Readers re-run [`refresh`](Self::refresh) when any stored
    /// seating capacity no longer matches the live one.
    fn refresh_if_stale(&self, shard: &mut Shard) {
        let stale = shard.entries.values().any(|e| {
            validate::live_capacity(self.directory.as_ref(), &e.room_ids) != e.seating_capacity
        });
        if stale {
            debug!(timetable = shard.timetable.id, "room capacities changed, rescanning");
            self.refresh(shard);
        }
    }

    // ── Timetable CRUD ────────────────────────────────────────────────────────

    pub fn create_timetable(&self, draft: TimetableDraft) -> EngineResult<Timetable> {
        if draft.title.trim().is_empty() {
            return Err(ValidationReason::EmptyField { field: "title" }.into());
        }
        if draft.start_date > draft.end_date {
            return Err(ValidationReason::InvalidDateRange {
                start: draft.start_date,
                end: draft.end_date,
            }
            .into());
        }
        let scope = &draft.scope;
        if !self.directory.academic_scope_exists(
            scope.academic_year_id,
            scope.semester_id,
            scope.academic_period_id,
        ) {
            return Err(EngineError::not_found(
                Resource::AcademicPeriod,
                scope.academic_period_id.unwrap_or(scope.semester_id),
            ));
        }
        let default_exam_duration = draft
            .default_exam_duration
            .unwrap_or(self.settings.default_exam_duration);
        if default_exam_duration == 0 {
            return Err(ValidationReason::ZeroDuration.into());
        }

        let id = self.next_timetable.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let timetable = Timetable {
            id,
            scope: draft.scope,
            title: draft.title.trim().to_string(),
            description: draft.description,
            start_date: draft.start_date,
            end_date: draft.end_date,
            status: TimetableStatus::Draft,
            approval_status: ApprovalStatus::Pending,
            allow_overlaps: draft.allow_overlaps,
            auto_resolve_conflicts: draft.auto_resolve_conflicts,
            default_exam_duration,
            total_exams: 0,
            total_conflicts: 0,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
            approved_by: None,
            approved_at: None,
            published_by: None,
            published_at: None,
            rejection_reason: None,
        };

        self.shards.write().insert(
            id,
            Arc::new(Mutex::new(Shard {
                timetable: timetable.clone(),
                entries: BTreeMap::new(),
                conflicts: BTreeMap::new(),
                removed: false,
            })),
        );

        info!(
            timetable = id,
            title = %timetable.title,
            start = %timetable.start_date,
            end = %timetable.end_date,
            "timetable created"
        );
        Ok(timetable)
    }

    pub fn update_timetable(&self, id: TimetableId, patch: TimetablePatch) -> EngineResult<Timetable> {
        self.with_shard(id, |shard| {
            lifecycle::ensure_editable(&shard.timetable, "update timetable")?;

            let mut next = shard.timetable.clone();
            if let Some(title) = patch.title {
                let title = title.trim();
                if title.is_empty() {
                    return Err(ValidationReason::EmptyField { field: "title" }.into());
                }
                next.title = title.to_string();
            }
            if let Some(description) = patch.description {
                next.description = description;
            }
            if let Some(start) = patch.start_date {
                next.start_date = start;
            }
            if let Some(end) = patch.end_date {
                next.end_date = end;
            }
            if next.start_date > next.end_date {
                return Err(ValidationReason::InvalidDateRange {
                    start: next.start_date,
                    end: next.end_date,
                }
                .into());
            }
            let stranded = shard
                .entries
                .values()
                .filter(|e| !next.covers(e.exam_date))
                .count();
            if stranded > 0 {
                return Err(ValidationReason::RangeExcludesEntries { count: stranded }.into());
            }
            if let Some(flag) = patch.allow_overlaps {
                next.allow_overlaps = flag;
            }
            if let Some(flag) = patch.auto_resolve_conflicts {
                next.auto_resolve_conflicts = flag;
            }
            if let Some(minutes) = patch.default_exam_duration {
                if minutes == 0 {
                    return Err(ValidationReason::ZeroDuration.into());
                }
                next.default_exam_duration = minutes;
            }
            next.updated_at = Utc::now();

            shard.timetable = next;
            info!(timetable = id, "timetable updated");
            Ok(shard.timetable.clone())
        })
    }

    /// Only an empty draft can be deleted.  Its resolved conflict history goes
    /// with it.
    pub fn delete_timetable(&self, id: TimetableId) -> EngineResult<()> {
        self.with_shard(id, |shard| {
            lifecycle::ensure_deletable(&shard.timetable, shard.entries.len())?;
            shard.removed = true;

            {
                let mut index = self.conflict_index.write();
                for cid in shard.conflicts.keys() {
                    index.remove(cid);
                }
            }
            self.shards.write().remove(&id);

            info!(timetable = id, "timetable deleted");
            Ok(())
        })
    }

    pub fn get_timetable(&self, id: TimetableId) -> EngineResult<Timetable> {
        self.with_shard(id, |shard| {
            self.refresh_if_stale(shard);
            Ok(shard.timetable.clone())
        })
    }

    /// All timetables in id order.
    pub fn list_timetables(&self) -> Vec<Timetable> {
        let shards: Vec<Arc<Mutex<Shard>>> = self.shards.read().values().cloned().collect();
        let mut list: Vec<Timetable> = shards
            .iter()
            .filter_map(|s| {
                let mut guard = s.lock();
                if guard.removed {
                    return None;
                }
                self.refresh_if_stale(&mut guard);
                Some(guard.timetable.clone())
            })
            .collect();
        list.sort_by_key(|t| t.id);
        list
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    pub fn submit_for_approval(&self, id: TimetableId) -> EngineResult<Timetable> {
        self.with_shard(id, |shard| {
            lifecycle::submit(&mut shard.timetable, shard.entries.len(), Utc::now())?;
            Ok(shard.timetable.clone())
        })
    }

    pub fn approve_timetable(&self, id: TimetableId, approver: UserId) -> EngineResult<Timetable> {
        self.with_shard(id, |shard| {
            lifecycle::approve(&mut shard.timetable, approver, Utc::now())?;
            Ok(shard.timetable.clone())
        })
    }

    pub fn reject_timetable(&self, id: TimetableId, reason: &str) -> EngineResult<Timetable> {
        self.with_shard(id, |shard| {
            lifecycle::reject(&mut shard.timetable, reason, Utc::now())?;
            Ok(shard.timetable.clone())
        })
    }

    /// Fails while any unresolved conflict is at or above the configured
    /// blocking severity.  Conflicts are recomputed against live room data
    /// first, so a capacity cut since the last edit is caught here.
    pub fn publish_timetable(&self, id: TimetableId, publisher: UserId) -> EngineResult<Timetable> {
        let threshold = self.settings.publish_blocking_severity;
        self.with_shard(id, |shard| {
            self.refresh(shard);
            let blocking = conflict::blocking_count(shard.conflicts.values(), threshold);
            if blocking > 0 {
                warn!(timetable = id, blocking = blocking, "publish blocked by conflicts");
            }
            lifecycle::publish(&mut shard.timetable, publisher, blocking, threshold, Utc::now())?;
            Ok(shard.timetable.clone())
        })
    }

    pub fn complete_timetable(&self, id: TimetableId) -> EngineResult<Timetable> {
        self.with_shard(id, |shard| {
            lifecycle::complete(&mut shard.timetable, Utc::now())?;
            Ok(shard.timetable.clone())
        })
    }

    pub fn archive_timetable(&self, id: TimetableId) -> EngineResult<Timetable> {
        self.with_shard(id, |shard| {
            lifecycle::archive(&mut shard.timetable, Utc::now())?;
            Ok(shard.timetable.clone())
        })
    }

    // ── Entries ───────────────────────────────────────────────────────────────

    pub fn create_entry(&self, timetable_id: TimetableId, draft: EntryDraft) -> EngineResult<Entry> {
        self.with_shard(timetable_id, |shard| {
            let entry = store::build_entry(
                self.directory.as_ref(),
                &shard.timetable,
                draft,
                Utc::now(),
                || self.next_entry.fetch_add(1, Ordering::Relaxed) + 1,
            )?;
            let id = entry.id;

            shard.entries.insert(id, entry);
            self.entry_index.write().insert(id, timetable_id);
            self.refresh(shard);

            info!(timetable = timetable_id, entry = id, "entry created");
            Ok(shard.entries[&id].clone())
        })
    }

    /// Apply `patch`.  With an `actor`, every field group the patch actually
    /// changes must be allowed by the actor's resolved permissions.
    pub fn update_entry(
        &self,
        id: EntryId,
        patch: EntryPatch,
        actor: Option<Actor>,
    ) -> EngineResult<Entry> {
        self.with_entry_shard(id, |shard| {
            lifecycle::ensure_editable(&shard.timetable, "update entry")?;
            let current = &shard.entries[&id];

            if let Some(actor) = actor {
                let perms = permission::resolve(
                    self.directory.as_ref(),
                    actor,
                    &shard.timetable,
                    current,
                );
                for group in store::touched_groups(current, &patch) {
                    if !perms.allows(group) {
                        warn!(entry = id, actor = actor.id, field = %group, "permission denied");
                        return Err(EngineError::PermissionDenied {
                            actor: actor.id,
                            field: group,
                        });
                    }
                }
            }

            let next = store::apply_patch(
                self.directory.as_ref(),
                &shard.timetable,
                current,
                patch,
                Utc::now(),
            )?;
            shard.entries.insert(id, next);
            self.refresh(shard);

            info!(timetable = shard.timetable.id, entry = id, "entry updated");
            Ok(shard.entries[&id].clone())
        })
    }

    pub fn delete_entry(&self, id: EntryId, actor: Option<Actor>) -> EngineResult<()> {
        self.with_entry_shard(id, |shard| {
            lifecycle::ensure_editable(&shard.timetable, "delete entry")?;

            if let Some(actor) = actor {
                let perms = permission::resolve(
                    self.directory.as_ref(),
                    actor,
                    &shard.timetable,
                    &shard.entries[&id],
                );
                if !perms.allows(FieldGroup::Delete) {
                    warn!(entry = id, actor = actor.id, "delete denied");
                    return Err(EngineError::PermissionDenied {
                        actor: actor.id,
                        field: FieldGroup::Delete,
                    });
                }
            }

            shard.entries.remove(&id);
            self.entry_index.write().remove(&id);
            self.refresh(shard);

            info!(timetable = shard.timetable.id, entry = id, "entry deleted");
            Ok(())
        })
    }

    pub fn get_entry(&self, id: EntryId) -> EngineResult<Entry> {
        self.with_entry_shard(id, |shard| {
            self.refresh_if_stale(shard);
            Ok(shard.entries[&id].clone())
        })
    }

    /// Entries ordered by `(exam_date, start_time, id)`.
    pub fn list_entries(&self, timetable_id: TimetableId) -> EngineResult<Vec<Entry>> {
        self.with_shard(timetable_id, |shard| {
            self.refresh_if_stale(shard);
            let mut list: Vec<Entry> = shard.entries.values().cloned().collect();
            list.sort_by_key(|e| (e.exam_date, e.start_time, e.id));
            Ok(list)
        })
    }

    // ── Conflicts ─────────────────────────────────────────────────────────────

    /// Recompute the timetable's conflicts and return the new unresolved set
    /// in display order.
    pub fn detect_conflicts(&self, timetable_id: TimetableId) -> EngineResult<Vec<Conflict>> {
        self.with_shard(timetable_id, |shard| {
            self.refresh(shard);
            Ok(conflict::sorted_for_display(
                shard.conflicts.values().filter(|c| !c.is_resolved),
            ))
        })
    }

    /// Every conflict of the timetable, resolved history included, in display
    /// order.
    pub fn get_timetable_conflicts(&self, timetable_id: TimetableId) -> EngineResult<Vec<Conflict>> {
        self.with_shard(timetable_id, |shard| {
            self.refresh_if_stale(shard);
            Ok(conflict::sorted_for_display(shard.conflicts.values()))
        })
    }

    /// Mark a conflict resolved.  Resolving an already-resolved conflict
    /// returns it unchanged.
    pub fn resolve_conflict(&self, id: ConflictId, resolved_by: UserId) -> EngineResult<Conflict> {
        let timetable_id = self
            .conflict_index
            .read()
            .get(&id)
            .copied()
            .ok_or_else(|| EngineError::not_found(Resource::Conflict, id))?;

        self.with_shard(timetable_id, |shard| {
            let conflict = shard
                .conflicts
                .get_mut(&id)
                .ok_or_else(|| EngineError::not_found(Resource::Conflict, id))?;

            if !conflict.is_resolved {
                conflict.is_resolved = true;
                conflict.resolved_by = Some(resolved_by);
                conflict.resolved_at = Some(Utc::now());
                info!(
                    timetable = timetable_id,
                    conflict = id,
                    resolved_by = resolved_by,
                    "conflict resolved"
                );
            }
            let resolved = conflict.clone();

            stats::refresh_counters(
                &mut shard.timetable,
                shard.entries.len(),
                shard.conflicts.values(),
            );
            Ok(resolved)
        })
    }

    // ── Permissions & statistics ──────────────────────────────────────────────

    /// Resolved fresh on every call; see [`permission`].
    pub fn get_modification_permissions(
        &self,
        actor_id: UserId,
        actor_role: Role,
        entry_id: EntryId,
    ) -> EngineResult<ModificationPermissions> {
        self.with_entry_shard(entry_id, |shard| {
            Ok(permission::resolve(
                self.directory.as_ref(),
                Actor::new(actor_id, actor_role),
                &shard.timetable,
                &shard.entries[&entry_id],
            ))
        })
    }

    pub fn get_timetable_statistics(&self, timetable_id: TimetableId) -> EngineResult<TimetableStatistics> {
        let threshold = self.settings.publish_blocking_severity;
        self.with_shard(timetable_id, |shard| {
            self.refresh_if_stale(shard);
            Ok(stats::aggregate(
                timetable_id,
                shard.entries.values(),
                shard.conflicts.values(),
                threshold,
            ))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{ActorScope, CatalogDirectory};
    use crate::error::StateReason;
    use crate::ids::IdSet;
    use crate::model::{AcademicScope, ConflictKind, ConflictSubject, EntryStatus, Severity};
    use crate::permission::PermissionScope;
    use chrono::{NaiveDate, NaiveTime};

    // ── Fixture ───────────────────────────────────────────────────────────────
    //
    // Faculty 3 owns department 10 (course 100 "X") and department 11
    // (course 101 "Y").  Venue 1 has rooms 11 (40 seats) and 12 (60 seats);
    // venue 2 has room 21 (30 seats).
    //
    // Users: 1 exams officer, 2 HOD of dept 10, 3 dean of faculty 3,
    //        4 dean of faculty 4, 5 lecturer.

    const HOD: UserId = 2;
    const DEAN: UserId = 3;
    const OTHER_DEAN: UserId = 4;

    fn directory() -> Arc<CatalogDirectory> {
        let dir = CatalogDirectory::new();
        dir.add_course(100, "X", 10);
        dir.add_course(101, "Y", 11);
        for p in 1..=3 {
            dir.add_program(p);
        }
        dir.add_room(11, 1, 40);
        dir.add_room(12, 1, 60);
        dir.add_room(21, 2, 30);
        dir.assign_actor(1, ActorScope::default());
        dir.assign_actor(
            HOD,
            ActorScope {
                faculty_id: Some(3),
                department_id: Some(10),
            },
        );
        dir.assign_actor(
            DEAN,
            ActorScope {
                faculty_id: Some(3),
                department_id: None,
            },
        );
        dir.assign_actor(
            OTHER_DEAN,
            ActorScope {
                faculty_id: Some(4),
                department_id: None,
            },
        );
        dir.assign_actor(5, ActorScope::default());
        dir.add_academic_year(2025, [1, 2], [1]);
        Arc::new(dir)
    }

    fn engine_with(dir: Arc<CatalogDirectory>) -> TimetableEngine {
        TimetableEngine::new(dir, EngineSettings::default())
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn time(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn timetable_draft() -> TimetableDraft {
        TimetableDraft {
            scope: AcademicScope {
                institution_id: 1,
                faculty_id: Some(3),
                academic_year_id: 2025,
                semester_id: 1,
                academic_period_id: Some(1),
            },
            title: "May examinations".to_string(),
            description: None,
            start_date: date(1),
            end_date: date(10),
            allow_overlaps: false,
            auto_resolve_conflicts: false,
            default_exam_duration: None,
            created_by: 1,
        }
    }

    fn entry_draft(course: u32, room: u32, programs: &[u32]) -> EntryDraft {
        EntryDraft {
            course_id: course,
            program_ids: programs.iter().copied().collect(),
            level: None,
            exam_date: date(2),
            start_time: time(9),
            end_time: time(11),
            duration: None,
            venue_id: 1,
            room_ids: IdSet::from([room]),
            invigilator_ids: IdSet::new(),
            chief_invigilator_id: None,
            student_count: None,
            status: EntryStatus::Scheduled,
            notes: None,
            special_requirements: None,
        }
    }

    fn unresolved(conflicts: &[Conflict]) -> Vec<(ConflictKind, Severity, ConflictSubject)> {
        conflicts
            .iter()
            .filter(|c| !c.is_resolved)
            .map(|c| (c.kind, c.severity, c.subject))
            .collect()
    }

    /// Drive a timetable with the given entries to `Approved`.
    fn approved(engine: &TimetableEngine, drafts: Vec<EntryDraft>) -> (TimetableId, Vec<EntryId>) {
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let ids = drafts
            .into_iter()
            .map(|d| engine.create_entry(t.id, d).unwrap().id)
            .collect();
        engine.submit_for_approval(t.id).unwrap();
        engine.approve_timetable(t.id, 1).unwrap();
        (t.id, ids)
    }

    // ── Timetable CRUD ────────────────────────────────────────────────────────

    #[test]
    fn create_timetable_applies_defaults() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        assert_eq!(t.status, TimetableStatus::Draft);
        assert_eq!(t.approval_status, ApprovalStatus::Pending);
        assert_eq!(t.default_exam_duration, 120);
        assert_eq!(engine.get_timetable(t.id).unwrap().title, "May examinations");
    }

    #[test]
    fn create_timetable_validates_range_and_calendar() {
        let engine = engine_with(directory());

        let mut d = timetable_draft();
        d.start_date = date(11);
        assert!(matches!(
            engine.create_timetable(d),
            Err(EngineError::Validation(ValidationReason::InvalidDateRange { .. }))
        ));

        let mut d = timetable_draft();
        d.scope.semester_id = 9;
        assert!(matches!(
            engine.create_timetable(d),
            Err(EngineError::NotFound {
                resource: Resource::AcademicPeriod,
                ..
            })
        ));
    }

    #[test]
    fn update_timetable_range_cannot_strand_entries() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();

        let narrow = TimetablePatch {
            start_date: Some(date(3)),
            ..Default::default()
        };
        assert!(matches!(
            engine.update_timetable(t.id, narrow),
            Err(EngineError::Validation(ValidationReason::RangeExcludesEntries { count: 1 }))
        ));

        let widen = TimetablePatch {
            end_date: Some(date(20)),
            title: Some("Extended".to_string()),
            ..Default::default()
        };
        let updated = engine.update_timetable(t.id, widen).unwrap();
        assert_eq!(updated.end_date, date(20));
        assert_eq!(updated.title, "Extended");
    }

    #[test]
    fn delete_only_empty_draft() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();

        assert!(matches!(
            engine.delete_timetable(t.id),
            Err(EngineError::ImmutableState { .. })
        ));

        engine.delete_entry(e.id, None).unwrap();
        engine.delete_timetable(t.id).unwrap();
        assert!(matches!(
            engine.get_timetable(t.id),
            Err(EngineError::NotFound {
                resource: Resource::Timetable,
                ..
            })
        ));
        assert!(engine.list_timetables().is_empty());
    }

    // ── Conflict scenario ─────────────────────────────────────────────────────

    #[test]
    fn venue_then_student_overlap_scenario() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();

        let a = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        let b = engine.create_entry(t.id, entry_draft(101, 11, &[2])).unwrap();

        let first = engine.detect_conflicts(t.id).unwrap();
        assert_eq!(
            unresolved(&first),
            vec![(
                ConflictKind::VenueOverlap,
                Severity::High,
                ConflictSubject::pair(a.id, b.id)
            )]
        );

        let c = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        let second = engine.detect_conflicts(t.id).unwrap();
        let kinds = unresolved(&second);

        assert!(kinds.contains(&(
            ConflictKind::VenueOverlap,
            Severity::High,
            ConflictSubject::pair(a.id, b.id)
        )));
        assert!(kinds.contains(&(
            ConflictKind::StudentOverlap,
            Severity::Critical,
            ConflictSubject::pair(a.id, c.id)
        )));
        // Critical sorts first.
        assert_eq!(second[0].kind, ConflictKind::StudentOverlap);
        assert_eq!(second[0].affected_programs, Some(IdSet::from([1])));
        // No student overlap between programs {1} and {2}.
        assert!(!kinds.contains(&(
            ConflictKind::StudentOverlap,
            Severity::Critical,
            ConflictSubject::pair(a.id, b.id)
        )));

        let tt = engine.get_timetable(t.id).unwrap();
        assert_eq!(tt.total_exams, 3);
        assert_eq!(tt.total_conflicts, second.len());
        assert!(engine.get_entry(a.id).unwrap().has_conflicts);
    }

    #[test]
    fn detect_twice_yields_same_content() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        engine.create_entry(t.id, entry_draft(101, 11, &[1])).unwrap();

        let strip = |v: Vec<Conflict>| {
            let mut v: Vec<_> = v
                .into_iter()
                .map(|c| (c.kind, c.severity, c.subject, c.description))
                .collect();
            v.sort_by(|a, b| a.3.cmp(&b.3));
            v
        };
        let first = strip(engine.detect_conflicts(t.id).unwrap());
        let second = strip(engine.detect_conflicts(t.id).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn deleting_an_entry_removes_its_conflicts() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let a = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        let b = engine.create_entry(t.id, entry_draft(101, 11, &[2])).unwrap();
        assert_eq!(engine.get_timetable(t.id).unwrap().total_conflicts, 1);

        engine.delete_entry(b.id, None).unwrap();

        assert!(engine.get_timetable_conflicts(t.id).unwrap().is_empty());
        assert_eq!(engine.get_timetable(t.id).unwrap().total_conflicts, 0);
        assert!(!engine.get_entry(a.id).unwrap().has_conflicts);
        assert!(matches!(
            engine.get_entry(b.id),
            Err(EngineError::NotFound {
                resource: Resource::Entry,
                ..
            })
        ));
    }

    #[test]
    fn capacity_follows_live_room_capacity() {
        let dir = directory();
        let engine = engine_with(Arc::clone(&dir));
        let t = engine.create_timetable(timetable_draft()).unwrap();

        let mut d = entry_draft(100, 11, &[1]);
        d.student_count = Some(35);
        let e = engine.create_entry(t.id, d).unwrap();
        assert_eq!(e.seating_capacity, 40);
        assert!(engine.detect_conflicts(t.id).unwrap().is_empty());

        dir.set_room_capacity(11, 30);
        let conflicts = engine.detect_conflicts(t.id).unwrap();
        assert_eq!(
            unresolved(&conflicts),
            vec![(
                ConflictKind::CapacityExceeded,
                Severity::High,
                ConflictSubject::Single(e.id)
            )]
        );
        assert_eq!(engine.get_entry(e.id).unwrap().seating_capacity, 30);
    }

    #[test]
    fn resolve_conflict_updates_counter_and_is_idempotent() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        engine.create_entry(t.id, entry_draft(101, 11, &[2])).unwrap();

        let conflict = engine.get_timetable_conflicts(t.id).unwrap().remove(0);
        let resolved = engine.resolve_conflict(conflict.id, 9).unwrap();
        assert!(resolved.is_resolved);
        assert_eq!(resolved.resolved_by, Some(9));
        assert_eq!(engine.get_timetable(t.id).unwrap().total_conflicts, 0);

        let again = engine.resolve_conflict(conflict.id, 10).unwrap();
        assert_eq!(again.resolved_by, Some(9));

        // Resolved history sorts after any unresolved conflict.
        let list = engine.detect_conflicts(t.id).unwrap();
        assert_eq!(list.len(), 1, "condition still holds, so it is detected again");
        let all = engine.get_timetable_conflicts(t.id).unwrap();
        assert_eq!(all.len(), 2);
        assert!(!all[0].is_resolved);
        assert!(all[1].is_resolved);

        assert!(matches!(
            engine.resolve_conflict(9_999, 1),
            Err(EngineError::NotFound {
                resource: Resource::Conflict,
                ..
            })
        ));
    }

    // ── Lifecycle gates ───────────────────────────────────────────────────────

    #[test]
    fn submit_empty_timetable_fails() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        assert!(matches!(
            engine.submit_for_approval(t.id),
            Err(EngineError::ConflictState {
                reason: StateReason::EmptyTimetable,
                ..
            })
        ));
    }

    #[test]
    fn publish_blocked_until_high_conflicts_resolved() {
        let engine = engine_with(directory());
        let (tid, _) = approved(
            &engine,
            vec![entry_draft(100, 11, &[1]), entry_draft(101, 11, &[2])],
        );

        assert!(matches!(
            engine.publish_timetable(tid, 1),
            Err(EngineError::ConflictState {
                reason: StateReason::BlockingConflicts { count: 1, .. },
                ..
            })
        ));

        for c in engine.get_timetable_conflicts(tid).unwrap() {
            engine.resolve_conflict(c.id, 1).unwrap();
        }
        let t = engine.publish_timetable(tid, 7).unwrap();
        assert_eq!(t.status, TimetableStatus::Published);
        assert!(t.is_published());
        assert_eq!(t.published_by, Some(7));
    }

    #[test]
    fn medium_conflicts_do_not_block_publish() {
        let engine = engine_with(directory());
        let mut a = entry_draft(100, 11, &[1]);
        let mut b = entry_draft(101, 12, &[2]);
        a.invigilator_ids = IdSet::from([50]);
        b.invigilator_ids = IdSet::from([50]);
        let (tid, _) = approved(&engine, vec![a, b]);

        assert_eq!(engine.get_timetable(tid).unwrap().total_conflicts, 1);
        assert!(engine.publish_timetable(tid, 1).is_ok());
    }

    #[test]
    fn shared_chief_invigilator_does_not_block_publish() {
        let engine = engine_with(directory());
        let mut a = entry_draft(100, 11, &[1]);
        let mut b = entry_draft(101, 21, &[2]);
        b.venue_id = 2;
        a.chief_invigilator_id = Some(60);
        b.chief_invigilator_id = Some(60);
        let (tid, _) = approved(&engine, vec![a, b]);

        let conflicts = engine.get_timetable_conflicts(tid).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::InvigilatorOverlap);
        assert_eq!(conflicts[0].severity, Severity::Medium);

        let t = engine.publish_timetable(tid, 1).unwrap();
        assert_eq!(t.status, TimetableStatus::Published);
    }

    #[test]
    fn capacity_cut_after_approval_blocks_publish() {
        let dir = directory();
        let engine = engine_with(Arc::clone(&dir));
        let mut d = entry_draft(100, 11, &[1]);
        d.student_count = Some(35);
        let (tid, ids) = approved(&engine, vec![d]);

        dir.set_room_capacity(11, 10);

        assert!(matches!(
            engine.publish_timetable(tid, 1),
            Err(EngineError::ConflictState {
                reason: StateReason::BlockingConflicts { count: 1, .. },
                ..
            })
        ));
        assert_eq!(engine.get_entry(ids[0]).unwrap().seating_capacity, 10);
        assert_eq!(
            engine.get_timetable(tid).unwrap().status,
            TimetableStatus::Approved
        );
    }

    #[test]
    fn reads_reflect_live_room_capacity() {
        let dir = directory();
        let engine = engine_with(Arc::clone(&dir));
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let mut d = entry_draft(100, 11, &[1]);
        d.room_ids = IdSet::from([11, 12]);
        d.student_count = Some(50);
        let e = engine.create_entry(t.id, d).unwrap();
        assert_eq!(e.seating_capacity, 100);

        assert!(dir.remove_room(12));

        let listed = engine.list_entries(t.id).unwrap();
        assert_eq!(listed[0].seating_capacity, 40);
        assert!(listed[0].has_conflicts);

        let stats = engine.get_timetable_statistics(t.id).unwrap();
        assert_eq!(stats.total_seats, 40);
        assert_eq!(
            stats.conflicts_by_kind[&ConflictKind::CapacityExceeded].unresolved,
            1
        );
        assert_eq!(engine.get_timetable(t.id).unwrap().total_conflicts, 1);
    }

    #[test]
    fn rejected_create_does_not_consume_an_id() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let first = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();

        assert!(engine.create_entry(t.id, entry_draft(999, 11, &[1])).is_err());
        let mut outside = entry_draft(100, 12, &[2]);
        outside.exam_date = date(30);
        assert!(engine.create_entry(t.id, outside).is_err());

        let second = engine.create_entry(t.id, entry_draft(101, 12, &[2])).unwrap();
        assert_eq!(second.id, first.id + 1);
    }

    #[test]
    fn publish_without_approval_fails() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        engine.submit_for_approval(t.id).unwrap();
        assert!(matches!(
            engine.publish_timetable(t.id, 1),
            Err(EngineError::ConflictState {
                reason: StateReason::NotApproved,
                ..
            })
        ));
    }

    #[test]
    fn entries_immutable_after_publish() {
        let engine = engine_with(directory());
        let (tid, ids) = approved(&engine, vec![entry_draft(100, 11, &[1])]);
        engine.publish_timetable(tid, 1).unwrap();

        let patch = EntryPatch {
            notes: Some(Some("late".to_string())),
            ..Default::default()
        };
        assert!(matches!(
            engine.update_entry(ids[0], patch, None),
            Err(EngineError::ImmutableState { .. })
        ));
        assert!(matches!(
            engine.delete_entry(ids[0], None),
            Err(EngineError::ImmutableState { .. })
        ));
        assert!(matches!(
            engine.create_entry(tid, entry_draft(101, 12, &[2])),
            Err(EngineError::ImmutableState { .. })
        ));

        engine.complete_timetable(tid).unwrap();
        assert!(matches!(
            engine.delete_entry(ids[0], None),
            Err(EngineError::ImmutableState { .. })
        ));
        engine.archive_timetable(tid).unwrap();
        assert!(matches!(
            engine.update_entry(ids[0], EntryPatch::default(), None),
            Err(EngineError::ImmutableState { .. })
        ));
    }

    #[test]
    fn rejection_returns_to_draft_and_allows_edits() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        engine.submit_for_approval(t.id).unwrap();
        let rejected = engine.reject_timetable(t.id, "move to week 2").unwrap();
        assert_eq!(rejected.status, TimetableStatus::Draft);
        assert_eq!(rejected.approval_status, ApprovalStatus::Rejected);

        let patch = EntryPatch {
            exam_date: Some(date(8)),
            ..Default::default()
        };
        assert_eq!(engine.update_entry(e.id, patch, None).unwrap().exam_date, date(8));
    }

    // ── Permissions ───────────────────────────────────────────────────────────

    #[test]
    fn hod_may_move_venue_but_not_date() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        let hod = Actor::new(HOD, Role::HeadOfDepartment);

        let move_venue = EntryPatch {
            venue_id: Some(2),
            room_ids: Some(IdSet::from([21])),
            ..Default::default()
        };
        let moved = engine.update_entry(e.id, move_venue, Some(hod)).unwrap();
        assert_eq!(moved.venue_id, 2);
        assert_eq!(moved.seating_capacity, 30);

        let move_date = EntryPatch {
            exam_date: Some(date(3)),
            ..Default::default()
        };
        assert!(matches!(
            engine.update_entry(e.id, move_date, Some(hod)),
            Err(EngineError::PermissionDenied {
                actor: HOD,
                field: FieldGroup::Date
            })
        ));
        assert_eq!(engine.get_entry(e.id).unwrap().exam_date, date(2));

        assert!(matches!(
            engine.delete_entry(e.id, Some(hod)),
            Err(EngineError::PermissionDenied {
                field: FieldGroup::Delete,
                ..
            })
        ));
    }

    #[test]
    fn hod_of_other_department_has_no_scope() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(101, 11, &[1])).unwrap();

        let perms = engine
            .get_modification_permissions(HOD, Role::HeadOfDepartment, e.id)
            .unwrap();
        assert_eq!(perms.scope, PermissionScope::None);
        assert!(!perms.can_modify_venue);
    }

    #[test]
    fn dean_scope_follows_timetable_faculty() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(101, 11, &[1])).unwrap();

        let own = engine.get_modification_permissions(DEAN, Role::Dean, e.id).unwrap();
        assert_eq!(own.scope, PermissionScope::Faculty);
        assert!(own.can_modify_invigilators);
        assert!(!own.can_modify_time);

        let other = engine
            .get_modification_permissions(OTHER_DEAN, Role::Dean, e.id)
            .unwrap();
        assert_eq!(other.scope, PermissionScope::None);
    }

    #[test]
    fn exams_officer_may_do_everything() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();
        let officer = Actor::new(1, Role::ExamsOfficer);

        let patch = EntryPatch {
            exam_date: Some(date(4)),
            start_time: Some(time(13)),
            end_time: Some(time(16)),
            course_id: Some(101),
            ..Default::default()
        };
        let updated = engine.update_entry(e.id, patch, Some(officer)).unwrap();
        assert_eq!(updated.duration, 180);
        engine.delete_entry(e.id, Some(officer)).unwrap();
    }

    #[test]
    fn permission_follows_scope_reassignment() {
        let dir = directory();
        let engine = engine_with(Arc::clone(&dir));
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(101, 11, &[1])).unwrap();

        let before = engine
            .get_modification_permissions(HOD, Role::HeadOfDepartment, e.id)
            .unwrap();
        assert_eq!(before.scope, PermissionScope::None);

        dir.assign_actor(
            HOD,
            ActorScope {
                faculty_id: Some(3),
                department_id: Some(11),
            },
        );
        let after = engine
            .get_modification_permissions(HOD, Role::HeadOfDepartment, e.id)
            .unwrap();
        assert_eq!(after.scope, PermissionScope::Department);
    }

    #[test]
    fn lecturer_cannot_touch_details() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();

        let patch = EntryPatch {
            student_count: Some(Some(10)),
            ..Default::default()
        };
        assert!(matches!(
            engine.update_entry(e.id, patch, Some(Actor::new(5, Role::Lecturer))),
            Err(EngineError::PermissionDenied {
                field: FieldGroup::Details,
                ..
            })
        ));
    }

    // ── Atomicity & concurrency ───────────────────────────────────────────────

    #[test]
    fn failed_update_leaves_entry_untouched() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let e = engine.create_entry(t.id, entry_draft(100, 11, &[1])).unwrap();

        let bad = EntryPatch {
            room_ids: Some(IdSet::from([12])),
            end_time: Some(time(8)),
            ..Default::default()
        };
        assert!(engine.update_entry(e.id, bad, None).is_err());

        let stored = engine.get_entry(e.id).unwrap();
        assert_eq!(stored.room_ids, IdSet::from([11]));
        assert_eq!(stored.end_time, time(11));
        assert_eq!(stored.seating_capacity, 40);
    }

    #[test]
    fn concurrent_writers_leave_consistent_conflict_set() {
        let engine = Arc::new(engine_with(directory()));
        let t1 = engine.create_timetable(timetable_draft()).unwrap().id;
        let t2 = engine.create_timetable(timetable_draft()).unwrap().id;

        std::thread::scope(|s| {
            for n in 0..8u32 {
                let engine = Arc::clone(&engine);
                s.spawn(move || {
                    let tid = if n % 2 == 0 { t1 } else { t2 };
                    // All in room 11, same slot, distinct programs cycling 1..=3.
                    let program = n % 3 + 1;
                    engine
                        .create_entry(tid, entry_draft(100, 11, &[program]))
                        .unwrap();
                });
            }
        });

        for tid in [t1, t2] {
            let stored: Vec<_> = engine.get_timetable_conflicts(tid).unwrap();
            let fresh = engine.detect_conflicts(tid).unwrap();
            let key = |v: &[Conflict]| {
                let mut k: Vec<_> = v.iter().map(|c| (c.kind, c.subject)).collect();
                k.sort_by_key(|(kind, subject)| (*kind, subject.entry1(), subject.entry2()));
                k
            };
            assert_eq!(key(&stored[..]), key(&fresh[..]));

            let t = engine.get_timetable(tid).unwrap();
            assert_eq!(t.total_exams, 4);
            // 4 entries sharing a room → 6 venue overlaps, at least.
            assert!(t.total_conflicts >= 6);
            assert_eq!(t.total_conflicts, fresh.len());
        }
    }

    // ── Statistics ────────────────────────────────────────────────────────────

    #[test]
    fn statistics_reflect_entries_and_conflicts() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let mut a = entry_draft(100, 11, &[1]);
        a.student_count = Some(30);
        let mut b = entry_draft(101, 11, &[2]);
        b.student_count = Some(20);
        b.exam_date = date(3);
        engine.create_entry(t.id, a).unwrap();
        engine.create_entry(t.id, b).unwrap();

        let stats = engine.get_timetable_statistics(t.id).unwrap();
        assert_eq!(stats.total_exams, 2);
        assert_eq!(stats.unique_dates, 2);
        assert_eq!(stats.unique_courses, 2);
        assert_eq!(stats.unique_venues, 1);
        assert_eq!(stats.average_exams_per_day, 1.0);
        assert_eq!(stats.total_seats, 80);
        assert_eq!(stats.total_students, 50);
        assert_eq!(stats.unresolved_conflicts, 0);
        assert!(stats.publishable);
    }

    #[test]
    fn listing_entries_is_chronological() {
        let engine = engine_with(directory());
        let t = engine.create_timetable(timetable_draft()).unwrap();
        let mut late = entry_draft(100, 11, &[1]);
        late.exam_date = date(5);
        let mut early = entry_draft(101, 12, &[2]);
        early.start_time = time(7);
        early.end_time = time(8);
        let late = engine.create_entry(t.id, late).unwrap();
        let early = engine.create_entry(t.id, early).unwrap();

        let order: Vec<_> = engine.list_entries(t.id).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(order, vec![early.id, late.id]);
    }
}
