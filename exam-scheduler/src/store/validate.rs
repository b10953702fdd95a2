/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Attribute validators shared by entry creation and update.

use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

use crate::directory::Directory;
use crate::error::{EngineError, EngineResult, Resource, ValidationReason};
use crate::ids::{CourseId, IdSet, VenueId};
use crate::model::Timetable;

/// Course must exist; programs must be non-empty and all exist.
pub fn check_course(dir: &dyn Directory, course: CourseId, programs: &IdSet) -> EngineResult<()> {
    if dir.course(course).is_none() {
        return Err(EngineError::not_found(Resource::Course, course));
    }
    if programs.is_empty() {
        return Err(ValidationReason::EmptySet { field: "program_ids" }.into());
    }
    if let Some(missing) = programs.iter().find(|&p| !dir.program_exists(p)) {
        return Err(EngineError::not_found(Resource::Program, missing));
    }
    Ok(())
}

/// Venue must exist; rooms must be non-empty, exist, and belong to the venue.
///
/// Returns the seating capacity of the room set.
pub fn check_placement(dir: &dyn Directory, venue: VenueId, rooms: &IdSet) -> EngineResult<u32> {
    if !dir.venue_exists(venue) {
        return Err(EngineError::not_found(Resource::Venue, venue));
    }
    if rooms.is_empty() {
        return Err(ValidationReason::EmptySet { field: "room_ids" }.into());
    }

    let mut capacity = 0u32;
    for room_id in rooms.iter() {
        let room = dir
            .room(room_id)
            .ok_or_else(|| EngineError::not_found(Resource::Room, room_id))?;
        if room.venue_id != venue {
            return Err(ValidationReason::RoomNotInVenue {
                room: room_id,
                venue,
            }
            .into());
        }
        capacity = capacity.saturating_add(room.capacity);
    }
    Ok(capacity)
}

/// Live seating capacity for an already-validated room set.
///
/// Rooms that have since disappeared from the directory contribute nothing.
pub fn live_capacity(dir: &dyn Directory, rooms: &IdSet) -> u32 {
    rooms
        .iter()
        .map(|room_id| match dir.room(room_id) {
            Some(room) => room.capacity,
            None => {
                warn!(room = room_id, "room no longer in directory, counting zero seats");
                0
            }
        })
        .fold(0u32, u32::saturating_add)
}

/// Date inside the timetable range, `end > start`, positive duration.
///
/// Returns the duration to store: the explicit one when given, otherwise
/// the length of the time window.
pub fn check_timing(
    timetable: &Timetable,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    duration: Option<u32>,
) -> EngineResult<u32> {
    if end <= start {
        return Err(ValidationReason::EndNotAfterStart.into());
    }
    if !timetable.covers(date) {
        return Err(ValidationReason::DateOutsideTimetable {
            date,
            start: timetable.start_date,
            end: timetable.end_date,
        }
        .into());
    }

    let minutes = match duration {
        Some(d) => d,
        // Partial minutes round up, so a valid window never derives zero.
        None => u32::try_from((end - start).num_seconds().saturating_add(59) / 60)
            .unwrap_or(u32::MAX)
            .max(1),
    };
    if minutes == 0 {
        return Err(ValidationReason::ZeroDuration.into());
    }
    Ok(minutes)
}
