//! Engine configuration loading and management.
//!
//! One YAML file carries both the engine settings and the directory catalog
//! the engine validates against:
//! ```yaml
//! engine:
//!   default_exam_duration_minutes: 120
//!   publish_blocking_severity: high
//! directory:
//!   courses:
//!     101: { code: "CSC101", department_id: 10 }
//!   programs: [1, 2]
//!   venues:
//!     1:
//!       rooms:
//!         11: { capacity: 40 }
//!   users:
//!     7: { faculty_id: 3, department_id: 10 }
//!   academic_years:
//!     2025: { semesters: [1, 2], periods: [1] }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::directory::{ActorScope, CatalogDirectory};
use crate::model::Severity;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineSection,
    #[serde(default)]
    directory: DirectorySection,
}

#[derive(Debug, Deserialize)]
struct EngineSection {
    #[serde(default = "default_exam_duration")]
    default_exam_duration_minutes: u32,
    #[serde(default = "default_blocking_severity")]
    publish_blocking_severity: Severity,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            default_exam_duration_minutes: default_exam_duration(),
            publish_blocking_severity: default_blocking_severity(),
        }
    }
}

fn default_exam_duration() -> u32 {
    120
}

fn default_blocking_severity() -> Severity {
    Severity::High
}

#[derive(Debug, Default, Deserialize)]
struct DirectorySection {
    #[serde(default)]
    courses: HashMap<u32, CourseEntry>,
    #[serde(default)]
    programs: Vec<u32>,
    #[serde(default)]
    venues: HashMap<u32, VenueEntry>,
    #[serde(default)]
    users: HashMap<u32, ActorScope>,
    #[serde(default)]
    academic_years: HashMap<u32, AcademicYearEntry>,
}

#[derive(Debug, Deserialize)]
struct CourseEntry {
    #[serde(default)]
    code: Option<String>,
    department_id: u32,
}

#[derive(Debug, Default, Deserialize)]
struct VenueEntry {
    #[serde(default)]
    rooms: HashMap<u32, RoomEntry>,
}

#[derive(Debug, Deserialize)]
struct RoomEntry {
    capacity: u32,
}

#[derive(Debug, Deserialize)]
struct AcademicYearEntry {
    #[serde(default)]
    semesters: Vec<u32>,
    #[serde(default)]
    periods: Vec<u32>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Tunables read by the engine on every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Used for timetables created without an explicit default, in minutes.
    pub default_exam_duration: u32,
    /// Lowest severity whose unresolved conflicts block publication.
    pub publish_blocking_severity: Severity,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_exam_duration: default_exam_duration(),
            publish_blocking_severity: default_blocking_severity(),
        }
    }
}

// ── ConfigManager ─────────────────────────────────────────────────────────────

/// Loads engine settings and the directory catalog from a YAML file.
#[derive(Debug, Default)]
pub struct ConfigManager {
    settings: EngineSettings,
    directory: Arc<CatalogDirectory>,

    /// Set to `true` after a successful [`load_from_file`](Self::load_from_file).
    loaded: bool,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `path` and replaces the settings and the directory catalog.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, or a setting is out of range.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        info!("Loading engine configuration from: {}", path.display());

        self.loaded = false;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        if file.engine.default_exam_duration_minutes == 0 {
            bail!("engine.default_exam_duration_minutes must be positive");
        }

        self.settings = EngineSettings {
            default_exam_duration: file.engine.default_exam_duration_minutes,
            publish_blocking_severity: file.engine.publish_blocking_severity,
        };
        self.directory = Arc::new(build_directory(file.directory)?);
        self.loaded = true;

        info!(
            default_exam_duration = self.settings.default_exam_duration,
            blocking_severity = %self.settings.publish_blocking_severity,
            courses = self.directory.course_count(),
            rooms = self.directory.room_count(),
            "Configuration loaded"
        );

        Ok(())
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Shared handle to the catalog; cloned into the engine.
    pub fn directory(&self) -> Arc<CatalogDirectory> {
        Arc::clone(&self.directory)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

fn build_directory(section: DirectorySection) -> Result<CatalogDirectory> {
    let dir = CatalogDirectory::new();

    for (id, course) in section.courses {
        let code = course.code.unwrap_or_else(|| format!("COURSE-{}", id));
        dir.add_course(id, code, course.department_id);
    }

    for id in section.programs {
        dir.add_program(id);
    }

    // A room id must be unique across venues; a duplicate would silently move
    // the room to whichever venue is read last.
    let mut room_owner: HashMap<u32, u32> = HashMap::new();
    for (venue_id, venue) in section.venues {
        dir.add_venue(venue_id);
        if venue.rooms.is_empty() {
            warn!(venue = venue_id, "venue has no rooms and cannot host exams");
        }
        for (room_id, room) in venue.rooms {
            if let Some(other) = room_owner.insert(room_id, venue_id) {
                bail!(
                    "room {} is listed under both venue {} and venue {}",
                    room_id,
                    other,
                    venue_id
                );
            }
            debug!(room = room_id, venue = venue_id, capacity = room.capacity, "room registered");
            dir.add_room(room_id, venue_id, room.capacity);
        }
    }

    for (id, scope) in section.users {
        dir.assign_actor(id, scope);
    }

    for (year, entry) in section.academic_years {
        dir.add_academic_year(year, entry.semesters, entry.periods);
    }

    Ok(dir)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
