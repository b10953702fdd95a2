/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Exam timetable integrity engine.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── ids          – identifier aliases and the ordered IdSet
//! ├── model/       – timetable, entry and conflict records
//! ├── error        – EngineError and its reason enums
//! ├── directory    – reference data lookups (courses, rooms, actors)
//! ├── config/      – YAML engine settings + directory seed
//! ├── store/       – entry validation and patch application
//! ├── conflict/    – pairwise scan and full rescan
//! ├── lifecycle/   – Draft → … → Archived state machine
//! ├── permission/  – field-level rights per actor
//! ├── stats/       – read-only aggregates
//! └── engine       – TimetableEngine, the operations callers use
//! ```

pub mod config;
pub mod conflict;
pub mod directory;
pub mod engine;
pub mod error;
pub mod ids;
pub mod lifecycle;
pub mod model;
pub mod permission;
pub mod stats;
pub mod store;

pub use engine::TimetableEngine;
pub use error::{EngineError, EngineResult};
