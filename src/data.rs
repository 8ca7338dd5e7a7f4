use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type TeacherId = u32;
pub type CourseId = u32;
pub type SectionId = u32;
pub type RoomId = u32;
pub type TimeSlotId = u32;
pub type OfferingId = u32;
pub type RunId = u32;

/// A faculty member who can be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub is_active: bool,
}

/// A course and its weekly meeting requirements.
///
/// `sessions_per_week` counts the time slots the course occupies each week;
/// `session_duration` is the number of consecutive slots per meeting (>1 for
/// lab blocks). Online courses need no room or time assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub name: String,
    pub sessions_per_week: u32,
    pub session_duration: u32,
    pub is_lab: bool,
    pub is_online: bool,
    pub is_active: bool,
}

/// A student group. No two of a section's offerings may share a time slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Classroom,
    Lab,
    Auditorium,
}

/// A physical room. Capacity is carried for data providers; the base
/// suitability rule only constrains on `room_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub number: String,
    pub room_type: RoomType,
    pub capacity: u32,
    pub is_active: bool,
}

/// One (day, period) cell of the fixed weekly grid.
///
/// `day_of_week` is 0 (Monday) through 6; periods are numbered from 1 within
/// a day and give the total order used to detect consecutive runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub day_of_week: u8,
    pub period_number: u8,
    pub is_break: bool,
    pub is_active: bool,
}

/// A (teacher, course, section) obligation requiring weekly scheduling.
/// The triple is unique across offerings. The preferred room is advisory
/// and not constrained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub id: OfferingId,
    pub teacher_id: TeacherId,
    pub course_id: CourseId,
    pub section_id: SectionId,
    #[serde(default)]
    pub preferred_room_id: Option<RoomId>,
}

/// Teacher blackout record; `is_available = false` rows forbid scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherAvailability {
    pub teacher_id: TeacherId,
    pub time_slot_id: TimeSlotId,
    pub is_available: bool,
}

/// Room blackout record, symmetric to [`TeacherAvailability`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomAvailability {
    pub room_id: RoomId,
    pub time_slot_id: TimeSlotId,
    pub is_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserConstraintKind {
    TeacherUnavailable,
    RoomUnavailable,
    /// Historically a hard avoid despite the name.
    SectionPreference,
}

/// A user-entered scheduling override, scoped to one (day, period) cell.
/// All three kinds are hard forbids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConstraint {
    pub id: u32,
    pub name: String,
    pub kind: UserConstraintKind,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub section_id: Option<SectionId>,
    pub day_of_week: u8,
    pub period_number: u8,
    pub is_active: bool,
}

/// A committed (offering, room, time slot) placement. The section is
/// denormalized from the offering for query convenience.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Assignment {
    pub offering_id: OfferingId,
    pub section_id: SectionId,
    pub room_id: RoomId,
    pub time_slot_id: TimeSlotId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
}

/// Audit record of one solve attempt. Written once per invocation in every
/// outcome, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRun {
    pub id: RunId,
    pub created_at: DateTime<Utc>,
    pub status: RunStatus,
    pub solver_status: String,
    pub total_slots: usize,
    pub solve_time_seconds: f64,
    pub notes: String,
}

/// Solver diagnostic counters for a successful solve.
///
/// HiGHS behind good_lp does not expose search-node or conflict counts, so
/// those fields are present for the contract but null under this backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveStatistics {
    pub branches: Option<u64>,
    pub conflicts: Option<u64>,
    pub wall_time: f64,
}

/// Structured outcome of a generation request. This is the only value the
/// engine ever hands back to callers; failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success {
        solver_status: String,
        total_slots: usize,
        solve_time: f64,
        statistics: SolveStatistics,
    },
    Failed {
        solver_status: String,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        solve_time: Option<f64>,
    },
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }
}

impl fmt::Display for GenerationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationResult::Success {
                solver_status,
                total_slots,
                solve_time,
                ..
            } => write!(
                f,
                "success ({solver_status}): {total_slots} slots in {solve_time:.3}s"
            ),
            GenerationResult::Failed {
                solver_status,
                error,
                ..
            } => write!(f, "failed ({solver_status}): {error}"),
        }
    }
}
