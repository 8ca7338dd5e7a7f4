use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data::{
    Assignment, Course, GenerationRun, Offering, Room, RoomAvailability, RoomId, RunId, Section,
    Teacher, TeacherAvailability, TeacherId, TimeSlot, TimeSlotId, UserConstraint,
};
use crate::error::{StoreError, StoreResult};

/// Read/write boundary between the engine and the persistence layer.
///
/// Readers hand back active-flag-filtered collections; the engine never
/// filters on activity itself. `insert_generation_run` assigns the run id.
pub trait TimetableStore {
    fn list_active_teachers(&self) -> StoreResult<Vec<Teacher>>;
    fn list_active_courses(&self) -> StoreResult<Vec<Course>>;
    fn list_active_sections(&self) -> StoreResult<Vec<Section>>;
    fn list_active_rooms(&self) -> StoreResult<Vec<Room>>;
    /// Active, non-break slots ordered by (day, period).
    fn list_active_time_slots(&self) -> StoreResult<Vec<TimeSlot>>;
    fn list_active_offerings(&self) -> StoreResult<Vec<Offering>>;
    /// (teacher, slot) pairs with `is_available = false`.
    fn list_teacher_unavailability(&self) -> StoreResult<Vec<(TeacherId, TimeSlotId)>>;
    /// (room, slot) pairs with `is_available = false`.
    fn list_room_unavailability(&self) -> StoreResult<Vec<(RoomId, TimeSlotId)>>;
    fn list_active_user_constraints(&self) -> StoreResult<Vec<UserConstraint>>;

    fn clear_assignments(&self) -> StoreResult<()>;
    fn insert_assignments(&self, assignments: &[Assignment]) -> StoreResult<()>;
    fn insert_generation_run(&self, run: GenerationRun) -> StoreResult<RunId>;

    fn list_assignments(&self) -> StoreResult<Vec<Assignment>>;
    fn list_generation_runs(&self) -> StoreResult<Vec<GenerationRun>>;
}

/// The entity tables the engine reads, as one bulk-loadable value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub teachers: Vec<Teacher>,
    pub courses: Vec<Course>,
    pub sections: Vec<Section>,
    pub rooms: Vec<Room>,
    pub time_slots: Vec<TimeSlot>,
    pub offerings: Vec<Offering>,
    pub teacher_availability: Vec<TeacherAvailability>,
    pub room_availability: Vec<RoomAvailability>,
    pub user_constraints: Vec<UserConstraint>,
}

#[derive(Debug, Default)]
struct StoreInner {
    dataset: Dataset,
    assignments: Vec<Assignment>,
    runs: Vec<GenerationRun>,
    next_run_id: RunId,
}

/// Thread-safe in-memory reference store, used by the service and the tests.
/// Persistent backends live behind the same trait and are out of scope here.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(dataset: Dataset) -> Self {
        let store = Self::new();
        store
            .replace_dataset(dataset)
            .expect("fresh store lock cannot be poisoned");
        store
    }

    /// Replaces the entity tables wholesale. Assignments and generation
    /// runs are kept; a subsequent solve clears the assignments itself.
    pub fn replace_dataset(&self, dataset: Dataset) -> StoreResult<()> {
        self.write()?.dataset = dataset;
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreInner>> {
        self.inner
            .read()
            .map_err(|err| StoreError::Lock(err.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreInner>> {
        self.inner
            .write()
            .map_err(|err| StoreError::Lock(err.to_string()))
    }
}

impl TimetableStore for MemoryStore {
    fn list_active_teachers(&self) -> StoreResult<Vec<Teacher>> {
        let inner = self.read()?;
        Ok(inner
            .dataset
            .teachers
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    fn list_active_courses(&self) -> StoreResult<Vec<Course>> {
        let inner = self.read()?;
        Ok(inner
            .dataset
            .courses
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    fn list_active_sections(&self) -> StoreResult<Vec<Section>> {
        let inner = self.read()?;
        Ok(inner
            .dataset
            .sections
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }

    fn list_active_rooms(&self) -> StoreResult<Vec<Room>> {
        let inner = self.read()?;
        Ok(inner
            .dataset
            .rooms
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }

    fn list_active_time_slots(&self) -> StoreResult<Vec<TimeSlot>> {
        let inner = self.read()?;
        let mut slots: Vec<TimeSlot> = inner
            .dataset
            .time_slots
            .iter()
            .filter(|s| s.is_active && !s.is_break)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.day_of_week, s.period_number));
        Ok(slots)
    }

    fn list_active_offerings(&self) -> StoreResult<Vec<Offering>> {
        // Offerings carry no active flag; activity is derived from their
        // references during snapshot validation.
        let inner = self.read()?;
        Ok(inner.dataset.offerings.clone())
    }

    fn list_teacher_unavailability(&self) -> StoreResult<Vec<(TeacherId, TimeSlotId)>> {
        let inner = self.read()?;
        Ok(inner
            .dataset
            .teacher_availability
            .iter()
            .filter(|a| !a.is_available)
            .map(|a| (a.teacher_id, a.time_slot_id))
            .collect())
    }

    fn list_room_unavailability(&self) -> StoreResult<Vec<(RoomId, TimeSlotId)>> {
        let inner = self.read()?;
        Ok(inner
            .dataset
            .room_availability
            .iter()
            .filter(|a| !a.is_available)
            .map(|a| (a.room_id, a.time_slot_id))
            .collect())
    }

    fn list_active_user_constraints(&self) -> StoreResult<Vec<UserConstraint>> {
        let inner = self.read()?;
        Ok(inner
            .dataset
            .user_constraints
            .iter()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    fn clear_assignments(&self) -> StoreResult<()> {
        self.write()?.assignments.clear();
        Ok(())
    }

    fn insert_assignments(&self, assignments: &[Assignment]) -> StoreResult<()> {
        self.write()?.assignments.extend_from_slice(assignments);
        Ok(())
    }

    fn insert_generation_run(&self, mut run: GenerationRun) -> StoreResult<RunId> {
        let mut inner = self.write()?;
        inner.next_run_id += 1;
        run.id = inner.next_run_id;
        let id = run.id;
        inner.runs.push(run);
        Ok(id)
    }

    fn list_assignments(&self) -> StoreResult<Vec<Assignment>> {
        Ok(self.read()?.assignments.clone())
    }

    fn list_generation_runs(&self) -> StoreResult<Vec<GenerationRun>> {
        Ok(self.read()?.runs.clone())
    }
}
