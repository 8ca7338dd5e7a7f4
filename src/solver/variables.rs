use good_lp::{ProblemVariables, Variable, variable};
use log::trace;
use std::collections::HashMap;

use crate::data::{Course, OfferingId, Room, RoomId, RoomType, SectionId, TeacherId, TimeSlotId};
use crate::snapshot::Snapshot;

/// Composite key of one decision variable:
/// "this offering meets at this time in this room".
pub type VarKey = (OfferingId, TimeSlotId, RoomId);

/// Lab courses require lab rooms; everything else may use any room type,
/// labs included, as a fallback.
pub fn room_suits_course(course: &Course, room: &Room) -> bool {
    !(course.is_lab && room.room_type != RoomType::Lab)
}

/// Sparse decision-variable space with reverse indices for the exclusivity
/// constraints. A key's absence means the combination is structurally
/// forbidden, never "assigned false".
#[derive(Default)]
pub struct VariableSpace {
    pub vars: HashMap<VarKey, Variable>,
    pub by_offering: HashMap<OfferingId, Vec<VarKey>>,
    pub by_teacher_slot: HashMap<(TeacherId, TimeSlotId), Vec<Variable>>,
    pub by_room_slot: HashMap<(RoomId, TimeSlotId), Vec<Variable>>,
    pub by_section_slot: HashMap<(SectionId, TimeSlotId), Vec<Variable>>,
    /// Rooms passing the suitability filter, per offering.
    pub suitable_rooms: HashMap<OfferingId, Vec<RoomId>>,
}

impl VariableSpace {
    /// Creates one binary variable per suitable (offering, slot, room)
    /// triple. Online offerings get no variables and are never scheduled.
    pub fn build(snapshot: &Snapshot, problem: &mut ProblemVariables) -> Self {
        let mut space = Self::default();
        let mut online = 0usize;

        for offering in &snapshot.offerings {
            let course = snapshot.course(offering);
            if course.is_online {
                online += 1;
                continue;
            }
            let rooms: Vec<&Room> = snapshot
                .rooms
                .iter()
                .filter(|room| room_suits_course(course, room))
                .collect();
            space
                .suitable_rooms
                .insert(offering.id, rooms.iter().map(|r| r.id).collect());

            for slot in &snapshot.time_slots {
                for room in &rooms {
                    let var = problem.add(variable().binary());
                    let key = (offering.id, slot.id, room.id);
                    space.vars.insert(key, var);
                    space.by_offering.entry(offering.id).or_default().push(key);
                    space
                        .by_teacher_slot
                        .entry((offering.teacher_id, slot.id))
                        .or_default()
                        .push(var);
                    space
                        .by_room_slot
                        .entry((room.id, slot.id))
                        .or_default()
                        .push(var);
                    space
                        .by_section_slot
                        .entry((offering.section_id, slot.id))
                        .or_default()
                        .push(var);
                }
            }
        }

        trace!(
            "created {} decision variables ({} online offerings excluded)",
            space.vars.len(),
            online
        );
        space
    }

    /// Non-online offerings with no candidate (slot, room) combination at
    /// all. A non-empty result makes the whole solve infeasible.
    pub fn unschedulable(&self, snapshot: &Snapshot) -> Vec<OfferingId> {
        snapshot
            .offerings
            .iter()
            .filter(|o| !snapshot.course(o).is_online)
            .filter(|o| self.by_offering.get(&o.id).is_none_or(|keys| keys.is_empty()))
            .map(|o| o.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::data::{Offering, Section, Teacher, TimeSlot};
    use crate::store::{Dataset, MemoryStore};

    fn room(id: RoomId, room_type: RoomType) -> Room {
        Room {
            id,
            number: format!("R{id}"),
            room_type,
            capacity: 40,
            is_active: true,
        }
    }

    fn dataset(lab_course: bool, online: bool) -> Dataset {
        Dataset {
            teachers: vec![Teacher {
                id: 1,
                name: "T1".to_string(),
                is_active: true,
            }],
            courses: vec![Course {
                id: 1,
                code: "C1".to_string(),
                name: "Course".to_string(),
                sessions_per_week: 2,
                session_duration: 1,
                is_lab: lab_course,
                is_online: online,
                is_active: true,
            }],
            sections: vec![Section {
                id: 1,
                name: "S1".to_string(),
                is_active: true,
            }],
            rooms: vec![room(1, RoomType::Classroom), room(2, RoomType::Lab)],
            time_slots: (1..=3)
                .map(|p| TimeSlot {
                    id: p as u32,
                    day_of_week: 0,
                    period_number: p,
                    is_break: false,
                    is_active: true,
                })
                .collect(),
            offerings: vec![Offering {
                id: 1,
                teacher_id: 1,
                course_id: 1,
                section_id: 1,
                preferred_room_id: None,
            }],
            ..Dataset::default()
        }
    }

    fn build(dataset: Dataset) -> VariableSpace {
        let store = MemoryStore::with_dataset(dataset);
        let snapshot = Snapshot::load(&store, &SolverConfig::default()).unwrap();
        let mut problem = ProblemVariables::new();
        VariableSpace::build(&snapshot, &mut problem)
    }

    #[test]
    fn non_lab_course_may_use_any_room() {
        let space = build(dataset(false, false));
        // 3 slots x 2 rooms
        assert_eq!(space.vars.len(), 6);
        assert_eq!(space.suitable_rooms[&1], vec![1, 2]);
    }

    #[test]
    fn lab_course_is_restricted_to_lab_rooms() {
        let space = build(dataset(true, false));
        assert_eq!(space.vars.len(), 3);
        assert_eq!(space.suitable_rooms[&1], vec![2]);
        assert!(space.vars.contains_key(&(1, 1, 2)));
        assert!(!space.vars.contains_key(&(1, 1, 1)));
    }

    #[test]
    fn online_offerings_get_no_variables() {
        let space = build(dataset(false, true));
        assert!(space.vars.is_empty());
        assert!(space.by_offering.is_empty());
    }

    #[test]
    fn lab_course_without_lab_rooms_is_unschedulable() {
        let mut dataset = dataset(true, false);
        dataset.rooms.retain(|r| r.room_type != RoomType::Lab);
        let store = MemoryStore::with_dataset(dataset);
        let snapshot = Snapshot::load(&store, &SolverConfig::default()).unwrap();
        let mut problem = ProblemVariables::new();
        let space = VariableSpace::build(&snapshot, &mut problem);

        assert_eq!(space.unschedulable(&snapshot), vec![1]);
    }

    #[test]
    fn reverse_indices_cover_every_variable() {
        let space = build(dataset(false, false));
        let teacher_total: usize = space.by_teacher_slot.values().map(Vec::len).sum();
        let room_total: usize = space.by_room_slot.values().map(Vec::len).sum();
        let section_total: usize = space.by_section_slot.values().map(Vec::len).sum();
        assert_eq!(teacher_total, space.vars.len());
        assert_eq!(room_total, space.vars.len());
        assert_eq!(section_total, space.vars.len());
    }
}
