use itertools::Itertools;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::SolverConfig;
use crate::data::{
    Course, CourseId, Offering, Room, RoomId, Section, TeacherId, TimeSlot, TimeSlotId,
    UserConstraint,
};
use crate::error::EngineError;
use crate::store::TimetableStore;

/// Frozen view of the store for one solve. Each solve loads a fresh
/// snapshot; nothing here outlives the call that built it.
#[derive(Debug)]
pub struct Snapshot {
    pub offerings: Vec<Offering>,
    pub courses: HashMap<CourseId, Course>,
    pub sections: Vec<Section>,
    pub rooms: Vec<Room>,
    /// Active, non-break grid slots sorted by (day, period).
    pub time_slots: Vec<TimeSlot>,
    pub teacher_unavailable: HashMap<TeacherId, HashSet<TimeSlotId>>,
    pub room_unavailable: HashMap<RoomId, HashSet<TimeSlotId>>,
    pub user_constraints: Vec<UserConstraint>,
}

impl Snapshot {
    /// Loads and validates the scheduling snapshot.
    ///
    /// An offering referencing a missing or inactive teacher, course, or
    /// section is a data-integrity error, raised before any model is built.
    pub fn load<S: TimetableStore + ?Sized>(
        store: &S,
        config: &SolverConfig,
    ) -> Result<Self, EngineError> {
        let teachers: HashSet<TeacherId> = store
            .list_active_teachers()?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let courses: HashMap<CourseId, Course> = store
            .list_active_courses()?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let sections = store.list_active_sections()?;
        let section_ids: HashSet<u32> = sections.iter().map(|s| s.id).collect();

        let mut offerings = store.list_active_offerings()?;
        offerings.sort_by_key(|o| o.id);
        if let Some(cap) = config.max_offerings {
            if offerings.len() > cap {
                warn!(
                    "capping analyzed offerings to {cap} of {} (ascending id)",
                    offerings.len()
                );
                offerings.truncate(cap);
            }
        }

        let mut seen_triples = HashSet::new();
        for offering in &offerings {
            if !teachers.contains(&offering.teacher_id) {
                return Err(EngineError::DataIntegrity {
                    offering: offering.id,
                    entity: "teacher",
                    id: offering.teacher_id,
                });
            }
            if !courses.contains_key(&offering.course_id) {
                return Err(EngineError::DataIntegrity {
                    offering: offering.id,
                    entity: "course",
                    id: offering.course_id,
                });
            }
            if !section_ids.contains(&offering.section_id) {
                return Err(EngineError::DataIntegrity {
                    offering: offering.id,
                    entity: "section",
                    id: offering.section_id,
                });
            }
            if !seen_triples.insert((offering.teacher_id, offering.course_id, offering.section_id))
            {
                return Err(EngineError::DuplicateOffering {
                    teacher: offering.teacher_id,
                    course: offering.course_id,
                    section: offering.section_id,
                });
            }
        }

        let mut time_slots = store.list_active_time_slots()?;
        time_slots.sort_by_key(|s| (s.day_of_week, s.period_number));

        let teacher_unavailable = store
            .list_teacher_unavailability()?
            .into_iter()
            .into_group_map()
            .into_iter()
            .map(|(teacher, slots)| (teacher, slots.into_iter().collect()))
            .collect();
        let room_unavailable = store
            .list_room_unavailability()?
            .into_iter()
            .into_group_map()
            .into_iter()
            .map(|(room, slots)| (room, slots.into_iter().collect()))
            .collect();
        let user_constraints = store.list_active_user_constraints()?;

        let rooms = store.list_active_rooms()?;
        info!(
            "loaded {} offerings, {} time slots, {} rooms, {} sections",
            offerings.len(),
            time_slots.len(),
            rooms.len(),
            sections.len()
        );

        Ok(Self {
            offerings,
            courses,
            sections,
            rooms,
            time_slots,
            teacher_unavailable,
            room_unavailable,
            user_constraints,
        })
    }

    /// The offering's course. References are validated at load time.
    pub fn course(&self, offering: &Offering) -> &Course {
        &self.courses[&offering.course_id]
    }

    /// Grid slots grouped by day, each day sorted by period.
    pub fn slots_by_day(&self) -> BTreeMap<u8, Vec<&TimeSlot>> {
        let mut days: BTreeMap<u8, Vec<&TimeSlot>> = BTreeMap::new();
        for slot in &self.time_slots {
            days.entry(slot.day_of_week).or_default().push(slot);
        }
        for slots in days.values_mut() {
            slots.sort_by_key(|s| s.period_number);
        }
        days
    }

    /// Resolves a (day, period) pair against the grid.
    pub fn slot_at(&self, day_of_week: u8, period_number: u8) -> Option<&TimeSlot> {
        self.time_slots
            .iter()
            .find(|s| s.day_of_week == day_of_week && s.period_number == period_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{RoomType, Section, Teacher};
    use crate::store::{Dataset, MemoryStore};

    fn teacher(id: TeacherId) -> Teacher {
        Teacher {
            id,
            name: format!("T{id}"),
            is_active: true,
        }
    }

    fn course(id: CourseId) -> Course {
        Course {
            id,
            code: format!("C{id}"),
            name: format!("Course {id}"),
            sessions_per_week: 2,
            session_duration: 1,
            is_lab: false,
            is_online: false,
            is_active: true,
        }
    }

    fn section(id: u32) -> Section {
        Section {
            id,
            name: format!("S{id}"),
            is_active: true,
        }
    }

    fn offering(id: u32, teacher_id: TeacherId, course_id: CourseId, section_id: u32) -> Offering {
        Offering {
            id,
            teacher_id,
            course_id,
            section_id,
            preferred_room_id: None,
        }
    }

    fn base_dataset() -> Dataset {
        Dataset {
            teachers: vec![teacher(1)],
            courses: vec![course(1)],
            sections: vec![section(1)],
            rooms: vec![Room {
                id: 1,
                number: "101".to_string(),
                room_type: RoomType::Classroom,
                capacity: 60,
                is_active: true,
            }],
            time_slots: vec![
                TimeSlot {
                    id: 1,
                    day_of_week: 0,
                    period_number: 1,
                    is_break: false,
                    is_active: true,
                },
                TimeSlot {
                    id: 2,
                    day_of_week: 0,
                    period_number: 2,
                    is_break: false,
                    is_active: true,
                },
            ],
            offerings: vec![offering(1, 1, 1, 1)],
            ..Dataset::default()
        }
    }

    #[test]
    fn loads_valid_dataset() {
        let store = MemoryStore::with_dataset(base_dataset());
        let snapshot = Snapshot::load(&store, &SolverConfig::default()).unwrap();
        assert_eq!(snapshot.offerings.len(), 1);
        assert_eq!(snapshot.time_slots.len(), 2);
        assert_eq!(snapshot.course(&snapshot.offerings[0]).id, 1);
    }

    #[test]
    fn missing_teacher_is_a_data_integrity_error() {
        let mut dataset = base_dataset();
        dataset.offerings = vec![offering(1, 99, 1, 1)];
        let store = MemoryStore::with_dataset(dataset);

        let err = Snapshot::load(&store, &SolverConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DataIntegrity {
                entity: "teacher",
                id: 99,
                ..
            }
        ));
    }

    #[test]
    fn inactive_course_is_a_data_integrity_error() {
        let mut dataset = base_dataset();
        dataset.courses[0].is_active = false;
        let store = MemoryStore::with_dataset(dataset);

        let err = Snapshot::load(&store, &SolverConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::DataIntegrity {
                entity: "course",
                ..
            }
        ));
    }

    #[test]
    fn duplicate_triple_is_rejected() {
        let mut dataset = base_dataset();
        dataset.offerings.push(offering(2, 1, 1, 1));
        let store = MemoryStore::with_dataset(dataset);

        let err = Snapshot::load(&store, &SolverConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateOffering { .. }));
    }

    #[test]
    fn offering_cap_keeps_lowest_ids() {
        let mut dataset = base_dataset();
        dataset.courses.push(course(2));
        dataset.offerings = vec![offering(5, 1, 1, 1), offering(2, 1, 2, 1)];
        let store = MemoryStore::with_dataset(dataset);

        let config = SolverConfig {
            max_offerings: Some(1),
            ..SolverConfig::default()
        };
        let snapshot = Snapshot::load(&store, &config).unwrap();
        assert_eq!(snapshot.offerings.len(), 1);
        assert_eq!(snapshot.offerings[0].id, 2);
    }

    #[test]
    fn slots_group_by_day_in_period_order() {
        let mut dataset = base_dataset();
        dataset.time_slots.push(TimeSlot {
            id: 3,
            day_of_week: 1,
            period_number: 1,
            is_break: false,
            is_active: true,
        });
        let store = MemoryStore::with_dataset(dataset);
        let snapshot = Snapshot::load(&store, &SolverConfig::default()).unwrap();

        let days = snapshot.slots_by_day();
        assert_eq!(days.len(), 2);
        assert_eq!(days[&0].iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(snapshot.slot_at(1, 1).unwrap().id, 3);
        assert!(snapshot.slot_at(3, 1).is_none());
    }
}
