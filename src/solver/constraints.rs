use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};
use log::warn;

use super::variables::VariableSpace;
use crate::config::{SessionCountPolicy, SolverConfig};
use crate::data::{TimeSlot, TimeSlotId, UserConstraintKind};
use crate::snapshot::Snapshot;

/// Compiles the hard constraint set over the variable space.
///
/// Block variables for multi-period sessions are created here (variables
/// must exist before the model is built); the returned constraints are
/// attached to the model after the objective is fixed.
pub fn compile(
    snapshot: &Snapshot,
    space: &VariableSpace,
    config: &SolverConfig,
    problem: &mut ProblemVariables,
) -> Vec<Constraint> {
    let mut out = Vec::new();
    session_counts(snapshot, space, config, &mut out);
    exclusivity(space, &mut out);
    availability(snapshot, space, &mut out);
    consecutive_blocks(snapshot, space, problem, &mut out);
    user_overrides(snapshot, space, &mut out);
    out
}

/// Each offering meets exactly `sessions_per_week` times (strict policy),
/// or between 1 and `min(sessions_per_week, cap)` times (relaxed policy).
fn session_counts(
    snapshot: &Snapshot,
    space: &VariableSpace,
    config: &SolverConfig,
    out: &mut Vec<Constraint>,
) {
    for offering in &snapshot.offerings {
        let Some(keys) = space.by_offering.get(&offering.id) else {
            continue;
        };
        let total: Expression = keys.iter().map(|key| space.vars[key]).sum();
        let sessions = snapshot.course(offering).sessions_per_week;
        match config.session_count_policy {
            SessionCountPolicy::Strict => {
                let required = sessions as f64;
                out.push(constraint!(total == required));
            }
            SessionCountPolicy::Relaxed { cap } => {
                let upper = sessions.min(cap) as f64;
                let lower = total.clone();
                out.push(constraint!(lower >= 1));
                out.push(constraint!(total <= upper));
            }
        }
    }
}

/// No teacher, room, or section hosts two meetings in the same slot.
fn exclusivity(space: &VariableSpace, out: &mut Vec<Constraint>) {
    for vars in space.by_teacher_slot.values() {
        push_at_most_one(vars, out);
    }
    for vars in space.by_room_slot.values() {
        push_at_most_one(vars, out);
    }
    for vars in space.by_section_slot.values() {
        push_at_most_one(vars, out);
    }
}

fn push_at_most_one(vars: &[Variable], out: &mut Vec<Constraint>) {
    // a single candidate cannot conflict with itself
    if vars.len() > 1 {
        let occupied: Expression = vars.iter().copied().sum();
        out.push(constraint!(occupied <= 1));
    }
}

/// Availability blackouts force the affected variables to zero.
fn availability(snapshot: &Snapshot, space: &VariableSpace, out: &mut Vec<Constraint>) {
    for (&teacher_id, slots) in &snapshot.teacher_unavailable {
        for &slot_id in slots {
            if let Some(vars) = space.by_teacher_slot.get(&(teacher_id, slot_id)) {
                push_forbidden(vars, out);
            }
        }
    }
    for (&room_id, slots) in &snapshot.room_unavailable {
        for &slot_id in slots {
            if let Some(vars) = space.by_room_slot.get(&(room_id, slot_id)) {
                push_forbidden(vars, out);
            }
        }
    }
}

fn push_forbidden(vars: &[Variable], out: &mut Vec<Constraint>) {
    let blocked: Expression = vars.iter().copied().sum();
    out.push(constraint!(blocked == 0));
}

/// Multi-period sessions must occupy a full period-consecutive block in a
/// single room.
///
/// One binary block variable per candidate window (day, start, room); each
/// slot variable equals the sum of the block variables covering it. Slots
/// outside every window are forced to zero, and overlapping blocks are
/// excluded by the slot variables' binary bound.
fn consecutive_blocks(
    snapshot: &Snapshot,
    space: &VariableSpace,
    problem: &mut ProblemVariables,
    out: &mut Vec<Constraint>,
) {
    let by_day = snapshot.slots_by_day();
    for offering in &snapshot.offerings {
        let duration = snapshot.course(offering).session_duration as usize;
        if duration <= 1 {
            continue;
        }
        let Some(rooms) = space.suitable_rooms.get(&offering.id) else {
            continue;
        };
        for day_slots in by_day.values() {
            let windows = consecutive_windows(day_slots, duration);
            for &room_id in rooms {
                let blocks: Vec<(&[TimeSlotId], Variable)> = windows
                    .iter()
                    .map(|window| (window.as_slice(), problem.add(variable().binary())))
                    .collect();
                for slot in day_slots {
                    let var = space.vars[&(offering.id, slot.id, room_id)];
                    let covering: Expression = blocks
                        .iter()
                        .filter(|(window, _)| window.contains(&slot.id))
                        .map(|(_, block)| *block)
                        .sum();
                    let linked = covering - var;
                    out.push(constraint!(linked == 0));
                }
            }
        }
    }
}

/// Windows of `len` period-consecutive slots within one day's sorted slots.
/// A window never bridges a gap in period numbers (e.g. a break removed
/// from the grid).
pub(crate) fn consecutive_windows(day_slots: &[&TimeSlot], len: usize) -> Vec<Vec<TimeSlotId>> {
    let mut out = Vec::new();
    if len == 0 || day_slots.len() < len {
        return out;
    }
    for window in day_slots.windows(len) {
        let contiguous = window
            .windows(2)
            .all(|pair| pair[1].period_number == pair[0].period_number + 1);
        if contiguous {
            out.push(window.iter().map(|slot| slot.id).collect());
        }
    }
    out
}

/// User overrides forbid the targeted teacher / room / section at one
/// resolved (day, period) cell.
fn user_overrides(snapshot: &Snapshot, space: &VariableSpace, out: &mut Vec<Constraint>) {
    for uc in &snapshot.user_constraints {
        let Some(slot) = snapshot.slot_at(uc.day_of_week, uc.period_number) else {
            warn!(
                "user constraint {} targets unknown slot (day {}, period {})",
                uc.id, uc.day_of_week, uc.period_number
            );
            continue;
        };
        let vars = match uc.kind {
            UserConstraintKind::TeacherUnavailable => match uc.teacher_id {
                Some(teacher_id) => space.by_teacher_slot.get(&(teacher_id, slot.id)),
                None => {
                    warn!("user constraint {} names no teacher", uc.id);
                    continue;
                }
            },
            UserConstraintKind::RoomUnavailable => match uc.room_id {
                Some(room_id) => space.by_room_slot.get(&(room_id, slot.id)),
                None => {
                    warn!("user constraint {} names no room", uc.id);
                    continue;
                }
            },
            UserConstraintKind::SectionPreference => match uc.section_id {
                Some(section_id) => space.by_section_slot.get(&(section_id, slot.id)),
                None => {
                    warn!("user constraint {} names no section", uc.id);
                    continue;
                }
            },
        };
        if let Some(vars) = vars {
            push_forbidden(vars, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: TimeSlotId, period: u8) -> TimeSlot {
        TimeSlot {
            id,
            day_of_week: 0,
            period_number: period,
            is_break: false,
            is_active: true,
        }
    }

    #[test]
    fn windows_cover_a_contiguous_day() {
        let slots = [slot(1, 1), slot(2, 2), slot(3, 3)];
        let refs: Vec<&TimeSlot> = slots.iter().collect();
        assert_eq!(
            consecutive_windows(&refs, 2),
            vec![vec![1, 2], vec![2, 3]]
        );
    }

    #[test]
    fn windows_never_bridge_a_period_gap() {
        // period 3 missing, e.g. a break removed from the grid
        let slots = [slot(1, 1), slot(2, 2), slot(4, 4), slot(5, 5)];
        let refs: Vec<&TimeSlot> = slots.iter().collect();
        assert_eq!(
            consecutive_windows(&refs, 2),
            vec![vec![1, 2], vec![4, 5]]
        );
    }

    #[test]
    fn short_day_has_no_windows() {
        let slots = [slot(1, 1)];
        let refs: Vec<&TimeSlot> = slots.iter().collect();
        assert!(consecutive_windows(&refs, 2).is_empty());
    }

    #[test]
    fn window_length_matches_request() {
        let slots = [slot(1, 1), slot(2, 2), slot(3, 3), slot(4, 4)];
        let refs: Vec<&TimeSlot> = slots.iter().collect();
        let windows = consecutive_windows(&refs, 3);
        assert_eq!(windows, vec![vec![1, 2, 3], vec![2, 3, 4]]);
    }
}
