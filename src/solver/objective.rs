use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint, variable};
use itertools::Itertools;
use std::collections::HashSet;

use super::variables::VariableSpace;
use crate::config::SolverConfig;
use crate::data::{OfferingId, RoomId, RoomType, TimeSlotId};
use crate::snapshot::Snapshot;

/// Compiles the soft-preference objective for an optimizing solve.
///
/// Returns the expression to maximise plus the linking constraints for the
/// deviation variables. Skipped entirely for feasibility solves.
pub fn compile(
    snapshot: &Snapshot,
    space: &VariableSpace,
    config: &SolverConfig,
    problem: &mut ProblemVariables,
) -> (Expression, Vec<Constraint>) {
    let mut links = Vec::new();

    let deviations = daily_balance(snapshot, space, problem, &mut links);
    let edges = edge_period_vars(snapshot, space);
    let lab_fallbacks = if config.lab_room_penalty > 0.0 {
        lab_occupancy_vars(snapshot, space)
    } else {
        Vec::new()
    };

    let deviation_total: Expression = deviations.into_iter().sum();
    let edge_total: Expression = edges.into_iter().sum();
    let lab_total: Expression = lab_fallbacks.into_iter().sum();

    let objective = (-config.balance_weight) * deviation_total
        + (-config.edge_period_weight) * edge_total
        + (-config.lab_room_penalty) * lab_total;
    (objective, links)
}

/// Daily balance per section: one nonnegative deviation variable per
/// unordered day pair, bounded below by both signed differences of the two
/// day-load expressions. Maximisation presses each deviation down onto
/// |load(day_i) - load(day_j)|.
fn daily_balance(
    snapshot: &Snapshot,
    space: &VariableSpace,
    problem: &mut ProblemVariables,
    links: &mut Vec<Constraint>,
) -> Vec<Variable> {
    let by_day = snapshot.slots_by_day();
    let mut deviations = Vec::new();

    for section in &snapshot.sections {
        let mut day_loads: Vec<Expression> = Vec::new();
        for slots in by_day.values() {
            let vars: Vec<Variable> = slots
                .iter()
                .filter_map(|slot| space.by_section_slot.get(&(section.id, slot.id)))
                .flatten()
                .copied()
                .collect();
            if !vars.is_empty() {
                day_loads.push(vars.into_iter().sum());
            }
        }
        for (first, second) in day_loads.iter().tuple_combinations() {
            let deviation = problem.add(variable().min(0.0));
            let over = first.clone() - second.clone() - deviation;
            let under = second.clone() - first.clone() - deviation;
            links.push(constraint!(over <= 0));
            links.push(constraint!(under <= 0));
            deviations.push(deviation);
        }
    }
    deviations
}

/// Variables sitting in period 1 or the last period of their day.
fn edge_period_vars(snapshot: &Snapshot, space: &VariableSpace) -> Vec<Variable> {
    let mut edge_slots: HashSet<TimeSlotId> = HashSet::new();
    for slots in snapshot.slots_by_day().values() {
        let Some(last) = slots.iter().map(|s| s.period_number).max() else {
            continue;
        };
        for slot in slots {
            if slot.period_number == 1 || slot.period_number == last {
                edge_slots.insert(slot.id);
            }
        }
    }
    space
        .vars
        .iter()
        .filter(|((_, slot_id, _), _)| edge_slots.contains(slot_id))
        .map(|(_, var)| *var)
        .collect()
}

/// Variables placing a non-lab course in a lab room. Only compiled when the
/// deployment sets a nonzero penalty weight.
fn lab_occupancy_vars(snapshot: &Snapshot, space: &VariableSpace) -> Vec<Variable> {
    let lab_rooms: HashSet<RoomId> = snapshot
        .rooms
        .iter()
        .filter(|room| room.room_type == RoomType::Lab)
        .map(|room| room.id)
        .collect();
    let theory_offerings: HashSet<OfferingId> = snapshot
        .offerings
        .iter()
        .filter(|o| !snapshot.course(o).is_lab)
        .map(|o| o.id)
        .collect();
    space
        .vars
        .iter()
        .filter(|((offering_id, _, room_id), _)| {
            theory_offerings.contains(offering_id) && lab_rooms.contains(room_id)
        })
        .map(|(_, var)| *var)
        .collect()
}
