pub mod constraints;
pub mod objective;
pub mod variables;

use chrono::Utc;
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable, default_solver,
};
use log::{error, info};
use std::collections::HashMap;
use std::time::Instant;

use crate::config::{SolveMode, SolverConfig};
use crate::data::{
    Assignment, GenerationResult, GenerationRun, OfferingId, RunStatus, SectionId, SolveStatistics,
};
use crate::error::EngineError;
use crate::snapshot::Snapshot;
use crate::store::TimetableStore;
use variables::VariableSpace;

/// Terminal solver outcomes, as reported in `solver_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SolveStatus {
    Optimal,
    Infeasible,
    Unknown,
    Error,
}

impl SolveStatus {
    fn as_str(self) -> &'static str {
        match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unknown => "unknown",
            SolveStatus::Error => "error",
        }
    }
}

/// Generates a full timetable from the store's current snapshot.
///
/// The single engine entry point. Blocks for the whole solve, replaces the
/// persisted assignment set, and records one generation run per attempt.
/// Never returns an error: internal failures become the structured failed
/// result, so callers only ever handle [`GenerationResult`].
pub fn generate_timetable<S: TimetableStore + ?Sized>(
    store: &S,
    config: &SolverConfig,
) -> GenerationResult {
    info!("starting timetable generation");
    match run_solve(store, config) {
        Ok(result) => result,
        Err(err) => {
            error!("timetable generation failed: {err}");
            let result = GenerationResult::Failed {
                solver_status: SolveStatus::Error.as_str().to_string(),
                error: err.to_string(),
                solve_time: None,
            };
            record_run(store, &result);
            result
        }
    }
}

fn run_solve<S: TimetableStore + ?Sized>(
    store: &S,
    config: &SolverConfig,
) -> Result<GenerationResult, EngineError> {
    // Full re-solve: prior assignments are discarded up front, so every
    // failure path leaves an empty set rather than a stale one.
    store.clear_assignments()?;

    let snapshot = Snapshot::load(store, config)?;
    let mut problem = ProblemVariables::new();
    let space = VariableSpace::build(&snapshot, &mut problem);

    let unschedulable = space.unschedulable(&snapshot);
    if !unschedulable.is_empty() {
        let result = GenerationResult::Failed {
            solver_status: SolveStatus::Infeasible.as_str().to_string(),
            error: format!(
                "offerings {unschedulable:?} have no candidate (time slot, room) combination"
            ),
            solve_time: None,
        };
        record_run(store, &result);
        return Ok(result);
    }

    if space.vars.is_empty() {
        // nothing to place: no offerings, or all of them online
        let result = GenerationResult::Success {
            solver_status: SolveStatus::Optimal.as_str().to_string(),
            total_slots: 0,
            solve_time: 0.0,
            statistics: SolveStatistics {
                branches: None,
                conflicts: None,
                wall_time: 0.0,
            },
        };
        record_run(store, &result);
        return Ok(result);
    }

    let hard = constraints::compile(&snapshot, &space, config, &mut problem);
    let (objective, links) = match config.mode {
        SolveMode::Optimize => objective::compile(&snapshot, &space, config, &mut problem),
        SolveMode::Feasibility => (std::iter::empty::<Variable>().sum::<Expression>(), Vec::new()),
    };
    info!(
        "model has {} decision variables and {} hard constraints",
        space.vars.len(),
        hard.len()
    );

    let mut model = problem
        .maximise(objective)
        .using(default_solver)
        .set_option("threads", config.threads)
        .set_option("random_seed", config.random_seed)
        .set_option("time_limit", config.time_limit_seconds)
        .set_option("log_to_console", "false");
    for constraint in hard {
        model.add_constraint(constraint);
    }
    for constraint in links {
        model.add_constraint(constraint);
    }

    let solve_started = Instant::now();
    let outcome = model.solve();
    let solve_time = solve_started.elapsed().as_secs_f64();

    let result = match outcome {
        Ok(solution) => {
            let assignments = extract(&snapshot, &space, &solution);
            info!(
                "solution found: {} assignments in {solve_time:.3}s",
                assignments.len()
            );
            store.insert_assignments(&assignments)?;
            GenerationResult::Success {
                solver_status: SolveStatus::Optimal.as_str().to_string(),
                total_slots: assignments.len(),
                solve_time,
                statistics: SolveStatistics {
                    branches: None,
                    conflicts: None,
                    wall_time: solve_time,
                },
            }
        }
        Err(err) => {
            // A time-limit termination surfaces as an unspecific solver
            // error; it is reported as unknown, never as success.
            let status = match err {
                ResolutionError::Infeasible => SolveStatus::Infeasible,
                ResolutionError::Unbounded => SolveStatus::Error,
                _ => SolveStatus::Unknown,
            };
            info!("no solution: {} ({err})", status.as_str());
            GenerationResult::Failed {
                solver_status: status.as_str().to_string(),
                error: err.to_string(),
                solve_time: Some(solve_time),
            }
        }
    };
    record_run(store, &result);
    Ok(result)
}

/// Reifies true-valued variables into assignment records, sorted for
/// deterministic output.
fn extract(
    snapshot: &Snapshot,
    space: &VariableSpace,
    solution: &impl Solution,
) -> Vec<Assignment> {
    let section_of: HashMap<OfferingId, SectionId> = snapshot
        .offerings
        .iter()
        .map(|o| (o.id, o.section_id))
        .collect();
    let mut assignments: Vec<Assignment> = space
        .vars
        .iter()
        .filter(|(_, var)| solution.value(**var) > 0.9)
        .map(|((offering_id, time_slot_id, room_id), _)| Assignment {
            offering_id: *offering_id,
            section_id: section_of[offering_id],
            room_id: *room_id,
            time_slot_id: *time_slot_id,
        })
        .collect();
    assignments.sort();
    assignments
}

/// Best-effort audit record; a failure to write it is logged, not raised.
fn record_run<S: TimetableStore + ?Sized>(store: &S, result: &GenerationResult) {
    let run = match result {
        GenerationResult::Success {
            solver_status,
            total_slots,
            solve_time,
            ..
        } => GenerationRun {
            id: 0,
            created_at: Utc::now(),
            status: RunStatus::Success,
            solver_status: solver_status.clone(),
            total_slots: *total_slots,
            solve_time_seconds: *solve_time,
            notes: String::new(),
        },
        GenerationResult::Failed {
            solver_status,
            error,
            solve_time,
        } => GenerationRun {
            id: 0,
            created_at: Utc::now(),
            status: RunStatus::Failed,
            solver_status: solver_status.clone(),
            total_slots: 0,
            solve_time_seconds: solve_time.unwrap_or(0.0),
            notes: error.clone(),
        },
    };
    if let Err(err) = store.insert_generation_run(run) {
        error!("failed to record generation run: {err}");
    }
}
