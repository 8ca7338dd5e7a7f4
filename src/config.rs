use serde::{Deserialize, Serialize};

/// How strictly the weekly session count binds each offering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SessionCountPolicy {
    /// Every offering is scheduled exactly `sessions_per_week` times.
    Strict,
    /// Degraded mode for overconstrained inputs: each offering is scheduled
    /// between one and `min(sessions_per_week, cap)` times.
    Relaxed { cap: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMode {
    /// Hard constraints only; any legal timetable is accepted.
    Feasibility,
    /// Hard constraints plus the soft-preference objective.
    Optimize,
}

/// Per-solve configuration. Every field has a default so HTTP callers can
/// send a partial body or none at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub mode: SolveMode,
    pub session_count_policy: SessionCountPolicy,
    /// Cap on analyzed offerings (ascending id). None schedules everything.
    pub max_offerings: Option<usize>,
    pub time_limit_seconds: f64,
    /// Solver threads; single-threaded by default for reproducibility.
    pub threads: i32,
    pub random_seed: i32,
    /// Weight per unit of |day-load difference| for a section.
    pub balance_weight: f64,
    /// Weight per placement in the first or last period of a day.
    pub edge_period_weight: f64,
    /// Weight per non-lab placement in a lab room. Zero keeps the original
    /// behavior of free lab fallback.
    pub lab_room_penalty: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: SolveMode::Optimize,
            session_count_policy: SessionCountPolicy::Strict,
            max_offerings: None,
            time_limit_seconds: 60.0,
            threads: 1,
            random_seed: 1234,
            balance_weight: 1.0,
            edge_period_weight: 1.0,
            lab_room_penalty: 0.0,
        }
    }
}
