mod active;
mod benchmark;
mod engine;
mod expenses;
mod kpi;
mod milestones;
mod passive;
mod ramp;
mod solver;
mod types;

pub use active::{ActiveEngine, ActivePhase, ActiveYear};
pub use benchmark::{BenchmarkPath, BenchmarkYear, SAFE_WITHDRAWAL_RATE};
pub use engine::{
    HORIZON_AGE, MIN_PROJECTION_YEARS, START_YEAR_RANGE, projection_years, run_projection,
    validate_settings,
};
pub use expenses::{ExpenseYear, advance_expenses, gross_up};
pub use kpi::derive_kpis;
pub use milestones::{FreedomEvents, MilestoneTracker};
pub use passive::{FREEDOM_RPIC, PassiveEngine, PassiveYear, PassiveYearContext, WithdrawalPolicy};
pub use ramp::effective_active_return;
pub use solver::{
    GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalType, SolveError, solve_goal,
};
pub use types::{
    KpiSet, Latched, MilestoneSet, Projection, SettingsError, SimulationSettings,
    WithdrawalStrategy, YearRow,
};
