use serde::Serialize;
use thiserror::Error;

use super::engine::{HORIZON_AGE, run_projection, validate_settings};
use super::types::{SettingsError, SimulationSettings};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    /// Smallest monthly contribution that reaches freedom by the target age.
    RequiredContribution,
    /// Largest starting annual expense figure that still reaches freedom by the target age.
    MaxExpenses,
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub goal_type: GoalType,
    pub target_freedom_age: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub freedom_age: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub goal_type: GoalType,
    pub target_freedom_age: u32,
    pub search_min: f64,
    pub search_max: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    pub solved_value: Option<f64>,
    pub achieved_freedom_age: Option<u32>,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    pub feasible: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("invalid solver config: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub fn solve_goal(
    settings: &SimulationSettings,
    config: GoalSolveConfig,
) -> Result<GoalSolveResult, SolveError> {
    validate_config(settings, config)?;
    validate_settings(settings)?;

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let low_age = evaluate_candidate(settings, config, config.search_min)?;
    let high_age = evaluate_candidate(settings, config, config.search_max)?;
    let meets = |age: Option<u32>| age.is_some_and(|age| age <= config.target_freedom_age);

    let mut solved_value = None;
    let mut converged = false;
    let feasible;
    let message;

    match config.goal_type {
        GoalType::RequiredContribution => {
            if meets(low_age) {
                solved_value = Some(config.search_min);
                converged = true;
                feasible = true;
                message = "Already reaches freedom at the lower contribution bound.".to_string();
            } else if !meets(high_age) {
                feasible = false;
                message = "No feasible contribution found within the search bounds.".to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let freedom_age = evaluate_candidate(settings, config, mid)?;
                    iterations.push(GoalSolveIteration {
                        iteration: it,
                        lower_bound: lo,
                        upper_bound: hi,
                        candidate_value: mid,
                        freedom_age,
                    });

                    if meets(freedom_age) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        break;
                    }
                }
                solved_value = Some(hi);
                feasible = true;
                message = if converged {
                    "Solved required monthly contribution.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
        GoalType::MaxExpenses => {
            if !meets(low_age) {
                feasible = false;
                message = "No feasible expense level found within the search bounds.".to_string();
            } else if meets(high_age) {
                solved_value = Some(config.search_max);
                converged = true;
                feasible = true;
                message = "Upper expense bound still reaches freedom; increase search max."
                    .to_string();
            } else {
                let mut lo = config.search_min;
                let mut hi = config.search_max;
                let mut it = 0;
                while it < config.max_iterations {
                    it += 1;
                    let mid = (lo + hi) * 0.5;
                    let freedom_age = evaluate_candidate(settings, config, mid)?;
                    iterations.push(GoalSolveIteration {
                        iteration: it,
                        lower_bound: lo,
                        upper_bound: hi,
                        candidate_value: mid,
                        freedom_age,
                    });

                    if meets(freedom_age) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }

                    if (hi - lo).abs() <= config.tolerance {
                        converged = true;
                        break;
                    }
                }
                solved_value = Some(lo);
                feasible = true;
                message = if converged {
                    "Solved maximum sustainable expenses.".to_string()
                } else {
                    "Reached max iterations before tolerance was met; returning best estimate."
                        .to_string()
                };
            }
        }
    }

    let achieved_freedom_age = match solved_value {
        Some(value) => evaluate_candidate(settings, config, value)?,
        None => None,
    };

    Ok(GoalSolveResult {
        goal_type: config.goal_type,
        target_freedom_age: config.target_freedom_age,
        search_min: config.search_min,
        search_max: config.search_max,
        tolerance: config.tolerance,
        max_iterations: config.max_iterations,
        solved_value,
        achieved_freedom_age,
        iterations,
        converged,
        feasible,
        message,
    })
}

fn evaluate_candidate(
    base: &SimulationSettings,
    config: GoalSolveConfig,
    candidate_value: f64,
) -> Result<Option<u32>, SettingsError> {
    let mut settings = base.clone();
    match config.goal_type {
        GoalType::RequiredContribution => settings.monthly_contribution = candidate_value.max(0.0),
        GoalType::MaxExpenses => settings.annual_expenses = candidate_value.max(0.0),
    }
    Ok(run_projection(&settings)?.kpis.freedom_age)
}

fn validate_config(settings: &SimulationSettings, config: GoalSolveConfig) -> Result<(), SolveError> {
    if config.target_freedom_age < settings.current_age {
        return Err(SolveError::InvalidConfig(
            "target_freedom_age must be >= current_age",
        ));
    }
    if config.target_freedom_age >= HORIZON_AGE {
        return Err(SolveError::InvalidConfig(
            "target_freedom_age must be below the projection horizon",
        ));
    }
    if !config.search_min.is_finite() || !config.search_max.is_finite() {
        return Err(SolveError::InvalidConfig("search bounds must be finite"));
    }
    if config.search_min < 0.0 {
        return Err(SolveError::InvalidConfig("search_min must be >= 0"));
    }
    if config.search_max <= config.search_min {
        return Err(SolveError::InvalidConfig(
            "search_max must be greater than search_min",
        ));
    }
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return Err(SolveError::InvalidConfig("tolerance must be > 0"));
    }
    if config.max_iterations == 0 {
        return Err(SolveError::InvalidConfig("max_iterations must be > 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::WithdrawalStrategy;
    use crate::core::engine::tests::sample_settings;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    /// Passive-only settings where freedom needs a 10% yield to cover expenses.
    fn deterministic_settings() -> SimulationSettings {
        let mut settings = sample_settings();
        settings.active_start = 0.0;
        settings.passive_start = 0.0;
        settings.active_phase_years = 0;
        settings.monthly_contribution = 0.0;
        settings.annual_expenses = 10_000.0;
        settings.inflation_rate = 0.0;
        settings.tax_rate = 0.0;
        settings.passive_yield_rate = 10.0;
        settings.ramp_up_enabled = false;
        settings.withdrawal_strategy = WithdrawalStrategy::ReinvestAll;
        settings
    }

    #[test]
    fn required_contribution_solver_finds_deterministic_solution() {
        // One year of contributions must reach 100 000 so year two yields 10 000.
        let settings = deterministic_settings();
        let config = GoalSolveConfig {
            goal_type: GoalType::RequiredContribution,
            target_freedom_age: 31,
            search_min: 0.0,
            search_max: 20_000.0,
            tolerance: 1.0,
            max_iterations: 40,
        };

        let result = solve_goal(&settings, config).expect("must solve");
        assert!(result.feasible);
        assert!(result.converged);
        assert_close(
            result.solved_value.expect("value expected"),
            100_000.0 / 12.0,
            config.tolerance + 1e-6,
        );
        assert_eq!(result.achieved_freedom_age, Some(31));
        assert!(!result.iterations.is_empty());
    }

    #[test]
    fn max_expenses_solver_finds_deterministic_solution() {
        let mut settings = deterministic_settings();
        settings.passive_start = 500_000.0;

        let config = GoalSolveConfig {
            goal_type: GoalType::MaxExpenses,
            target_freedom_age: 30,
            search_min: 1_000.0,
            search_max: 100_000.0,
            tolerance: 1.0,
            max_iterations: 40,
        };

        let result = solve_goal(&settings, config).expect("must solve");
        assert!(result.feasible);
        assert_close(
            result.solved_value.expect("value expected"),
            50_000.0,
            config.tolerance + 1e-6,
        );
        assert_eq!(result.achieved_freedom_age, Some(30));
    }

    #[test]
    fn required_contribution_solver_reports_infeasible_when_bounds_too_low() {
        let settings = deterministic_settings();
        let config = GoalSolveConfig {
            goal_type: GoalType::RequiredContribution,
            target_freedom_age: 31,
            search_min: 0.0,
            search_max: 5_000.0,
            tolerance: 1.0,
            max_iterations: 16,
        };

        let result = solve_goal(&settings, config).expect("must return result");
        assert!(!result.feasible);
        assert!(result.solved_value.is_none());
        assert!(result.achieved_freedom_age.is_none());
    }

    #[test]
    fn solver_rejects_bad_config_and_bad_settings() {
        let settings = deterministic_settings();
        let config = GoalSolveConfig {
            goal_type: GoalType::RequiredContribution,
            target_freedom_age: 29,
            search_min: 0.0,
            search_max: 5_000.0,
            tolerance: 1.0,
            max_iterations: 16,
        };
        assert!(matches!(
            solve_goal(&settings, config),
            Err(SolveError::InvalidConfig(_))
        ));

        let inverted = GoalSolveConfig {
            target_freedom_age: 40,
            search_min: 10.0,
            search_max: 1.0,
            ..config
        };
        assert!(matches!(
            solve_goal(&settings, inverted),
            Err(SolveError::InvalidConfig(_))
        ));

        let mut bad_settings = deterministic_settings();
        bad_settings.tax_rate = 100.0;
        let ok_config = GoalSolveConfig {
            target_freedom_age: 40,
            ..config
        };
        assert!(matches!(
            solve_goal(&bad_settings, ok_config),
            Err(SolveError::Settings(_))
        ));
    }
}
