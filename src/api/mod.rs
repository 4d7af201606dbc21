use axum::{
    Router,
    extract::{Json, Query},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    GoalSolveConfig, GoalSolveResult, GoalType, Projection, SettingsError, SimulationSettings,
    SolveError, WithdrawalStrategy, run_projection, solve_goal, validate_settings,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliWithdrawalStrategy {
    ReinvestAll,
    CoverExpenses,
    CustomSchedule,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliGoalType {
    RequiredContribution,
    MaxExpenses,
}

impl From<CliGoalType> for GoalType {
    fn from(value: CliGoalType) -> Self {
        match value {
            CliGoalType::RequiredContribution => GoalType::RequiredContribution,
            CliGoalType::MaxExpenses => GoalType::MaxExpenses,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
enum ApiWithdrawalStrategy {
    #[serde(alias = "reinvestAll", alias = "reinvest_all", alias = "reinvest")]
    ReinvestAll,
    #[serde(alias = "coverExpenses", alias = "cover_expenses", alias = "cover")]
    CoverExpenses,
    #[serde(alias = "customSchedule", alias = "custom_schedule", alias = "custom")]
    CustomSchedule,
}

impl From<ApiWithdrawalStrategy> for CliWithdrawalStrategy {
    fn from(value: ApiWithdrawalStrategy) -> Self {
        match value {
            ApiWithdrawalStrategy::ReinvestAll => CliWithdrawalStrategy::ReinvestAll,
            ApiWithdrawalStrategy::CoverExpenses => CliWithdrawalStrategy::CoverExpenses,
            ApiWithdrawalStrategy::CustomSchedule => CliWithdrawalStrategy::CustomSchedule,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalType {
    #[serde(alias = "requiredContribution", alias = "required_contribution")]
    RequiredContribution,
    #[serde(alias = "maxExpenses", alias = "max_expenses")]
    MaxExpenses,
}

impl From<ApiGoalType> for CliGoalType {
    fn from(value: ApiGoalType) -> Self {
        match value {
            ApiGoalType::RequiredContribution => CliGoalType::RequiredContribution,
            ApiGoalType::MaxExpenses => CliGoalType::MaxExpenses,
        }
    }
}

/// Settings overlay shared by the HTTP API and settings files. Every key is optional.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_age: Option<u32>,
    active_start: Option<f64>,
    passive_start: Option<f64>,
    monthly_contribution: Option<f64>,

    annual_expenses: Option<f64>,
    inflation_rate: Option<f64>,
    step_down_enabled: Option<bool>,
    step_down_age: Option<u32>,
    step_down_percent: Option<f64>,

    trading_cap: Option<f64>,
    active_return_rate: Option<f64>,
    passive_yield_rate: Option<f64>,
    active_phase_years: Option<u32>,
    cash_out_percent: Option<f64>,
    tax_rate: Option<f64>,

    ramp_up_enabled: Option<bool>,
    ramp_up_months: Option<u32>,

    withdrawal_strategy: Option<ApiWithdrawalStrategy>,
    custom_withdrawal_start_year: Option<i32>,
    custom_withdrawal_amount: Option<f64>,
    yield_cap_percent: Option<f64>,
    retirement_income_monthly: Option<f64>,
    retirement_income_start_age: Option<u32>,

    traditional_return_rate: Option<f64>,
    start_year: Option<i32>,
}

impl From<&SimulationSettings> for ProjectPayload {
    fn from(settings: &SimulationSettings) -> Self {
        let (strategy, custom_start_year, custom_amount) = match settings.withdrawal_strategy {
            WithdrawalStrategy::ReinvestAll => (ApiWithdrawalStrategy::ReinvestAll, None, None),
            WithdrawalStrategy::CoverExpenses => (ApiWithdrawalStrategy::CoverExpenses, None, None),
            WithdrawalStrategy::CustomSchedule {
                start_year,
                annual_amount,
            } => (
                ApiWithdrawalStrategy::CustomSchedule,
                Some(start_year),
                Some(annual_amount),
            ),
        };

        Self {
            current_age: Some(settings.current_age),
            active_start: Some(settings.active_start),
            passive_start: Some(settings.passive_start),
            monthly_contribution: Some(settings.monthly_contribution),
            annual_expenses: Some(settings.annual_expenses),
            inflation_rate: Some(settings.inflation_rate),
            step_down_enabled: Some(settings.step_down_enabled),
            step_down_age: Some(settings.step_down_age),
            step_down_percent: Some(settings.step_down_percent),
            trading_cap: Some(settings.trading_cap),
            active_return_rate: Some(settings.active_return_rate),
            passive_yield_rate: Some(settings.passive_yield_rate),
            active_phase_years: Some(settings.active_phase_years),
            cash_out_percent: Some(settings.cash_out_percent),
            tax_rate: Some(settings.tax_rate),
            ramp_up_enabled: Some(settings.ramp_up_enabled),
            ramp_up_months: Some(settings.ramp_up_months),
            withdrawal_strategy: Some(strategy),
            custom_withdrawal_start_year: custom_start_year,
            custom_withdrawal_amount: custom_amount,
            yield_cap_percent: Some(settings.yield_cap_percent),
            retirement_income_monthly: Some(settings.retirement_income_monthly),
            retirement_income_start_age: Some(settings.retirement_income_start_age),
            traditional_return_rate: Some(settings.traditional_return_rate),
            start_year: Some(settings.start_year),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SolvePayload {
    #[serde(flatten)]
    settings: ProjectPayload,
    goal: Option<ApiGoalType>,
    target_freedom_age: Option<u32>,
    search_min: Option<f64>,
    search_max: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "twin-engine",
    about = "Deterministic twin-engine wealth projection (capped active pool + passive income pool vs. a 4% benchmark)"
)]
struct Cli {
    #[arg(long, default_value_t = 30)]
    current_age: u32,
    #[arg(long, default_value_t = 50_000.0, help = "Opening active (trading) balance")]
    active_start: f64,
    #[arg(long, default_value_t = 10_000.0, help = "Opening passive (income) balance")]
    passive_start: f64,
    #[arg(long, default_value_t = 2_000.0)]
    monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = 60_000.0,
        help = "Net annual expenses in today's money"
    )]
    annual_expenses: f64,
    #[arg(long, default_value_t = 3.0, help = "Annual inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = false, action = ArgAction::Set)]
    step_down_enabled: bool,
    #[arg(long, default_value_t = 70, help = "Age at which expenses step down once")]
    step_down_age: u32,
    #[arg(long, default_value_t = 20.0, help = "Expense reduction at step-down in percent")]
    step_down_percent: f64,
    #[arg(long, default_value_t = 200_000.0, help = "Maximum active balance")]
    trading_cap: f64,
    #[arg(long, default_value_t = 30.0, help = "Nominal active return in percent")]
    active_return_rate: f64,
    #[arg(long, default_value_t = 12.0, help = "Passive yield in percent")]
    passive_yield_rate: f64,
    #[arg(long, default_value_t = 15, help = "Years before the active pool is liquidated")]
    active_phase_years: u32,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Haircut applied when the active pool is liquidated, in percent"
    )]
    cash_out_percent: f64,
    #[arg(long, default_value_t = 18.0, help = "Tax rate on profits and withdrawals in percent")]
    tax_rate: f64,
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    ramp_up_enabled: bool,
    #[arg(
        long,
        default_value_t = 18,
        help = "Months for active efficiency to ramp from 50% to 100%"
    )]
    ramp_up_months: u32,
    #[arg(
        long,
        value_enum,
        default_value_t = CliWithdrawalStrategy::CoverExpenses,
        help = "Passive withdrawal strategy"
    )]
    withdrawal_strategy: CliWithdrawalStrategy,
    #[arg(
        long,
        help = "First calendar year of custom withdrawals; required when --withdrawal-strategy=custom-schedule"
    )]
    custom_withdrawal_start_year: Option<i32>,
    #[arg(long, default_value_t = 0.0, help = "Gross annual custom withdrawal")]
    custom_withdrawal_amount: f64,
    #[arg(
        long,
        default_value_t = 80.0,
        help = "Maximum share of the year's passive income that may be withdrawn, in percent"
    )]
    yield_cap_percent: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly retirement income (pension)")]
    retirement_income_monthly: f64,
    #[arg(long, default_value_t = 67)]
    retirement_income_start_age: u32,
    #[arg(long, default_value_t = 7.0, help = "Benchmark portfolio return in percent")]
    traditional_return_rate: f64,
    #[arg(long, default_value_t = 2025)]
    start_year: i32,

    #[arg(
        long,
        help = "JSON settings file (camelCase keys); values in the file override flags"
    )]
    settings_file: Option<PathBuf>,
    #[arg(long, help = "Write the resolved settings to this JSON file")]
    save_settings: Option<PathBuf>,

    #[arg(long, value_enum, help = "Solve for a goal instead of printing the projection")]
    goal: Option<CliGoalType>,
    #[arg(long, help = "Freedom age the solver must reach; required with --goal")]
    target_freedom_age: Option<u32>,
    #[arg(long, help = "Lower solver bound; defaults depend on --goal")]
    search_min: Option<f64>,
    #[arg(long, help = "Upper solver bound; defaults depend on --goal")]
    search_max: Option<f64>,
    #[arg(long, default_value_t = 1.0)]
    tolerance: f64,
    #[arg(long, default_value_t = 60)]
    max_iterations: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    settings: SimulationSettings,
    #[serde(flatten)]
    projection: Projection,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    settings: SimulationSettings,
    #[serde(flatten)]
    result: GoalSolveResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn flag_name(field: &str) -> String {
    format!("--{}", field.replace('_', "-"))
}

fn settings_error_message(err: &SettingsError) -> String {
    let field = err.field();
    err.to_string().replacen(field, &flag_name(field), 1)
}

fn solve_error_message(err: &SolveError) -> String {
    match err {
        SolveError::Settings(inner) => settings_error_message(inner),
        other => other.to_string(),
    }
}

fn build_settings(cli: &Cli) -> Result<SimulationSettings, String> {
    if cli.step_down_enabled && cli.step_down_age < cli.current_age {
        return Err("--step-down-age must be >= --current-age when step-down is enabled".to_string());
    }

    let withdrawal_strategy = match cli.withdrawal_strategy {
        CliWithdrawalStrategy::ReinvestAll => WithdrawalStrategy::ReinvestAll,
        CliWithdrawalStrategy::CoverExpenses => WithdrawalStrategy::CoverExpenses,
        CliWithdrawalStrategy::CustomSchedule => {
            let Some(start_year) = cli.custom_withdrawal_start_year else {
                return Err(
                    "--custom-withdrawal-start-year is required when --withdrawal-strategy=custom-schedule"
                        .to_string(),
                );
            };
            WithdrawalStrategy::CustomSchedule {
                start_year,
                annual_amount: cli.custom_withdrawal_amount,
            }
        }
    };

    let settings = SimulationSettings {
        current_age: cli.current_age,
        active_start: cli.active_start,
        passive_start: cli.passive_start,
        monthly_contribution: cli.monthly_contribution,
        annual_expenses: cli.annual_expenses,
        inflation_rate: cli.inflation_rate,
        step_down_enabled: cli.step_down_enabled,
        step_down_age: cli.step_down_age,
        step_down_percent: cli.step_down_percent,
        trading_cap: cli.trading_cap,
        active_return_rate: cli.active_return_rate,
        passive_yield_rate: cli.passive_yield_rate,
        active_phase_years: cli.active_phase_years,
        cash_out_percent: cli.cash_out_percent,
        tax_rate: cli.tax_rate,
        ramp_up_enabled: cli.ramp_up_enabled,
        ramp_up_months: cli.ramp_up_months,
        withdrawal_strategy,
        yield_cap_percent: cli.yield_cap_percent,
        retirement_income_monthly: cli.retirement_income_monthly,
        retirement_income_start_age: cli.retirement_income_start_age,
        traditional_return_rate: cli.traditional_return_rate,
        start_year: cli.start_year,
    };

    validate_settings(&settings).map_err(|e| settings_error_message(&e))?;
    Ok(settings)
}

fn default_search_bounds(goal_type: GoalType) -> (f64, f64) {
    match goal_type {
        GoalType::RequiredContribution => (0.0, 50_000.0),
        GoalType::MaxExpenses => (1_000.0, 1_000_000.0),
    }
}

fn build_solve_config(cli: &Cli) -> Result<Option<GoalSolveConfig>, String> {
    let Some(goal) = cli.goal else {
        return Ok(None);
    };
    let Some(target_freedom_age) = cli.target_freedom_age else {
        return Err("--target-freedom-age is required when --goal is set".to_string());
    };

    let goal_type = GoalType::from(goal);
    let (default_min, default_max) = default_search_bounds(goal_type);
    Ok(Some(GoalSolveConfig {
        goal_type,
        target_freedom_age,
        search_min: cli.search_min.unwrap_or(default_min),
        search_max: cli.search_max.unwrap_or(default_max),
        tolerance: cli.tolerance,
        max_iterations: cli.max_iterations,
    }))
}

pub fn run_cli() -> Result<(), String> {
    let output = execute_cli(Cli::parse())?;
    println!("{output}");
    Ok(())
}

fn execute_cli(mut cli: Cli) -> Result<String, String> {
    if let Some(path) = cli.settings_file.take() {
        let payload = load_settings_file(&path)?;
        apply_payload(&mut cli, payload);
        info!(path = %path.display(), "loaded settings file");
    }

    let settings = build_settings(&cli)?;
    if let Some(path) = &cli.save_settings {
        save_settings_file(path, &settings)?;
        info!(path = %path.display(), "saved settings file");
    }

    let json = match build_solve_config(&cli)? {
        Some(config) => {
            let result = solve_goal(&settings, config).map_err(|e| solve_error_message(&e))?;
            info!(
                goal = ?result.goal_type,
                feasible = result.feasible,
                solved_value = ?result.solved_value,
                "goal solve complete"
            );
            serde_json::to_string_pretty(&SolveResponse { settings, result })
        }
        None => {
            let projection = run_projection(&settings).map_err(|e| settings_error_message(&e))?;
            info!(
                years = projection.years.len(),
                freedom_age = ?projection.kpis.freedom_age,
                "projection complete"
            );
            serde_json::to_string_pretty(&ProjectResponse {
                settings,
                projection,
            })
        }
    };
    json.map_err(|e| format!("failed to serialize output: {e}"))
}

fn load_settings_file(path: &Path) -> Result<ProjectPayload, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("failed to read settings file {}: {e}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| format!("invalid settings file {}: {e}", path.display()))
}

fn save_settings_file(path: &Path, settings: &SimulationSettings) -> Result<(), String> {
    let json = serde_json::to_string_pretty(&ProjectPayload::from(settings))
        .map_err(|e| format!("failed to serialize settings: {e}"))?;
    fs::write(path, json + "\n")
        .map_err(|e| format!("failed to write settings file {}: {e}", path.display()))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/solve", post(solve_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "twin-engine HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn solve_post_handler(Json(payload): Json<SolvePayload>) -> Response {
    solve_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let settings = match settings_from_payload(payload) {
        Ok(settings) => settings,
        Err(msg) => {
            warn!(error = %msg, "rejected projection payload");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match run_projection(&settings) {
        Ok(projection) => json_response(
            StatusCode::OK,
            ProjectResponse {
                settings,
                projection,
            },
        ),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &settings_error_message(&e)),
    }
}

async fn solve_handler_impl(payload: SolvePayload) -> Response {
    let (settings, config) = match solve_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected solve payload");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match solve_goal(&settings, config) {
        Ok(result) => json_response(StatusCode::OK, SolveResponse { settings, result }),
        Err(e) => {
            let msg = solve_error_message(&e);
            warn!(error = %msg, "solver rejected request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn settings_from_json(json: &str) -> Result<SimulationSettings, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    settings_from_payload(payload)
}

fn settings_from_payload(payload: ProjectPayload) -> Result<SimulationSettings, String> {
    let mut cli = default_cli_for_api();
    apply_payload(&mut cli, payload);
    build_settings(&cli)
}

fn solve_request_from_payload(
    payload: SolvePayload,
) -> Result<(SimulationSettings, GoalSolveConfig), String> {
    let mut cli = default_cli_for_api();
    apply_payload(&mut cli, payload.settings);

    cli.goal = payload.goal.map(CliGoalType::from);
    cli.target_freedom_age = payload.target_freedom_age;
    cli.search_min = payload.search_min;
    cli.search_max = payload.search_max;
    if let Some(v) = payload.tolerance {
        cli.tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        cli.max_iterations = v;
    }

    let config = build_solve_config(&cli)?.ok_or_else(|| "goal is required".to_string())?;
    let settings = build_settings(&cli)?;
    Ok((settings, config))
}

fn apply_payload(cli: &mut Cli, payload: ProjectPayload) {
    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.active_start {
        cli.active_start = v;
    }
    if let Some(v) = payload.passive_start {
        cli.passive_start = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }

    if let Some(v) = payload.annual_expenses {
        cli.annual_expenses = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.step_down_enabled {
        cli.step_down_enabled = v;
    }
    if let Some(v) = payload.step_down_age {
        cli.step_down_age = v;
    }
    if let Some(v) = payload.step_down_percent {
        cli.step_down_percent = v;
    }

    if let Some(v) = payload.trading_cap {
        cli.trading_cap = v;
    }
    if let Some(v) = payload.active_return_rate {
        cli.active_return_rate = v;
    }
    if let Some(v) = payload.passive_yield_rate {
        cli.passive_yield_rate = v;
    }
    if let Some(v) = payload.active_phase_years {
        cli.active_phase_years = v;
    }
    if let Some(v) = payload.cash_out_percent {
        cli.cash_out_percent = v;
    }
    if let Some(v) = payload.tax_rate {
        cli.tax_rate = v;
    }

    if let Some(v) = payload.ramp_up_enabled {
        cli.ramp_up_enabled = v;
    }
    if let Some(v) = payload.ramp_up_months {
        cli.ramp_up_months = v;
    }

    if let Some(v) = payload.withdrawal_strategy {
        cli.withdrawal_strategy = v.into();
    }
    if let Some(v) = payload.custom_withdrawal_start_year {
        cli.custom_withdrawal_start_year = Some(v);
    }
    if let Some(v) = payload.custom_withdrawal_amount {
        cli.custom_withdrawal_amount = v;
    }
    if let Some(v) = payload.yield_cap_percent {
        cli.yield_cap_percent = v;
    }
    if let Some(v) = payload.retirement_income_monthly {
        cli.retirement_income_monthly = v;
    }
    if let Some(v) = payload.retirement_income_start_age {
        cli.retirement_income_start_age = v;
    }

    if let Some(v) = payload.traditional_return_rate {
        cli.traditional_return_rate = v;
    }
    if let Some(v) = payload.start_year {
        cli.start_year = v;
    }
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 30,
        active_start: 50_000.0,
        passive_start: 10_000.0,
        monthly_contribution: 2_000.0,
        annual_expenses: 60_000.0,
        inflation_rate: 3.0,
        step_down_enabled: false,
        step_down_age: 70,
        step_down_percent: 20.0,
        trading_cap: 200_000.0,
        active_return_rate: 30.0,
        passive_yield_rate: 12.0,
        active_phase_years: 15,
        cash_out_percent: 0.0,
        tax_rate: 18.0,
        ramp_up_enabled: true,
        ramp_up_months: 18,
        withdrawal_strategy: CliWithdrawalStrategy::CoverExpenses,
        custom_withdrawal_start_year: None,
        custom_withdrawal_amount: 0.0,
        yield_cap_percent: 80.0,
        retirement_income_monthly: 0.0,
        retirement_income_start_age: 67,
        traditional_return_rate: 7.0,
        start_year: 2025,
        settings_file: None,
        save_settings: None,
        goal: None,
        target_freedom_age: None,
        search_min: None,
        search_max: None,
        tolerance: 1.0,
        max_iterations: 60,
    }
}
