use super::active::{ActiveEngine, ActivePhase};
use super::benchmark::BenchmarkPath;
use super::expenses::advance_expenses;
use super::kpi::derive_kpis;
use super::milestones::{FreedomEvents, MilestoneTracker};
use super::passive::{PassiveEngine, PassiveYearContext, WithdrawalPolicy};
use super::ramp::effective_active_return;
use super::types::{Projection, SettingsError, SimulationSettings, WithdrawalStrategy, YearRow};

/// Age at which the projection stops.
pub const HORIZON_AGE: u32 = 106;
/// Shortest projection, used when the current age is close to the horizon.
pub const MIN_PROJECTION_YEARS: u32 = 10;
/// Calendar years a run may start in.
pub const START_YEAR_RANGE: (i32, i32) = (1900, 2200);

/// Number of rows a run produces. The last row's end-of-year balances are the
/// balances on reaching the horizon age.
pub fn projection_years(current_age: u32) -> u32 {
    HORIZON_AGE
        .saturating_sub(current_age)
        .max(MIN_PROJECTION_YEARS)
}

pub fn validate_settings(settings: &SimulationSettings) -> Result<(), SettingsError> {
    if settings.current_age > HORIZON_AGE {
        return Err(SettingsError::OutOfRange {
            field: "current_age",
            value: i64::from(settings.current_age),
            min: 0,
            max: i64::from(HORIZON_AGE),
        });
    }
    let (min_year, max_year) = START_YEAR_RANGE;
    if !(min_year..=max_year).contains(&settings.start_year) {
        return Err(SettingsError::OutOfRange {
            field: "start_year",
            value: i64::from(settings.start_year),
            min: i64::from(min_year),
            max: i64::from(max_year),
        });
    }

    let mut numbers = vec![
        ("active_start", settings.active_start),
        ("passive_start", settings.passive_start),
        ("monthly_contribution", settings.monthly_contribution),
        ("annual_expenses", settings.annual_expenses),
        ("inflation_rate", settings.inflation_rate),
        ("step_down_percent", settings.step_down_percent),
        ("trading_cap", settings.trading_cap),
        ("active_return_rate", settings.active_return_rate),
        ("passive_yield_rate", settings.passive_yield_rate),
        ("cash_out_percent", settings.cash_out_percent),
        ("tax_rate", settings.tax_rate),
        ("yield_cap_percent", settings.yield_cap_percent),
        ("retirement_income_monthly", settings.retirement_income_monthly),
        ("traditional_return_rate", settings.traditional_return_rate),
    ];
    if let WithdrawalStrategy::CustomSchedule { annual_amount, .. } = settings.withdrawal_strategy
    {
        numbers.push(("custom_withdrawal_amount", annual_amount));
    }

    for &(field, value) in &numbers {
        if !value.is_finite() {
            return Err(SettingsError::NonFinite { field });
        }
    }

    for (field, value) in [
        ("active_start", settings.active_start),
        ("passive_start", settings.passive_start),
        ("monthly_contribution", settings.monthly_contribution),
        ("annual_expenses", settings.annual_expenses),
        ("passive_yield_rate", settings.passive_yield_rate),
        ("retirement_income_monthly", settings.retirement_income_monthly),
    ] {
        if value < 0.0 {
            return Err(SettingsError::Negative { field });
        }
    }
    if let WithdrawalStrategy::CustomSchedule { annual_amount, .. } = settings.withdrawal_strategy
    {
        if annual_amount < 0.0 {
            return Err(SettingsError::Negative {
                field: "custom_withdrawal_amount",
            });
        }
    }

    if settings.trading_cap <= 0.0 {
        return Err(SettingsError::NotPositive {
            field: "trading_cap",
        });
    }

    for (field, value) in [
        ("tax_rate", settings.tax_rate),
        ("yield_cap_percent", settings.yield_cap_percent),
        ("inflation_rate", settings.inflation_rate),
    ] {
        if !(0.0..100.0).contains(&value) {
            return Err(SettingsError::PercentNotBelowHundred { field, value });
        }
    }

    for (field, value) in [
        ("step_down_percent", settings.step_down_percent),
        ("cash_out_percent", settings.cash_out_percent),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(SettingsError::PercentOutOfRange { field, value });
        }
    }

    for (field, value) in [
        ("active_return_rate", settings.active_return_rate),
        ("traditional_return_rate", settings.traditional_return_rate),
    ] {
        if value <= -100.0 {
            return Err(SettingsError::RateTooLow { field, value });
        }
    }

    if settings.ramp_up_enabled && settings.ramp_up_months == 0 {
        return Err(SettingsError::RampDurationZero);
    }

    Ok(())
}

/// Runs the twin-engine projection alongside the traditional benchmark.
///
/// Same settings always produce the same rows, milestones and KPIs.
pub fn run_projection(settings: &SimulationSettings) -> Result<Projection, SettingsError> {
    validate_settings(settings)?;

    let years = projection_years(settings.current_age);
    let annual_contribution = settings.annual_contribution();

    let mut active = ActiveEngine::new(
        settings.active_start,
        settings.trading_cap,
        settings.tax_rate,
        settings.active_phase_years,
        settings.cash_out_percent,
    );
    // A starting active balance above the cap begins life in the passive pool.
    let opening_excess = (settings.active_start - settings.trading_cap).max(0.0);
    let mut passive = PassiveEngine::new(
        settings.passive_start + opening_excess,
        settings.passive_yield_rate,
        WithdrawalPolicy {
            strategy: settings.withdrawal_strategy,
            yield_cap_percent: settings.yield_cap_percent,
            retirement_income_monthly: settings.retirement_income_monthly,
            retirement_income_start_age: settings.retirement_income_start_age,
            tax_rate: settings.tax_rate,
        },
    );
    let mut benchmark = BenchmarkPath::new(
        settings.active_start + settings.passive_start,
        settings.traditional_return_rate,
        settings.tax_rate,
    );
    let mut tracker = MilestoneTracker::new();

    let mut rows = Vec::with_capacity(years as usize);
    let mut previous_expenses = None;

    for year_index in 0..years {
        let age = settings.current_age + year_index;
        let year = settings.start_year + year_index as i32;

        let active_return = effective_active_return(
            settings.active_return_rate,
            settings.ramp_up_enabled,
            settings.ramp_up_months,
            year_index,
        );
        let expenses = advance_expenses(settings, previous_expenses, age);
        previous_expenses = Some(expenses.net);

        let benchmark_year = benchmark.step(annual_contribution, expenses);

        let active_year = active.step(year_index, active_return, annual_contribution);

        let passive_year = passive.step(PassiveYearContext {
            year,
            age,
            expenses,
            inflow: active_year.passive_inflow(),
            active_balance: active.balance(),
        });

        let row = YearRow {
            year,
            age,
            active_balance: active.balance(),
            passive_balance: passive_year.balance,
            traditional_balance: benchmark_year.balance,
            active_net_profit: active_year.net_profit,
            passive_income: passive_year.income,
            traditional_safe_income: benchmark_year.safe_income,
            current_expenses: expenses.net,
            retirement_income: passive_year.retirement_income,
            gross_withdrawal: passive_year.gross_withdrawal,
            net_withdrawal: passive_year.net_withdrawal,
            spillover: active_year.spillover,
            rpic_score: passive_year.rpic_score,
            cap_hit: active.phase() == ActivePhase::Capped,
            freedom_achieved: passive_year.freedom_achieved,
            active_phase_active: active.is_active(),
        };

        tracker.observe(
            &row,
            FreedomEvents {
                wealth_engine_capital: passive_year.freedom_capital,
                benchmark_capital: benchmark_year.freedom_capital,
            },
        );
        rows.push(row);
    }

    let milestones = tracker.into_milestones();
    let kpis = derive_kpis(settings, &rows, &milestones);

    Ok(Projection {
        years: rows,
        milestones,
        kpis,
    })
}
