use super::expenses::{gross_up, safe_ratio};
use super::types::{KpiSet, MilestoneSet, SimulationSettings, YearRow};

fn age_at(settings: &SimulationSettings, year: i32) -> Option<u32> {
    let offset = year.checked_sub(settings.start_year)?;
    u32::try_from(offset)
        .ok()
        .and_then(|offset| settings.current_age.checked_add(offset))
}

/// Passive balance whose yield would cover `gross_expenses`.
pub fn passive_capital_target(gross_expenses: f64, yield_rate: f64) -> f64 {
    safe_ratio(gross_expenses, yield_rate / 100.0)
}

/// Summarises a finished run.
pub fn derive_kpis(
    settings: &SimulationSettings,
    rows: &[YearRow],
    milestones: &MilestoneSet,
) -> KpiSet {
    let freedom_year = milestones.freedom_year.get();
    let benchmark_year = milestones.benchmark_freedom_year.get();

    let years_saved = match (freedom_year, benchmark_year) {
        (Some(engine), Some(benchmark)) => Some(benchmark - engine),
        _ => None,
    };

    let engine_capital = milestones.freedom_capital_required.get();
    let benchmark_capital = milestones.benchmark_capital_required.get();
    let capital_saved_percent = match (engine_capital, benchmark_capital) {
        (Some(engine), Some(benchmark)) => Some(safe_ratio(benchmark - engine, benchmark) * 100.0),
        _ => None,
    };

    let (legacy_wealth_engine, legacy_benchmark) = rows
        .last()
        .map(|row| (row.wealth_engine_total(), row.traditional_balance))
        .unwrap_or((0.0, 0.0));

    let first_gross_expenses = rows
        .first()
        .map(|row| gross_up(row.current_expenses, settings.tax_rate))
        .unwrap_or(0.0);

    KpiSet {
        freedom_age: freedom_year.and_then(|year| age_at(settings, year)),
        benchmark_freedom_age: benchmark_year.and_then(|year| age_at(settings, year)),
        years_saved,
        capital_required_wealth_engine: engine_capital,
        capital_required_benchmark: benchmark_capital,
        capital_saved_percent,
        legacy_wealth_engine,
        legacy_benchmark,
        passive_capital_target: passive_capital_target(
            first_gross_expenses,
            settings.passive_yield_rate,
        ),
        total_withdrawn_net: rows.iter().map(|row| row.net_withdrawal).sum(),
    }
}
