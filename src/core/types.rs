use serde::Serialize;
use thiserror::Error;

/// Controls whether, and how much, the passive engine pays out in a given year.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WithdrawalStrategy {
    /// Compound everything until the wealth engine reaches freedom, then cover expenses.
    ReinvestAll,
    /// Withdraw the tax-grossed expense need every year.
    CoverExpenses,
    /// Withdraw a fixed gross amount every year from `start_year` onwards.
    #[serde(rename_all = "camelCase")]
    CustomSchedule { start_year: i32, annual_amount: f64 },
}

/// Inputs for one projection run. Rates and percentages are stored as percents
/// (`18.0` means 18%), matching how they are entered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSettings {
    pub current_age: u32,
    pub active_start: f64,
    pub passive_start: f64,
    pub monthly_contribution: f64,

    pub annual_expenses: f64,
    pub inflation_rate: f64,
    pub step_down_enabled: bool,
    pub step_down_age: u32,
    pub step_down_percent: f64,

    pub trading_cap: f64,
    pub active_return_rate: f64,
    pub passive_yield_rate: f64,
    pub active_phase_years: u32,
    pub cash_out_percent: f64,
    pub tax_rate: f64,

    pub ramp_up_enabled: bool,
    pub ramp_up_months: u32,

    pub withdrawal_strategy: WithdrawalStrategy,
    pub yield_cap_percent: f64,
    pub retirement_income_monthly: f64,
    pub retirement_income_start_age: u32,

    pub traditional_return_rate: f64,
    pub start_year: i32,
}

impl SimulationSettings {
    pub fn annual_contribution(&self) -> f64 {
        self.monthly_contribution * 12.0
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must be >= 0")]
    Negative { field: &'static str },
    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },
    #[error("{field} must be between 0 and 100, got {value}")]
    PercentOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be >= 0 and < 100, got {value}")]
    PercentNotBelowHundred { field: &'static str, value: f64 },
    #[error("{field} must be > -100, got {value}")]
    RateTooLow { field: &'static str, value: f64 },
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("ramp_up_months must be > 0 when ramp-up is enabled")]
    RampDurationZero,
}

impl SettingsError {
    /// Name of the settings field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonFinite { field }
            | Self::Negative { field }
            | Self::NotPositive { field }
            | Self::PercentOutOfRange { field, .. }
            | Self::PercentNotBelowHundred { field, .. }
            | Self::RateTooLow { field, .. }
            | Self::OutOfRange { field, .. } => field,
            Self::RampDurationZero => "ramp_up_months",
        }
    }
}

/// One simulated year. Rows are produced in ascending year order and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    pub year: i32,
    pub age: u32,
    pub active_balance: f64,
    pub passive_balance: f64,
    pub traditional_balance: f64,
    pub active_net_profit: f64,
    pub passive_income: f64,
    pub traditional_safe_income: f64,
    pub current_expenses: f64,
    pub retirement_income: f64,
    pub gross_withdrawal: f64,
    pub net_withdrawal: f64,
    pub spillover: f64,
    pub rpic_score: f64,
    pub cap_hit: bool,
    pub freedom_achieved: bool,
    pub active_phase_active: bool,
}

impl YearRow {
    pub fn wealth_engine_total(&self) -> f64 {
        self.active_balance + self.passive_balance
    }
}

/// A value that can be assigned at most once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Latched<T>(Option<T>);

impl<T: Copy> Latched<T> {
    pub const fn unset() -> Self {
        Self(None)
    }

    /// Stores `value` if nothing is stored yet. Returns true when this call latched.
    pub fn latch(&mut self, value: T) -> bool {
        if self.0.is_some() {
            return false;
        }
        self.0 = Some(value);
        true
    }

    pub fn get(&self) -> Option<T> {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl<T: Copy> Default for Latched<T> {
    fn default() -> Self {
        Self::unset()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneSet {
    pub active_profit_25k_year: Latched<i32>,
    pub active_profit_100k_year: Latched<i32>,
    pub passive_500k_year: Latched<i32>,
    pub passive_1m_year: Latched<i32>,
    pub passive_2m_year: Latched<i32>,
    pub passive_5m_year: Latched<i32>,
    pub passive_10m_year: Latched<i32>,
    pub cap_hit_year: Latched<i32>,
    pub active_phase_end_year: Latched<i32>,
    pub freedom_year: Latched<i32>,
    pub benchmark_freedom_year: Latched<i32>,
    pub freedom_capital_required: Latched<f64>,
    pub benchmark_capital_required: Latched<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSet {
    pub freedom_age: Option<u32>,
    pub benchmark_freedom_age: Option<u32>,
    pub years_saved: Option<i32>,
    pub capital_required_wealth_engine: Option<f64>,
    pub capital_required_benchmark: Option<f64>,
    pub capital_saved_percent: Option<f64>,
    pub legacy_wealth_engine: f64,
    pub legacy_benchmark: f64,
    pub passive_capital_target: f64,
    pub total_withdrawn_net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub years: Vec<YearRow>,
    pub milestones: MilestoneSet,
    pub kpis: KpiSet,
}
