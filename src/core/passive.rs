//! Uncapped yield pool and the withdrawal policy that pays living costs from it.

use super::expenses::{ExpenseYear, after_tax, gross_up, safe_ratio};
use super::types::WithdrawalStrategy;

/// RPIC score at which passive income covers gross expenses.
pub const FREEDOM_RPIC: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WithdrawalPolicy {
    pub strategy: WithdrawalStrategy,
    pub yield_cap_percent: f64,
    pub retirement_income_monthly: f64,
    pub retirement_income_start_age: u32,
    pub tax_rate: f64,
}

#[derive(Debug, Clone)]
pub struct PassiveEngine {
    yield_rate: f64,
    policy: WithdrawalPolicy,
    balance: f64,
    freedom_reached: bool,
}

/// Inputs describing the year being simulated.
#[derive(Debug, Clone, Copy)]
pub struct PassiveYearContext {
    pub year: i32,
    pub age: u32,
    pub expenses: ExpenseYear,
    /// Contribution overflow, spillover and liquidation from the active engine.
    pub inflow: f64,
    /// Active balance after this year's active step, for the freedom snapshot.
    pub active_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassiveYear {
    pub balance: f64,
    pub income: f64,
    pub rpic_score: f64,
    pub retirement_income: f64,
    pub gross_withdrawal: f64,
    pub net_withdrawal: f64,
    pub freedom_achieved: bool,
    /// Set only in the year freedom first triggers.
    pub freedom_capital: Option<f64>,
}

pub fn rpic_score(income: f64, gross_expenses: f64) -> f64 {
    safe_ratio(income, gross_expenses) * 100.0
}

/// Annual retirement income credited at `age`, or 0 before it starts.
pub fn retirement_income_for_age(policy: &WithdrawalPolicy, age: u32) -> f64 {
    if age >= policy.retirement_income_start_age {
        (policy.retirement_income_monthly * 12.0).max(0.0)
    } else {
        0.0
    }
}

/// Gross amount the policy asks for this year, before the yield and balance caps.
fn requested_gross_withdrawal(
    policy: &WithdrawalPolicy,
    year: i32,
    net_expenses: f64,
    retirement_income: f64,
    freedom_reached: bool,
) -> f64 {
    let expense_need = || {
        let net_need = (net_expenses - retirement_income).max(0.0);
        gross_up(net_need, policy.tax_rate)
    };

    match policy.strategy {
        WithdrawalStrategy::CoverExpenses => expense_need(),
        WithdrawalStrategy::ReinvestAll => {
            if freedom_reached {
                expense_need()
            } else {
                0.0
            }
        }
        WithdrawalStrategy::CustomSchedule {
            start_year,
            annual_amount,
        } => {
            if year >= start_year {
                annual_amount.max(0.0)
            } else {
                0.0
            }
        }
    }
}

impl PassiveEngine {
    pub fn new(starting_balance: f64, yield_rate: f64, policy: WithdrawalPolicy) -> Self {
        Self {
            yield_rate,
            policy,
            balance: starting_balance.max(0.0),
            freedom_reached: false,
        }
    }

    pub fn step(&mut self, ctx: PassiveYearContext) -> PassiveYear {
        let income = self.balance * self.yield_rate / 100.0;
        let rpic_score = rpic_score(income, ctx.expenses.gross);

        let mut freedom_capital = None;
        if !self.freedom_reached && rpic_score >= FREEDOM_RPIC {
            self.freedom_reached = true;
            freedom_capital = Some(ctx.active_balance + self.balance);
        }

        let retirement_income = retirement_income_for_age(&self.policy, ctx.age);
        let requested = requested_gross_withdrawal(
            &self.policy,
            ctx.year,
            ctx.expenses.net,
            retirement_income,
            self.freedom_reached,
        );
        let yield_cap = (income * self.policy.yield_cap_percent / 100.0).max(0.0);
        let gross_withdrawal = requested.min(yield_cap).min(self.balance).max(0.0);

        self.balance = (self.balance + income + ctx.inflow.max(0.0) - gross_withdrawal).max(0.0);

        PassiveYear {
            balance: self.balance,
            income,
            rpic_score,
            retirement_income,
            gross_withdrawal,
            net_withdrawal: after_tax(gross_withdrawal, self.policy.tax_rate),
            freedom_achieved: self.freedom_reached,
            freedom_capital,
        }
    }
}
