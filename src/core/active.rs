//! Capped, high-return trading pool.
//!
//! The pool grows until it reaches the trading cap; from then on every dollar
//! of after-tax profit spills over to the passive engine. Once the active phase
//! has run for its configured number of years the pool is liquidated into the
//! passive engine and stays empty.

use tracing::debug;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ActivePhase {
    Growing,
    Capped,
    Ended,
}

#[derive(Debug, Clone)]
pub struct ActiveEngine {
    cap: f64,
    tax_rate: f64,
    phase_years: u32,
    cash_out_percent: f64,
    balance: f64,
    phase: ActivePhase,
}

/// Money the active engine hands to the passive engine in one year.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActiveYear {
    pub net_profit: f64,
    pub contribution_overflow: f64,
    pub spillover: f64,
    pub liquidation: f64,
    pub capped_this_year: bool,
    pub ended_this_year: bool,
}

impl ActiveYear {
    pub fn passive_inflow(&self) -> f64 {
        self.contribution_overflow + self.spillover + self.liquidation
    }
}

impl ActiveEngine {
    pub fn new(
        starting_balance: f64,
        cap: f64,
        tax_rate: f64,
        phase_years: u32,
        cash_out_percent: f64,
    ) -> Self {
        let balance = starting_balance.max(0.0).min(cap);
        let phase = if balance >= cap {
            ActivePhase::Capped
        } else {
            ActivePhase::Growing
        };
        Self {
            cap,
            tax_rate,
            phase_years,
            cash_out_percent,
            balance,
            phase,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn phase(&self) -> ActivePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != ActivePhase::Ended
    }

    /// Advances one year. `year_index` is zero-based from the start of the run,
    /// `effective_return` is in percent.
    pub fn step(
        &mut self,
        year_index: u32,
        effective_return: f64,
        annual_contribution: f64,
    ) -> ActiveYear {
        let contribution = annual_contribution.max(0.0);
        let mut outcome = ActiveYear::default();

        if self.phase != ActivePhase::Ended && year_index >= self.phase_years {
            outcome.liquidation = self.balance * (1.0 - self.cash_out_percent / 100.0);
            self.balance = 0.0;
            self.phase = ActivePhase::Ended;
            outcome.ended_this_year = true;
            debug!(
                year_index,
                liquidation = outcome.liquidation,
                "active phase ended"
            );
        }

        if self.phase == ActivePhase::Ended {
            outcome.contribution_overflow = contribution;
            return outcome;
        }

        let room = (self.cap - self.balance).max(0.0);
        let routed_here = contribution.min(room);
        outcome.contribution_overflow = contribution - routed_here;

        let gross_profit = self.balance * effective_return / 100.0;
        let tax = gross_profit * self.tax_rate / 100.0;
        outcome.net_profit = gross_profit - tax;

        let tentative = self.balance + outcome.net_profit + routed_here;
        if tentative >= self.cap {
            outcome.spillover = tentative - self.cap;
            self.balance = self.cap;
            if self.phase == ActivePhase::Growing {
                outcome.capped_this_year = true;
                debug!(year_index, spillover = outcome.spillover, "trading cap reached");
            }
            self.phase = ActivePhase::Capped;
        } else {
            self.balance = tentative.max(0.0);
            if self.phase == ActivePhase::Capped {
                self.phase = ActivePhase::Growing;
                debug!(year_index, balance = self.balance, "active balance fell below cap");
            }
        }

        outcome
    }
}
