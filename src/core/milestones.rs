use tracing::debug;

use super::types::{Latched, MilestoneSet, YearRow};

const ACTIVE_PROFIT_25K: f64 = 25_000.0;
const ACTIVE_PROFIT_100K: f64 = 100_000.0;
const PASSIVE_500K: f64 = 500_000.0;
const PASSIVE_1M: f64 = 1_000_000.0;
const PASSIVE_2M: f64 = 2_000_000.0;
const PASSIVE_5M: f64 = 5_000_000.0;
const PASSIVE_10M: f64 = 10_000_000.0;

/// Freedom events that happened during the year being observed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreedomEvents {
    pub wealth_engine_capital: Option<f64>,
    pub benchmark_capital: Option<f64>,
}

/// Watches each finished year and latches the first year every milestone is met.
#[derive(Debug, Clone, Default)]
pub struct MilestoneTracker {
    milestones: MilestoneSet,
}

fn latch_when<T: Copy + std::fmt::Debug>(
    slot: &mut Latched<T>,
    condition: bool,
    value: T,
    name: &'static str,
) {
    if condition && slot.latch(value) {
        debug!(milestone = name, value = ?value, "milestone reached");
    }
}

impl MilestoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn milestones(&self) -> &MilestoneSet {
        &self.milestones
    }

    pub fn into_milestones(self) -> MilestoneSet {
        self.milestones
    }

    pub fn observe(&mut self, row: &YearRow, events: FreedomEvents) {
        let m = &mut self.milestones;
        let year = row.year;

        latch_when(
            &mut m.active_profit_25k_year,
            row.active_net_profit >= ACTIVE_PROFIT_25K,
            year,
            "active_profit_25k",
        );
        latch_when(
            &mut m.active_profit_100k_year,
            row.active_net_profit >= ACTIVE_PROFIT_100K,
            year,
            "active_profit_100k",
        );

        for (slot, threshold, name) in [
            (&mut m.passive_500k_year, PASSIVE_500K, "passive_500k"),
            (&mut m.passive_1m_year, PASSIVE_1M, "passive_1m"),
            (&mut m.passive_2m_year, PASSIVE_2M, "passive_2m"),
            (&mut m.passive_5m_year, PASSIVE_5M, "passive_5m"),
            (&mut m.passive_10m_year, PASSIVE_10M, "passive_10m"),
        ] {
            latch_when(slot, row.passive_balance >= threshold, year, name);
        }

        latch_when(&mut m.cap_hit_year, row.cap_hit, year, "cap_hit");
        latch_when(
            &mut m.active_phase_end_year,
            !row.active_phase_active,
            year,
            "active_phase_end",
        );

        if let Some(capital) = events.wealth_engine_capital {
            latch_when(&mut m.freedom_year, true, year, "freedom");
            latch_when(
                &mut m.freedom_capital_required,
                true,
                capital,
                "freedom_capital_required",
            );
        }
        if let Some(capital) = events.benchmark_capital {
            latch_when(&mut m.benchmark_freedom_year, true, year, "benchmark_freedom");
            latch_when(
                &mut m.benchmark_capital_required,
                true,
                capital,
                "benchmark_capital_required",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(year: i32) -> YearRow {
        YearRow {
            year,
            age: 30 + (year - 2025) as u32,
            active_balance: 0.0,
            passive_balance: 0.0,
            traditional_balance: 0.0,
            active_net_profit: 0.0,
            passive_income: 0.0,
            traditional_safe_income: 0.0,
            current_expenses: 60_000.0,
            retirement_income: 0.0,
            gross_withdrawal: 0.0,
            net_withdrawal: 0.0,
            spillover: 0.0,
            rpic_score: 0.0,
            cap_hit: false,
            freedom_achieved: false,
            active_phase_active: true,
        }
    }

    #[test]
    fn latched_cell_refuses_second_write() {
        let mut cell = Latched::unset();
        assert!(cell.latch(2030));
        assert!(!cell.latch(2031));
        assert_eq!(cell.get(), Some(2030));
    }

    #[test]
    fn passive_thresholds_latch_first_crossing_year_only() {
        let mut tracker = MilestoneTracker::new();

        let mut first = row(2025);
        first.passive_balance = 1_200_000.0;
        tracker.observe(&first, FreedomEvents::default());

        let mut second = row(2026);
        second.passive_balance = 600_000.0;
        tracker.observe(&second, FreedomEvents::default());

        let mut third = row(2027);
        third.passive_balance = 2_500_000.0;
        tracker.observe(&third, FreedomEvents::default());

        let m = tracker.milestones();
        assert_eq!(m.passive_500k_year.get(), Some(2025));
        assert_eq!(m.passive_1m_year.get(), Some(2025));
        assert_eq!(m.passive_2m_year.get(), Some(2027));
        assert_eq!(m.passive_5m_year.get(), None);
        assert_eq!(m.passive_10m_year.get(), None);
    }

    #[test]
    fn active_profit_and_phase_milestones_latch() {
        let mut tracker = MilestoneTracker::new();

        let mut first = row(2025);
        first.active_net_profit = 30_000.0;
        tracker.observe(&first, FreedomEvents::default());

        let mut second = row(2026);
        second.active_net_profit = 120_000.0;
        second.cap_hit = true;
        tracker.observe(&second, FreedomEvents::default());

        let mut third = row(2027);
        third.cap_hit = true;
        third.active_phase_active = false;
        tracker.observe(&third, FreedomEvents::default());

        let m = tracker.milestones();
        assert_eq!(m.active_profit_25k_year.get(), Some(2025));
        assert_eq!(m.active_profit_100k_year.get(), Some(2026));
        assert_eq!(m.cap_hit_year.get(), Some(2026));
        assert_eq!(m.active_phase_end_year.get(), Some(2027));
    }

    #[test]
    fn freedom_events_latch_year_and_capital_once() {
        let mut tracker = MilestoneTracker::new();
        tracker.observe(
            &row(2030),
            FreedomEvents {
                wealth_engine_capital: Some(800_000.0),
                benchmark_capital: None,
            },
        );
        tracker.observe(
            &row(2031),
            FreedomEvents {
                wealth_engine_capital: Some(900_000.0),
                benchmark_capital: Some(1_500_000.0),
            },
        );

        let m = tracker.milestones();
        assert_eq!(m.freedom_year.get(), Some(2030));
        assert_eq!(m.freedom_capital_required.get(), Some(800_000.0));
        assert_eq!(m.benchmark_freedom_year.get(), Some(2031));
        assert_eq!(m.benchmark_capital_required.get(), Some(1_500_000.0));
    }
}
