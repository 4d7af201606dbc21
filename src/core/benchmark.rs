use super::expenses::{ExpenseYear, gross_up};

/// Share of the balance a traditional portfolio may spend each year.
pub const SAFE_WITHDRAWAL_RATE: f64 = 0.04;

/// Single-pool traditional portfolio used as the comparison path.
#[derive(Debug, Clone)]
pub struct BenchmarkPath {
    return_rate: f64,
    tax_rate: f64,
    balance: f64,
    retired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkYear {
    pub balance: f64,
    pub safe_income: f64,
    /// Set only in the year the safe income first covers expenses.
    pub freedom_capital: Option<f64>,
}

impl BenchmarkPath {
    pub fn new(starting_balance: f64, return_rate: f64, tax_rate: f64) -> Self {
        Self {
            return_rate,
            tax_rate,
            balance: starting_balance.max(0.0),
            retired: false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_retired(&self) -> bool {
        self.retired
    }

    /// Freedom is also the retirement transition: contributions stop and
    /// withdrawals start from the following year.
    pub fn step(&mut self, annual_contribution: f64, expenses: ExpenseYear) -> BenchmarkYear {
        let growth = self.balance * self.return_rate / 100.0;
        let safe_income = (self.balance + growth) * SAFE_WITHDRAWAL_RATE;
        let mut freedom_capital = None;

        if self.retired {
            let withdrawal = gross_up(expenses.net, self.tax_rate);
            self.balance = (self.balance + growth - withdrawal).max(0.0);
        } else {
            if safe_income >= expenses.net {
                freedom_capital = Some(self.balance + growth);
                self.retired = true;
            }
            self.balance = (self.balance + growth + annual_contribution.max(0.0)).max(0.0);
        }

        BenchmarkYear {
            balance: self.balance,
            safe_income,
            freedom_capital,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn expenses(net: f64, tax_rate: f64) -> ExpenseYear {
        ExpenseYear {
            net,
            gross: gross_up(net, tax_rate),
        }
    }

    #[test]
    fn accumulates_growth_and_contributions_before_freedom() {
        let mut path = BenchmarkPath::new(100_000.0, 7.0, 18.0);
        let year = path.step(24_000.0, expenses(60_000.0, 18.0));

        assert_approx(year.safe_income, 107_000.0 * 0.04);
        assert_approx(year.balance, 131_000.0);
        assert!(year.freedom_capital.is_none());
        assert!(!path.is_retired());
    }

    #[test]
    fn freedom_snapshots_capital_and_retires_next_year() {
        // 1.5M * 1.07 * 4% = 64 200 >= 60 000
        let mut path = BenchmarkPath::new(1_500_000.0, 7.0, 18.0);
        let first = path.step(24_000.0, expenses(60_000.0, 18.0));
        assert_approx(first.freedom_capital.unwrap_or_default(), 1_605_000.0);
        assert_approx(first.balance, 1_629_000.0);
        assert!(path.is_retired());

        let second = path.step(24_000.0, expenses(60_000.0, 18.0));
        assert!(second.freedom_capital.is_none());
        let expected = 1_629_000.0 * 1.07 - 60_000.0 / 0.82;
        assert_approx(second.balance, expected);
    }

    #[test]
    fn retired_balance_clamps_at_zero() {
        let mut path = BenchmarkPath::new(1_000.0, 0.0, 0.0);
        path.retired = true;
        let year = path.step(0.0, expenses(60_000.0, 0.0));
        assert_approx(year.balance, 0.0);
    }
}
