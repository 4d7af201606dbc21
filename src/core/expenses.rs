use super::types::SimulationSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpenseYear {
    pub net: f64,
    pub gross: f64,
}

/// Converts a net (spendable) amount into the pre-tax amount needed to fund it.
/// Returns 0 when the tax rate leaves nothing to divide by.
pub fn gross_up(net: f64, tax_rate: f64) -> f64 {
    let keep = 1.0 - tax_rate / 100.0;
    if keep <= 0.0 {
        return 0.0;
    }
    net / keep
}

pub fn after_tax(gross: f64, tax_rate: f64) -> f64 {
    gross * (1.0 - tax_rate / 100.0)
}

/// `numerator / denominator`, or 0 when the denominator is not positive.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator <= 0.0 {
        return 0.0;
    }
    numerator / denominator
}

/// Produces this year's expense figure from last year's.
///
/// Inflation applies to every year after the first. The step-down cut applies
/// once, in the year the configured age is reached, and carries forward through
/// `previous_net` afterwards.
pub fn advance_expenses(
    settings: &SimulationSettings,
    previous_net: Option<f64>,
    age: u32,
) -> ExpenseYear {
    let mut net = match previous_net {
        None => settings.annual_expenses,
        Some(previous) => previous * (1.0 + settings.inflation_rate / 100.0),
    };

    if settings.step_down_enabled && age == settings.step_down_age {
        net *= 1.0 - settings.step_down_percent / 100.0;
    }

    let net = net.max(0.0);
    ExpenseYear {
        net,
        gross: gross_up(net, settings.tax_rate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::tests::sample_settings;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn first_year_uses_base_expenses_without_inflation() {
        let mut settings = sample_settings();
        settings.annual_expenses = 60_000.0;
        settings.inflation_rate = 3.0;
        settings.tax_rate = 18.0;

        let year = advance_expenses(&settings, None, settings.current_age);
        assert_approx(year.net, 60_000.0);
        assert_approx(year.gross, 60_000.0 / 0.82);
    }

    #[test]
    fn later_years_compound_inflation() {
        let mut settings = sample_settings();
        settings.inflation_rate = 3.0;
        settings.step_down_enabled = false;

        let year = advance_expenses(&settings, Some(50_000.0), settings.current_age + 1);
        assert_approx(year.net, 51_500.0);
    }

    #[test]
    fn step_down_applies_only_in_configured_year() {
        let mut settings = sample_settings();
        settings.inflation_rate = 0.0;
        settings.step_down_enabled = true;
        settings.step_down_age = 70;
        settings.step_down_percent = 20.0;

        let before = advance_expenses(&settings, Some(60_000.0), 69);
        assert_approx(before.net, 60_000.0);
        let at = advance_expenses(&settings, Some(before.net), 70);
        assert_approx(at.net, 48_000.0);
        let after = advance_expenses(&settings, Some(at.net), 71);
        assert_approx(after.net, 48_000.0);
    }

    #[test]
    fn step_down_is_ignored_when_disabled() {
        let mut settings = sample_settings();
        settings.inflation_rate = 0.0;
        settings.step_down_enabled = false;
        settings.step_down_age = 70;
        settings.step_down_percent = 20.0;

        let at = advance_expenses(&settings, Some(60_000.0), 70);
        assert_approx(at.net, 60_000.0);
    }

    #[test]
    fn gross_up_guards_full_tax_rate() {
        assert_approx(gross_up(10_000.0, 100.0), 0.0);
        assert_approx(gross_up(10_000.0, 0.0), 10_000.0);
        assert_approx(gross_up(8_200.0, 18.0), 10_000.0);
    }

    #[test]
    fn safe_ratio_guards_zero_and_negative_denominators() {
        assert_approx(safe_ratio(5.0, 0.0), 0.0);
        assert_approx(safe_ratio(5.0, -1.0), 0.0);
        assert_approx(safe_ratio(5.0, 2.0), 2.5);
        assert!(safe_ratio(1.0, 0.0).is_finite());
    }
}
