//! Ramp-up curve for the active return.
//!
//! Efficiency rises linearly from 50% at the start of the ramp to 100% once the
//! ramp completes. A year's effective rate is the nominal rate scaled by the
//! average efficiency over that year.

const START_EFFICIENCY: f64 = 0.5;

fn efficiency_at(elapsed_years: f64, ramp_years: f64) -> f64 {
    let progress = (elapsed_years / ramp_years).min(1.0);
    START_EFFICIENCY + (1.0 - START_EFFICIENCY) * progress
}

/// Average efficiency over `[year_index, year_index + 1)`.
pub fn ramp_efficiency(ramp_up_months: u32, year_index: u32) -> f64 {
    if ramp_up_months == 0 {
        return 1.0;
    }

    let ramp_years = ramp_up_months as f64 / 12.0;
    let year_start = year_index as f64;
    let year_end = year_start + 1.0;

    if year_start >= ramp_years {
        return 1.0;
    }

    if year_end <= ramp_years {
        return (efficiency_at(year_start, ramp_years) + efficiency_at(year_end, ramp_years)) * 0.5;
    }

    // Straddles the end of the ramp: weight the ramping and full-speed parts by time.
    let ramp_share = ramp_years - year_start;
    let ramp_average = (efficiency_at(year_start, ramp_years) + 1.0) * 0.5;
    ramp_share * ramp_average + (1.0 - ramp_share)
}

/// Effective active return (in percent) for the given zero-based year.
pub fn effective_active_return(
    nominal_rate: f64,
    ramp_up_enabled: bool,
    ramp_up_months: u32,
    year_index: u32,
) -> f64 {
    if !ramp_up_enabled {
        return nominal_rate;
    }
    nominal_rate * ramp_efficiency(ramp_up_months, year_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn disabled_ramp_returns_nominal_rate() {
        assert_approx(effective_active_return(30.0, false, 18, 0), 30.0);
        assert_approx(effective_active_return(30.0, false, 18, 5), 30.0);
    }

    #[test]
    fn eighteen_month_ramp_averages_first_year_endpoints() {
        // ((0.5) + (0.5 + 0.5 * 1/1.5)) / 2 = 2/3
        assert_approx(effective_active_return(30.0, true, 18, 0), 20.0);
    }

    #[test]
    fn eighteen_month_ramp_blends_boundary_year_by_months() {
        // Six months at avg(0.8333.., 1.0), six months at 1.0.
        let efficiency = 0.5 * ((0.5 + 0.5 / 1.5 + 1.0) / 2.0) + 0.5;
        assert_approx(effective_active_return(30.0, true, 18, 1), 30.0 * efficiency);
        assert_approx(effective_active_return(30.0, true, 18, 1), 28.75);
    }

    #[test]
    fn two_year_ramp_hand_calculation() {
        assert_approx(effective_active_return(30.0, true, 24, 0), 18.75);
        assert_approx(effective_active_return(30.0, true, 24, 1), 26.25);
        assert_approx(effective_active_return(30.0, true, 24, 2), 30.0);
    }

    #[test]
    fn years_after_ramp_use_full_rate() {
        assert_approx(effective_active_return(30.0, true, 18, 2), 30.0);
        assert_approx(effective_active_return(30.0, true, 12, 1), 30.0);
    }

    #[test]
    fn ramp_shorter_than_a_year_blends_within_year_zero() {
        // 6 month ramp: half the year averages 0.75, other half at 1.0.
        assert_approx(ramp_efficiency(6, 0), 0.5 * 0.75 + 0.5);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_efficiency_is_bounded_and_non_decreasing(
            months in 1u32..120,
            year in 0u32..15
        ) {
            let this_year = ramp_efficiency(months, year);
            let next_year = ramp_efficiency(months, year + 1);
            prop_assert!((0.5..=1.0).contains(&this_year));
            prop_assert!(next_year + 1e-12 >= this_year);
        }
    }
}
