//! Financial appraisal primitives: NPV, IRR, payback and cost metrics.
//!
//! All quantities are in the scenario's currency. Cashflow slices are
//! year-ordered with index 0 holding the flow at the end of year 1; the
//! initial investment is passed separately and never discounted.
use crate::error::ModelError;

/// Convergence tolerance on |NPV| for the IRR search.
const IRR_TOLERANCE: f64 = 0.01;
/// Starting guess for the IRR search.
const IRR_INITIAL_GUESS: f64 = 0.10;
/// Bisection bracket for rates the Newton step may not leave.
const IRR_BRACKET: (f64, f64) = (-0.99, 10.0);

/// Result of the IRR search.
///
/// Non-convergence is a legitimate outcome for pathological cashflows (for
/// example all-negative flows, which have no root), not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IrrOutcome {
    /// The search found a rate with |NPV| below tolerance
    Converged(f64),
    /// Iteration budget exhausted; the last iterate is reported
    DidNotConverge {
        /// Best rate estimate when the budget ran out
        best_estimate: f64,
    },
}

impl IrrOutcome {
    /// The rate estimate regardless of convergence.
    pub fn rate(&self) -> f64 {
        match *self {
            IrrOutcome::Converged(rate) | IrrOutcome::DidNotConverge {
                best_estimate: rate,
            } => rate,
        }
    }
}

/// Time to recover the initial investment from undiscounted cashflows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaybackPeriod {
    /// Years until cumulative cashflow reaches the investment, with linear
    /// interpolation inside the crossing year
    Years(f64),
    /// Cumulative cashflow never reaches the investment
    Never,
}

/// Net present value: `−I₀ + Σ CF_t / (1+r)^t`.
pub fn npv(initial_investment: f64, cashflows: &[f64], discount_rate: f64) -> f64 {
    let discounted: f64 = cashflows
        .iter()
        .enumerate()
        .map(|(i, cashflow)| cashflow / (1.0 + discount_rate).powi(i as i32 + 1))
        .sum();
    discounted - initial_investment
}

fn npv_derivative(cashflows: &[f64], rate: f64) -> f64 {
    cashflows
        .iter()
        .enumerate()
        .map(|(i, cashflow)| {
            let t = f64::from(i as i32 + 1);
            -t * cashflow / (1.0 + rate).powi(i as i32 + 2)
        })
        .sum()
}

/// Internal rate of return by Newton–Raphson with a bisection fallback.
///
/// Starts from 10%. Each iteration keeps a bracket `[lo, hi]` that must
/// contain the root (NPV is decreasing in the rate for conventional
/// cashflows); when the Newton step leaves the bracket or the derivative
/// vanishes, the midpoint is used instead, so the search cannot diverge or
/// divide by zero.
pub fn irr(initial_investment: f64, cashflows: &[f64], max_iterations: u32) -> IrrOutcome {
    let (mut lo, mut hi) = IRR_BRACKET;
    let mut rate = IRR_INITIAL_GUESS;

    for _ in 0..max_iterations {
        let value = npv(initial_investment, cashflows, rate);
        if value.abs() < IRR_TOLERANCE {
            return IrrOutcome::Converged(rate);
        }
        if value > 0.0 {
            lo = rate;
        } else {
            hi = rate;
        }

        let derivative = npv_derivative(cashflows, rate);
        let newton_step = rate - value / derivative;
        rate = if derivative != 0.0 && newton_step > lo && newton_step < hi {
            newton_step
        } else {
            f64::midpoint(lo, hi)
        };
    }
    IrrOutcome::DidNotConverge {
        best_estimate: rate,
    }
}

/// Undiscounted payback period with interpolation inside the crossing year.
pub fn payback_period(initial_investment: f64, cashflows: &[f64]) -> PaybackPeriod {
    let mut cumulative = 0.0;
    for (i, cashflow) in cashflows.iter().enumerate() {
        let previous = cumulative;
        cumulative += cashflow;
        if cumulative >= initial_investment {
            let fraction = (initial_investment - previous) / cashflow;
            return PaybackPeriod::Years(i as f64 + fraction);
        }
    }
    PaybackPeriod::Never
}

/// Return on investment as a percentage of the initial outlay.
pub fn roi(total_profit: f64, initial_investment: f64) -> f64 {
    if initial_investment == 0.0 {
        return 0.0;
    }
    total_profit / initial_investment * 100.0
}

/// Risk-adjusted NPV with certainty-equivalent cashflows.
///
/// `NPV_adj = Σ_t CF_t·(1 − σ_t²/2) / (1 + r + β·σ_t)^t − I₀`
///
/// Each year's flow is shrunk by its variance and discounted at a rate
/// raised by the risk-aversion weight β times its standard deviation.
pub fn risk_adjusted_npv(
    initial_investment: f64,
    cashflows: &[f64],
    cashflow_variances: &[f64],
    discount_rate: f64,
    risk_aversion: f64,
) -> Result<f64, ModelError> {
    if cashflows.len() != cashflow_variances.len() {
        return Err(ModelError::ShapeMismatch {
            left: cashflows.len(),
            right: cashflow_variances.len(),
        });
    }

    let adjusted: f64 = cashflows
        .iter()
        .zip(cashflow_variances)
        .enumerate()
        .map(|(i, (cashflow, variance))| {
            let certainty_equivalent = cashflow * (1.0 - variance.powi(2) / 2.0);
            let adjusted_rate = discount_rate + risk_aversion * variance;
            certainty_equivalent / (1.0 + adjusted_rate).powi(i as i32 + 1)
        })
        .sum();
    Ok(adjusted - initial_investment)
}

/// Break-even time with a degradation penalty added on top.
///
/// `T = ln(1 + I₀/CF) / ln(1 + r) + ΔT`; at a zero discount rate this
/// degenerates to simple payback `I₀/CF`. Non-positive cashflows never break
/// even (+∞).
pub fn breakeven_with_degradation(
    initial_investment: f64,
    annual_cashflow: f64,
    discount_rate: f64,
    degradation_years: f64,
) -> f64 {
    if annual_cashflow <= 0.0 {
        return f64::INFINITY;
    }
    let base = if discount_rate > 0.0 {
        (1.0 + initial_investment / annual_cashflow).ln() / (1.0 + discount_rate).ln()
    } else {
        initial_investment / annual_cashflow
    };
    base + degradation_years
}

/// Year-ordered cashflows escalating from a first-year value.
///
/// Year 1 carries the unescalated amount; year `t` carries
/// `savings·(1+e)^(t−1)`.
pub fn annual_cashflows(annual_savings: f64, years: u32, escalation_rate: f64) -> Vec<f64> {
    (0..years)
        .map(|year| annual_savings * (1.0 + escalation_rate).powi(year as i32))
        .collect()
}

/// NPV of an escalating cashflow with optional annual performance loss.
///
/// `degradation_factor` compounds per year (0.98 means 2% of the savings are
/// lost for every year of age); `None` disables the attenuation.
pub fn npv_with_escalation(
    initial_investment: f64,
    annual_cashflow: f64,
    analysis_period: u32,
    discount_rate: f64,
    escalation_rate: f64,
    degradation_factor: Option<f64>,
) -> f64 {
    let mut total = -initial_investment;
    for t in 1..=analysis_period {
        let t = t as i32;
        let mut cashflow = annual_cashflow * (1.0 + escalation_rate).powi(t);
        if let Some(factor) = degradation_factor {
            cashflow *= factor.powi(t);
        }
        total += cashflow / (1.0 + discount_rate).powi(t);
    }
    total
}

/// Present value of owning and operating a vehicle over the horizon.
pub fn total_cost_of_ownership(
    initial_cost: f64,
    annual_operating_cost: f64,
    years: u32,
    discount_rate: f64,
) -> f64 {
    initial_cost + npv(0.0, &vec![annual_operating_cost; years as usize], discount_rate)
}

/// Levelized cost per kilometre.
///
/// PV of capital plus operating costs, net of the discounted residual value,
/// divided by the PV of distance driven.
pub fn levelized_cost_per_km(
    initial_investment: f64,
    annual_operating_cost: f64,
    annual_distance_km: f64,
    analysis_period: u32,
    discount_rate: f64,
    residual_value_factor: f64,
) -> f64 {
    let pv_opex = npv(0.0, &vec![annual_operating_cost; analysis_period as usize], discount_rate);
    let residual = initial_investment * residual_value_factor;
    let pv_residual = residual / (1.0 + discount_rate).powi(analysis_period as i32);
    let total_pv_cost = initial_investment + pv_opex - pv_residual;

    let pv_distance = npv(0.0, &vec![annual_distance_km; analysis_period as usize], discount_rate);
    total_pv_cost / pv_distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_npv_five_year_annuity() {
        let value = npv(150_000.0, &[30_000.0; 5], 0.08);
        assert_approx_eq!(f64, value, -30_218.69, epsilon = 0.01);
    }

    #[test]
    fn test_npv_zero_rate_is_plain_sum() {
        let value = npv(100.0, &[40.0, 40.0, 40.0], 0.0);
        assert_approx_eq!(f64, value, 20.0);
    }

    #[rstest]
    #[case(0.0, 0.05)]
    #[case(0.05, 0.10)]
    #[case(0.10, 0.20)]
    fn test_npv_decreasing_in_rate(#[case] low_rate: f64, #[case] high_rate: f64) {
        let cashflows = [120_000.0, 120_000.0, 130_000.0, 140_000.0];
        assert!(
            npv(400_000.0, &cashflows, low_rate) > npv(400_000.0, &cashflows, high_rate)
        );
    }

    #[test]
    fn test_irr_round_trips_through_npv() {
        let cashflows = [100_000.0, 120_000.0, 120_000.0, 130_000.0, 140_000.0];
        let IrrOutcome::Converged(rate) = irr(400_000.0, &cashflows, 1000) else {
            panic!("expected convergence");
        };
        assert!(npv(400_000.0, &cashflows, rate).abs() < 0.01);
        // A five-year recovery of 4x at ~1.25x total implies a healthy rate
        assert!(rate > 0.10 && rate < 0.20, "got {rate}");
    }

    #[test]
    fn test_irr_all_negative_cashflows_has_no_root() {
        let outcome = irr(100_000.0, &[-10_000.0, -10_000.0], 200);
        assert!(matches!(outcome, IrrOutcome::DidNotConverge { .. }));
        assert!(outcome.rate().is_finite());
    }

    #[test]
    fn test_payback_with_interpolation() {
        let cashflows = [100_000.0, 120_000.0, 120_000.0, 130_000.0, 140_000.0];
        let PaybackPeriod::Years(years) = payback_period(500_000.0, &cashflows) else {
            panic!("expected payback");
        };
        // Crosses during year 5: 470k after 4 years, 30k/140k into the fifth
        assert!(years > 4.0 && years < 5.0);
        assert_approx_eq!(f64, years, 4.0 + 30_000.0 / 140_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_payback_never() {
        assert_eq!(
            payback_period(500_000.0, &[50_000.0; 5]),
            PaybackPeriod::Never
        );
    }

    #[test]
    fn test_payback_first_year() {
        let PaybackPeriod::Years(years) = payback_period(50_000.0, &[100_000.0]) else {
            panic!("expected payback");
        };
        assert_approx_eq!(f64, years, 0.5);
    }

    #[test]
    fn test_roi_percentage() {
        assert_approx_eq!(f64, roi(50_000.0, 200_000.0), 25.0);
        assert_approx_eq!(f64, roi(50_000.0, 0.0), 0.0);
    }

    #[test]
    fn test_risk_adjusted_npv_below_plain_npv() {
        let cashflows = [100_000.0, 120_000.0, 120_000.0, 130_000.0, 140_000.0];
        let variances = [0.05, 0.04, 0.04, 0.03, 0.03];
        let adjusted =
            risk_adjusted_npv(500_000.0, &cashflows, &variances, 0.08, 0.5).unwrap();
        let plain = npv(500_000.0, &cashflows, 0.08);
        assert!(adjusted < plain);
        // Zero variance collapses to the plain NPV
        let no_risk = risk_adjusted_npv(500_000.0, &cashflows, &[0.0; 5], 0.08, 0.5).unwrap();
        assert_approx_eq!(f64, no_risk, plain, epsilon = 1e-6);
    }

    #[test]
    fn test_risk_adjusted_npv_shape_mismatch() {
        assert_eq!(
            risk_adjusted_npv(1.0, &[1.0, 2.0], &[0.1], 0.08, 0.5),
            Err(ModelError::ShapeMismatch { left: 2, right: 1 })
        );
    }

    #[test]
    fn test_breakeven_with_degradation() {
        let breakeven = breakeven_with_degradation(500_000.0, 120_000.0, 0.08, 0.5);
        // ln(1 + 500/120)/ln(1.08) + 0.5
        assert_approx_eq!(
            f64,
            breakeven,
            (1.0_f64 + 500.0 / 120.0).ln() / 1.08_f64.ln() + 0.5,
            epsilon = 1e-9
        );
        // Zero rate degenerates to simple payback
        assert_approx_eq!(
            f64,
            breakeven_with_degradation(500_000.0, 100_000.0, 0.0, 0.0),
            5.0
        );
        assert!(breakeven_with_degradation(500_000.0, 0.0, 0.08, 0.5).is_infinite());
    }

    #[test]
    fn test_annual_cashflows_escalate_from_year_one() {
        let cashflows = annual_cashflows(1000.0, 3, 0.10);
        assert_approx_eq!(f64, cashflows[0], 1000.0);
        assert_approx_eq!(f64, cashflows[1], 1100.0);
        assert_approx_eq!(f64, cashflows[2], 1210.0, epsilon = 1e-9);
    }

    #[test]
    fn test_npv_with_escalation_and_degradation() {
        // Degradation strictly reduces the value of escalating savings
        let without = npv_with_escalation(500_000.0, 120_000.0, 5, 0.08, 0.03, None);
        let with = npv_with_escalation(500_000.0, 120_000.0, 5, 0.08, 0.03, Some(0.98));
        assert!(with < without);
        // Factor 1.0 is a no-op
        let unity = npv_with_escalation(500_000.0, 120_000.0, 5, 0.08, 0.03, Some(1.0));
        assert_approx_eq!(f64, unity, without, epsilon = 1e-6);
    }

    #[test]
    fn test_total_cost_of_ownership() {
        let tco = total_cost_of_ownership(150_000.0, 85_000.0, 5, 0.08);
        assert_approx_eq!(f64, tco, 150_000.0 + 85_000.0 * 3.992_710_037, epsilon = 0.01);
    }

    #[test]
    fn test_levelized_cost_per_km() {
        let cost = levelized_cost_per_km(400_000.0, 50_000.0, 100_000.0, 5, 0.08, 0.20);
        // Residual value lowers the levelized cost
        let no_residual = levelized_cost_per_km(400_000.0, 50_000.0, 100_000.0, 5, 0.08, 0.0);
        assert!(cost < no_residual);
        assert!(cost > 0.0);
    }
}
