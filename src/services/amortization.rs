// src/services/amortization.rs
use serde::{Serialize, Deserialize};
use log::{debug, warn};
use std::fs;
use std::path::Path;
use crate::models::{AmortizationResult, InputError, ScenarioInputs, YearlyDataPoint};

const DEFAULT_HORIZON_YEARS: u32 = 30;
// Balances below half a cent count as paid off.
const PAID_OFF_EPSILON: f64 = 0.005;

/// Premium rate applied to the base loan when the down payment falls in
/// `[min_down_payment_percent, max_down_payment_percent)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceTier {
    pub min_down_payment_percent: f64,
    pub max_down_payment_percent: f64,
    pub premium_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorConfig {
    #[serde(default = "default_horizon")]
    pub horizon_years: u32,
    #[serde(default = "default_insurance_tiers")]
    pub insurance_tiers: Vec<InsuranceTier>,
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_YEARS
}

fn default_insurance_tiers() -> Vec<InsuranceTier> {
    vec![
        InsuranceTier { min_down_payment_percent: 0.0, max_down_payment_percent: 10.0, premium_rate: 0.040 },
        InsuranceTier { min_down_payment_percent: 10.0, max_down_payment_percent: 15.0, premium_rate: 0.031 },
        InsuranceTier { min_down_payment_percent: 15.0, max_down_payment_percent: 20.0, premium_rate: 0.028 },
    ]
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        CalculatorConfig {
            horizon_years: default_horizon(),
            insurance_tiers: default_insurance_tiers(),
        }
    }
}

impl CalculatorConfig {
    /// Reads the calculator config from JSON, falling back to defaults when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Calculator config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let config: CalculatorConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
        if config.horizon_years == 0 {
            anyhow::bail!("horizon_years must be at least 1 in {}", path.display());
        }
        Ok(config)
    }

    pub fn premium_rate(&self, down_payment_percent: f64) -> f64 {
        self.insurance_tiers
            .iter()
            .find(|tier| {
                down_payment_percent >= tier.min_down_payment_percent
                    && down_payment_percent < tier.max_down_payment_percent
            })
            .map(|tier| tier.premium_rate)
            .unwrap_or(0.0)
    }
}

/// Fixed monthly payment for an amortizing loan.
pub fn monthly_payment(loan_amount: f64, annual_rate_percent: f64, years: u32) -> f64 {
    let payments = years as f64 * 12.0;
    if loan_amount <= 0.0 || payments <= 0.0 {
        return 0.0;
    }
    let monthly_rate = annual_rate_percent / 100.0 / 12.0;
    if monthly_rate == 0.0 {
        return loan_amount / payments;
    }
    let growth = (1.0 + monthly_rate).powf(payments);
    loan_amount * (monthly_rate * growth) / (growth - 1.0)
}

pub fn mortgage_insurance_premium(config: &CalculatorConfig, base_loan: f64, down_payment_percent: f64) -> f64 {
    if base_loan <= 0.0 {
        return 0.0;
    }
    base_loan * config.premium_rate(down_payment_percent)
}

#[derive(Debug, Clone, Copy)]
struct LoanTerms {
    down_payment: f64,
    premium: f64,
    loan_amount: f64,
    monthly_payment: f64,
}

fn loan_terms(config: &CalculatorConfig, inputs: &ScenarioInputs) -> LoanTerms {
    let down_payment = inputs.home_price * inputs.down_payment_percent / 100.0;
    let base_loan = (inputs.home_price - down_payment).max(0.0);
    let premium = mortgage_insurance_premium(config, base_loan, inputs.down_payment_percent);
    let loan_amount = base_loan + premium;
    LoanTerms {
        down_payment,
        premium,
        loan_amount,
        monthly_payment: monthly_payment(loan_amount, inputs.mortgage_rate, inputs.amortization_years),
    }
}

/// Walks one year of monthly payments against the outstanding balance.
fn pay_down_year(remaining: &mut f64, monthly_rate: f64, payment: f64) {
    for _ in 0..12 {
        if *remaining <= 0.0 {
            break;
        }
        let interest = *remaining * monthly_rate;
        let this_payment = payment.min(*remaining + interest);
        *remaining = *remaining + interest - this_payment;
        if *remaining < PAID_OFF_EPSILON {
            *remaining = 0.0;
        }
    }
}

fn grow_investment(balance: f64, monthly_return: f64, monthly_surplus: f64) -> f64 {
    let mut balance = balance;
    for _ in 0..12 {
        balance *= 1.0 + monthly_return;
        if monthly_surplus > 0.0 {
            balance += monthly_surplus;
        }
    }
    balance
}

fn project(config: &CalculatorConfig, inputs: &ScenarioInputs, terms: &LoanTerms) -> Vec<YearlyDataPoint> {
    let monthly_rate = inputs.mortgage_rate / 100.0 / 12.0;
    let monthly_return = inputs.investment_return / 100.0 / 12.0;
    let ownership_costs = inputs.annual_property_tax + inputs.annual_insurance + inputs.annual_maintenance;
    // Charged every year of the horizon, including after payoff.
    let yearly_buy_cost = 12.0 * terms.monthly_payment + ownership_costs;

    let mut remaining_principal = terms.loan_amount;
    let mut current_home_value = inputs.home_price;
    let mut current_monthly_rent = inputs.monthly_rent;
    let mut buy_cost = 0.0;
    let mut rent_cost = 0.0;
    let mut rent_investment = terms.down_payment;

    let mut yearly_data = Vec::with_capacity(config.horizon_years as usize);
    for year in 1..=config.horizon_years {
        pay_down_year(&mut remaining_principal, monthly_rate, terms.monthly_payment);
        buy_cost += yearly_buy_cost;

        current_home_value *= 1.0 + inputs.home_appreciation / 100.0;
        let buy_equity = current_home_value - remaining_principal;

        rent_cost += current_monthly_rent * 12.0;
        let monthly_surplus = yearly_buy_cost / 12.0 - current_monthly_rent;
        rent_investment = grow_investment(rent_investment, monthly_return, monthly_surplus);
        current_monthly_rent *= 1.0 + inputs.annual_rent_increase / 100.0;

        yearly_data.push(YearlyDataPoint {
            year,
            buy_cost,
            rent_cost,
            buy_equity,
            rent_investment,
            remaining_principal,
        });
    }
    yearly_data
}

/// First year in which buying (net of equity gained) costs less than renting
/// plus the growth the down payment would have earned invested. Only the first
/// crossing is reported, even if later years cross back.
pub fn find_breakeven_year(yearly_data: &[YearlyDataPoint], down_payment: f64, investment_return: f64) -> Option<u32> {
    for point in yearly_data {
        let opportunity_cost = down_payment * (1.0 + investment_return / 100.0).powi(point.year as i32);
        let rent_total_with_investment = point.rent_cost + (opportunity_cost - down_payment);
        let buy_net_cost = point.buy_cost - (point.buy_equity - down_payment);

        if !rent_total_with_investment.is_finite() || !buy_net_cost.is_finite() {
            warn!("Non-finite breakeven comparison in year {}, skipping", point.year);
            continue;
        }
        if buy_net_cost < rent_total_with_investment {
            return Some(point.year);
        }
    }
    None
}

pub fn compute_amortization(config: &CalculatorConfig, inputs: &ScenarioInputs) -> Result<AmortizationResult, InputError> {
    inputs.validate()?;

    let terms = loan_terms(config, inputs);
    debug!(
        "Loan terms: down payment {:.2}, premium {:.2}, loan {:.2}, payment {:.2}",
        terms.down_payment, terms.premium, terms.loan_amount, terms.monthly_payment
    );

    let yearly_data = project(config, inputs, &terms);
    let breakeven_year = find_breakeven_year(&yearly_data, terms.down_payment, inputs.investment_return);

    Ok(AmortizationResult {
        down_payment: terms.down_payment,
        mortgage_insurance_premium: terms.premium,
        loan_amount: terms.loan_amount,
        monthly_payment: terms.monthly_payment,
        yearly_data,
        breakeven_year,
    })
}
