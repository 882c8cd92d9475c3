// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

const MAX_AMORTIZATION_YEARS: u32 = 50;

/// Inputs for one rent-vs-buy comparison. Percentages are whole percents (5.5 = 5.5%).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInputs {
    pub home_price: f64,
    pub down_payment_percent: f64,
    pub monthly_rent: f64,
    pub mortgage_rate: f64,
    pub amortization_years: u32,
    pub annual_rent_increase: f64,
    pub home_appreciation: f64,
    pub investment_return: f64,
    pub annual_property_tax: f64,
    pub annual_insurance: f64,
    pub annual_maintenance: f64,
    pub closing_costs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputError {
    pub field: &'static str,
    pub message: String,
}

impl InputError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        InputError {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.message)
    }
}

impl std::error::Error for InputError {}

impl ScenarioInputs {
    pub fn validate(&self) -> Result<(), InputError> {
        let fields: [(&'static str, f64); 11] = [
            ("homePrice", self.home_price),
            ("downPaymentPercent", self.down_payment_percent),
            ("monthlyRent", self.monthly_rent),
            ("mortgageRate", self.mortgage_rate),
            ("annualRentIncrease", self.annual_rent_increase),
            ("homeAppreciation", self.home_appreciation),
            ("investmentReturn", self.investment_return),
            ("annualPropertyTax", self.annual_property_tax),
            ("annualInsurance", self.annual_insurance),
            ("annualMaintenance", self.annual_maintenance),
            ("closingCosts", self.closing_costs),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(InputError::new(field, "must be a finite number"));
            }
        }

        if self.home_price <= 0.0 {
            return Err(InputError::new("homePrice", "must be greater than zero"));
        }
        if self.monthly_rent <= 0.0 {
            return Err(InputError::new("monthlyRent", "must be greater than zero"));
        }
        if !(0.0..=100.0).contains(&self.down_payment_percent) {
            return Err(InputError::new("downPaymentPercent", "must be between 0 and 100"));
        }
        if self.amortization_years == 0 || self.amortization_years > MAX_AMORTIZATION_YEARS {
            return Err(InputError::new(
                "amortizationYears",
                format!("must be between 1 and {} years", MAX_AMORTIZATION_YEARS),
            ));
        }
        if self.mortgage_rate < 0.0 {
            return Err(InputError::new("mortgageRate", "must not be negative"));
        }

        let costs = [
            ("annualPropertyTax", self.annual_property_tax),
            ("annualInsurance", self.annual_insurance),
            ("annualMaintenance", self.annual_maintenance),
            ("closingCosts", self.closing_costs),
        ];
        for (field, value) in costs {
            if value < 0.0 {
                return Err(InputError::new(field, "must not be negative"));
            }
        }

        let growth_rates = [
            ("annualRentIncrease", self.annual_rent_increase),
            ("homeAppreciation", self.home_appreciation),
            ("investmentReturn", self.investment_return),
        ];
        for (field, value) in growth_rates {
            if value < -100.0 {
                return Err(InputError::new(field, "must not be below -100%"));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyDataPoint {
    pub year: u32,
    pub buy_cost: f64,
    pub rent_cost: f64,
    pub buy_equity: f64,
    pub rent_investment: f64,
    pub remaining_principal: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationResult {
    pub down_payment: f64,
    pub mortgage_insurance_premium: f64,
    pub loan_amount: f64,
    pub monthly_payment: f64,
    pub yearly_data: Vec<YearlyDataPoint>,
    pub breakeven_year: Option<u32>,
}

/// One persisted snapshot per (cache key, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCacheRecord {
    pub cache_key: String,
    pub month: String,
    pub payload: Value,
    pub last_fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheResponse {
    pub month: String,
    pub payload: Value,
    pub cached: bool,
    pub stale: bool,
    pub last_fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CityBreakdown {
    pub city: String,
    #[serde(flatten)]
    pub cache: CacheResponse,
    pub categories: BTreeMap<String, usize>,
}
