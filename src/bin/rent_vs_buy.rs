// src/bin/rent_vs_buy.rs
use dotenv::dotenv;
use log::info;
use std::{env, fs};

use realty_insights::models::ScenarioInputs;
use realty_insights::services::amortization::{compute_amortization, CalculatorConfig};
use realty_insights::services::format::format_currency;

fn sample_inputs() -> ScenarioInputs {
    ScenarioInputs {
        home_price: 500_000.0,
        down_payment_percent: 20.0,
        monthly_rent: 2_500.0,
        mortgage_rate: 5.5,
        amortization_years: 25,
        annual_rent_increase: 3.0,
        home_appreciation: 3.0,
        investment_return: 6.0,
        annual_property_tax: 3_000.0,
        annual_insurance: 1_500.0,
        annual_maintenance: 3_000.0,
        closing_costs: 10_000.0,
    }
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let inputs = match env::args().nth(1) {
        Some(path) => {
            info!("Reading scenario from {}", path);
            serde_json::from_str(&fs::read_to_string(&path)?)?
        }
        None => sample_inputs(),
    };
    let config_path = env::var("CALCULATOR_CONFIG_JSON").unwrap_or_else(|_| "config/calculator.json".to_string());
    let config = CalculatorConfig::load(config_path)?;

    let result = compute_amortization(&config, &inputs)?;

    println!("Down payment:        {}", format_currency(result.down_payment, "$"));
    println!("Mortgage insurance:  {}", format_currency(result.mortgage_insurance_premium, "$"));
    println!("Loan amount:         {}", format_currency(result.loan_amount, "$"));
    println!("Monthly payment:     {}", format_currency(result.monthly_payment, "$"));
    println!();
    println!("{:>4}  {:>14}  {:>14}  {:>14}  {:>14}  {:>14}", "Year", "Buy cost", "Rent cost", "Equity", "Invested", "Principal");
    for point in &result.yearly_data {
        println!(
            "{:>4}  {:>14}  {:>14}  {:>14}  {:>14}  {:>14}",
            point.year,
            format_currency(point.buy_cost, "$"),
            format_currency(point.rent_cost, "$"),
            format_currency(point.buy_equity, "$"),
            format_currency(point.rent_investment, "$"),
            format_currency(point.remaining_principal, "$"),
        );
    }
    println!();
    match result.breakeven_year {
        Some(year) => println!("Buying breaks even in year {}", year),
        None => println!("Buying does not break even within {} years", config.horizon_years),
    }
    Ok(())
}
