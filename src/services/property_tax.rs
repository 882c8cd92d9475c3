// src/services/property_tax.rs
use csv::Reader;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::InputError;

#[derive(Debug, Deserialize)]
struct RateRow {
    city: String,
    rate_percent: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PropertyTaxQuote {
    pub city: String,
    pub rate_percent: f64,
    pub annual_tax: f64,
    pub monthly_tax: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyTaxError {
    UnknownCity(String),
    Input(InputError),
}

impl std::fmt::Display for PropertyTaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PropertyTaxError::UnknownCity(city) => write!(f, "No property tax rate for city '{}'", city),
            PropertyTaxError::Input(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PropertyTaxError {}

/// Residential tax rates keyed by city slug.
#[derive(Debug, Clone, Default)]
pub struct PropertyTaxTable {
    rates: BTreeMap<String, f64>,
}

pub fn city_slug(city: &str) -> String {
    city.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

impl PropertyTaxTable {
    pub fn from_rates<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        PropertyTaxTable {
            rates: rates.into_iter().map(|(city, rate)| (city_slug(city.as_ref()), rate)).collect(),
        }
    }

    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = Reader::from_reader(reader);
        let mut rates = BTreeMap::new();
        for row in rdr.deserialize() {
            let row: RateRow = row?;
            if !row.rate_percent.is_finite() || row.rate_percent < 0.0 {
                anyhow::bail!("Invalid rate {} for city {}", row.rate_percent, row.city);
            }
            rates.insert(city_slug(&row.city), row.rate_percent);
        }
        Ok(PropertyTaxTable { rates })
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Property tax table {} not found, starting with no cities", path.display());
            return Ok(Self::default());
        }
        let table = Self::from_csv_reader(std::fs::File::open(path)?)?;
        info!("Loaded {} property tax rates from {}", table.rates.len(), path.display());
        Ok(table)
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn annual_property_tax(&self, city: &str, assessed_value: f64) -> Result<PropertyTaxQuote, PropertyTaxError> {
        if !assessed_value.is_finite() || assessed_value < 0.0 {
            return Err(PropertyTaxError::Input(InputError::new(
                "assessedValue",
                "must be a non-negative number",
            )));
        }
        let slug = city_slug(city);
        let rate_percent = *self
            .rates
            .get(&slug)
            .ok_or_else(|| PropertyTaxError::UnknownCity(slug.clone()))?;

        let annual_tax = assessed_value * rate_percent / 100.0;
        Ok(PropertyTaxQuote {
            city: slug,
            rate_percent,
            annual_tax,
            monthly_tax: annual_tax / 12.0,
        })
    }
}
