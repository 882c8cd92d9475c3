// src/services/categories.rs
use serde::{Deserialize, Serialize};
use log::warn;
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::Place;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CategoryRule {
    TypeIncludes { value: String },
    NameContains { value: String },
}

impl CategoryRule {
    pub fn matches(&self, place: &Place) -> bool {
        match self {
            CategoryRule::TypeIncludes { value } => place.types.iter().any(|t| t == value),
            CategoryRule::NameContains { value } => {
                place.name.to_lowercase().contains(&value.to_lowercase())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCategory {
    pub label: String,
    pub rules: Vec<CategoryRule>,
}

impl PlaceCategory {
    pub fn matches(&self, place: &Place) -> bool {
        self.rules.iter().any(|rule| rule.matches(place))
    }
}

pub fn load_categories(path: impl AsRef<Path>) -> anyhow::Result<Vec<PlaceCategory>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("Place categories {} not found, city breakdowns will have no categories", path.display());
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

/// Counts places per category label. A place may land in several categories;
/// every configured label is present even with a zero count.
pub fn categorize(places: &[Place], categories: &[PlaceCategory]) -> BTreeMap<String, usize> {
    categories
        .iter()
        .map(|category| {
            let count = places.iter().filter(|place| category.matches(place)).count();
            (category.label.clone(), count)
        })
        .collect()
}
