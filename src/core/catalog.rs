//! Read-only lookup of component category and type names.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const UNKNOWN_CATEGORY: &str = "Unknown Category";
pub const UNKNOWN_TYPE: &str = "Unknown Subcategory";

/// A category as written in the configuration file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    ("Accommodation", &["Hotel", "Hostel", "Camping", "Apartment", "Other"]),
    ("Food", &["Restaurant", "Fast food", "Cafe", "Bar", "Other"]),
    ("Transport", &["Plane", "Train", "Bus", "Car", "Other"]),
    ("Entertainment", &["Museum", "Theatre", "Cinema", "Concert", "Other"]),
    ("Shopping", &["Clothes", "Electronics", "Souvenirs", "Other"]),
    ("Other", &["Other"]),
];

pub fn default_categories() -> Vec<CategorySpec> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, types)| CategorySpec {
            name: name.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentType {
    pub id: u64,
    pub category_id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

/// Category and type names keyed by id.
///
/// Ids are assigned in declaration order starting at 1. Type ids run across
/// all categories, so the first type of the second category follows the last
/// type of the first.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    types: HashMap<u64, ComponentType>,
}

impl Catalog {
    pub fn new(specs: &[CategorySpec]) -> Self {
        let mut categories = Vec::with_capacity(specs.len());
        let mut types = HashMap::new();
        let mut next_type_id = 1;

        for (index, spec) in specs.iter().enumerate() {
            let category_id = index as u64 + 1;
            categories.push(Category {
                id: category_id,
                name: spec.name.clone(),
            });
            for type_name in &spec.types {
                types.insert(
                    next_type_id,
                    ComponentType {
                        id: next_type_id,
                        category_id,
                        name: type_name.clone(),
                    },
                );
                next_type_id += 1;
            }
        }

        Self { categories, types }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn category_name(&self, id: u64) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    pub fn type_name(&self, id: u64) -> Option<&str> {
        self.types.get(&id).map(|t| t.name.as_str())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(&default_categories())
    }
}
