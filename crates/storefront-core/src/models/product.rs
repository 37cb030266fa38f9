//! Product records served by the catalog and admin endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Default rating for newly created products
pub const DEFAULT_RATING: f64 = 4.5;

/// Upper bound for the average rating
pub const MAX_RATING: f64 = 5.0;

/// Maximum product name length accepted by the backend
pub const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Flour,
    Sugar,
    Salt,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Flour,
        Category::Sugar,
        Category::Salt,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Flour => "flour",
            Category::Sugar => "sugar",
            Category::Salt => "salt",
            Category::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Flour => "Flour",
            Category::Sugar => "Sugar",
            Category::Salt => "Salt",
            Category::Other => "Other",
        }
    }

    /// Parse a category id, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: f64,
    pub quantity_available: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_rating", deserialize_with = "deserialize_decimal")]
    pub rating: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_in_stock(&self) -> bool {
        self.quantity_available > 0
    }
}

/// Fields for creating a product.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDraft {
    pub name: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    pub quantity_available: u32,
    pub rating: f64,
    pub is_active: bool,
}

impl ProductDraft {
    pub fn new(name: &str, category: Category, price: f64, quantity_available: u32) -> Self {
        Self {
            name: name.to_string(),
            category,
            description: None,
            price,
            quantity_available,
            rating: DEFAULT_RATING,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_name(&self.name)?;
        validate_price(self.price)?;
        validate_rating(self.rating)
    }
}

/// Partial update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_available: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.quantity_available.is_none()
            && self.rating.is_none()
            && self.is_active.is_none()
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.is_empty() {
            return Err(ApiError::Validation("Nothing to update".to_string()));
        }
        if let Some(ref name) = self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("Name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::Validation(format!(
            "Name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), ApiError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::Validation("Price cannot be negative.".to_string()));
    }
    Ok(())
}

fn validate_rating(rating: f64) -> Result<(), ApiError> {
    if !(0.0..=MAX_RATING).contains(&rating) {
        return Err(ApiError::Validation(format!(
            "Rating must be between 0 and {}",
            MAX_RATING
        )));
    }
    Ok(())
}

fn default_rating() -> f64 {
    DEFAULT_RATING
}

fn default_true() -> bool {
    true
}

// Decimal fields arrive either as numbers or as strings like "4.5"
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct DecimalVisitor;

    impl<'de> de::Visitor<'de> for DecimalVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or decimal string")
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v as f64)
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(DecimalVisitor)
}
