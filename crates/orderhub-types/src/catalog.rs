//! Partner catalog document, as published by shops in YAML.
//!
//! ```yaml
//! shop: Connect
//! categories:
//!   - id: 224
//!     name: Smartphones
//! goods:
//!   - id: 4216292
//!     category: 224
//!     model: apple/iphone/xs-max
//!     name: Apple iPhone XS Max 512GB
//!     price: 110000
//!     price_rrc: 116990
//!     quantity: 14
//!     parameters:
//!       "Screen (inch)": 6.5
//!       "Color": gold
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    pub shop: String,
    #[serde(default)]
    pub categories: Vec<CatalogCategory>,
    #[serde(default)]
    pub goods: Vec<CatalogGood>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogGood {
    /// Identifier in the partner's own system.
    pub id: u32,
    pub category: i64,
    #[serde(default)]
    pub model: String,
    pub name: String,
    pub price: u32,
    pub price_rrc: u32,
    pub quantity: u32,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// Parameter values are free-form scalars, stored as the text they were written as.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "serde_yaml::Value")]
pub struct ParameterValue(String);

impl ParameterValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<serde_yaml::Value> for ParameterValue {
    type Error = CatalogError;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        use serde_yaml::Value;

        // Number's Display keeps `6.0` and full-width u64 values
        match value {
            Value::Bool(v) => Ok(Self(v.to_string())),
            Value::Number(v) => Ok(Self(v.to_string())),
            Value::String(v) => Ok(Self(v)),
            other => Err(CatalogError::Invalid(format!(
                "parameter value must be a scalar, got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl CatalogDocument {
    pub fn from_yaml(bytes: &[u8]) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_yaml::from_slice(bytes)?;
        doc.check()?;
        Ok(doc)
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.shop.trim().is_empty() {
            return Err(CatalogError::Invalid("shop name is empty".into()));
        }
        if let Some(category) = self.categories.iter().find(|c| c.name.trim().is_empty()) {
            return Err(CatalogError::Invalid(format!(
                "category {} has an empty name",
                category.id
            )));
        }
        if let Some(good) = self.goods.iter().find(|g| g.name.trim().is_empty()) {
            return Err(CatalogError::Invalid(format!("good {} has an empty name", good.id)));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("malformed catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid catalog: {0}")]
    Invalid(String),
}
