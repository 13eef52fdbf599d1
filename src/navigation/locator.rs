//! Navigation Locators
//!
//! A locator is a URI of the form `/{module-id};/{type-id}?key=value&...`.
//! The module and type identify what to resolve; the query parameters are
//! handed to the resolved instance through its navigation context.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Base used to resolve relative locators
const LOCATOR_BASE: &str = "app://shell/";

/// Result type for locator parsing
pub type LocatorResult<T> = Result<T, LocatorError>;

/// Reasons a locator string is rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Locator is empty")]
    Empty,

    #[error("Locator '{locator}' is not a valid URI: {message}")]
    Malformed { locator: String, message: String },

    #[error("Locator '{locator}' must have the form /{{module}};/{{type}}")]
    InvalidPath { locator: String },

    #[error("Invalid {part} identifier '{value}' in locator")]
    InvalidIdentifier { part: &'static str, value: String },
}

/// Parsed navigation target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    module_id: String,
    type_id: String,
    parameters: BTreeMap<String, String>,
}

impl Locator {
    /// Build a locator from its parts
    pub fn new<M: Into<String>, T: Into<String>>(module_id: M, type_id: T) -> LocatorResult<Self> {
        let module_id = module_id.into();
        let type_id = type_id.into();
        validate_identifier("module", &module_id)?;
        validate_identifier("type", &type_id)?;
        Ok(Self {
            module_id,
            type_id,
            parameters: BTreeMap::new(),
        })
    }

    /// Add or replace a query parameter
    pub fn with_parameter<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Parse a locator string
    ///
    /// Relative (`/Sales;/OrderList?id=7`) and absolute
    /// (`app://shell/Sales;/OrderList`) forms are accepted. Query values are
    /// percent-decoded; when a key repeats, the last value wins.
    pub fn parse(input: &str) -> LocatorResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LocatorError::Empty);
        }

        let base = Url::parse(LOCATOR_BASE).map_err(|e| malformed(trimmed, e))?;
        let url = base.join(trimmed).map_err(|e| malformed(trimmed, e))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();
        let (module_id, type_id) = match segments.as_slice() {
            [module, type_id] => match module.strip_suffix(';') {
                Some(module) => (module.to_string(), type_id.to_string()),
                None => return Err(invalid_path(trimmed)),
            },
            _ => return Err(invalid_path(trimmed)),
        };

        let mut locator = Self::new(module_id, type_id)?;
        for (key, value) in url.query_pairs() {
            locator.parameters.insert(key.into_owned(), value.into_owned());
        }
        Ok(locator)
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{};/{}", self.module_id, self.type_id)?;
        if !self.parameters.is_empty() {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.parameters.iter())
                .finish();
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_identifier(part: &'static str, value: &str) -> LocatorResult<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(LocatorError::InvalidIdentifier {
            part,
            value: value.to_string(),
        })
    }
}

fn malformed(locator: &str, error: url::ParseError) -> LocatorError {
    LocatorError::Malformed {
        locator: locator.to_string(),
        message: error.to_string(),
    }
}

fn invalid_path(locator: &str) -> LocatorError {
    LocatorError::InvalidPath {
        locator: locator.to_string(),
    }
}
