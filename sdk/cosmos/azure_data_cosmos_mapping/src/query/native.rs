// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// A Cosmos DB SQL query with its bound parameters.
///
/// Serializes to the body the service expects:
///
/// ```rust
/// # use azure_data_cosmos_mapping::Query;
/// let query = Query::from("SELECT * FROM ROOT r WHERE r.firstName=@p1")
///     .with_parameter("@p1", "Sherlock")
///     .unwrap();
/// let body = serde_json::to_value(&query).unwrap();
/// assert_eq!(body["parameters"][0]["name"], "@p1");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Query {
    #[serde(rename = "query")]
    text: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<QueryParameter>,
}

/// A named parameter of a [`Query`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryParameter {
    name: String,
    value: Value,
}

impl QueryParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Query {
    /// Adds a parameter, serializing `value` to JSON.
    ///
    /// Parameters keep insertion order. Names must start with `@` and be unique.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self> {
        let name = name.into();
        if !name.starts_with('@') {
            return Err(Error::invalid_argument(format!(
                "query parameter '{}' must start with '@'",
                name
            )));
        }
        if self.parameter(&name).is_some() {
            return Err(Error::invalid_argument(format!(
                "query parameter '{}' is already bound",
                name
            )));
        }
        let value = serde_json::to_value(value).map_err(|e| {
            Error::invalid_argument(format!("query parameter '{}' is not serializable: {}", name, e))
        })?;
        self.parameters.push(QueryParameter { name, value });
        Ok(self)
    }

    pub(crate) fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub(crate) fn push_parameter(&mut self, name: String, value: Value) {
        self.parameters.push(QueryParameter { name, value });
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Looks up a parameter value by name.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::from(text.to_string())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self {
            text,
            parameters: Vec::new(),
        }
    }
}
