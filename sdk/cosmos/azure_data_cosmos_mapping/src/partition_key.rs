// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The value of a document's partition key.
///
/// Partition key values are scalar JSON values: strings, numbers, booleans or `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(Value);

impl PartitionKey {
    /// A partition key whose value is JSON `null`.
    pub const NULL: PartitionKey = PartitionKey(Value::Null);

    /// Creates a partition key from a JSON value, returning `None` for arrays and objects.
    pub fn from_value(value: Value) -> Option<Self> {
        is_scalar(&value).then_some(PartitionKey(value))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

pub(crate) fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

impl From<&str> for PartitionKey {
    fn from(value: &str) -> Self {
        PartitionKey(Value::String(value.to_string()))
    }
}

impl From<String> for PartitionKey {
    fn from(value: String) -> Self {
        PartitionKey(Value::String(value))
    }
}

impl From<i64> for PartitionKey {
    fn from(value: i64) -> Self {
        PartitionKey(Value::from(value))
    }
}

impl From<f64> for PartitionKey {
    fn from(value: f64) -> Self {
        PartitionKey(Value::from(value))
    }
}

impl From<bool> for PartitionKey {
    fn from(value: bool) -> Self {
        PartitionKey(Value::Bool(value))
    }
}
