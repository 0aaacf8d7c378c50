// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// Describes a container: its id, partitioning, time-to-live and indexing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerProperties {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<PartitionKeyDefinition>,

    /// Default item time-to-live in seconds; `-1` enables TTL without a default expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexing_policy: Option<IndexingPolicy>,
}

impl ContainerProperties {
    /// The partition key path, e.g. `/lastName`, if the container is partitioned.
    pub fn partition_key_path(&self) -> Option<&str> {
        self.partition_key
            .as_ref()
            .and_then(|pk| pk.paths.first())
            .map(String::as_str)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionKeyDefinition {
    pub paths: Vec<String>,
    #[serde(default)]
    pub kind: PartitionKeyKind,
}

impl PartitionKeyDefinition {
    /// A hash partition key on a dotted field path, converted to the `/a/b` path form.
    pub fn from_field(field: &str) -> Self {
        Self {
            paths: vec![format!("/{}", field.replace('.', "/"))],
            kind: PartitionKeyKind::Hash,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum PartitionKeyKind {
    #[default]
    Hash,
    MultiHash,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexingMode {
    #[default]
    Consistent,
    None,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct PropertyPath {
    pub path: String,
}

/// How the container indexes its items.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingPolicy {
    pub automatic: bool,
    pub indexing_mode: IndexingMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_paths: Vec<PropertyPath>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_paths: Vec<PropertyPath>,
}

impl Default for IndexingPolicy {
    fn default() -> Self {
        Self {
            automatic: true,
            indexing_mode: IndexingMode::Consistent,
            included_paths: Vec::new(),
            excluded_paths: Vec::new(),
        }
    }
}
