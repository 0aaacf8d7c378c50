// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    constants::ID_FIELD,
    error::{Error, Result},
    models::{ContainerProperties, IndexingPolicy, PartitionKeyDefinition, ThroughputProperties},
};

const MIN_REQUEST_UNITS: u32 = 400;

/// A domain type stored as documents in a Cosmos DB container.
///
/// Implementations describe the type's storage layout once; the result is memoized per type
/// by [`EntityMetadataCache`](crate::metadata::EntityMetadataCache).
///
/// # Examples
///
/// ```rust
/// use azure_data_cosmos_mapping::metadata::{CosmosEntity, EntityMetadata};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Person {
///     id: String,
///     first_name: String,
///     last_name: String,
/// }
///
/// impl CosmosEntity for Person {
///     fn metadata() -> azure_data_cosmos_mapping::Result<EntityMetadata> {
///         EntityMetadata::builder("people")
///             .partition_key_field("lastName")
///             .build()
///     }
/// }
/// ```
pub trait CosmosEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn metadata() -> Result<EntityMetadata>;
}

/// Storage layout of a domain type.
///
/// Field names are the serialized (JSON) property names, dotted for nested properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityMetadata {
    container_name: String,
    id_field: String,
    partition_key_field: Option<String>,
    version_field: Option<String>,
    request_units: Option<u32>,
    time_to_live: Option<i32>,
    indexing_policy: Option<IndexingPolicy>,
    auto_create_container: bool,
    auto_generate_id: bool,
}

impl EntityMetadata {
    pub fn builder(container_name: impl Into<String>) -> EntityMetadataBuilder {
        EntityMetadataBuilder(EntityMetadata {
            container_name: container_name.into(),
            id_field: ID_FIELD.to_string(),
            partition_key_field: None,
            version_field: None,
            request_units: None,
            time_to_live: None,
            indexing_policy: None,
            auto_create_container: true,
            auto_generate_id: false,
        })
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    pub fn partition_key_field(&self) -> Option<&str> {
        self.partition_key_field.as_deref()
    }

    /// The partition key fields, empty for an unpartitioned container.
    pub fn partition_key_fields(&self) -> Vec<&str> {
        self.partition_key_field.as_deref().into_iter().collect()
    }

    /// The field that mirrors the document's `_etag` for optimistic concurrency.
    pub fn version_field(&self) -> Option<&str> {
        self.version_field.as_deref()
    }

    pub fn request_units(&self) -> Option<u32> {
        self.request_units
    }

    pub fn time_to_live(&self) -> Option<i32> {
        self.time_to_live
    }

    pub fn indexing_policy(&self) -> Option<&IndexingPolicy> {
        self.indexing_policy.as_ref()
    }

    pub fn auto_create_container(&self) -> bool {
        self.auto_create_container
    }

    pub fn auto_generate_id(&self) -> bool {
        self.auto_generate_id
    }

    /// The container description to create for this entity.
    pub fn container_properties(&self) -> ContainerProperties {
        ContainerProperties {
            id: self.container_name.clone(),
            partition_key: self
                .partition_key_field
                .as_deref()
                .map(PartitionKeyDefinition::from_field),
            default_ttl: self.time_to_live,
            indexing_policy: self.indexing_policy.clone(),
        }
    }

    pub fn throughput(&self) -> Option<ThroughputProperties> {
        self.request_units.map(ThroughputProperties::manual)
    }
}

/// Builder used to construct an [`EntityMetadata`].
///
/// Obtain an [`EntityMetadataBuilder`] by calling [`EntityMetadata::builder()`]
pub struct EntityMetadataBuilder(EntityMetadata);

impl EntityMetadataBuilder {
    /// Sets the field holding the id. Defaults to `id`.
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.0.id_field = field.into();
        self
    }

    pub fn partition_key_field(mut self, field: impl Into<String>) -> Self {
        self.0.partition_key_field = Some(field.into());
        self
    }

    pub fn version_field(mut self, field: impl Into<String>) -> Self {
        self.0.version_field = Some(field.into());
        self
    }

    pub fn request_units(mut self, request_units: u32) -> Self {
        self.0.request_units = Some(request_units);
        self
    }

    /// Default time-to-live of items in seconds, `-1` for no default expiry.
    pub fn time_to_live(mut self, seconds: i32) -> Self {
        self.0.time_to_live = Some(seconds);
        self
    }

    pub fn indexing_policy(mut self, policy: IndexingPolicy) -> Self {
        self.0.indexing_policy = Some(policy);
        self
    }

    pub fn auto_create_container(mut self, enabled: bool) -> Self {
        self.0.auto_create_container = enabled;
        self
    }

    /// Generates a UUID for items saved without an id.
    pub fn auto_generate_id(mut self, enabled: bool) -> Self {
        self.0.auto_generate_id = enabled;
        self
    }

    pub fn build(self) -> Result<EntityMetadata> {
        let metadata = self.0;
        let name = &metadata.container_name;
        if name.trim().is_empty() {
            return Err(Error::invalid_argument("container name must not be empty"));
        }
        if name.ends_with(' ') || name.contains(['/', '\\', '?', '#']) {
            return Err(Error::invalid_argument(format!(
                "container name '{}' contains characters the service does not allow",
                name
            )));
        }
        if metadata.id_field.is_empty() {
            return Err(Error::invalid_argument("id field must not be empty"));
        }
        for (label, field) in [
            ("partition key", &metadata.partition_key_field),
            ("version", &metadata.version_field),
        ] {
            if matches!(field.as_deref(), Some(f) if f.is_empty()) {
                return Err(Error::invalid_argument(format!("{} field must not be empty", label)));
            }
        }
        if metadata.version_field.as_deref() == Some(metadata.id_field.as_str()) {
            return Err(Error::invalid_argument("version field cannot be the id field"));
        }
        if matches!(metadata.time_to_live, Some(ttl) if ttl == 0 || ttl < -1) {
            return Err(Error::invalid_argument(
                "time to live must be -1 or a positive number of seconds",
            ));
        }
        if matches!(metadata.request_units, Some(ru) if ru < MIN_REQUEST_UNITS) {
            return Err(Error::invalid_argument(format!(
                "request units must be at least {}",
                MIN_REQUEST_UNITS
            )));
        }
        Ok(metadata)
    }
}
