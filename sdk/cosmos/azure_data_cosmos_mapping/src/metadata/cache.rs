// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::{
    error::Result,
    metadata::{CosmosEntity, EntityMetadata},
};

/// Memoizes [`EntityMetadata`] per domain type.
///
/// Entries are never replaced or removed. Concurrent first lookups of the same type may each
/// compute the metadata, but only one result is stored and every caller receives that one.
#[derive(Debug, Default)]
pub struct EntityMetadataCache {
    entries: RwLock<HashMap<TypeId, Arc<EntityMetadata>>>,
}

impl EntityMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the metadata for `T`, computing it on first use.
    ///
    /// A failing [`CosmosEntity::metadata`] stores nothing and is retried on the next call.
    pub fn get<T: CosmosEntity>(&self) -> Result<Arc<EntityMetadata>> {
        let key = TypeId::of::<T>();
        {
            let entries = self.entries.read().unwrap();
            if let Some(metadata) = entries.get(&key) {
                return Ok(Arc::clone(metadata));
            }
        }

        // Computed outside the lock; a racing writer may get there first.
        let computed = Arc::new(T::metadata()?);

        let mut entries = self.entries.write().unwrap();
        let stored = entries.entry(key).or_insert_with(|| {
            debug!(
                entity = type_name::<T>(),
                container = computed.container_name(),
                "cached entity metadata"
            );
            Arc::clone(&computed)
        });
        Ok(Arc::clone(stored))
    }

    /// Returns the number of domain types cached.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
