// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use async_trait::async_trait;

use crate::{
    error::StoreResult,
    models::{ContainerProperties, Document},
    options::{CreateContainerOptions, ItemOptions, QueryOptions},
    FeedPage, PartitionKey, Query,
};

/// The operations the mapping layer needs from a Cosmos DB transport.
///
/// This trait is the seam between the mapping layer and the network. Implement it over the
/// Cosmos DB SDK in production, or over an in-memory store when testing your application.
/// Retries, connection management and consistency are the implementation's concern.
///
/// `container` is always the container id within the configured database.
#[async_trait]
pub trait DocumentStoreClient: Send + Sync {
    /// Creates an item, failing with a 409 status if the id already exists in the partition.
    async fn create_item(
        &self,
        container: &str,
        item: Document,
        options: &ItemOptions,
    ) -> StoreResult<Document>;

    /// Reads an item, failing with a 404 status if it does not exist.
    async fn read_item(
        &self,
        container: &str,
        id: &str,
        partition_key: Option<&PartitionKey>,
        options: &ItemOptions,
    ) -> StoreResult<Document>;

    /// Creates or replaces an item.
    ///
    /// When `options.if_match` is set the write only applies if the stored item still carries
    /// that entity tag, and fails with a 412 status otherwise.
    async fn upsert_item(
        &self,
        container: &str,
        item: Document,
        options: &ItemOptions,
    ) -> StoreResult<Document>;

    async fn delete_item(
        &self,
        container: &str,
        id: &str,
        partition_key: Option<&PartitionKey>,
        options: &ItemOptions,
    ) -> StoreResult<()>;

    /// Executes one round-trip of a query.
    ///
    /// Returns at most `options.max_item_count` items, resuming from `options.continuation`.
    /// The returned page carries the token for the next round-trip, or none when exhausted.
    async fn query_items(
        &self,
        container: &str,
        query: &Query,
        options: &QueryOptions,
    ) -> StoreResult<FeedPage<serde_json::Value>>;

    /// Creates a container unless one with the same id exists, returning the stored description.
    async fn create_container_if_not_exists(
        &self,
        properties: &ContainerProperties,
        options: &CreateContainerOptions,
    ) -> StoreResult<ContainerProperties>;

    async fn delete_container(&self, container: &str) -> StoreResult<()>;
}
