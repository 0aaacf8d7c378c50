// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::sync::Arc;

use futures::Stream;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    clients::DocumentStoreClient,
    config::CosmosConfig,
    constants::{ETAG_FIELD, ID_FIELD},
    converter::{lookup, MappingConverter},
    error::{Error, Result, StoreError},
    metadata::{CosmosEntity, EntityMetadata, EntityMetadataCache},
    models::{ContainerProperties, Document},
    options::{CreateContainerOptions, ItemOptions, QueryOptions},
    pagination::{controller, Page, PageRequest},
    query::{Criteria, DocumentQuery, Query, QuerySpecGenerator},
    PartitionKey,
};

/// Executes mapping operations against a [`DocumentStoreClient`].
///
/// The template owns the [`MappingConverter`] and the per-type [`EntityMetadataCache`]; it
/// holds no other state between calls, so one instance can serve concurrent operations.
///
/// Typed operations read the container name, id field and partition key from the entity's
/// metadata. The `*_in` variants target an explicit container instead.
pub struct CosmosTemplate {
    client: Arc<dyn DocumentStoreClient>,
    config: CosmosConfig,
    converter: MappingConverter,
    metadata: EntityMetadataCache,
}

impl CosmosTemplate {
    pub fn new(client: Arc<dyn DocumentStoreClient>, config: CosmosConfig) -> Self {
        Self {
            client,
            config,
            converter: MappingConverter::new(),
            metadata: EntityMetadataCache::new(),
        }
    }

    pub fn with_converter(mut self, converter: MappingConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn config(&self) -> &CosmosConfig {
        &self.config
    }

    /// Returns the cached metadata for `T`.
    pub fn metadata<T: CosmosEntity>(&self) -> Result<Arc<EntityMetadata>> {
        self.metadata.get::<T>()
    }

    /// Creates the container described by `T`'s metadata unless it already exists.
    pub async fn create_container_if_not_exists<T: CosmosEntity>(
        &self,
    ) -> Result<ContainerProperties> {
        let metadata = self.metadata::<T>()?;
        self.create_container_for(&metadata).await
    }

    /// Creates the container described by `metadata` unless it already exists.
    ///
    /// Repeated calls with the same metadata return the existing container. The mapping layer
    /// adds no locking of its own; concurrent creation from several processes relies on the
    /// store's create-if-not-exists semantics.
    #[tracing::instrument(level = "debug", skip_all, fields(container = metadata.container_name()))]
    pub async fn create_container_for(&self, metadata: &EntityMetadata) -> Result<ContainerProperties> {
        let properties = metadata.container_properties();
        let options = CreateContainerOptions {
            throughput: metadata.throughput(),
        };
        let stored = self
            .client
            .create_container_if_not_exists(&properties, &options)
            .await
            .map_err(|e| {
                Error::from_store(
                    "create_container_if_not_exists",
                    metadata.container_name(),
                    None,
                    e,
                )
            })?;

        if stored.partition_key_path() != properties.partition_key_path() {
            warn!(
                container = %stored.id,
                expected = ?properties.partition_key_path(),
                actual = ?stored.partition_key_path(),
                "existing container has a different partition key"
            );
        }
        info!(database = self.config.database(), container = %stored.id, "container ready");
        Ok(stored)
    }

    pub async fn delete_container(&self, container: &str) -> Result<()> {
        self.client
            .delete_container(container)
            .await
            .map_err(|e| Error::from_store("delete_container", container, None, e))?;
        info!(database = self.config.database(), container, "container deleted");
        Ok(())
    }

    /// Inserts a new item, failing if one with the same id already exists.
    pub async fn insert<T: CosmosEntity>(&self, item: &T) -> Result<T> {
        let metadata = self.metadata::<T>()?;
        let container = metadata.container_name();
        let write = self.converter.to_document(item, &metadata)?;
        let options = self.item_options(write.partition_key.clone(), None);

        debug!(container, id = %write.id, "inserting item");
        let stored = self
            .client
            .create_item(container, write.document, &options)
            .await
            .map_err(|e| Error::from_store("create_item", container, Some(&write.id), e))?;
        self.to_entity(stored, &metadata, "create_item")
    }

    /// Inserts or replaces an item.
    ///
    /// For entities with a version field, a previously stored item is only replaced if it still
    /// carries the version held by `item`; otherwise this fails with
    /// [`Error::ConcurrencyConflict`].
    pub async fn upsert<T: CosmosEntity>(&self, item: &T) -> Result<T> {
        let metadata = self.metadata::<T>()?;
        let container = metadata.container_name();
        let write = self.converter.to_document(item, &metadata)?;
        let options = self.item_options(write.partition_key.clone(), write.if_match.clone());

        debug!(container, id = %write.id, conditional = write.if_match.is_some(), "upserting item");
        let stored = self
            .client
            .upsert_item(container, write.document, &options)
            .await
            .map_err(|e| Error::from_store("upsert_item", container, Some(&write.id), e))?;
        self.to_entity(stored, &metadata, "upsert_item")
    }

    /// Reads an item by id, returning `None` if it does not exist.
    ///
    /// Without a partition key, a partitioned container is searched with a cross-partition query.
    pub async fn find_by_id<T: CosmosEntity>(
        &self,
        id: &str,
        partition_key: Option<PartitionKey>,
    ) -> Result<Option<T>> {
        let metadata = self.metadata::<T>()?;
        let container = metadata.container_name();

        let document = match partition_key {
            None if metadata.partition_key_field().is_some() => {
                self.find_document_by_id(container, &metadata, id).await?
            }
            partition_key => {
                let options = self.item_options(partition_key, None);
                match self
                    .client
                    .read_item(container, id, options.partition_key.as_ref(), &options)
                    .await
                {
                    Ok(document) => Some(document),
                    Err(e) => match Error::from_store("read_item", container, Some(id), e) {
                        Error::NotFound { .. } => None,
                        other => return Err(other),
                    },
                }
            }
        };

        document
            .map(|d| self.to_entity(d, &metadata, "read_item"))
            .transpose()
    }

    pub async fn find_by_ids<T: CosmosEntity>(&self, ids: &[String]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let metadata = self.metadata::<T>()?;
        let values = ids.iter().cloned().map(Value::String).collect();
        let query = DocumentQuery::new(Criteria::is_in(metadata.id_field(), values)?);
        self.find(&query).await
    }

    pub async fn find_all<T: CosmosEntity>(&self) -> Result<Vec<T>> {
        self.find(&DocumentQuery::all()).await
    }

    /// Runs `query` against `T`'s container and returns every match.
    pub async fn find<T: CosmosEntity>(&self, query: &DocumentQuery) -> Result<Vec<T>> {
        let metadata = self.metadata::<T>()?;
        self.find_with(&metadata, metadata.container_name(), query)
            .await
    }

    /// Runs `query` against `container`, mapping results as `T`.
    pub async fn find_in<T: CosmosEntity>(
        &self,
        query: &DocumentQuery,
        container: &str,
    ) -> Result<Vec<T>> {
        let metadata = self.metadata::<T>()?;
        self.find_with(&metadata, container, query).await
    }

    async fn find_with<T: CosmosEntity>(
        &self,
        metadata: &EntityMetadata,
        container: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<T>> {
        self.find_documents(container, metadata, query)
            .await?
            .into_iter()
            .map(|d| self.to_entity(d, metadata, "query_items"))
            .collect()
    }

    pub async fn exists<T: CosmosEntity>(&self, query: &DocumentQuery) -> Result<bool> {
        Ok(self.count::<T>(query).await? > 0)
    }

    /// Counts the items of `T`'s container matching `query`.
    pub async fn count<T: CosmosEntity>(&self, query: &DocumentQuery) -> Result<u64> {
        let metadata = self.metadata::<T>()?;
        self.count_with(
            metadata.container_name(),
            metadata.id_field(),
            &metadata.partition_key_fields(),
            query,
        )
        .await
    }

    /// Counts the items of `container` matching `query`, with no entity mapping.
    ///
    /// The container is treated as unpartitioned, so the count always fans out.
    pub async fn count_in(&self, query: &DocumentQuery, container: &str) -> Result<u64> {
        self.count_with(container, ID_FIELD, &[], query).await
    }

    #[tracing::instrument(level = "debug", skip(self, id_field, partition_key_fields, query))]
    async fn count_with(
        &self,
        container: &str,
        id_field: &str,
        partition_key_fields: &[&str],
        query: &DocumentQuery,
    ) -> Result<u64> {
        let generated = QuerySpecGenerator::new(id_field).count(query)?;
        let options = self.query_options(partition_key_fields, query);
        let values = self.drain(container, &generated, options).await?;

        // A fanned-out count can come back as one partial count per partition.
        values.iter().try_fold(0u64, |total, value| {
            value.as_u64().map(|n| total + n).ok_or_else(|| {
                malformed(
                    "query_items",
                    container,
                    format!("expected a count, got {}", value),
                )
            })
        })
    }

    /// Deletes an item by id.
    ///
    /// Unlike [`find_by_id`](Self::find_by_id), a missing item is an error
    /// ([`Error::NotFound`]).
    pub async fn delete_by_id<T: CosmosEntity>(
        &self,
        id: &str,
        partition_key: Option<PartitionKey>,
    ) -> Result<()> {
        let metadata = self.metadata::<T>()?;
        let container = metadata.container_name();

        let partition_key = match partition_key {
            None if metadata.partition_key_field().is_some() => {
                let document = self
                    .find_document_by_id(container, &metadata, id)
                    .await?
                    .ok_or_else(|| Error::NotFound {
                        container: container.to_string(),
                        id: id.to_string(),
                    })?;
                self.partition_key_of(&document, &metadata)
            }
            partition_key => partition_key,
        };

        let options = self.item_options(partition_key, None);
        self.delete_item(container, id, &options).await
    }

    /// Deletes a previously read item, guarded by its version when the entity has one.
    pub async fn delete_entity<T: CosmosEntity>(&self, item: &T) -> Result<()> {
        let metadata = self.metadata::<T>()?;
        let write = self.converter.to_document(item, &metadata)?;
        let options = self.item_options(write.partition_key, write.if_match);
        self.delete_item(metadata.container_name(), &write.id, &options)
            .await
    }

    /// Deletes every item matching `query` and returns them.
    ///
    /// The query has no native delete form, so matching items are read first and deleted one
    /// at a time. The first failed deletion stops the operation with
    /// [`Error::PartialDelete`], which lists the ids already deleted; those are not restored.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn delete<T: CosmosEntity>(&self, query: &DocumentQuery) -> Result<Vec<T>> {
        let metadata = self.metadata::<T>()?;
        let container = metadata.container_name();
        let documents = self.find_documents(container, &metadata, query).await?;

        // Map everything up front so a malformed item fails before anything is deleted.
        let entities = documents
            .iter()
            .map(|d| self.to_entity(d.clone(), &metadata, "query_items"))
            .collect::<Result<Vec<T>>>()?;

        let mut deleted = Vec::with_capacity(documents.len());
        for document in &documents {
            let id = match document.get(ID_FIELD).and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    let source = malformed("query_items", container, "item without an id");
                    return Err(partial_delete(container, deleted, source));
                }
            };
            let if_match = metadata
                .version_field()
                .and_then(|_| document.get(ETAG_FIELD))
                .and_then(Value::as_str)
                .map(str::to_string);
            let options = self.item_options(self.partition_key_of(document, &metadata), if_match);

            if let Err(e) = self.delete_item(container, &id, &options).await {
                warn!(
                    container,
                    id = %id,
                    deleted = deleted.len(),
                    remaining = documents.len() - deleted.len(),
                    "delete by query stopped at first failure"
                );
                return Err(partial_delete(container, deleted, e));
            }
            deleted.push(id);
        }

        debug!(container, deleted = deleted.len(), "delete by query complete");
        Ok(entities)
    }

    /// Deletes every item in `T`'s container, returning how many were deleted.
    pub async fn delete_all<T: CosmosEntity>(&self) -> Result<usize> {
        Ok(self.delete::<T>(&DocumentQuery::all()).await?.len())
    }

    /// Fetches the page of `query` described by `request`.
    ///
    /// The first page is requested with [`PageRequest::first`]; later pages with the
    /// [`Page::next_page_request`] of the page before. A page is only returned once fully
    /// received and mapped, so a cancelled fetch never yields a partial page.
    #[tracing::instrument(level = "debug", skip_all, fields(page_number = request.page_number()))]
    pub async fn paginate<T: CosmosEntity>(
        &self,
        query: &DocumentQuery,
        request: PageRequest,
    ) -> Result<Page<T>> {
        let metadata = self.metadata::<T>()?;
        let container = metadata.container_name();
        let query = query.with_page(request.clone());

        let generated = QuerySpecGenerator::new(metadata.id_field())
            .with_indexing_policy(metadata.indexing_policy())
            .sorted_find(&query)?;
        let mut options = self.query_options(&metadata.partition_key_fields(), &query);
        controller::prepare(&request, &mut options)?;

        let response = self
            .client
            .query_items(container, &generated, &options)
            .await
            .map_err(|e| Error::from_store("query_items", container, None, e))?;
        let response = response.try_map(|value| {
            let document = into_document(value, container)?;
            self.to_entity(document, &metadata, "query_items")
        })?;

        Ok(controller::advance(request, response))
    }

    /// Streams the pages of `query`, starting at `first`.
    ///
    /// Pages are fetched strictly one after another since each needs its predecessor's token.
    /// Empty pages that are not the last are skipped. Dropping the stream between pages stops
    /// the iteration.
    pub fn paginate_stream<'a, T: CosmosEntity>(
        &'a self,
        query: &'a DocumentQuery,
        first: PageRequest,
    ) -> impl Stream<Item = Result<Page<T>>> + 'a {
        futures::stream::try_unfold(Some(first), move |state| async move {
            let Some(mut request) = state else {
                return Ok::<_, Error>(None);
            };
            loop {
                let page = self.paginate::<T>(query, request).await?;
                match page.next_page_request() {
                    Some(next) if page.is_transient_empty() => request = next.clone(),
                    next => {
                        let next = next.cloned();
                        return Ok(Some((page, next)));
                    }
                }
            }
        })
    }

    fn query_options(&self, partition_key_fields: &[&str], query: &DocumentQuery) -> QueryOptions {
        let mut options = QueryOptions::from_request_defaults(self.config.request_options());
        options.enable_cross_partition = query.is_cross_partition_required(partition_key_fields);
        if !options.enable_cross_partition {
            options.partition_key = partition_key_fields
                .first()
                .and_then(|field| query.partition_key_value(field))
                .and_then(|value| PartitionKey::from_value(value.clone()));
        }
        options
    }

    fn item_options(&self, partition_key: Option<PartitionKey>, if_match: Option<String>) -> ItemOptions {
        let mut options = ItemOptions::builder()
            .request_defaults(self.config.request_options())
            .build();
        options.partition_key = partition_key;
        options.if_match = if_match;
        options
    }

    async fn find_documents(
        &self,
        container: &str,
        metadata: &EntityMetadata,
        query: &DocumentQuery,
    ) -> Result<Vec<Document>> {
        let generated = QuerySpecGenerator::new(metadata.id_field())
            .with_indexing_policy(metadata.indexing_policy())
            .sorted_find(query)?;
        let options = self.query_options(&metadata.partition_key_fields(), query);
        self.drain(container, &generated, options)
            .await?
            .into_iter()
            .map(|value| into_document(value, container))
            .collect()
    }

    async fn find_document_by_id(
        &self,
        container: &str,
        metadata: &EntityMetadata,
        id: &str,
    ) -> Result<Option<Document>> {
        let query = DocumentQuery::new(Criteria::equal(metadata.id_field(), id)?);
        Ok(self
            .find_documents(container, metadata, &query)
            .await?
            .into_iter()
            .next())
    }

    /// Follows continuation tokens until the store reports the result set exhausted.
    async fn drain(
        &self,
        container: &str,
        query: &Query,
        mut options: QueryOptions,
    ) -> Result<Vec<Value>> {
        debug!(
            container,
            query = query.text(),
            parameters = query.parameters().len(),
            cross_partition = options.enable_cross_partition,
            partition_key = ?options.partition_key,
            "executing query"
        );

        let mut items = Vec::new();
        loop {
            let page = self
                .client
                .query_items(container, query, &options)
                .await
                .map_err(|e| Error::from_store("query_items", container, None, e))?;
            let (mut batch, continuation) = page.into_parts();
            items.append(&mut batch);
            match continuation {
                Some(token) => options.continuation = Some(token),
                None => break,
            }
        }
        Ok(items)
    }

    async fn delete_item(&self, container: &str, id: &str, options: &ItemOptions) -> Result<()> {
        debug!(container, id, conditional = options.if_match.is_some(), "deleting item");
        self.client
            .delete_item(container, id, options.partition_key.as_ref(), options)
            .await
            .map_err(|e| Error::from_store("delete_item", container, Some(id), e))
    }

    fn partition_key_of(&self, document: &Document, metadata: &EntityMetadata) -> Option<PartitionKey> {
        let field = metadata.partition_key_field()?;
        let field = if field == metadata.id_field() { ID_FIELD } else { field };
        lookup(document, field).and_then(|value| PartitionKey::from_value(value.clone()))
    }

    fn to_entity<T: CosmosEntity>(
        &self,
        document: Document,
        metadata: &EntityMetadata,
        operation: &'static str,
    ) -> Result<T> {
        self.converter
            .from_document(document, metadata)
            .map_err(|e| Error::StoreAccess {
                operation,
                container: metadata.container_name().to_string(),
                source: StoreError::from(e),
            })
    }
}

fn into_document(value: Value, container: &str) -> Result<Document> {
    match value {
        Value::Object(document) => Ok(document),
        other => Err(malformed(
            "query_items",
            container,
            format!("expected a document, got {}", other),
        )),
    }
}

fn malformed(operation: &'static str, container: &str, message: impl Into<String>) -> Error {
    Error::StoreAccess {
        operation,
        container: container.to_string(),
        source: StoreError::DataConversion(message.into()),
    }
}

fn partial_delete(container: &str, deleted: Vec<String>, source: Error) -> Error {
    Error::PartialDelete {
        container: container.to_string(),
        deleted,
        source: Box::new(source),
    }
}
