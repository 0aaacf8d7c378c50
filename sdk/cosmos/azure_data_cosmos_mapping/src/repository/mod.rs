// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Typed repositories over a [`CosmosTemplate`], including queries derived from method names.

mod execution;
mod part_tree;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::{
    clients::CosmosTemplate,
    error::Result,
    metadata::CosmosEntity,
    pagination::{Page, PageRequest},
    query::{DocumentQuery, Sort},
    PartitionKey,
};

pub use execution::{CosmosQueryExecution, QueryResult};
pub use part_tree::{PartTree, Subject};

/// CRUD and derived-query access to the items of one entity type.
///
/// # Examples
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use azure_data_cosmos_mapping::{clients::CosmosTemplate, metadata::{CosmosEntity, EntityMetadata}, repository::CosmosRepository};
/// # #[derive(serde::Serialize, serde::Deserialize)]
/// # struct Person { id: String, last_name: String }
/// # impl CosmosEntity for Person {
/// #     fn metadata() -> azure_data_cosmos_mapping::Result<EntityMetadata> { EntityMetadata::builder("people").build() }
/// # }
/// # async fn doc(template: Arc<CosmosTemplate>) -> azure_data_cosmos_mapping::Result<()> {
/// let people = CosmosRepository::<Person>::new(template);
/// let holmeses = people
///     .execute_derived("findByLastName", &[serde_json::json!("Holmes")], None)
///     .await?
///     .into_entities();
/// # Ok(())
/// # }
/// ```
pub struct CosmosRepository<T> {
    template: Arc<CosmosTemplate>,
    derived: RwLock<HashMap<String, Arc<PartTree>>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: CosmosEntity> CosmosRepository<T> {
    pub fn new(template: Arc<CosmosTemplate>) -> Self {
        Self {
            template,
            derived: RwLock::new(HashMap::new()),
            _entity: PhantomData,
        }
    }

    pub fn template(&self) -> &CosmosTemplate {
        &self.template
    }

    /// Creates the entity's container if its metadata asks for it.
    pub async fn initialize(&self) -> Result<()> {
        let metadata = self.template.metadata::<T>()?;
        if metadata.auto_create_container() {
            self.template.create_container_for(&metadata).await?;
        }
        Ok(())
    }

    /// Inserts or replaces `entity`, honoring its version field if it has one.
    pub async fn save(&self, entity: &T) -> Result<T> {
        self.template.upsert(entity).await
    }

    /// Saves each entity in turn, stopping at the first failure.
    pub async fn save_all<'a>(&self, entities: impl IntoIterator<Item = &'a T>) -> Result<Vec<T>> {
        let mut saved = Vec::new();
        for entity in entities {
            saved.push(self.save(entity).await?);
        }
        Ok(saved)
    }

    pub async fn find_by_id(&self, id: &str, partition_key: Option<PartitionKey>) -> Result<Option<T>> {
        self.template.find_by_id(id, partition_key).await
    }

    pub async fn exists_by_id(&self, id: &str, partition_key: Option<PartitionKey>) -> Result<bool> {
        Ok(self.find_by_id(id, partition_key).await?.is_some())
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        self.template.find_all().await
    }

    pub async fn find_all_by_ids(&self, ids: &[String]) -> Result<Vec<T>> {
        self.template.find_by_ids(ids).await
    }

    pub async fn find_all_sorted(&self, sort: Sort) -> Result<Vec<T>> {
        self.template.find(&DocumentQuery::all().with_sort(sort)).await
    }

    pub async fn find_all_paged(&self, request: PageRequest) -> Result<Page<T>> {
        self.template.paginate(&DocumentQuery::all(), request).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.template.count::<T>(&DocumentQuery::all()).await
    }

    pub async fn delete_by_id(&self, id: &str, partition_key: Option<PartitionKey>) -> Result<()> {
        self.template.delete_by_id::<T>(id, partition_key).await
    }

    pub async fn delete(&self, entity: &T) -> Result<()> {
        self.template.delete_entity(entity).await
    }

    pub async fn delete_all(&self) -> Result<usize> {
        self.template.delete_all::<T>().await
    }

    /// Runs a query derived from `method_name`, binding `args` in order.
    ///
    /// `page` selects paged execution and is only valid for `find` methods.
    pub async fn execute_derived(
        &self,
        method_name: &str,
        args: &[Value],
        page: Option<PageRequest>,
    ) -> Result<QueryResult<T>> {
        let tree = self.part_tree(method_name)?;
        let query = tree.to_query(args)?;
        let execution = CosmosQueryExecution::for_subject(tree.subject(), page)?;
        self.execute(execution, &query).await
    }

    pub async fn execute(
        &self,
        execution: CosmosQueryExecution,
        query: &DocumentQuery,
    ) -> Result<QueryResult<T>> {
        execution.execute(&self.template, query).await
    }

    fn part_tree(&self, method_name: &str) -> Result<Arc<PartTree>> {
        if let Some(tree) = self.derived.read().unwrap().get(method_name) {
            return Ok(Arc::clone(tree));
        }
        let parsed = Arc::new(PartTree::parse(method_name)?);
        debug!(method_name, subject = ?parsed.subject(), "parsed derived query");
        let mut derived = self.derived.write().unwrap();
        Ok(Arc::clone(
            derived
                .entry(method_name.to_string())
                .or_insert(parsed),
        ))
    }
}
