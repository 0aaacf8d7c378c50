// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{
    clients::CosmosTemplate,
    error::{Error, Result},
    metadata::CosmosEntity,
    pagination::{Page, PageRequest},
    query::DocumentQuery,
    repository::Subject,
};

/// How a repository query is carried out against the template.
#[derive(Clone, Debug, PartialEq)]
pub enum CosmosQueryExecution {
    /// Resolves the entity's container name without touching the store.
    ContainerName,
    MultiEntity,
    Count,
    Exists,
    Delete,
    Paged(PageRequest),
}

/// The outcome of a [`CosmosQueryExecution`].
#[derive(Debug)]
pub enum QueryResult<T> {
    ContainerName(String),
    Entities(Vec<T>),
    Count(u64),
    Exists(bool),
    Page(Page<T>),
}

impl CosmosQueryExecution {
    /// Chooses the execution for a derived method.
    ///
    /// Only `find` methods can be paged.
    pub fn for_subject(subject: Subject, page: Option<PageRequest>) -> Result<Self> {
        Ok(match (subject, page) {
            (Subject::Find, Some(page)) => CosmosQueryExecution::Paged(page),
            (Subject::Find, None) => CosmosQueryExecution::MultiEntity,
            (Subject::Count, None) => CosmosQueryExecution::Count,
            (Subject::Exists, None) => CosmosQueryExecution::Exists,
            (Subject::Delete, None) => CosmosQueryExecution::Delete,
            (subject, Some(_)) => {
                return Err(Error::invalid_argument(format!(
                    "{:?} queries cannot be paged",
                    subject
                )))
            }
        })
    }

    pub async fn execute<T: CosmosEntity>(
        self,
        template: &CosmosTemplate,
        query: &DocumentQuery,
    ) -> Result<QueryResult<T>> {
        match self {
            CosmosQueryExecution::ContainerName => Ok(QueryResult::ContainerName(
                template.metadata::<T>()?.container_name().to_string(),
            )),
            CosmosQueryExecution::MultiEntity => template.find(query).await.map(QueryResult::Entities),
            CosmosQueryExecution::Count => template.count::<T>(query).await.map(QueryResult::Count),
            CosmosQueryExecution::Exists => template.exists::<T>(query).await.map(QueryResult::Exists),
            CosmosQueryExecution::Delete => template.delete(query).await.map(QueryResult::Entities),
            CosmosQueryExecution::Paged(request) => {
                template.paginate(query, request).await.map(QueryResult::Page)
            }
        }
    }
}

impl<T> QueryResult<T> {
    pub fn into_entities(self) -> Option<Vec<T>> {
        match self {
            QueryResult::Entities(entities) => Some(entities),
            _ => None,
        }
    }

    pub fn into_page(self) -> Option<Page<T>> {
        match self {
            QueryResult::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            QueryResult::Count(count) => Some(*count),
            _ => None,
        }
    }

    pub fn exists(&self) -> Option<bool> {
        match self {
            QueryResult::Exists(exists) => Some(*exists),
            _ => None,
        }
    }

    pub fn container_name(&self) -> Option<&str> {
        match self {
            QueryResult::ContainerName(name) => Some(name),
            _ => None,
        }
    }
}
