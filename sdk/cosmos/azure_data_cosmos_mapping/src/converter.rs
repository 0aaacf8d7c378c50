// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Conversion between domain values and stored documents.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    constants::{ETAG_FIELD, ID_FIELD},
    error::{Error, Result},
    metadata::EntityMetadata,
    models::Document,
    partition_key::PartitionKey,
};

/// A document ready to be written, with the values the write needs alongside it.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteDocument {
    pub id: String,
    pub document: Document,
    pub partition_key: Option<PartitionKey>,
    /// The entity tag carried by the version field, if the entity has been stored before.
    pub if_match: Option<String>,
}

/// Maps domain values to documents and back.
///
/// The declared id field is stored under the reserved `id` property and the version field
/// mirrors the system `_etag`.
#[derive(Clone, Debug)]
pub struct MappingConverter {
    id_generator: fn() -> String,
}

impl Default for MappingConverter {
    fn default() -> Self {
        Self {
            id_generator: || uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl MappingConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `id_generator` instead of random UUIDs for entities with generated ids.
    pub fn with_id_generator(id_generator: fn() -> String) -> Self {
        Self { id_generator }
    }

    pub fn to_document<T: Serialize>(
        &self,
        item: &T,
        metadata: &EntityMetadata,
    ) -> Result<WriteDocument> {
        let mut document = match serde_json::to_value(item) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(Error::invalid_argument(format!(
                    "entities must serialize to a JSON object, got {}",
                    json_kind(&other)
                )))
            }
            Err(e) => {
                return Err(Error::invalid_argument(format!(
                    "entity could not be serialized: {}",
                    e
                )))
            }
        };

        let id_field = metadata.id_field();
        let declared = if id_field == ID_FIELD {
            document.remove(ID_FIELD)
        } else {
            if document.contains_key(ID_FIELD) {
                return Err(Error::invalid_argument(format!(
                    "'{}' is reserved for the id but the entity declares '{}' as its id field",
                    ID_FIELD, id_field
                )));
            }
            document.remove(id_field)
        };
        let id = match declared {
            Some(Value::String(id)) if !id.is_empty() => id,
            None | Some(Value::Null) if metadata.auto_generate_id() => (self.id_generator)(),
            Some(Value::String(_)) | None | Some(Value::Null) => {
                return Err(Error::invalid_argument(format!(
                    "entity in container '{}' has no id",
                    metadata.container_name()
                )))
            }
            Some(other) => {
                return Err(Error::invalid_argument(format!(
                    "id field '{}' must be a string, got {}",
                    id_field,
                    json_kind(&other)
                )))
            }
        };
        document.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let if_match = match metadata.version_field() {
            Some(field) => match document.remove(field) {
                Some(Value::String(etag)) if !etag.is_empty() => Some(etag),
                _ => None,
            },
            None => None,
        };

        let partition_key = match metadata.partition_key_field() {
            Some(field) => {
                let field = if field == id_field { ID_FIELD } else { field };
                match lookup(&document, field) {
                    Some(value) => Some(PartitionKey::from_value(value.clone()).ok_or_else(|| {
                        Error::invalid_argument(format!(
                            "partition key field '{}' must hold a scalar value",
                            field
                        ))
                    })?),
                    None => None,
                }
            }
            None => None,
        };

        Ok(WriteDocument {
            id,
            document,
            partition_key,
            if_match,
        })
    }

    pub fn from_document<T: DeserializeOwned>(
        &self,
        mut document: Document,
        metadata: &EntityMetadata,
    ) -> serde_json::Result<T> {
        let id_field = metadata.id_field();
        if id_field != ID_FIELD {
            if let Some(id) = document.remove(ID_FIELD) {
                document.insert(id_field.to_string(), id);
            }
        }
        if let Some(version_field) = metadata.version_field() {
            let etag = document.get(ETAG_FIELD).cloned().unwrap_or(Value::Null);
            document.insert(version_field.to_string(), etag);
        }
        serde_json::from_value(Value::Object(document))
    }
}

/// Reads a dotted field path from a document.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
