// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Reserved names and well-known values shared with the Cosmos DB service.

/// The reserved document property that holds the document identifier.
pub const ID_FIELD: &str = "id";

/// The system property holding the entity tag used for optimistic concurrency.
pub const ETAG_FIELD: &str = "_etag";

/// The alias bound to the container root in generated queries.
pub const ROOT_ALIAS: &str = "r";

/// Prefix of generated query parameter names.
pub const PARAMETER_PREFIX: &str = "@p";

/// HTTP status codes exchanged with the document store.
pub mod status {
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const PRECONDITION_FAILED: u16 = 412;
}
