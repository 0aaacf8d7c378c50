// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! The store-facing side of the mapping layer.

mod store;
mod template;

pub use store::DocumentStoreClient;
pub use template::CosmosTemplate;
