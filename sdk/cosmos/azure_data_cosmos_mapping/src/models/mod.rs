// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Model types sent to and received from the store.

mod container_properties;
mod throughput_properties;

pub use container_properties::*;
pub use throughput_properties::*;

/// A stored item as a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;
