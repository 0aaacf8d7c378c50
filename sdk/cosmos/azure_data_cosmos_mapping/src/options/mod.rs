// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

mod container_options;
mod item_options;
mod query_options;

pub use container_options::*;
pub use item_options::*;
pub use query_options::*;
