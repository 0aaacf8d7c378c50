// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Per-type storage metadata and its memoization.

mod cache;
mod entity;

pub use cache::*;
pub use entity::*;
