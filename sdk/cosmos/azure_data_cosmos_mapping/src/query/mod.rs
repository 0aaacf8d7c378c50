// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Criteria trees, query envelopes and their translation to Cosmos DB SQL.

mod criteria;
mod document_query;
mod generator;
mod native;
pub mod partition;

pub use criteria::*;
pub use document_query::*;
pub use generator::QuerySpecGenerator;
pub use native::{Query, QueryParameter};
