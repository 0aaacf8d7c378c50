// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

#![doc = include_str!("../README.md")]
// Docs.rs build is done with the nightly compiler, so we can enable nightly features in that build.
// In this case we enable two features:
// - `doc_auto_cfg`: Automatically scans `cfg` attributes and uses them to show those required configurations in the generated documentation.
// - `doc_cfg_hide`: Ignore the `doc` configuration for `doc_auto_cfg`.
// See https://doc.rust-lang.org/rustdoc/unstable-features.html#doc_auto_cfg-automatically-generate-doccfg for more details.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(docsrs, feature(doc_cfg_hide))]

pub mod clients;
mod config;
mod connection_string;
pub mod constants;
pub mod converter;
mod error;
mod feed;
pub mod metadata;
pub mod models;
mod options;
pub mod pagination;
mod partition_key;
pub mod query;
pub mod repository;

#[doc(inline)]
pub use clients::CosmosTemplate;

pub use config::*;
pub use connection_string::*;
pub use error::{Error, Result, StoreError, StoreResult};
pub use options::*;
pub use partition_key::*;
pub use query::Query;

pub use feed::FeedPage;
