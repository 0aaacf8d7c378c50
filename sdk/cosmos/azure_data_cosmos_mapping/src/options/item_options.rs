// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{ConsistencyLevel, PartitionKey, RequestOptions};

/// Options passed to point operations on items (create, read, upsert, delete).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ItemOptions {
    pub partition_key: Option<PartitionKey>,
    /// The entity tag the stored item must still carry for the write to apply.
    pub if_match: Option<String>,
    pub consistency_level: Option<ConsistencyLevel>,
    pub session_token: Option<String>,
}

impl ItemOptions {
    /// Creates a new [`ItemOptionsBuilder`] that can be used to construct an [`ItemOptions`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// let options = azure_data_cosmos_mapping::ItemOptions::builder()
    ///     .if_match("\"00000000-0000\"")
    ///     .build();
    /// assert!(options.if_match.is_some());
    /// ```
    pub fn builder() -> ItemOptionsBuilder {
        ItemOptionsBuilder::default()
    }
}

/// Builder used to construct an [`ItemOptions`].
///
/// Obtain an [`ItemOptionsBuilder`] by calling [`ItemOptions::builder()`]
#[derive(Default)]
pub struct ItemOptionsBuilder(ItemOptions);

impl ItemOptionsBuilder {
    pub fn partition_key(mut self, partition_key: impl Into<PartitionKey>) -> Self {
        self.0.partition_key = Some(partition_key.into());
        self
    }

    pub fn if_match(mut self, etag: impl Into<String>) -> Self {
        self.0.if_match = Some(etag.into());
        self
    }

    /// Copies the consistency and session defaults from `request_options`.
    pub fn request_defaults(mut self, request_options: &RequestOptions) -> Self {
        self.0.consistency_level = request_options.consistency_level;
        self.0.session_token = request_options.session_token.clone();
        self
    }

    /// Builds an [`ItemOptions`] from the builder.
    ///
    /// This does not consume the builder, and can be called multiple times.
    pub fn build(&self) -> ItemOptions {
        self.0.clone()
    }
}
