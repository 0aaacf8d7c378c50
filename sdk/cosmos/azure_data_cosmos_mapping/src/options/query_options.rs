// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{ConsistencyLevel, PartitionKey, RequestOptions};

/// Execution options for a single `query_items` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    /// Routes the query to one partition. Set when the criteria pin the partition key.
    pub partition_key: Option<PartitionKey>,
    /// Lets the store fan the query out across partitions.
    pub enable_cross_partition: bool,
    pub max_item_count: Option<usize>,
    pub continuation: Option<String>,
    pub consistency_level: Option<ConsistencyLevel>,
    pub session_token: Option<String>,
    pub populate_query_metrics: bool,
}

impl QueryOptions {
    pub(crate) fn from_request_defaults(request_options: &RequestOptions) -> Self {
        Self {
            consistency_level: request_options.consistency_level,
            session_token: request_options.session_token.clone(),
            populate_query_metrics: request_options.populate_query_metrics,
            max_item_count: request_options.default_max_item_count,
            ..Default::default()
        }
    }
}
