// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::models::ThroughputProperties;

/// Options used when creating a container.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreateContainerOptions {
    /// Throughput to provision with the container. `None` shares database throughput.
    pub throughput: Option<ThroughputProperties>,
}
