// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// Provisioned throughput of a container, in request units per second.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputProperties {
    #[serde(rename = "content")]
    offer: Offer,
}

#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Offer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_throughput: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_autopilot_settings: Option<AutoscaleSettings>,
}

#[derive(Clone, Default, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct AutoscaleSettings {
    pub max_throughput: u32,
}

impl ThroughputProperties {
    /// Fixed throughput of `throughput` RU/s.
    pub fn manual(throughput: u32) -> Self {
        Self {
            offer: Offer {
                offer_throughput: Some(throughput),
                offer_autopilot_settings: None,
            },
        }
    }

    /// Autoscale throughput scaling up to `max_throughput` RU/s.
    pub fn autoscale(max_throughput: u32) -> Self {
        Self {
            offer: Offer {
                offer_throughput: None,
                offer_autopilot_settings: Some(AutoscaleSettings { max_throughput }),
            },
        }
    }

    pub fn throughput(&self) -> Option<u32> {
        self.offer.offer_throughput
    }

    pub fn autoscale_maximum(&self) -> Option<u32> {
        self.offer
            .offer_autopilot_settings
            .as_ref()
            .map(|s| s.max_throughput)
    }
}
