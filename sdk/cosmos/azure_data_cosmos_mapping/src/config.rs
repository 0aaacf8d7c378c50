// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Account and request configuration.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    connection_string::ConnectionString,
    error::{Error, Result},
};

/// Credentials used to authenticate with the account.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A primary or secondary account key.
    Key(String),
    /// A resource token scoped to specific resources.
    ResourceToken(String),
}

impl Credential {
    pub fn secret(&self) -> &str {
        match self {
            Credential::Key(s) | Credential::ResourceToken(s) => s,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Key(_) => f.write_str("Key(<redacted>)"),
            Credential::ResourceToken(_) => f.write_str("ResourceToken(<redacted>)"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    Strong,
    BoundedStaleness,
    #[default]
    Session,
    ConsistentPrefix,
    Eventual,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionMode {
    #[default]
    Gateway,
    Direct,
}

/// Connection settings handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionPolicy {
    pub connection_mode: ConnectionMode,
    pub request_timeout: Duration,
    pub max_connection_pool_size: usize,
    pub preferred_locations: Vec<String>,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            connection_mode: ConnectionMode::Gateway,
            request_timeout: Duration::from_secs(60),
            max_connection_pool_size: 1000,
            preferred_locations: Vec::new(),
        }
    }
}

/// Defaults applied to every request issued by a [`CosmosTemplate`](crate::clients::CosmosTemplate).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Overrides the account consistency level per request.
    pub consistency_level: Option<ConsistencyLevel>,
    pub session_token: Option<String>,
    pub populate_query_metrics: bool,
    /// Page size used when a query is drained without an explicit page request.
    pub default_max_item_count: Option<usize>,
}

/// Immutable configuration of the account and database the mapping layer targets.
///
/// # Examples
///
/// ```rust
/// use azure_data_cosmos_mapping::{ConsistencyLevel, CosmosConfig, Credential};
///
/// let config = CosmosConfig::new(
///     "https://myaccount.documents.azure.com:443/",
///     Credential::Key("c2VjcmV0".into()),
///     "library",
/// )
/// .unwrap()
/// .with_consistency_level(ConsistencyLevel::Eventual);
/// assert_eq!(config.database(), "library");
/// ```
#[derive(Clone, Debug)]
pub struct CosmosConfig {
    uri: Url,
    credential: Credential,
    database: String,
    connection_policy: ConnectionPolicy,
    consistency_level: ConsistencyLevel,
    allow_telemetry: bool,
    request_options: RequestOptions,
}

impl CosmosConfig {
    /// Creates a configuration, validating the endpoint, credential and database name.
    ///
    /// The endpoint must be `https`, except for `http` endpoints on the local emulator.
    pub fn new(uri: &str, credential: Credential, database: impl Into<String>) -> Result<Self> {
        let uri = Url::parse(uri)
            .map_err(|e| Error::invalid_argument(format!("invalid account endpoint '{}': {}", uri, e)))?;
        let local = matches!(uri.host_str(), Some("localhost") | Some("127.0.0.1"));
        match uri.scheme() {
            "https" => {}
            "http" if local => {}
            scheme => {
                return Err(Error::invalid_argument(format!(
                    "account endpoint scheme '{}' is not allowed",
                    scheme
                )))
            }
        }
        if credential.secret().trim().is_empty() {
            return Err(Error::invalid_argument("credential must not be empty"));
        }
        let database = database.into();
        if database.trim().is_empty() {
            return Err(Error::invalid_argument("database name must not be empty"));
        }

        Ok(Self {
            uri,
            credential,
            database,
            connection_policy: ConnectionPolicy::default(),
            consistency_level: ConsistencyLevel::default(),
            allow_telemetry: true,
            request_options: RequestOptions::default(),
        })
    }

    /// Creates a configuration from an account connection string.
    pub fn from_connection_string(
        connection_string: &str,
        database: impl Into<String>,
    ) -> Result<Self> {
        let cs: ConnectionString = connection_string.parse()?;
        Self::new(&cs.account_endpoint, Credential::Key(cs.account_key), database)
    }

    pub fn with_connection_policy(mut self, connection_policy: ConnectionPolicy) -> Self {
        self.connection_policy = connection_policy;
        self
    }

    pub fn with_consistency_level(mut self, consistency_level: ConsistencyLevel) -> Self {
        self.consistency_level = consistency_level;
        self
    }

    pub fn with_allow_telemetry(mut self, allow_telemetry: bool) -> Self {
        self.allow_telemetry = allow_telemetry;
        self
    }

    /// Sets per-request defaults, rejecting a zero default page size.
    pub fn with_request_options(mut self, request_options: RequestOptions) -> Result<Self> {
        if request_options.default_max_item_count == Some(0) {
            return Err(Error::invalid_argument(
                "default max item count must be greater than zero",
            ));
        }
        self.request_options = request_options;
        Ok(self)
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn connection_policy(&self) -> &ConnectionPolicy {
        &self.connection_policy
    }

    pub fn consistency_level(&self) -> ConsistencyLevel {
        self.consistency_level
    }

    pub fn allow_telemetry(&self) -> bool {
        self.allow_telemetry
    }

    pub fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }
}
