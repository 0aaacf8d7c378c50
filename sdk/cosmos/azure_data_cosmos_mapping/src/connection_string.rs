// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::{fmt, str::FromStr};

use crate::error::{Error, Result};

/// A parsed Cosmos DB account connection string.
///
/// The format is a `;`-separated list of `Key=Value` pairs, for example
/// `AccountEndpoint=https://myaccount.documents.azure.com:443/;AccountKey=c2VjcmV0;`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub account_endpoint: String,
    pub account_key: String,
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::invalid_argument("connection string is empty"));
        }

        let mut account_endpoint = None;
        let mut account_key = None;
        for pair in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Keys are base64 and may themselves contain '='.
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                Error::invalid_argument("connection string segment is missing '='")
            })?;
            match key.trim() {
                k if k.eq_ignore_ascii_case("AccountEndpoint") => {
                    account_endpoint = Some(value.trim().to_string())
                }
                k if k.eq_ignore_ascii_case("AccountKey") => {
                    account_key = Some(value.trim().to_string())
                }
                _ => {}
            }
        }

        match (account_endpoint, account_key) {
            (Some(account_endpoint), Some(account_key))
                if !account_endpoint.is_empty() && !account_key.is_empty() =>
            {
                Ok(ConnectionString {
                    account_endpoint,
                    account_key,
                })
            }
            _ => Err(Error::invalid_argument(
                "connection string requires both AccountEndpoint and AccountKey",
            )),
        }
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_endpoint", &self.account_endpoint)
            .field("account_key", &"<redacted>")
            .finish()
    }
}
