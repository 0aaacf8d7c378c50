// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Decides whether a query can be routed to a single partition.
//!
//! The analysis is conservative: a partition key is only considered pinned by an equality
//! that every matching document must satisfy. Equalities under an `OR`, negated equalities
//! and case-insensitive equalities never pin, because they admit documents from more than
//! one partition.

use serde_json::Value;

use crate::{
    partition_key::is_scalar,
    query::{BinaryOp, Criteria, CriteriaType},
};

/// Returns `false` only when every field in `partition_key_fields` is pinned to a single
/// scalar value by an `AND`-reachable equality.
///
/// An empty `partition_key_fields` (unpartitioned container) always returns `true`.
pub fn is_cross_partition_required(criteria: &Criteria, partition_key_fields: &[&str]) -> bool {
    if partition_key_fields.is_empty() {
        return true;
    }
    !partition_key_fields
        .iter()
        .all(|field| extract_partition_value(criteria, field).is_some())
}

/// Finds the value `field` is pinned to, searching `AND` branches depth-first, left first.
///
/// Matches nested under an `OR` are never returned.
pub fn extract_partition_value<'a>(criteria: &'a Criteria, field: &str) -> Option<&'a Value> {
    match criteria {
        Criteria::All => None,
        Criteria::Comparison(c) => {
            let pins = c.op() == CriteriaType::Equal
                && !c.negated()
                && !c.ignore_case()
                && c.subject() == field;
            match c.values() {
                [value] if pins && is_scalar(value) => Some(value),
                _ => None,
            }
        }
        Criteria::Binary {
            op: BinaryOp::And,
            left,
            right,
        } => extract_partition_value(left, field).or_else(|| extract_partition_value(right, field)),
        Criteria::Binary { op: BinaryOp::Or, .. } => None,
    }
}
