// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! The predicate tree used to describe which documents a query selects.

use std::fmt;

use serde_json::Value;

use crate::error::{Error, Result};

/// The comparison performed by a [`Comparison`] leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CriteriaType {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Between,
    In,
    Containing,
    StartsWith,
    EndsWith,
    Like,
    Regex,
    Exists,
    IsNull,
    IsEmpty,
    Near,
    All,
}

/// How many values a [`CriteriaType`] binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

impl CriteriaType {
    pub fn arity(self) -> Arity {
        match self {
            CriteriaType::Exists | CriteriaType::IsNull | CriteriaType::IsEmpty => {
                Arity::Exactly(0)
            }
            CriteriaType::All => Arity::Exactly(0),
            CriteriaType::Between => Arity::Exactly(2),
            CriteriaType::In | CriteriaType::Near => Arity::AtLeast(1),
            _ => Arity::Exactly(1),
        }
    }

    /// Returns `true` for operators that only make sense against string values.
    pub fn is_string_match(self) -> bool {
        matches!(
            self,
            CriteriaType::Containing
                | CriteriaType::StartsWith
                | CriteriaType::EndsWith
                | CriteriaType::Like
                | CriteriaType::Regex
        )
    }
}

impl fmt::Display for CriteriaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CriteriaType::Equal => "EQUAL",
            CriteriaType::LessThan => "LESS_THAN",
            CriteriaType::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            CriteriaType::GreaterThan => "GREATER_THAN",
            CriteriaType::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            CriteriaType::Between => "BETWEEN",
            CriteriaType::In => "IN",
            CriteriaType::Containing => "CONTAINING",
            CriteriaType::StartsWith => "STARTS_WITH",
            CriteriaType::EndsWith => "ENDS_WITH",
            CriteriaType::Like => "LIKE",
            CriteriaType::Regex => "REGEX",
            CriteriaType::Exists => "EXISTS",
            CriteriaType::IsNull => "IS_NULL",
            CriteriaType::IsEmpty => "IS_EMPTY",
            CriteriaType::Near => "NEAR",
            CriteriaType::All => "ALL",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::And => f.write_str("AND"),
            BinaryOp::Or => f.write_str("OR"),
        }
    }
}

/// A single field comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    subject: String,
    op: CriteriaType,
    values: Vec<Value>,
    ignore_case: bool,
    negated: bool,
}

impl Comparison {
    /// The dotted field path being compared.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn op(&self) -> CriteriaType {
        self.op
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn negated(&self) -> bool {
        self.negated
    }
}

/// An immutable predicate tree.
///
/// Trees are built bottom-up: leaves with [`Criteria::comparison`] (or the shorthands) and
/// inner nodes with [`Criteria::and`] / [`Criteria::or`].
#[derive(Clone, Debug, PartialEq)]
pub enum Criteria {
    /// Matches every document.
    All,
    Comparison(Comparison),
    Binary {
        op: BinaryOp,
        left: Box<Criteria>,
        right: Box<Criteria>,
    },
}

impl Criteria {
    pub fn all() -> Self {
        Criteria::All
    }

    /// Creates a comparison leaf, checking the number of values against the operator.
    pub fn comparison(
        subject: impl Into<String>,
        op: CriteriaType,
        values: Vec<Value>,
    ) -> Result<Self> {
        let subject = subject.into();
        if op == CriteriaType::All {
            return Err(Error::invalid_argument(
                "ALL carries no subject, use Criteria::all()",
            ));
        }
        if subject.trim().is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} requires a non-empty subject",
                op
            )));
        }
        let arity = op.arity();
        if !arity.accepts(values.len()) {
            return Err(Error::invalid_argument(format!(
                "{} on '{}' requires {} value(s), got {}",
                op,
                subject,
                arity,
                values.len()
            )));
        }
        Ok(Criteria::Comparison(Comparison {
            subject,
            op,
            values,
            ignore_case: false,
            negated: false,
        }))
    }

    pub fn equal(subject: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        Self::comparison(subject, CriteriaType::Equal, vec![value.into()])
    }

    pub fn between(
        subject: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self> {
        Self::comparison(subject, CriteriaType::Between, vec![low.into(), high.into()])
    }

    pub fn is_in(subject: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        Self::comparison(subject, CriteriaType::In, values)
    }

    pub fn and(left: Criteria, right: Criteria) -> Self {
        Criteria::Binary {
            op: BinaryOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Criteria, right: Criteria) -> Self {
        Criteria::Binary {
            op: BinaryOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Returns a copy of this leaf that compares case-insensitively.
    ///
    /// Has no effect on binary nodes or [`Criteria::All`].
    pub fn ignore_case(self) -> Self {
        match self {
            Criteria::Comparison(mut c) => {
                c.ignore_case = true;
                Criteria::Comparison(c)
            }
            other => other,
        }
    }

    /// Returns a copy of this leaf with its result negated.
    ///
    /// Has no effect on binary nodes or [`Criteria::All`].
    pub fn negate(self) -> Self {
        match self {
            Criteria::Comparison(mut c) => {
                c.negated = !c.negated;
                Criteria::Comparison(c)
            }
            other => other,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Criteria::All)
    }

    /// Iterates the comparison leaves in pre-order, left before right.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves { stack: vec![self] }
    }
}

/// Pre-order iterator over the [`Comparison`] leaves of a [`Criteria`].
pub struct Leaves<'a> {
    stack: Vec<&'a Criteria>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Comparison;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                Criteria::All => continue,
                Criteria::Comparison(c) => return Some(c),
                Criteria::Binary { left, right, .. } => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
            }
        }
        None
    }
}
