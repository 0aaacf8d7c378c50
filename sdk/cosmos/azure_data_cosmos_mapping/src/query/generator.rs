// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Compiles a [`DocumentQuery`] into a parameterized Cosmos DB SQL [`Query`].

use std::fmt::Write;

use serde_json::Value;

use crate::{
    constants::{ID_FIELD, PARAMETER_PREFIX, ROOT_ALIAS},
    error::{Error, Result},
    models::{IndexingMode, IndexingPolicy, PropertyPath},
    query::{BinaryOp, Comparison, Criteria, CriteriaType, DocumentQuery, Query, Sort},
};

// Property names that must be addressed with bracket notation.
const RESERVED_WORDS: &[&str] = &[
    "and", "array", "as", "asc", "between", "by", "desc", "distinct", "escape", "exists",
    "false", "from", "group", "in", "join", "like", "limit", "not", "null", "offset", "or",
    "order", "root", "select", "top", "true", "udf", "undefined", "value", "where",
];

/// Generates query text for the find, count and sorted-find shapes.
///
/// Generation is a pure function of the query, the entity's declared id field and, for
/// sorted shapes, its indexing policy. The id field is always rendered as the reserved `id`
/// property, and parameters are named
/// `@p1, @p2, ...` in pre-order traversal of the criteria tree.
#[derive(Clone, Debug)]
pub struct QuerySpecGenerator<'a> {
    id_field: &'a str,
    indexing_policy: Option<&'a IndexingPolicy>,
}

impl<'a> QuerySpecGenerator<'a> {
    pub fn new(id_field: &'a str) -> Self {
        Self {
            id_field,
            indexing_policy: None,
        }
    }

    /// Checks sort properties against the container's indexing policy.
    ///
    /// Without a policy every property is assumed to be range indexed, which is the service
    /// default.
    pub fn with_indexing_policy(mut self, policy: Option<&'a IndexingPolicy>) -> Self {
        self.indexing_policy = policy;
        self
    }

    /// `SELECT * FROM ROOT r [WHERE ...]`
    pub fn find(&self, query: &DocumentQuery) -> Result<Query> {
        self.generate("SELECT * FROM ROOT r", query.criteria())
    }

    /// `SELECT VALUE COUNT(1) FROM r [WHERE ...]`
    pub fn count(&self, query: &DocumentQuery) -> Result<Query> {
        self.generate("SELECT VALUE COUNT(1) FROM r", query.criteria())
    }

    /// The find shape followed by an `ORDER BY` clause built from the effective sort.
    ///
    /// Case-insensitive ordering is not supported by the service and is rejected, as is
    /// ordering by a property the indexing policy leaves unindexed.
    pub fn sorted_find(&self, query: &DocumentQuery) -> Result<Query> {
        let order_by = self.order_by(query.effective_sort())?;
        let mut generated = self.find(query)?;
        generated.push_text(&order_by);
        Ok(generated)
    }

    fn generate(&self, head: &str, criteria: &Criteria) -> Result<Query> {
        let mut compiler = Compiler {
            generator: self,
            parameters: Vec::new(),
        };
        let mut text = head.to_string();
        if !criteria.is_all() {
            let predicate = compiler.predicate(criteria)?;
            text.push_str(" WHERE ");
            text.push_str(&predicate);
        }

        let mut query = Query::from(text);
        for (name, value) in compiler.parameters {
            query.push_parameter(name, value);
        }
        Ok(query)
    }

    fn order_by(&self, sort: &Sort) -> Result<String> {
        let mut clause = String::new();
        for (i, order) in sort.orders().iter().enumerate() {
            if order.ignore_case {
                return Err(Error::unsupported(format!(
                    "case-insensitive sort on '{}'",
                    order.property
                )));
            }
            self.check_orderable(&order.property)?;
            clause.push_str(if i == 0 { " ORDER BY " } else { ", " });
            clause.push_str(&self.field(&order.property)?);
            clause.push(' ');
            clause.push_str(order.direction.as_str());
        }
        Ok(clause)
    }

    fn check_orderable(&self, property: &str) -> Result<()> {
        let Some(policy) = self.indexing_policy else {
            return Ok(());
        };
        if policy.indexing_mode == IndexingMode::None {
            return Err(Error::unsupported(format!(
                "sort on '{}': the container is not indexed",
                property
            )));
        }

        let path = if property == self.id_field {
            format!("/{}", ID_FIELD)
        } else {
            format!("/{}", property.replace('.', "/"))
        };
        let most_specific = |paths: &[PropertyPath]| {
            paths
                .iter()
                .filter_map(|p| index_path_match(&p.path, &path))
                .max()
        };
        // No included paths means the implicit root path `/*`.
        let included = if policy.included_paths.is_empty() {
            Some(0)
        } else {
            most_specific(&policy.included_paths)
        };
        let excluded = most_specific(&policy.excluded_paths);
        let indexed = match (included, excluded) {
            (Some(included), Some(excluded)) => included > excluded,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if indexed {
            Ok(())
        } else {
            Err(Error::unsupported(format!(
                "sort on '{}': the property is excluded from the indexing policy",
                property
            )))
        }
    }

    /// Renders a dotted field path against the root alias.
    fn field(&self, subject: &str) -> Result<String> {
        if subject == self.id_field {
            return Ok(format!("{}.{}", ROOT_ALIAS, ID_FIELD));
        }

        let mut rendered = ROOT_ALIAS.to_string();
        for segment in subject.split('.') {
            if segment.is_empty() {
                return Err(Error::invalid_argument(format!(
                    "malformed field path '{}'",
                    subject
                )));
            }
            if is_plain_identifier(segment) {
                rendered.push('.');
                rendered.push_str(segment);
            } else {
                // A JSON string literal is also a valid Cosmos SQL string literal.
                let quoted = Value::String(segment.to_string()).to_string();
                let _ = write!(rendered, "[{}]", quoted);
            }
        }
        Ok(rendered)
    }
}

/// Matches an indexing policy path (`/a/b/?`, `/a/*`, `/*`) against a document path such as
/// `/a/b`, returning the length of the matched prefix so that the most specific policy path
/// wins.
fn index_path_match(pattern: &str, path: &str) -> Option<usize> {
    if let Some(exact) = pattern.strip_suffix("/?") {
        return (exact == path).then_some(exact.len());
    }
    let prefix = pattern.strip_suffix("/*").unwrap_or(pattern);
    let covered = path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'));
    covered.then_some(prefix.len())
}

fn is_plain_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&segment.to_ascii_lowercase().as_str())
}

struct Compiler<'g, 'a> {
    generator: &'g QuerySpecGenerator<'a>,
    parameters: Vec<(String, Value)>,
}

impl Compiler<'_, '_> {
    fn predicate(&mut self, criteria: &Criteria) -> Result<String> {
        match criteria {
            // Only reachable below a binary node; a root `All` suppresses the WHERE clause.
            Criteria::All => Ok("true".to_string()),
            Criteria::Comparison(c) => {
                let expr = self.comparison(c)?;
                if c.negated() {
                    Ok(format!("NOT ({})", expr))
                } else {
                    Ok(expr)
                }
            }
            Criteria::Binary { op, left, right } => {
                let left = self.predicate(left)?;
                let right = self.predicate(right)?;
                match op {
                    BinaryOp::And => Ok(format!("{} AND {}", left, right)),
                    BinaryOp::Or => Ok(format!("({} OR {})", left, right)),
                }
            }
        }
    }

    fn bind(&mut self, value: &Value) -> String {
        let name = format!("{}{}", PARAMETER_PREFIX, self.parameters.len() + 1);
        self.parameters.push((name.clone(), value.clone()));
        name
    }

    fn comparison(&mut self, c: &Comparison) -> Result<String> {
        let field = self.generator.field(c.subject())?;
        let folded = c.ignore_case();
        let fold = |s: String| if folded { format!("UPPER({})", s) } else { s };

        let expr = match c.op() {
            CriteriaType::Equal
            | CriteriaType::LessThan
            | CriteriaType::LessThanOrEqual
            | CriteriaType::GreaterThan
            | CriteriaType::GreaterThanOrEqual => {
                let operator = match c.op() {
                    CriteriaType::Equal => "=",
                    CriteriaType::LessThan => "<",
                    CriteriaType::LessThanOrEqual => "<=",
                    CriteriaType::GreaterThan => ">",
                    _ => ">=",
                };
                let param = self.bind(&c.values()[0]);
                format!("{}{}{}", fold(field), operator, fold(param))
            }
            CriteriaType::Between => {
                let low = self.bind(&c.values()[0]);
                let high = self.bind(&c.values()[1]);
                let field = fold(field);
                format!("({}>={} AND {}<={})", field, fold(low), field, fold(high))
            }
            CriteriaType::In => {
                let params: Vec<String> = c
                    .values()
                    .iter()
                    .map(|v| {
                        let param = self.bind(v);
                        fold(param)
                    })
                    .collect();
                format!("{} IN ({})", fold(field), params.join(", "))
            }
            CriteriaType::Containing | CriteriaType::StartsWith | CriteriaType::EndsWith => {
                let function = match c.op() {
                    CriteriaType::Containing => "CONTAINS",
                    CriteriaType::StartsWith => "STARTSWITH",
                    _ => "ENDSWITH",
                };
                let param = self.bind(&c.values()[0]);
                if folded {
                    format!("{}({}, {}, true)", function, field, param)
                } else {
                    format!("{}({}, {})", function, field, param)
                }
            }
            CriteriaType::Like => {
                let param = self.bind(&c.values()[0]);
                format!("{} LIKE {}", fold(field), fold(param))
            }
            CriteriaType::Regex => {
                let param = self.bind(&c.values()[0]);
                if folded {
                    format!("RegexMatch({}, {}, \"i\")", field, param)
                } else {
                    format!("RegexMatch({}, {})", field, param)
                }
            }
            CriteriaType::Exists => format!("IS_DEFINED({})", field),
            CriteriaType::IsNull => format!("IS_NULL({})", field),
            op @ (CriteriaType::IsEmpty | CriteriaType::Near | CriteriaType::All) => {
                return Err(Error::unsupported(format!(
                    "criteria type {} on '{}' cannot be translated to a query",
                    op,
                    c.subject()
                )));
            }
        };
        Ok(expr)
    }
}
