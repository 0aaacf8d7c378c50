// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Derives queries from repository method names such as `findByLastNameOrderByFirstNameAsc`.

use serde_json::Value;

use crate::{
    error::{Error, Result},
    query::{Criteria, CriteriaType, DocumentQuery, Sort, SortOrder},
};

/// What a derived method does with the documents its predicate selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subject {
    Find,
    Count,
    Exists,
    Delete,
}

const SUBJECTS: &[(&str, Subject)] = &[
    ("find", Subject::Find),
    ("read", Subject::Find),
    ("get", Subject::Find),
    ("query", Subject::Find),
    ("search", Subject::Find),
    ("stream", Subject::Find),
    ("count", Subject::Count),
    ("exists", Subject::Exists),
    ("delete", Subject::Delete),
    ("remove", Subject::Delete),
];

/// Property keywords, longest first so that `IsNotNull` wins over `NotNull` and `Null`.
///
/// Any other keyword may also be spelled with a leading `Is` (`IsIn`, `IsNotLike`); see
/// [`parse_part`].
const KEYWORDS: &[(&str, Keyword)] = &[
    ("IsNotNull", Keyword::negated(CriteriaType::IsNull)),
    ("NotNull", Keyword::negated(CriteriaType::IsNull)),
    ("IsNull", Keyword::plain(CriteriaType::IsNull)),
    ("Null", Keyword::plain(CriteriaType::IsNull)),
    ("LessThanEqual", Keyword::plain(CriteriaType::LessThanOrEqual)),
    ("LessThan", Keyword::plain(CriteriaType::LessThan)),
    ("GreaterThanEqual", Keyword::plain(CriteriaType::GreaterThanOrEqual)),
    ("GreaterThan", Keyword::plain(CriteriaType::GreaterThan)),
    ("Before", Keyword::plain(CriteriaType::LessThan)),
    ("After", Keyword::plain(CriteriaType::GreaterThan)),
    ("Between", Keyword::plain(CriteriaType::Between)),
    ("NotIn", Keyword::negated(CriteriaType::In)),
    ("In", Keyword::plain(CriteriaType::In)),
    ("StartingWith", Keyword::plain(CriteriaType::StartsWith)),
    ("StartsWith", Keyword::plain(CriteriaType::StartsWith)),
    ("EndingWith", Keyword::plain(CriteriaType::EndsWith)),
    ("EndsWith", Keyword::plain(CriteriaType::EndsWith)),
    ("NotContaining", Keyword::negated(CriteriaType::Containing)),
    ("Containing", Keyword::plain(CriteriaType::Containing)),
    ("Contains", Keyword::plain(CriteriaType::Containing)),
    ("NotLike", Keyword::negated(CriteriaType::Like)),
    ("Like", Keyword::plain(CriteriaType::Like)),
    ("Regex", Keyword::plain(CriteriaType::Regex)),
    ("Matches", Keyword::plain(CriteriaType::Regex)),
    ("Exists", Keyword::plain(CriteriaType::Exists)),
    ("IsTrue", Keyword::constant(true)),
    ("True", Keyword::constant(true)),
    ("IsFalse", Keyword::constant(false)),
    ("False", Keyword::constant(false)),
    ("IsNotEmpty", Keyword::negated(CriteriaType::IsEmpty)),
    ("NotEmpty", Keyword::negated(CriteriaType::IsEmpty)),
    ("IsEmpty", Keyword::plain(CriteriaType::IsEmpty)),
    ("Empty", Keyword::plain(CriteriaType::IsEmpty)),
    ("Near", Keyword::plain(CriteriaType::Near)),
    ("IsNot", Keyword::negated(CriteriaType::Equal)),
    ("Not", Keyword::negated(CriteriaType::Equal)),
    ("Is", Keyword::plain(CriteriaType::Equal)),
    ("Equals", Keyword::plain(CriteriaType::Equal)),
];

#[derive(Clone, Copy, Debug, PartialEq)]
struct Keyword {
    op: CriteriaType,
    negated: bool,
    /// Compares against a fixed boolean instead of consuming an argument.
    constant: Option<bool>,
}

impl Keyword {
    const fn plain(op: CriteriaType) -> Self {
        Self {
            op,
            negated: false,
            constant: None,
        }
    }

    const fn negated(op: CriteriaType) -> Self {
        Self {
            op,
            negated: true,
            constant: None,
        }
    }

    const fn constant(value: bool) -> Self {
        Self {
            op: CriteriaType::Equal,
            negated: false,
            constant: Some(value),
        }
    }

    /// The number of method arguments consumed. `In` takes a single array argument.
    fn arguments(&self) -> usize {
        if self.constant.is_some() {
            return 0;
        }
        match self.op {
            CriteriaType::Between => 2,
            CriteriaType::Exists | CriteriaType::IsNull | CriteriaType::IsEmpty => 0,
            _ => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Part {
    property: String,
    keyword: Keyword,
    ignore_case: bool,
}

/// A parsed repository method name.
///
/// The predicate is a disjunction of conjunctions: `findByAAndBOrC` selects `(A AND B) OR C`.
#[derive(Clone, Debug, PartialEq)]
pub struct PartTree {
    subject: Subject,
    branches: Vec<Vec<Part>>,
    sort: Sort,
}

impl PartTree {
    pub fn parse(method_name: &str) -> Result<Self> {
        let (subject, rest) = SUBJECTS
            .iter()
            .find_map(|(prefix, subject)| {
                let rest = method_name.strip_prefix(prefix)?;
                starts_word(rest).then_some((*subject, rest))
            })
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "'{}' does not start with a known query prefix",
                    method_name
                ))
            })?;

        let (head, order_by) = match rest.find("OrderBy") {
            Some(at) => (&rest[..at], Some(&rest[at + "OrderBy".len()..])),
            None => (rest, None),
        };

        let predicate = match head.find("By") {
            Some(at) => &head[at + "By".len()..],
            None => "",
        };
        let (predicate, all_ignore_case) = match strip_any(predicate, &["AllIgnoreCase", "AllIgnoringCase"]) {
            Some(stripped) => (stripped, true),
            None => (predicate, false),
        };

        let branches = if predicate.is_empty() {
            Vec::new()
        } else {
            split_words(predicate, "Or")
                .into_iter()
                .map(|branch| {
                    split_words(branch, "And")
                        .into_iter()
                        .map(|part| parse_part(part, all_ignore_case, method_name))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?
        };

        let sort = match order_by {
            Some(order_by) => parse_order_by(order_by, method_name)?,
            None => Sort::unsorted(),
        };

        Ok(Self {
            subject,
            branches,
            sort,
        })
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// The number of arguments the derived method takes.
    pub fn argument_count(&self) -> usize {
        self.branches
            .iter()
            .flatten()
            .map(|part| part.keyword.arguments())
            .sum()
    }

    /// Binds `args` to the predicate, in the order the properties appear in the method name.
    pub fn to_query(&self, args: &[Value]) -> Result<DocumentQuery> {
        let expected = self.argument_count();
        if args.len() != expected {
            return Err(Error::invalid_argument(format!(
                "derived query expects {} argument(s), got {}",
                expected,
                args.len()
            )));
        }

        let mut args = args.iter();
        let mut criteria: Option<Criteria> = None;
        for branch in &self.branches {
            let mut conjunction: Option<Criteria> = None;
            for part in branch {
                let taken: Vec<Value> = args.by_ref().take(part.keyword.arguments()).cloned().collect();
                let leaf = part.to_criteria(taken)?;
                conjunction = Some(match conjunction {
                    Some(left) => Criteria::and(left, leaf),
                    None => leaf,
                });
            }
            if let Some(conjunction) = conjunction {
                criteria = Some(match criteria {
                    Some(left) => Criteria::or(left, conjunction),
                    None => conjunction,
                });
            }
        }

        Ok(DocumentQuery::new(criteria.unwrap_or(Criteria::All)).with_sort(self.sort.clone()))
    }
}

impl Part {
    fn to_criteria(&self, args: Vec<Value>) -> Result<Criteria> {
        let values = match (self.keyword.constant, self.keyword.op) {
            (Some(constant), _) => vec![Value::Bool(constant)],
            (None, CriteriaType::In) => match args.into_iter().next() {
                Some(Value::Array(values)) => values,
                Some(other) => vec![other],
                None => Vec::new(),
            },
            (None, _) => args,
        };

        let mut criteria = Criteria::comparison(self.property.clone(), self.keyword.op, values)?;
        if self.keyword.negated {
            criteria = criteria.negate();
        }
        if self.ignore_case {
            criteria = criteria.ignore_case();
        }
        Ok(criteria)
    }
}

fn parse_part(part: &str, all_ignore_case: bool, method_name: &str) -> Result<Part> {
    let (part, ignore_case) = match strip_any(part, &["IgnoreCase", "IgnoringCase"]) {
        Some(stripped) => (stripped, true),
        None => (part, all_ignore_case),
    };

    let (property, keyword) = KEYWORDS
        .iter()
        .find_map(|(suffix, keyword)| {
            let property = part.strip_suffix(suffix)?;
            let property = match property.strip_suffix("Is") {
                Some(stripped) if !stripped.is_empty() => stripped,
                _ => property,
            };
            (!property.is_empty()).then_some((property, *keyword))
        })
        .unwrap_or((part, Keyword::plain(CriteriaType::Equal)));

    Ok(Part {
        property: property_path(property, method_name)?,
        keyword,
        ignore_case,
    })
}

fn parse_order_by(order_by: &str, method_name: &str) -> Result<Sort> {
    let mut sort = Sort::unsorted();
    let mut rest = order_by;
    while !rest.is_empty() {
        // The next direction keyword ends the current property.
        let (at, len, descending) = ["Asc", "Desc"]
            .iter()
            .filter_map(|keyword| {
                find_word(rest, keyword).map(|at| (at, keyword.len(), *keyword == "Desc"))
            })
            .min_by_key(|(at, _, _)| *at)
            .unwrap_or((rest.len(), 0, false));

        let property = property_path(&rest[..at], method_name)?;
        sort = sort.and(if descending {
            SortOrder::desc(property)
        } else {
            SortOrder::asc(property)
        });
        rest = &rest[at + len..];
    }
    Ok(sort)
}

/// Converts `LastName` to `lastName` and `Address_City` to `address.city`.
fn property_path(property: &str, method_name: &str) -> Result<String> {
    if property.is_empty() {
        return Err(Error::invalid_argument(format!(
            "'{}' names an empty property",
            method_name
        )));
    }
    let segments = property
        .split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => Ok(first.to_lowercase().chain(chars).collect::<String>()),
                None => Err(Error::invalid_argument(format!(
                    "'{}' names an empty property",
                    method_name
                ))),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(segments.join("."))
}

/// `true` if `s` is empty or begins a new camel-case word.
fn starts_word(s: &str) -> bool {
    s.chars().next().map_or(true, char::is_uppercase)
}

/// Finds `keyword` at a word boundary: followed by an uppercase letter or the end.
fn find_word(s: &str, keyword: &str) -> Option<usize> {
    s.match_indices(keyword)
        .map(|(at, _)| at)
        .find(|at| *at > 0 && starts_word(&s[at + keyword.len()..]))
}

fn split_words<'a>(s: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(at) = find_word(rest, keyword) {
        parts.push(&rest[..at]);
        rest = &rest[at + keyword.len()..];
    }
    parts.push(rest);
    parts
}

fn strip_any<'a>(s: &'a str, suffixes: &[&str]) -> Option<&'a str> {
    suffixes.iter().find_map(|suffix| s.strip_suffix(suffix))
}
