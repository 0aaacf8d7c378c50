// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use serde_json::Value;

use crate::{
    pagination::PageRequest,
    query::{partition, Criteria},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Ordering on a single property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub property: String,
    pub direction: Direction,
    pub ignore_case: bool,
}

impl SortOrder {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
            ignore_case: false,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
            ignore_case: false,
        }
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

/// An ordered list of [`SortOrder`]s; the first entry is the primary key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<SortOrder>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(order: SortOrder) -> Self {
        Self {
            orders: vec![order],
        }
    }

    /// Appends a further ordering.
    pub fn and(mut self, order: SortOrder) -> Self {
        self.orders.push(order);
        self
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn orders(&self) -> &[SortOrder] {
        &self.orders
    }
}

impl FromIterator<SortOrder> for Sort {
    fn from_iter<I: IntoIterator<Item = SortOrder>>(iter: I) -> Self {
        Self {
            orders: iter.into_iter().collect(),
        }
    }
}

/// A criteria tree plus optional sort and paging directives.
///
/// Builder methods return a new envelope and leave the receiver untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentQuery {
    criteria: Criteria,
    sort: Sort,
    page: Option<PageRequest>,
}

impl DocumentQuery {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            sort: Sort::unsorted(),
            page: None,
        }
    }

    /// A query selecting every document.
    pub fn all() -> Self {
        Self::new(Criteria::All)
    }

    pub fn with_sort(&self, sort: Sort) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    pub fn with_page(&self, page: PageRequest) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn page(&self) -> Option<&PageRequest> {
        self.page.as_ref()
    }

    /// The sort to apply: the page request's sort when it has one, otherwise the envelope's.
    pub fn effective_sort(&self) -> &Sort {
        match &self.page {
            Some(page) if page.sort().is_sorted() => page.sort(),
            _ => &self.sort,
        }
    }

    /// See [`partition::is_cross_partition_required`].
    pub fn is_cross_partition_required(&self, partition_key_fields: &[&str]) -> bool {
        partition::is_cross_partition_required(&self.criteria, partition_key_fields)
    }

    /// See [`partition::extract_partition_value`].
    pub fn partition_key_value(&self, field: &str) -> Option<&Value> {
        partition::extract_partition_value(&self.criteria, field)
    }
}

impl From<Criteria> for DocumentQuery {
    fn from(criteria: Criteria) -> Self {
        DocumentQuery::new(criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_sort_does_not_mutate() {
        let query = DocumentQuery::new(Criteria::equal("a", 1).unwrap());
        let sorted = query.with_sort(Sort::by(SortOrder::desc("b")));
        assert!(!query.sort().is_sorted());
        assert_eq!(sorted.sort().orders()[0].direction, Direction::Desc);
        assert_eq!(sorted.criteria(), query.criteria());
    }

    #[test]
    fn page_sort_takes_precedence() {
        let page = PageRequest::first(10)
            .unwrap()
            .with_sort(Sort::by(SortOrder::asc("lastName")));
        let query = DocumentQuery::all()
            .with_sort(Sort::by(SortOrder::asc("firstName")))
            .with_page(page);
        assert_eq!(query.effective_sort().orders()[0].property, "lastName");
    }

    #[test]
    fn envelope_sort_used_when_page_is_unsorted() {
        let query = DocumentQuery::all()
            .with_sort(Sort::by(SortOrder::asc("firstName")))
            .with_page(PageRequest::first(10).unwrap());
        assert_eq!(query.effective_sort().orders()[0].property, "firstName");
    }
}
