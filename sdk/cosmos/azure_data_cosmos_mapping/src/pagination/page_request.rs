// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::{
    error::{Error, Result},
    query::Sort,
};

/// Where a paginated query stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageState {
    /// No continuation token yet; the query starts from the beginning.
    FirstPage,
    /// A continuation token is held and more pages are expected.
    MidPage,
    /// The store returned no continuation token; the result set is exhausted.
    LastPage,
}

/// A request for one page of a query.
///
/// Only the first page can be requested without a continuation token. Later pages are
/// obtained from [`Page::next_page_request`](crate::pagination::Page::next_page_request).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    offset: u64,
    page_number: u32,
    page_size: usize,
    continuation: Option<String>,
    sort: Sort,
}

impl PageRequest {
    /// A request for the first page of `page_size` items.
    pub fn first(page_size: usize) -> Result<Self> {
        Self::new(0, 0, page_size, None)
    }

    /// A request resuming at `continuation`.
    ///
    /// `page_size` must be positive. The pairing of `page_number` and `continuation` is checked
    /// when the request is executed, not here.
    pub fn new(
        offset: u64,
        page_number: u32,
        page_size: usize,
        continuation: Option<String>,
    ) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::invalid_argument("page size must be greater than zero"));
        }
        Ok(Self {
            offset,
            page_number,
            page_size,
            continuation: continuation.filter(|c| !c.is_empty()),
            sort: Sort::unsorted(),
        })
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// The number of items returned by earlier pages.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn is_first(&self) -> bool {
        self.page_number == 0 && self.continuation.is_none()
    }

    pub fn state(&self) -> PageState {
        match self.continuation {
            None => PageState::FirstPage,
            Some(_) => PageState::MidPage,
        }
    }

    /// The request following this one, resuming at `continuation`.
    pub(crate) fn successor(&self, returned: usize, continuation: String) -> Self {
        Self {
            offset: self.offset + returned as u64,
            page_number: self.page_number + 1,
            page_size: self.page_size,
            continuation: Some(continuation),
            sort: self.sort.clone(),
        }
    }
}
