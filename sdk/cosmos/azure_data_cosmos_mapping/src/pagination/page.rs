// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use crate::pagination::{PageRequest, PageState};

/// One page of mapped results plus the request for the page after it.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    items: Vec<T>,
    request: PageRequest,
    effective_size: usize,
    next: Option<PageRequest>,
}

impl<T> Page<T> {
    pub(crate) fn new(
        items: Vec<T>,
        request: PageRequest,
        effective_size: usize,
        next: Option<PageRequest>,
    ) -> Self {
        Self {
            items,
            request,
            effective_size,
            next,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The request that produced this page.
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// The page size to report for this page.
    ///
    /// The store may return fewer items than requested while more data remains; in that case
    /// this is the number actually returned. A page with no items reports the requested size.
    pub fn effective_size(&self) -> usize {
        self.effective_size
    }

    pub fn next_page_request(&self) -> Option<&PageRequest> {
        self.next.as_ref()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn state(&self) -> PageState {
        if self.next.is_some() {
            PageState::MidPage
        } else {
            PageState::LastPage
        }
    }

    /// `true` for an empty page that is not the last one.
    ///
    /// The store can return such pages under throughput pressure. Callers should continue from
    /// [`next_page_request`](Self::next_page_request) rather than treat this as the end.
    pub fn is_transient_empty(&self) -> bool {
        self.items.is_empty() && self.next.is_some()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            request: self.request,
            effective_size: self.effective_size,
            next: self.next,
        }
    }
}
