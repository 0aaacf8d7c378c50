// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

/// A single page of results returned by the store for a query.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedPage<T> {
    items: Vec<T>,
    continuation: Option<String>,
}

impl<T> FeedPage<T> {
    /// Creates a page. An empty continuation string is normalised to `None`.
    pub fn new(items: Vec<T>, continuation: Option<String>) -> Self {
        Self {
            items,
            continuation: continuation.filter(|c| !c.is_empty()),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The token to resume from, or `None` once the result set is exhausted.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    pub fn into_parts(self) -> (Vec<T>, Option<String>) {
        (self.items, self.continuation)
    }

    /// Converts each item, failing on the first conversion error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<FeedPage<U>, E> {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(FeedPage {
            items,
            continuation: self.continuation,
        })
    }
}
