// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Page-to-page continuation handling.
//!
//! The controller performs no I/O. [`prepare`] turns a [`PageRequest`] into query options
//! before a fetch and [`advance`] interprets the store's response afterwards, so the same
//! logic serves blocking and asynchronous callers.

use tracing::trace;

use crate::{
    error::{Error, Result},
    feed::FeedPage,
    options::QueryOptions,
    pagination::{Page, PageRequest},
};

/// Validates `request` and writes its paging directives into `options`.
///
/// Fails with [`Error::IllegalState`] when a page other than the first carries no
/// continuation token, since the store cannot resume without one.
pub fn prepare(request: &PageRequest, options: &mut QueryOptions) -> Result<()> {
    if request.page_number() != 0 && request.continuation().is_none() {
        return Err(Error::illegal_state(format!(
            "non-first page requires a continuation token (page {})",
            request.page_number()
        )));
    }
    options.max_item_count = Some(request.page_size());
    options.continuation = request.continuation().map(str::to_string);
    Ok(())
}

/// Builds the page for `request` from the store's response.
///
/// Exhaustion is signalled only by the absence of a continuation token. A short or empty
/// response that still carries a token yields a page with a next request.
pub fn advance<T>(request: PageRequest, response: FeedPage<T>) -> Page<T> {
    let (items, continuation) = response.into_parts();
    let returned = items.len();
    let effective_size = if returned > 0 {
        request.page_size().min(returned)
    } else {
        request.page_size()
    };

    let next = continuation.map(|token| request.successor(returned, token));
    trace!(
        page_number = request.page_number(),
        requested = request.page_size(),
        returned,
        has_next = next.is_some(),
        "page fetched"
    );
    Page::new(items, request, effective_size, next)
}
