// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

//! Continuation-token pagination.

pub mod controller;
mod page;
mod page_request;

pub use page::Page;
pub use page_request::{PageRequest, PageState};
