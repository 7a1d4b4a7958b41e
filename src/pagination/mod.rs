//! Pagination module
//!
//! Cursor-based traversal of list endpoints.
//!
//! # Overview
//!
//! [`Paginator::paginate`] fetches a page, hands it to a callback, extracts the
//! next cursor and repeats. [`Paginator::collect_all`] builds on it to gather
//! every item of a list, restarting when the server-side iterator expires.

mod engine;
mod types;

pub use engine::{Paginator, MAX_ITERATOR_RESETS, PAGE_SIZE_PARAM};
pub use types::{
    FieldOffset, IteratorReset, OffsetExtractor, PageContext, PageControl, PageCursor,
    DEFAULT_OFFSET_FIELD,
};
