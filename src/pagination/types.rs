//! Pagination types and traits
//!
//! Defines the page context handed to callbacks, the continuation signal
//! they return, and the cursor extraction abstraction.

use crate::http::RequestDescriptor;
use crate::types::{JsonValue, StringMap};
use std::collections::HashMap;

/// Cursor parameters for the next page; empty means no further pages
pub type PageCursor = StringMap;

/// Response field read by the default cursor extractor
pub const DEFAULT_OFFSET_FIELD: &str = "offset";

/// Whether pagination should go on after a page callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageControl {
    /// Fetch the next page, if any
    #[default]
    Continue,
    /// Stop without fetching further pages
    Stop,
}

impl PageControl {
    /// Check if we should continue
    pub fn should_continue(self) -> bool {
        matches!(self, Self::Continue)
    }
}

impl From<()> for PageControl {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

impl From<bool> for PageControl {
    fn from(next: bool) -> Self {
        if next {
            Self::Continue
        } else {
            Self::Stop
        }
    }
}

/// A fetched page as seen by callbacks and cursor extractors
#[derive(Debug)]
pub struct PageContext<'a> {
    /// The request the traversal started from, without cursor parameters
    pub request: &'a RequestDescriptor,
    /// Parsed response body of this page
    pub response: JsonValue,
    /// 0-based page index
    pub page: u32,
}

impl PageContext<'_> {
    /// Move the array under `key` out of the response.
    ///
    /// Returns an empty vec when the key is missing or not an array.
    pub fn take_items(&mut self, key: &str) -> Vec<JsonValue> {
        match self.response.get_mut(key).map(JsonValue::take) {
            Some(JsonValue::Array(items)) => items,
            _ => Vec::new(),
        }
    }
}

/// Extracts the next page's cursor from a fetched page
pub trait OffsetExtractor: Send + Sync {
    /// Cursor for the next page, `None` when this was the last page
    fn next_cursor(&self, ctx: &PageContext<'_>) -> Option<PageCursor>;
}

impl<F> OffsetExtractor for F
where
    F: Fn(&PageContext<'_>) -> Option<PageCursor> + Send + Sync,
{
    fn next_cursor(&self, ctx: &PageContext<'_>) -> Option<PageCursor> {
        self(ctx)
    }
}

/// Reads a single response field and sends it back under the same name
#[derive(Debug, Clone)]
pub struct FieldOffset {
    /// Response field, also used as the request parameter name
    pub field: String,
}

impl Default for FieldOffset {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET_FIELD)
    }
}

impl FieldOffset {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl OffsetExtractor for FieldOffset {
    fn next_cursor(&self, ctx: &PageContext<'_>) -> Option<PageCursor> {
        let value = match ctx.response.get(&self.field)? {
            JsonValue::String(s) if !s.is_empty() => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            _ => return None,
        };

        let mut cursor = HashMap::new();
        cursor.insert(self.field.clone(), value);
        Some(cursor)
    }
}

/// What the bulk fetch does when the server-side list iterator expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IteratorReset {
    /// Discard collected items and start over from the first page
    #[default]
    Restart,
    /// Return the error to the caller
    Propagate,
}
