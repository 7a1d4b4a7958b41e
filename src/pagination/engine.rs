//! Page-driven traversal
//!
//! Runs the fetch → callback → advance loop for one logical list operation.
//! Pages are fetched strictly one after another; the next request is built
//! only once the previous page's callback returned.

use super::types::{
    FieldOffset, IteratorReset, OffsetExtractor, PageContext, PageControl, PageCursor,
};
use crate::error::Result;
use crate::http::{HttpClient, RequestDescriptor};
use crate::types::JsonValue;
use tracing::{debug, trace, warn};

/// Request parameter dropped by [`Paginator::collect_all`] so the server
/// returns its maximum page size
pub const PAGE_SIZE_PARAM: &str = "pageSize";

/// Number of restarts `collect_all` attempts before giving up on an
/// expiring iterator
pub const MAX_ITERATOR_RESETS: u32 = 3;

enum PageState<'a> {
    Fetching(PageCursor),
    AwaitingCallback(PageContext<'a>),
    Advancing(PageContext<'a>),
    Done,
}

/// Drives paginated requests through an [`HttpClient`]
#[derive(Debug, Clone, Copy)]
pub struct Paginator<'c> {
    client: &'c HttpClient,
}

impl<'c> Paginator<'c> {
    pub fn new(client: &'c HttpClient) -> Self {
        Self { client }
    }

    /// Fetch pages until the callback stops or no cursor remains.
    ///
    /// `on_each_page` may return `()`, a `bool` or a [`PageControl`];
    /// `()` and `true` continue. Without an extractor the cursor is read
    /// from the response's `offset` field.
    pub async fn paginate<F, R>(
        &self,
        descriptor: &RequestDescriptor,
        mut on_each_page: F,
        extractor: Option<&dyn OffsetExtractor>,
    ) -> Result<()>
    where
        F: FnMut(&mut PageContext<'_>) -> R,
        R: Into<PageControl>,
    {
        let default_extractor = FieldOffset::default();
        let extractor: &dyn OffsetExtractor = match extractor {
            Some(extractor) => extractor,
            None => &default_extractor,
        };

        let mut page = 0;
        let mut state = PageState::Fetching(PageCursor::new());

        loop {
            state = match state {
                PageState::Fetching(cursor) => {
                    trace!("Fetching page {} of {} {}", page, descriptor.method, descriptor.path);
                    let request = descriptor.with_cursor(&cursor);
                    let response = self.client.execute(&request).await?;
                    debug!("Fetched page {} of {}", page, descriptor.path);
                    PageState::AwaitingCallback(PageContext {
                        request: descriptor,
                        response,
                        page,
                    })
                }
                PageState::AwaitingCallback(mut ctx) => {
                    let control: PageControl = on_each_page(&mut ctx).into();
                    if control.should_continue() {
                        PageState::Advancing(ctx)
                    } else {
                        trace!("Page callback stopped pagination at page {}", page);
                        PageState::Done
                    }
                }
                PageState::Advancing(ctx) => match extractor.next_cursor(&ctx) {
                    Some(cursor) if !cursor.is_empty() => {
                        page += 1;
                        PageState::Fetching(cursor)
                    }
                    _ => PageState::Done,
                },
                PageState::Done => return Ok(()),
            };
        }
    }

    /// Fetch every page and collect the arrays found under `items_key`.
    ///
    /// Any `pageSize` parameter is removed. When the server reports the list
    /// iterator as expired and `reset` is [`IteratorReset::Restart`], items
    /// collected so far are discarded and the traversal starts over.
    pub async fn collect_all(
        &self,
        descriptor: &RequestDescriptor,
        items_key: &str,
        reset: IteratorReset,
    ) -> Result<Vec<JsonValue>> {
        let descriptor = descriptor.without_param(PAGE_SIZE_PARAM);
        let mut resets = 0;

        loop {
            let mut items = Vec::new();
            let outcome = self
                .paginate(
                    &descriptor,
                    |ctx| items.extend(ctx.take_items(items_key)),
                    None,
                )
                .await;

            match outcome {
                Ok(()) => return Ok(items),
                Err(e)
                    if e.is_iterator_expired()
                        && reset == IteratorReset::Restart
                        && resets < MAX_ITERATOR_RESETS =>
                {
                    resets += 1;
                    warn!(
                        "List iterator expired on {} after {} items, restarting ({}/{})",
                        descriptor.path,
                        items.len(),
                        resets,
                        MAX_ITERATOR_RESETS
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
