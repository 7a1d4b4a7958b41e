//! Lazy list queries over records and comments

use super::comment::Comment;
use super::options_object;
use super::record::Record;
use super::table::Table;
use super::types::{CommentData, ListCommentsOptions, ListRecordsOptions, RecordData};
use crate::airtable::parse_items;
use crate::error::{Error, Result};
use crate::http::RequestDescriptor;
use crate::pagination::{IteratorReset, PageControl};
use crate::types::Method;

const RECORDS_KEY: &str = "records";
const COMMENTS_KEY: &str = "comments";

/// Record listing through `POST /{base}/{table}/listRecords`
#[derive(Debug, Clone)]
pub struct Query {
    table: Table,
    options: ListRecordsOptions,
    reset: IteratorReset,
}

impl Query {
    pub(crate) fn new(table: Table, options: ListRecordsOptions) -> Self {
        Self {
            table,
            options,
            reset: IteratorReset::default(),
        }
    }

    pub fn options(&self) -> &ListRecordsOptions {
        &self.options
    }

    /// Whether [`all`](Self::all) restarts when the server's iterator expires
    #[must_use]
    pub fn reset_on_iterator_expiry(mut self, enabled: bool) -> Self {
        self.reset = if enabled {
            IteratorReset::Restart
        } else {
            IteratorReset::Propagate
        };
        self
    }

    fn request(&self) -> Result<RequestDescriptor> {
        let path = format!("{}/listRecords", self.table.resource_path());
        let body = serde_json::to_value(&self.options)?;
        Ok(RequestDescriptor::with_method(Method::POST, path).json(body))
    }

    /// Records of the first page only
    pub async fn first_page(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        self.each_page(|page| {
            records.extend(page);
            false
        })
        .await?;
        Ok(records)
    }

    /// Hand each page of records to `on_page` until it stops or pages run out
    pub async fn each_page<F, R>(&self, mut on_page: F) -> Result<()>
    where
        F: FnMut(Vec<Record>) -> R,
        R: Into<PageControl>,
    {
        let request = self.request()?;
        let mut failure: Option<Error> = None;

        self.table
            .client()
            .paginate(
                &request,
                |ctx| match parse_items::<RecordData>(ctx.take_items(RECORDS_KEY)) {
                    Ok(page) => on_page(wrap_records(&self.table, page)).into(),
                    Err(e) => {
                        failure = Some(e);
                        PageControl::Stop
                    }
                },
                None,
            )
            .await?;

        failure.map_or(Ok(()), Err)
    }

    /// Every matching record, fetched at the server's maximum page size
    pub async fn all(&self) -> Result<Vec<Record>> {
        let items = self
            .table
            .client()
            .collect_all(&self.request()?, RECORDS_KEY, self.reset)
            .await?;
        let records = parse_items::<RecordData>(items)?;
        Ok(wrap_records(&self.table, records))
    }
}

fn wrap_records(table: &Table, page: Vec<RecordData>) -> Vec<Record> {
    page.into_iter()
        .map(|data| Record::from_data(table.clone(), data))
        .collect()
}

/// Comment listing through `GET /{base}/{table}/{record}/comments`
#[derive(Debug, Clone)]
pub struct CommentQuery {
    table: Table,
    record_id: String,
    options: ListCommentsOptions,
}

impl CommentQuery {
    pub(crate) fn new(table: Table, record_id: impl Into<String>, options: ListCommentsOptions) -> Self {
        Self {
            table,
            record_id: record_id.into(),
            options,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    fn request(&self) -> Result<RequestDescriptor> {
        let query = options_object(&self.options)?;
        Ok(RequestDescriptor::new(self.table.comments_path(&self.record_id)).query_object(query))
    }

    pub async fn first_page(&self) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();
        self.each_page(|page| {
            comments.extend(page);
            false
        })
        .await?;
        Ok(comments)
    }

    pub async fn each_page<F, R>(&self, mut on_page: F) -> Result<()>
    where
        F: FnMut(Vec<Comment>) -> R,
        R: Into<PageControl>,
    {
        let request = self.request()?;
        let mut failure: Option<Error> = None;

        self.table
            .client()
            .paginate(
                &request,
                |ctx| match parse_items::<CommentData>(ctx.take_items(COMMENTS_KEY)) {
                    Ok(page) => on_page(self.wrap(page)).into(),
                    Err(e) => {
                        failure = Some(e);
                        PageControl::Stop
                    }
                },
                None,
            )
            .await?;

        failure.map_or(Ok(()), Err)
    }

    /// Every comment of the record
    pub async fn all(&self) -> Result<Vec<Comment>> {
        let items = self
            .table
            .client()
            .collect_all(&self.request()?, COMMENTS_KEY, IteratorReset::Propagate)
            .await?;
        Ok(self.wrap(parse_items::<CommentData>(items)?))
    }

    fn wrap(&self, page: Vec<CommentData>) -> Vec<Comment> {
        page.into_iter()
            .map(|data| Comment::new(self.table.clone(), self.record_id.clone(), data))
            .collect()
    }
}
