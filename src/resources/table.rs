use super::comment::Comment;
use super::{encode_path, fields_body, options_object};
use super::query::{CommentQuery, Query};
use super::record::Record;
use super::types::{
    CommentData, Deleted, FieldSchema, GetRecordOptions, ListCommentsOptions, ListRecordsOptions,
    RecordData, UpdateMethod, UpdateRecordOptions,
};
use crate::airtable::Airtable;
use crate::error::Result;
use crate::http::RequestDescriptor;
use crate::types::{JsonObject, JsonValue, Method};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct RecordList {
    records: Vec<RecordData>,
}

#[derive(Deserialize)]
struct DeletedList {
    records: Vec<Deleted>,
}

/// Handle to one table of a base, addressed by name or id
#[derive(Debug, Clone)]
pub struct Table {
    client: Airtable,
    base_id: String,
    id: String,
}

impl Table {
    pub(crate) fn new(client: Airtable, base_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            client,
            base_id: base_id.into(),
            id: id.into(),
        }
    }

    /// Table name or id as given
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    pub fn client(&self) -> &Airtable {
        &self.client
    }

    // ========================================================================
    // Paths
    // ========================================================================

    pub(crate) fn resource_path(&self) -> String {
        encode_path([self.base_id.as_str(), self.id.as_str()])
    }

    pub(crate) fn record_path(&self, record_id: &str) -> String {
        encode_path([self.base_id.as_str(), self.id.as_str(), record_id])
    }

    pub(crate) fn comments_path(&self, record_id: &str) -> String {
        encode_path([self.base_id.as_str(), self.id.as_str(), record_id, "comments"])
    }

    fn comment_path(&self, record_id: &str, comment_id: &str) -> String {
        encode_path([
            self.base_id.as_str(),
            self.id.as_str(),
            record_id,
            "comments",
            comment_id,
        ])
    }

    fn fields_path(&self) -> String {
        encode_path(["meta", "bases", self.base_id.as_str(), "tables", self.id.as_str(), "fields"])
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Record handle without fetching it
    pub fn record(&self, record_id: impl Into<String>) -> Record {
        Record::new(self.clone(), record_id)
    }

    /// Create one record
    pub async fn create(&self, fields: JsonObject, options: UpdateRecordOptions) -> Result<Record> {
        let request = RequestDescriptor::with_method(Method::POST, self.resource_path())
            .json(JsonValue::Object(fields_body(fields, &options)?));
        let data: RecordData = self.client.execute_as(&request).await?;
        Ok(Record::from_data(self.clone(), data))
    }

    /// Create several records in one request
    pub async fn create_many(
        &self,
        records: Vec<JsonObject>,
        options: UpdateRecordOptions,
    ) -> Result<Vec<Record>> {
        let records: Vec<JsonValue> = records
            .into_iter()
            .map(|fields| json!({ "fields": fields }))
            .collect();
        let request = RequestDescriptor::with_method(Method::POST, self.resource_path())
            .json(records_body(records, &options)?);
        let list: RecordList = self.client.execute_as(&request).await?;
        Ok(self.wrap_records(list.records))
    }

    /// Fetch one record
    pub async fn find(&self, record_id: &str, options: GetRecordOptions) -> Result<Record> {
        let data = self.find_data(record_id, &options).await?;
        Ok(Record::from_data(self.clone(), data))
    }

    pub(crate) async fn find_data(
        &self,
        record_id: &str,
        options: &GetRecordOptions,
    ) -> Result<RecordData> {
        let request =
            RequestDescriptor::new(self.record_path(record_id)).query_object(options_object(options)?);
        self.client.execute_as(&request).await
    }

    /// Lazily evaluated record listing
    pub fn list(&self, options: ListRecordsOptions) -> Query {
        Query::new(self.clone(), options)
    }

    /// Update one record
    pub async fn update(
        &self,
        record_id: &str,
        fields: JsonObject,
        method: UpdateMethod,
        options: UpdateRecordOptions,
    ) -> Result<Record> {
        let data = self.update_data(record_id, fields, method, &options).await?;
        Ok(Record::from_data(self.clone(), data))
    }

    pub(crate) async fn update_data(
        &self,
        record_id: &str,
        fields: JsonObject,
        method: UpdateMethod,
        options: &UpdateRecordOptions,
    ) -> Result<RecordData> {
        let request = RequestDescriptor::with_method(update_method(method), self.record_path(record_id))
            .json(JsonValue::Object(fields_body(fields, options)?));
        self.client.execute_as(&request).await
    }

    /// Update several records, given as `(record id, fields)` pairs
    pub async fn update_many(
        &self,
        records: Vec<(String, JsonObject)>,
        method: UpdateMethod,
        options: UpdateRecordOptions,
    ) -> Result<Vec<Record>> {
        let records: Vec<JsonValue> = records
            .into_iter()
            .map(|(id, fields)| json!({ "id": id, "fields": fields }))
            .collect();
        let request = RequestDescriptor::with_method(update_method(method), self.resource_path())
            .json(records_body(records, &options)?);
        let list: RecordList = self.client.execute_as(&request).await?;
        Ok(self.wrap_records(list.records))
    }

    /// Delete one record
    pub async fn delete(&self, record_id: &str) -> Result<Deleted> {
        self.client
            .execute_as(&RequestDescriptor::with_method(
                Method::DELETE,
                self.record_path(record_id),
            ))
            .await
    }

    /// Delete several records in one request
    pub async fn delete_many(&self, record_ids: &[&str]) -> Result<Vec<Deleted>> {
        let request = RequestDescriptor::with_method(Method::DELETE, self.resource_path())
            .query("records", json!(record_ids));
        let list: DeletedList = self.client.execute_as(&request).await?;
        Ok(list.records)
    }

    fn wrap_records(&self, records: Vec<RecordData>) -> Vec<Record> {
        records
            .into_iter()
            .map(|data| Record::from_data(self.clone(), data))
            .collect()
    }

    // ========================================================================
    // Fields
    // ========================================================================

    /// Add a field from a JSON definition (`name`, `type`, `options`, ...)
    pub async fn create_field(&self, definition: JsonValue) -> Result<FieldSchema> {
        self.client
            .execute_as(&RequestDescriptor::with_method(Method::POST, self.fields_path()).json(definition))
            .await
    }

    /// Change a field's name or description
    pub async fn update_field(&self, field_id: &str, changes: JsonValue) -> Result<FieldSchema> {
        let path = format!("{}/{}", self.fields_path(), urlencoding::encode(field_id));
        self.client
            .execute_as(&RequestDescriptor::with_method(Method::PATCH, path).json(changes))
            .await
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Lazily evaluated comment listing of a record
    pub fn comments(&self, record_id: impl Into<String>, options: ListCommentsOptions) -> CommentQuery {
        CommentQuery::new(self.clone(), record_id, options)
    }

    /// Comment on a record, optionally as a reply
    pub async fn create_comment(
        &self,
        record_id: &str,
        text: &str,
        parent_comment_id: Option<&str>,
    ) -> Result<Comment> {
        let mut body = json!({ "text": text });
        if let Some(parent) = parent_comment_id {
            body["parentCommentId"] = json!(parent);
        }
        let request =
            RequestDescriptor::with_method(Method::POST, self.comments_path(record_id)).json(body);
        let data: CommentData = self.client.execute_as(&request).await?;
        Ok(Comment::new(self.clone(), record_id, data))
    }

    /// Replace a comment's text
    pub async fn update_comment(
        &self,
        record_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<Comment> {
        let data = self.update_comment_data(record_id, comment_id, text).await?;
        Ok(Comment::new(self.clone(), record_id, data))
    }

    pub(crate) async fn update_comment_data(
        &self,
        record_id: &str,
        comment_id: &str,
        text: &str,
    ) -> Result<CommentData> {
        let request =
            RequestDescriptor::with_method(Method::PATCH, self.comment_path(record_id, comment_id))
                .json(json!({ "text": text }));
        self.client.execute_as(&request).await
    }

    /// Delete a comment
    pub async fn delete_comment(&self, record_id: &str, comment_id: &str) -> Result<Deleted> {
        self.client
            .execute_as(&RequestDescriptor::with_method(
                Method::DELETE,
                self.comment_path(record_id, comment_id),
            ))
            .await
    }
}

/// Batch body: the options flattened next to `records`
fn records_body(records: Vec<JsonValue>, options: &UpdateRecordOptions) -> Result<JsonValue> {
    let mut body = options_object(options)?;
    body.insert("records".to_string(), JsonValue::Array(records));
    Ok(JsonValue::Object(body))
}

fn update_method(method: UpdateMethod) -> Method {
    match method {
        UpdateMethod::Patch => Method::PATCH,
        UpdateMethod::Put => Method::PUT,
    }
}
