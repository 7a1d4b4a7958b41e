use super::comment::Comment;
use super::query::CommentQuery;
use super::table::Table;
use super::types::{
    Deleted, GetRecordOptions, ListCommentsOptions, RecordData, UpdateMethod, UpdateRecordOptions,
};
use crate::error::Result;
use crate::types::{JsonObject, JsonValue};
use chrono::{DateTime, Utc};

/// A table record with locally editable fields
#[derive(Debug, Clone)]
pub struct Record {
    table: Table,
    id: String,
    data: Option<RecordData>,
    /// Current field values; empty fields are usually absent
    pub fields: JsonObject,
    pub created_time: Option<DateTime<Utc>>,
    pub comment_count: Option<u32>,
    deleted: bool,
}

impl Record {
    pub(crate) fn new(table: Table, id: impl Into<String>) -> Self {
        Self {
            table,
            id: id.into(),
            data: None,
            fields: JsonObject::new(),
            created_time: None,
            comment_count: None,
            deleted: false,
        }
    }

    pub(crate) fn from_data(table: Table, data: RecordData) -> Self {
        let mut record = Self::new(table, data.id.clone());
        record.set_data(data);
        record
    }

    fn set_data(&mut self, data: RecordData) {
        self.fields = data.fields.clone();
        self.created_time = Some(data.created_time);
        if data.comment_count.is_some() {
            self.comment_count = data.comment_count;
        }
        self.data = Some(data);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Last payload received from the API
    pub fn data(&self) -> Option<&RecordData> {
        self.data.as_ref()
    }

    /// Set once a delete was acknowledged; informational only
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Value of a field by name or id
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    /// Change a field locally; sent by [`save`](Self::save)
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<JsonValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Reload from the API
    pub async fn fetch(&mut self, options: GetRecordOptions) -> Result<()> {
        let data = self.table.find_data(&self.id, &options).await?;
        self.set_data(data);
        Ok(())
    }

    /// Write all local fields back, clearing fields not present
    pub async fn save(&mut self, options: UpdateRecordOptions) -> Result<()> {
        let fields = self.fields.clone();
        self.put_update(fields, options).await
    }

    /// Update only the given fields
    pub async fn patch_update(
        &mut self,
        fields: JsonObject,
        options: UpdateRecordOptions,
    ) -> Result<()> {
        let data = self
            .table
            .update_data(&self.id, fields, UpdateMethod::Patch, &options)
            .await?;
        self.set_data(data);
        Ok(())
    }

    /// Replace the record's fields
    pub async fn put_update(
        &mut self,
        fields: JsonObject,
        options: UpdateRecordOptions,
    ) -> Result<()> {
        let data = self
            .table
            .update_data(&self.id, fields, UpdateMethod::Put, &options)
            .await?;
        self.set_data(data);
        Ok(())
    }

    pub async fn delete(&mut self) -> Result<Deleted> {
        let response = self.table.delete(&self.id).await?;
        if response.deleted {
            self.deleted = true;
        }
        Ok(response)
    }

    // ========================================================================
    // Comments
    // ========================================================================

    pub fn comments(&self, options: ListCommentsOptions) -> CommentQuery {
        self.table.comments(self.id.clone(), options)
    }

    pub async fn create_comment(&self, text: &str, parent_comment_id: Option<&str>) -> Result<Comment> {
        self.table
            .create_comment(&self.id, text, parent_comment_id)
            .await
    }

    pub async fn update_comment(&self, comment_id: &str, text: &str) -> Result<Comment> {
        self.table.update_comment(&self.id, comment_id, text).await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<Deleted> {
        self.table.delete_comment(&self.id, comment_id).await
    }
}
