use super::table::Table;
use super::types::{Collaborator, CommentData, Deleted, Mention, Reaction};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A comment on a record
#[derive(Debug, Clone)]
pub struct Comment {
    table: Table,
    record_id: String,
    data: CommentData,
    /// Local text, sent by [`save`](Self::save)
    pub text: String,
    deleted: bool,
}

impl Comment {
    pub(crate) fn new(table: Table, record_id: impl Into<String>, data: CommentData) -> Self {
        Self {
            table,
            record_id: record_id.into(),
            text: data.text.clone(),
            data,
            deleted: false,
        }
    }

    fn set_data(&mut self, data: CommentData) {
        self.text = data.text.clone();
        self.data = data;
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn data(&self) -> &CommentData {
        &self.data
    }

    pub fn author(&self) -> Option<&Collaborator> {
        self.data.author.as_ref()
    }

    pub fn created_time(&self) -> DateTime<Utc> {
        self.data.created_time
    }

    pub fn last_updated_time(&self) -> Option<DateTime<Utc>> {
        self.data.last_updated_time
    }

    pub fn parent_comment_id(&self) -> Option<&str> {
        self.data.parent_comment_id.as_deref()
    }

    pub fn mentioned(&self) -> Option<&HashMap<String, Mention>> {
        self.data.mentioned.as_ref()
    }

    pub fn reactions(&self) -> Option<&[Reaction]> {
        self.data.reactions.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Replace the comment's text on the server
    pub async fn update(&mut self, text: &str) -> Result<()> {
        let data = self
            .table
            .update_comment_data(&self.record_id, &self.data.id, text)
            .await?;
        self.set_data(data);
        Ok(())
    }

    /// Send the local text
    pub async fn save(&mut self) -> Result<()> {
        let text = self.text.clone();
        self.update(&text).await
    }

    pub async fn delete(&mut self) -> Result<Deleted> {
        let response = self
            .table
            .delete_comment(&self.record_id, &self.data.id)
            .await?;
        if response.deleted {
            self.deleted = true;
        }
        Ok(response)
    }
}
