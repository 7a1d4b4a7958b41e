//! Resource wrappers
//!
//! Typed handles for bases, tables, records and comments. Every wrapper
//! holds a cheap clone of the [`Airtable`](crate::Airtable) client and
//! sends through its request executor and pagination engine.

mod base;
mod comment;
mod query;
mod record;
mod table;
mod types;

pub use base::Base;
pub use comment::Comment;
pub use query::{CommentQuery, Query};
pub use record::Record;
pub use table::Table;
pub use types::{
    BaseInfo, BaseSchema, Collaborator, CommentData, CreatedBase, Deleted, FieldSchema,
    GetRecordOptions, ListCommentsOptions, ListRecordsOptions, Mention, PermissionLevel, Reaction,
    ReactingUser, ReactionEmoji, RecordData, SortDirection, SortSpec, TableSchema, UpdateMethod,
    UpdateRecordOptions, UserInfo, ViewSchema,
};

use crate::error::Result;
use crate::types::{JsonObject, JsonValue};
use serde::Serialize;


/// Join path segments, percent-encoding each one
pub(crate) fn encode_path<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Serialize options into a JSON object; unset options are omitted
pub(crate) fn options_object<T: Serialize>(options: &T) -> Result<JsonObject> {
    match serde_json::to_value(options)? {
        JsonValue::Object(map) => Ok(map),
        _ => Ok(JsonObject::new()),
    }
}

/// Write body: the options flattened next to `fields`
pub(crate) fn fields_body(fields: JsonObject, options: &UpdateRecordOptions) -> Result<JsonObject> {
    let mut body = options_object(options)?;
    body.insert("fields".to_string(), JsonValue::Object(fields));
    Ok(body)
}
