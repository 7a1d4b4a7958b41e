use super::encode_path;
use super::table::Table;
use super::types::{BaseSchema, TableSchema};
use crate::airtable::Airtable;
use crate::error::Result;
use crate::http::RequestDescriptor;
use crate::types::{JsonValue, Method};

/// Handle to one base
#[derive(Debug, Clone)]
pub struct Base {
    client: Airtable,
    id: String,
}

impl Base {
    pub(crate) fn new(client: Airtable, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client(&self) -> &Airtable {
        &self.client
    }

    /// Handle to a table by name or id
    pub fn table(&self, name_or_id: impl Into<String>) -> Table {
        Table::new(self.client.clone(), self.id.clone(), name_or_id)
    }

    fn tables_path(&self) -> String {
        encode_path(["meta", "bases", self.id.as_str(), "tables"])
    }

    /// Tables, fields and views of this base
    pub async fn schema(&self) -> Result<BaseSchema> {
        self.client
            .execute_as(&RequestDescriptor::new(self.tables_path()))
            .await
    }

    /// Create a table from a JSON definition (`name`, `fields`, ...)
    pub async fn create_table(&self, definition: JsonValue) -> Result<TableSchema> {
        self.client
            .execute_as(&RequestDescriptor::with_method(Method::POST, self.tables_path()).json(definition))
            .await
    }
}
