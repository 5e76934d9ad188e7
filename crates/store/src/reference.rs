use anyhow::{anyhow, Result};
use aws_sdk_dynamodb::types::AttributeValue;
use pocguide_clients::DynamoClient;
use pocguide_common::ModuleClient;
use serde_json::Value;

use crate::marshal::{self, Item};

/// Gateway over one of the editable reference tables (items, powers, relics,
/// runes, general powers, champion videos). The documents are schema-free
/// beyond their key attribute; writes are whole-document upserts.
#[derive(Clone)]
pub struct ReferenceStore {
    db: DynamoClient,
    table: String,
    key_attr: &'static str,
}

impl ReferenceStore {
    pub fn new(db: DynamoClient, table: String, key_attr: &'static str) -> Self {
        Self { db, table, key_attr }
    }

    pub async fn list_all(&self) -> Result<Vec<Value>> {
        let mut documents = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .db
                .get_client()
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| anyhow!("Scan {} failed: {}", self.table, e))?;

            documents.extend(out.items().iter().map(marshal::from_item));

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        Ok(documents)
    }

    /// Whole-document upsert. The caller has already validated that the key
    /// attribute is present.
    pub async fn upsert(&self, document: &Value) -> Result<()> {
        self.db
            .get_client()
            .put_item()
            .table_name(&self.table)
            .set_item(Some(marshal::to_item(document)))
            .send()
            .await
            .map_err(|e| anyhow!("PutItem into {} failed: {}", self.table, e))?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.db
            .get_client()
            .delete_item()
            .table_name(&self.table)
            .key(self.key_attr, AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| anyhow!("DeleteItem from {} failed: {}", self.table, e))?;
        Ok(())
    }
}
