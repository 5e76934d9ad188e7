use anyhow::{anyhow, Result};
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use pocguide_clients::DynamoClient;
use pocguide_common::ModuleClient;
use serde_json::Value;

use crate::is_conditional_failure;
use crate::marshal::{self, Item};

/// Outcome of an admin champion upsert. Create-vs-update intent is enforced
/// by the write's condition expression, never by a prior read.
#[derive(Debug)]
pub enum ChampionWrite {
    Saved,
    AlreadyExists,
    Missing,
}

/// Champion reference data. Reads are public and schema-free; writes are the
/// admin editor's whole-document upserts keyed by `championID`.
#[derive(Clone)]
pub struct ChampionStore {
    db: DynamoClient,
}

impl ChampionStore {
    pub fn new(db: DynamoClient) -> Self {
        Self { db }
    }

    fn table(&self) -> String {
        self.db.champions_table()
    }

    pub async fn list_all(&self) -> Result<Vec<Value>> {
        let mut champions = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .db
                .get_client()
                .scan()
                .table_name(self.table())
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| anyhow!("Scan failed: {}", e))?;

            champions.extend(out.items().iter().map(marshal::from_item));

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        Ok(champions)
    }

    /// Exact-name lookup on `name-index`. NAME is a reserved word, hence the
    /// alias.
    pub async fn find_by_name(&self, name: &str) -> Result<Vec<Value>> {
        let out = self
            .db
            .get_client()
            .query()
            .table_name(self.table())
            .index_name("name-index")
            .key_condition_expression("#name = :name")
            .expression_attribute_names("#name", "name")
            .expression_attribute_values(":name", AttributeValue::S(name.to_string()))
            .send()
            .await
            .map_err(|e| anyhow!("Query name-index failed: {}", e))?;

        Ok(out.items().iter().map(marshal::from_item).collect())
    }

    /// Conditional whole-document write: with `expect_new` the put only lands
    /// on a fresh id, otherwise only on an existing one.
    pub async fn upsert(&self, document: &Value, expect_new: bool) -> Result<ChampionWrite> {
        let condition = if expect_new {
            "attribute_not_exists(championID)"
        } else {
            "attribute_exists(championID)"
        };

        let result = self
            .db
            .get_client()
            .put_item()
            .table_name(self.table())
            .set_item(Some(marshal::to_item(document)))
            .condition_expression(condition)
            .send()
            .await;

        match result {
            Ok(_) => Ok(ChampionWrite::Saved),
            Err(err) if is_conditional_failure(&err) => Ok(if expect_new {
                ChampionWrite::AlreadyExists
            } else {
                ChampionWrite::Missing
            }),
            Err(err) => Err(anyhow!("PutItem failed: {}", err)),
        }
    }

    /// Deletes by `championID`, returning the old document so the caller can
    /// name what went away. `None` when nothing was stored under that id.
    pub async fn remove(&self, champion_id: &str) -> Result<Option<Value>> {
        let out = self
            .db
            .get_client()
            .delete_item()
            .table_name(self.table())
            .key("championID", AttributeValue::S(champion_id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| anyhow!("DeleteItem failed: {}", e))?;

        Ok(out
            .attributes()
            .filter(|item| !item.is_empty())
            .map(marshal::from_item))
    }
}
