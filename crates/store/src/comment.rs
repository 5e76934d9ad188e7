use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, ReturnValue, WriteRequest};
use pocguide_clients::DynamoClient;
use pocguide_common::ModuleClient;
use serde::{Deserialize, Serialize};

use crate::is_conditional_failure;
use crate::marshal::{self, Item};

/// A comment attached to either a champion page (`championName`) or a build
/// detail page (`buildId`). Comments form a forest via `parentId`, but depth
/// is clamped to one level at write time (see [`clamp_reply`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    #[serde(alias = "id")]
    pub commentid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub champion_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(rename = "user_sub")]
    pub user_sub: String,
    pub username: String,
    pub content: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub is_edited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_username: Option<String>,
}

impl Comment {
    pub fn from_item(item: &Item) -> Result<Self> {
        serde_json::from_value(marshal::from_item(item))
            .map_err(|e| anyhow!("malformed comment item: {}", e))
    }

    pub fn to_item(&self) -> Result<Item> {
        Ok(marshal::to_item(&serde_json::to_value(self)?))
    }
}

/// Resolves the stored parent for a reply: replying to a reply re-parents
/// onto the top-level ancestor so stored depth matches rendered depth, while
/// the addressed username is kept for attribution.
pub fn clamp_reply(parent: &Comment, requested_reply_to: Option<String>) -> (String, Option<String>) {
    let parent_id = parent
        .parent_id
        .clone()
        .unwrap_or_else(|| parent.commentid.clone());
    let reply_to = requested_reply_to.or_else(|| Some(parent.username.clone()));
    (parent_id, reply_to)
}

/// Ids of every comment reachable from `root` via `parentId` links.
pub fn descendants_of(comments: &[Comment], root: &str) -> Vec<String> {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for comment in comments {
        if let Some(parent) = comment.parent_id.as_deref() {
            children.entry(parent).or_default().push(&comment.commentid);
        }
    }

    let mut found = Vec::new();
    let mut seen: HashSet<&str> = HashSet::from([root]);
    let mut frontier = vec![root];
    while let Some(current) = frontier.pop() {
        for child in children.get(current).map(|v| v.as_slice()).unwrap_or(&[]) {
            if seen.insert(child) {
                found.push(child.to_string());
                frontier.push(child);
            }
        }
    }
    found
}

#[derive(Debug)]
pub enum CommentUpdate {
    Updated(Comment),
    NotFound,
    Forbidden,
}

#[derive(Debug)]
pub enum CommentDelete {
    Deleted { replies: usize },
    NotFound,
    Forbidden,
}

#[derive(Clone)]
pub struct CommentStore {
    db: DynamoClient,
}

impl CommentStore {
    pub fn new(db: DynamoClient) -> Self {
        Self { db }
    }

    fn table(&self) -> String {
        self.db.comments_table()
    }

    pub async fn insert(&self, comment: &Comment) -> Result<bool> {
        let item = comment.to_item()?;
        let result = self
            .db
            .get_client()
            .put_item()
            .table_name(self.table())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(commentid)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_conditional_failure(&err) => Ok(false),
            Err(err) => Err(anyhow!("PutItem failed: {}", err)),
        }
    }

    pub async fn get(&self, commentid: &str) -> Result<Option<Comment>> {
        let out = self
            .db
            .get_client()
            .get_item()
            .table_name(self.table())
            .key("commentid", AttributeValue::S(commentid.to_string()))
            .send()
            .await
            .map_err(|e| anyhow!("GetItem failed: {}", e))?;

        out.item().map(Comment::from_item).transpose()
    }

    /// Flat list for one champion, oldest first. The client reconstructs the
    /// parent→children nesting.
    pub async fn list_for_champion(&self, champion_name: &str) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .db
                .get_client()
                .query()
                .table_name(self.table())
                .index_name("championName-index")
                .key_condition_expression("championName = :champion")
                .expression_attribute_values(
                    ":champion",
                    AttributeValue::S(champion_name.to_string()),
                )
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| anyhow!("Query championName-index failed: {}", e))?;

            for item in out.items() {
                comments.push(Comment::from_item(item)?);
            }

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    /// Flat list for one build, oldest first.
    pub async fn list_for_build(&self, build_id: &str) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .db
                .get_client()
                .query()
                .table_name(self.table())
                .index_name("buildId-index")
                .key_condition_expression("buildId = :build")
                .expression_attribute_values(":build", AttributeValue::S(build_id.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| anyhow!("Query buildId-index failed: {}", e))?;

            for item in out.items() {
                comments.push(Comment::from_item(item)?);
            }

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    pub async fn list_all(&self) -> Result<Vec<Comment>> {
        let mut comments = Vec::new();
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

            for item in out.items() {
                comments.push(Comment::from_item(item)?);
            }

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        Ok(comments)
    }

    /// Owner-conditional edit: one `UpdateItem` that marks the comment edited
    /// and stamps `updatedAt`.
    pub async fn update_content(
        &self,
        commentid: &str,
        owner_sub: &str,
        content: &str,
        updated_at: &str,
    ) -> Result<CommentUpdate> {
        let result = self
            .db
            .get_client()
            .update_item()
            .table_name(self.table())
            .key("commentid", AttributeValue::S(commentid.to_string()))
            .update_expression(
                "SET #content = :content, #updatedAt = :updatedAt, #isEdited = :edited",
            )
            .condition_expression("attribute_exists(commentid) AND #userSub = :caller")
            .expression_attribute_names("#content", "content")
            .expression_attribute_names("#updatedAt", "updatedAt")
            .expression_attribute_names("#isEdited", "isEdited")
            .expression_attribute_names("#userSub", "user_sub")
            .expression_attribute_values(":content", AttributeValue::S(content.to_string()))
            .expression_attribute_values(":updatedAt", AttributeValue::S(updated_at.to_string()))
            .expression_attribute_values(":edited", AttributeValue::Bool(true))
            .expression_attribute_values(":caller", AttributeValue::S(owner_sub.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(out) => {
                let item = out
                    .attributes()
                    .ok_or_else(|| anyhow!("UpdateItem returned no attributes"))?;
                Ok(CommentUpdate::Updated(Comment::from_item(item)?))
            }
            Err(err) if is_conditional_failure(&err) => match self.get(commentid).await? {
                None => Ok(CommentUpdate::NotFound),
                Some(_) => Ok(CommentUpdate::Forbidden),
            },
            Err(err) => Err(anyhow!("UpdateItem failed: {}", err)),
        }
    }

    /// Owner-conditional delete that cascades to the whole reply subtree.
    /// Only the root is owner-guarded; descendants go with it regardless of
    /// author, which is the documented contract.
    pub async fn delete_with_replies(
        &self,
        commentid: &str,
        owner_sub: &str,
    ) -> Result<CommentDelete> {
        let Some(comment) = self.get(commentid).await? else {
            return Ok(CommentDelete::NotFound);
        };

        let result = self
            .db
            .get_client()
            .delete_item()
            .table_name(self.table())
            .key("commentid", AttributeValue::S(commentid.to_string()))
            .condition_expression("attribute_exists(commentid) AND #userSub = :caller")
            .expression_attribute_names("#userSub", "user_sub")
            .expression_attribute_values(":caller", AttributeValue::S(owner_sub.to_string()))
            .send()
            .await;

        if let Err(err) = result {
            if is_conditional_failure(&err) {
                return Ok(match self.get(commentid).await? {
                    None => CommentDelete::NotFound,
                    Some(_) => CommentDelete::Forbidden,
                });
            }
            return Err(anyhow!("DeleteItem failed: {}", err));
        }

        let siblings = if let Some(champion) = comment.champion_name.as_deref() {
            self.list_for_champion(champion).await?
        } else if let Some(build) = comment.build_id.as_deref() {
            self.list_for_build(build).await?
        } else {
            Vec::new()
        };
        let replies = descendants_of(&siblings, commentid);
        let deleted = replies.len();
        self.delete_batch(&replies).await?;

        Ok(CommentDelete::Deleted { replies: deleted })
    }

    async fn delete_batch(&self, commentids: &[String]) -> Result<()> {
        let table = self.table();

        // BatchWriteItem caps at 25 requests per call
        for chunk in commentids.chunks(25) {
            let mut requests = Vec::with_capacity(chunk.len());
            for commentid in chunk {
                let delete = DeleteRequest::builder()
                    .key("commentid", AttributeValue::S(commentid.clone()))
                    .build()
                    .map_err(|e| anyhow!("invalid delete request: {}", e))?;
                requests.push(WriteRequest::builder().delete_request(delete).build());
            }

            let mut pending = HashMap::from([(table.clone(), requests)]);
            while !pending.is_empty() {
                let out = self
                    .db
                    .get_client()
                    .batch_write_item()
                    .set_request_items(Some(pending))
                    .send()
                    .await
                    .map_err(|e| anyhow!("BatchWriteItem failed: {}", e))?;

                pending = out
                    .unprocessed_items()
                    .filter(|items| !items.is_empty())
                    .cloned()
                    .unwrap_or_default();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment(id: &str, parent: Option<&str>) -> Comment {
        Comment {
            commentid: id.into(),
            champion_name: Some("Jinx".into()),
            user_sub: "u-1".into(),
            username: "jinxmain".into(),
            content: "nice build".into(),
            created_at: format!("2024-05-01T00:00:0{}.000Z", id.len()),
            parent_id: parent.map(Into::into),
            ..Comment::default()
        }
    }

    #[test]
    fn wire_format_keeps_user_sub_snake_case() {
        let out = serde_json::to_value(comment("c1", None)).unwrap();
        assert!(out.get("user_sub").is_some());
        assert!(out.get("userSub").is_none());
        assert_eq!(out["championName"], "Jinx");
        // absent optionals are omitted from responses
        assert!(out.get("buildId").is_none());
        assert!(out.get("parentId").is_none());
        assert!(out.get("updatedAt").is_none());
    }

    #[test]
    fn build_scoped_comments_carry_build_id_only() {
        let mut c = comment("c1", None);
        c.champion_name = None;
        c.build_id = Some("b-42".into());

        let out = serde_json::to_value(&c).unwrap();
        assert_eq!(out["buildId"], "b-42");
        assert!(out.get("championName").is_none());

        let item = c.to_item().unwrap();
        let parsed = Comment::from_item(&item).unwrap();
        assert_eq!(parsed.build_id.as_deref(), Some("b-42"));
        assert!(parsed.champion_name.is_none());
    }

    #[test]
    fn accepts_legacy_id_alias() {
        let parsed: Comment = serde_json::from_value(json!({
            "id": "c9",
            "championName": "Gwen",
            "user_sub": "u-2",
            "username": "x",
            "content": "hello",
            "createdAt": "2024-05-01T00:00:00.000Z",
        }))
        .unwrap();
        assert_eq!(parsed.commentid, "c9");
    }

    #[test]
    fn item_round_trip() {
        let original = comment("c1", Some("c0"));
        let item = original.to_item().unwrap();
        let parsed = Comment::from_item(&item).unwrap();
        assert_eq!(parsed.commentid, "c1");
        assert_eq!(parsed.parent_id.as_deref(), Some("c0"));
        assert!(!parsed.is_edited);
    }

    #[test]
    fn clamp_keeps_top_level_parents() {
        let top = comment("c1", None);
        let (parent, reply_to) = clamp_reply(&top, None);
        assert_eq!(parent, "c1");
        assert_eq!(reply_to.as_deref(), Some("jinxmain"));
    }

    #[test]
    fn clamp_reparents_reply_to_a_reply() {
        let nested = comment("c2", Some("c1"));
        let (parent, reply_to) = clamp_reply(&nested, Some("someone".into()));
        assert_eq!(parent, "c1");
        assert_eq!(reply_to.as_deref(), Some("someone"));
    }

    #[test]
    fn descendants_walks_the_whole_subtree() {
        let forest = vec![
            comment("c1", None),
            comment("c2", Some("c1")),
            comment("c3", Some("c2")),
            comment("c4", Some("c1")),
            comment("c5", None),
            comment("c6", Some("c5")),
        ];

        let mut found = descendants_of(&forest, "c1");
        found.sort();
        assert_eq!(found, vec!["c2", "c3", "c4"]);

        assert!(descendants_of(&forest, "c3").is_empty());
        assert_eq!(descendants_of(&forest, "c5"), vec!["c6"]);
    }

    #[test]
    fn descendants_tolerates_parent_cycles() {
        // corrupt data should not hang the cascade
        let forest = vec![comment("c1", Some("c2")), comment("c2", Some("c1"))];
        assert_eq!(descendants_of(&forest, "c1"), vec!["c2"]);
    }
}
