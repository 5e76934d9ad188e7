use anyhow::{anyhow, bail, Result};
use aws_sdk_dynamodb::types::{AttributeValue, KeysAndAttributes, ReturnValue};
use pocguide_clients::DynamoClient;
use pocguide_common::ModuleClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::is_conditional_failure;
use crate::marshal::{self, Item};

/// A user-authored champion build. `display` is persisted as the strings
/// "true"/"false" (it keys `display-index`), `favorite` as a string set so
/// membership toggles can use native set operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Build {
    pub id: String,
    pub sub: String,
    pub creator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_name: Option<String>,
    pub champion_name: String,
    pub description: String,
    #[serde(alias = "artifacts")]
    pub relic_set: Vec<String>,
    pub powers: Vec<String>,
    pub rune: Vec<String>,
    pub regions: Vec<String>,
    pub star: i64,
    pub display: bool,
    pub like: i64,
    pub favorite: Vec<String>,
    pub views: i64,
    pub created_at: String,
}

impl Build {
    pub fn from_item(item: &Item) -> Result<Self> {
        let mut value = marshal::from_item(item);
        normalize_display(&mut value);
        serde_json::from_value(value).map_err(|e| anyhow!("malformed build item: {}", e))
    }

    pub fn to_item(&self) -> Result<Item> {
        let value = serde_json::to_value(self)?;
        let mut item = marshal::to_item(&value);

        // creatorName is derived per response, never persisted
        item.remove("creatorName");
        item.insert(
            "display".into(),
            AttributeValue::S(marshal::bool_to_display(self.display)),
        );

        // DynamoDB rejects empty sets, the attribute is simply absent then
        item.remove("favorite");
        if !self.favorite.is_empty() {
            item.insert("favorite".into(), AttributeValue::Ss(self.favorite.clone()));
        }

        Ok(item)
    }
}

fn normalize_display(value: &mut Value) {
    if let Some(display) = value.get_mut("display") {
        if let Some(s) = display.as_str() {
            *display = Value::Bool(s == "true");
        }
    }
}

/// Optional fields of an update request. Owner updates pass a subset, the
/// admin editor may additionally touch championName, like and views.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildPatch {
    pub champion_name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "artifacts")]
    pub relic_set: Option<Vec<String>>,
    pub powers: Option<Vec<String>>,
    pub rune: Option<Vec<String>>,
    pub regions: Option<Vec<String>>,
    pub star: Option<i64>,
    pub display: Option<bool>,
    pub like: Option<i64>,
    pub views: Option<i64>,
}

impl BuildPatch {
    pub fn is_empty(&self) -> bool {
        self.champion_name.is_none()
            && self.description.is_none()
            && self.relic_set.is_none()
            && self.powers.is_none()
            && self.rune.is_none()
            && self.regions.is_none()
            && self.star.is_none()
            && self.display.is_none()
            && self.like.is_none()
            && self.views.is_none()
    }

    fn apply(&self, expr: &mut crate::UpdateExpr) {
        let string_list = |items: &Vec<String>| {
            AttributeValue::L(items.iter().cloned().map(AttributeValue::S).collect())
        };

        expr.set_opt(
            "championName",
            self.champion_name.clone().map(AttributeValue::S),
        );
        expr.set_opt("description", self.description.clone().map(AttributeValue::S));
        expr.set_opt("relicSet", self.relic_set.as_ref().map(string_list));
        expr.set_opt("powers", self.powers.as_ref().map(string_list));
        expr.set_opt("rune", self.rune.as_ref().map(string_list));
        expr.set_opt("regions", self.regions.as_ref().map(string_list));
        expr.set_opt("star", self.star.map(|v| AttributeValue::N(v.to_string())));
        expr.set_opt(
            "display",
            self.display.map(|v| AttributeValue::S(marshal::bool_to_display(v))),
        );
        expr.set_opt("like", self.like.map(|v| AttributeValue::N(v.to_string())));
        expr.set_opt("views", self.views.map(|v| AttributeValue::N(v.to_string())));
    }
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Updated(Build),
    NotFound,
    Forbidden,
}

#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Forbidden,
}

#[derive(Debug, Clone, Copy)]
pub struct FavoriteToggle {
    pub is_favorited: bool,
    pub favorite_count: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct LikeOutcome {
    pub like: i64,
    pub already_liked: bool,
}

#[derive(Clone)]
pub struct BuildStore {
    db: DynamoClient,
}

impl BuildStore {
    pub fn new(db: DynamoClient) -> Self {
        Self { db }
    }

    fn table(&self) -> String {
        self.db.builds_table()
    }

    /// Conditional create. Returns false when the id is already taken; the
    /// existing item is never overwritten.
    pub async fn insert(&self, build: &Build) -> Result<bool> {
        let item = build.to_item()?;
        let result = self
            .db
            .get_client()
            .put_item()
            .table_name(self.table())
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) if is_conditional_failure(&err) => Ok(false),
            Err(err) => Err(anyhow!("PutItem failed: {}", err)),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Build>> {
        let out = self
            .db
            .get_client()
            .get_item()
            .table_name(self.table())
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| anyhow!("GetItem failed: {}", e))?;

        out.item().map(Build::from_item).transpose()
    }

    /// All public builds via `display-index`.
    pub async fn list_public(&self) -> Result<Vec<Build>> {
        let mut builds = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .db
                .get_client()
                .query()
                .table_name(self.table())
                .index_name("display-index")
                .key_condition_expression("#display = :display")
                .expression_attribute_names("#display", "display")
                .expression_attribute_values(":display", AttributeValue::S("true".into()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| anyhow!("Query display-index failed: {}", e))?;

            for item in out.items() {
                builds.push(Build::from_item(item)?);
            }

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        Ok(builds)
    }

    pub async fn list_by_creator(&self, creator: &str) -> Result<Vec<Build>> {
        let mut builds = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .db
                .get_client()
                .query()
                .table_name(self.table())
                .index_name("creator-index")
                .key_condition_expression("creator = :creator")
                .expression_attribute_values(":creator", AttributeValue::S(creator.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| anyhow!("Query creator-index failed: {}", e))?;

            for item in out.items() {
                builds.push(Build::from_item(item)?);
            }

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        Ok(builds)
    }

    /// Full scan, admin listing only.
    pub async fn list_all(&self) -> Result<Vec<Build>> {
        let mut builds = Vec::new();
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
                builds.push(Build::from_item(item)?);
            }

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        Ok(builds)
    }

    pub async fn list_favorited_by(&self, sub: &str) -> Result<Vec<Build>> {
        let mut builds = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let out = self
                .db
                .get_client()
                .scan()
                .table_name(self.table())
                .filter_expression("contains(#fav, :sub)")
                .expression_attribute_names("#fav", "favorite")
                .expression_attribute_values(":sub", AttributeValue::S(sub.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| anyhow!("Scan favorites failed: {}", e))?;

            for item in out.items() {
                builds.push(Build::from_item(item)?);
            }

            start_key = out.last_evaluated_key().cloned();
            if start_key.is_none() {
                break;
            }
        }

        Ok(builds)
    }

    /// Single conditional `UpdateItem`. With `owner` set the write only lands
    /// when the stored `sub` matches the caller, so ownership is enforced by
    /// the store rather than a read-then-write sequence.
    pub async fn update_fields(
        &self,
        id: &str,
        owner: Option<&str>,
        patch: &BuildPatch,
    ) -> Result<UpdateOutcome> {
        let mut expr = crate::UpdateExpr::default();
        patch.apply(&mut expr);
        if expr.is_empty() {
            bail!("refusing to update build {} with an empty patch", id);
        }

        let (expression, mut names, mut values) = expr.into_parts();
        let condition = match owner {
            Some(sub) => {
                names.insert("#ownerSub".into(), "sub".into());
                values.insert(":caller".into(), AttributeValue::S(sub.to_string()));
                "attribute_exists(id) AND #ownerSub = :caller"
            }
            None => "attribute_exists(id)",
        };

        let result = self
            .db
            .get_client()
            .update_item()
            .table_name(self.table())
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression(expression)
            .condition_expression(condition)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(out) => {
                let item = out
                    .attributes()
                    .ok_or_else(|| anyhow!("UpdateItem returned no attributes"))?;
                Ok(UpdateOutcome::Updated(Build::from_item(item)?))
            }
            Err(err) if is_conditional_failure(&err) => match self.get(id).await? {
                None => Ok(UpdateOutcome::NotFound),
                Some(_) => Ok(UpdateOutcome::Forbidden),
            },
            Err(err) => Err(anyhow!("UpdateItem failed: {}", err)),
        }
    }

    pub async fn delete(&self, id: &str, owner: Option<&str>) -> Result<DeleteOutcome> {
        let mut req = self
            .db
            .get_client()
            .delete_item()
            .table_name(self.table())
            .key("id", AttributeValue::S(id.to_string()));

        req = match owner {
            Some(sub) => req
                .condition_expression("attribute_exists(id) AND #ownerSub = :caller")
                .expression_attribute_names("#ownerSub", "sub")
                .expression_attribute_values(":caller", AttributeValue::S(sub.to_string())),
            None => req.condition_expression("attribute_exists(id)"),
        };

        match req.send().await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(err) if is_conditional_failure(&err) => match self.get(id).await? {
                None => Ok(DeleteOutcome::NotFound),
                Some(_) => Ok(DeleteOutcome::Forbidden),
            },
            Err(err) => Err(anyhow!("DeleteItem failed: {}", err)),
        }
    }

    /// Atomic view bump, initializing the counter on first read.
    pub async fn record_view(&self, id: &str) -> Result<i64> {
        let out = self
            .db
            .get_client()
            .update_item()
            .table_name(self.table())
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression("SET #views = if_not_exists(#views, :zero) + :inc")
            .expression_attribute_names("#views", "views")
            .expression_attribute_values(":inc", AttributeValue::N("1".into()))
            .expression_attribute_values(":zero", AttributeValue::N("0".into()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| anyhow!("view bump failed: {}", e))?;

        Ok(out.attributes().map(|a| marshal::get_n(a, "views")).unwrap_or(0))
    }

    /// Membership toggle on the `favorite` string set. Both directions are
    /// guarded conditional updates, so concurrent callers flip their own
    /// membership without clobbering each other. Returns `None` when the
    /// build does not exist.
    pub async fn toggle_favorite(&self, id: &str, sub: &str) -> Result<Option<FavoriteToggle>> {
        let member = AttributeValue::Ss(vec![sub.to_string()]);
        let subject = AttributeValue::S(sub.to_string());

        let add = self
            .db
            .get_client()
            .update_item()
            .table_name(self.table())
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression("ADD #fav :member")
            .condition_expression(
                "attribute_exists(id) AND (attribute_not_exists(#fav) OR NOT contains(#fav, :sub))",
            )
            .expression_attribute_names("#fav", "favorite")
            .expression_attribute_values(":member", member.clone())
            .expression_attribute_values(":sub", subject.clone())
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match add {
            Ok(out) => Ok(Some(FavoriteToggle {
                is_favorited: true,
                favorite_count: set_len(out.attributes(), "favorite"),
            })),
            Err(err) if is_conditional_failure(&err) => {
                let remove = self
                    .db
                    .get_client()
                    .update_item()
                    .table_name(self.table())
                    .key("id", AttributeValue::S(id.to_string()))
                    .update_expression("DELETE #fav :member")
                    .condition_expression("attribute_exists(id) AND contains(#fav, :sub)")
                    .expression_attribute_names("#fav", "favorite")
                    .expression_attribute_values(":member", member)
                    .expression_attribute_values(":sub", subject)
                    .return_values(ReturnValue::AllNew)
                    .send()
                    .await;

                match remove {
                    Ok(out) => Ok(Some(FavoriteToggle {
                        is_favorited: false,
                        favorite_count: set_len(out.attributes(), "favorite"),
                    })),
                    // lost a race with a concurrent flip, or the build is gone:
                    // report whatever is stored now
                    Err(err) if is_conditional_failure(&err) => {
                        Ok(self.get(id).await?.map(|b| FavoriteToggle {
                            is_favorited: b.favorite.iter().any(|s| s == sub),
                            favorite_count: b.favorite.len() as i64,
                        }))
                    }
                    Err(err) => Err(anyhow!("favorite removal failed: {}", err)),
                }
            }
            Err(err) => Err(anyhow!("favorite add failed: {}", err)),
        }
    }

    /// At-most-once like per user, enforced by the `likedBy` set guard. The
    /// numeric counter is bumped in the same atomic update.
    pub async fn record_like(&self, id: &str, sub: &str) -> Result<Option<LikeOutcome>> {
        let result = self
            .db
            .get_client()
            .update_item()
            .table_name(self.table())
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression("SET #like = if_not_exists(#like, :zero) + :inc ADD #likedBy :member")
            .condition_expression(
                "attribute_exists(id) AND (attribute_not_exists(#likedBy) OR NOT contains(#likedBy, :sub))",
            )
            .expression_attribute_names("#like", "like")
            .expression_attribute_names("#likedBy", "likedBy")
            .expression_attribute_values(":inc", AttributeValue::N("1".into()))
            .expression_attribute_values(":zero", AttributeValue::N("0".into()))
            .expression_attribute_values(":member", AttributeValue::Ss(vec![sub.to_string()]))
            .expression_attribute_values(":sub", AttributeValue::S(sub.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(out) => {
                let like = out.attributes().map(|a| marshal::get_n(a, "like")).unwrap_or(0);
                Ok(Some(LikeOutcome { like, already_liked: false }))
            }
            Err(err) if is_conditional_failure(&err) => match self.get(id).await? {
                None => Ok(None),
                Some(build) => Ok(Some(LikeOutcome {
                    like: build.like,
                    already_liked: true,
                })),
            },
            Err(err) => Err(anyhow!("like failed: {}", err)),
        }
    }

    /// Favorite membership for the caller across N builds in O(1) round
    /// trips. The result carries exactly the requested ids; unknown builds
    /// read as not-favorited.
    pub async fn favorite_status_batch(
        &self,
        ids: &[String],
        sub: &str,
    ) -> Result<HashMap<String, bool>> {
        let sets = self.favorite_sets(ids).await?;
        Ok(project_favorite_status(ids, &sets, sub))
    }

    pub async fn favorite_count_batch(&self, ids: &[String]) -> Result<HashMap<String, i64>> {
        let sets = self.favorite_sets(ids).await?;
        Ok(project_favorite_counts(ids, &sets))
    }

    async fn favorite_sets(&self, ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let table = self.table();
        let mut sets = HashMap::new();

        // BatchGetItem caps at 100 keys per call
        for chunk in ids.chunks(100) {
            let mut request = KeysAndAttributes::builder()
                .projection_expression("#id, #fav")
                .expression_attribute_names("#id", "id")
                .expression_attribute_names("#fav", "favorite");
            for id in chunk {
                request = request.keys(HashMap::from([(
                    "id".to_string(),
                    AttributeValue::S(id.clone()),
                )]));
            }
            let request = request
                .build()
                .map_err(|e| anyhow!("invalid batch request: {}", e))?;

            let mut pending = HashMap::from([(table.clone(), request)]);
            while !pending.is_empty() {
                let out = self
                    .db
                    .get_client()
                    .batch_get_item()
                    .set_request_items(Some(pending))
                    .send()
                    .await
                    .map_err(|e| anyhow!("BatchGetItem failed: {}", e))?;

                if let Some(responses) = out.responses() {
                    for item in responses.get(&table).map(|v| v.as_slice()).unwrap_or(&[]) {
                        if let Some(id) = marshal::get_s(item, "id") {
                            sets.insert(id, marshal::get_ss(item, "favorite"));
                        }
                    }
                }

                pending = out
                    .unprocessed_keys()
                    .filter(|keys| !keys.is_empty())
                    .cloned()
                    .unwrap_or_default();
            }
        }

        Ok(sets)
    }
}

/// Projects the fetched favorite sets onto exactly the requested ids; a
/// build missing from the table reads as not-favorited.
fn project_favorite_status(
    ids: &[String],
    sets: &HashMap<String, Vec<String>>,
    sub: &str,
) -> HashMap<String, bool> {
    ids.iter()
        .map(|id| {
            let favorited = sets
                .get(id)
                .map(|s| s.iter().any(|m| m == sub))
                .unwrap_or(false);
            (id.clone(), favorited)
        })
        .collect()
}

fn project_favorite_counts(
    ids: &[String],
    sets: &HashMap<String, Vec<String>>,
) -> HashMap<String, i64> {
    ids.iter()
        .map(|id| (id.clone(), sets.get(id).map(|s| s.len() as i64).unwrap_or(0)))
        .collect()
}

fn set_len(attributes: Option<&Item>, key: &str) -> i64 {
    attributes
        .map(|item| marshal::get_ss(item, key).len() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Build {
        Build {
            id: "b1".into(),
            sub: "u-1".into(),
            creator: "jinxmain".into(),
            champion_name: "Jinx".into(),
            description: "ramp into powder monkeys".into(),
            relic_set: vec!["A1".into()],
            display: true,
            favorite: vec!["u-2".into(), "u-3".into()],
            created_at: "2024-05-01T00:00:00.000Z".into(),
            ..Build::default()
        }
    }

    #[test]
    fn item_round_trip_preserves_build() {
        let build = sample();
        let item = build.to_item().unwrap();

        // display keys an index, so it must be the string form
        assert!(matches!(item.get("display"), Some(AttributeValue::S(s)) if s == "true"));
        assert!(matches!(item.get("favorite"), Some(AttributeValue::Ss(ss)) if ss.len() == 2));
        assert!(!item.contains_key("creatorName"));

        let parsed = Build::from_item(&item).unwrap();
        assert_eq!(parsed.id, build.id);
        assert!(parsed.display);
        assert_eq!(parsed.favorite, build.favorite);
        assert_eq!(parsed.relic_set, build.relic_set);
    }

    #[test]
    fn empty_favorite_set_is_omitted() {
        let mut build = sample();
        build.favorite.clear();
        let item = build.to_item().unwrap();
        assert!(!item.contains_key("favorite"));
        assert!(Build::from_item(&item).unwrap().favorite.is_empty());
    }

    #[test]
    fn accepts_artifacts_alias_on_input() {
        let build: Build = serde_json::from_value(json!({
            "id": "b2",
            "championName": "Gwen",
            "artifacts": ["Needle"],
        }))
        .unwrap();
        assert_eq!(build.relic_set, vec!["Needle"]);

        // the wire name going out is relicSet
        let out = serde_json::to_value(&build).unwrap();
        assert_eq!(out["relicSet"], json!(["Needle"]));
        assert!(out.get("artifacts").is_none());
    }

    #[test]
    fn unknown_attributes_are_ignored() {
        let mut item = sample().to_item().unwrap();
        item.insert(
            "likedBy".into(),
            AttributeValue::Ss(vec!["u-9".into()]),
        );
        // likedBy is store-internal and must not leak into the model
        let parsed = Build::from_item(&item).unwrap();
        let out = serde_json::to_value(&parsed).unwrap();
        assert!(out.get("likedBy").is_none());
    }

    #[test]
    fn patch_emptiness_tracks_all_fields() {
        assert!(BuildPatch::default().is_empty());

        let patch: BuildPatch = serde_json::from_value(json!({"star": 5})).unwrap();
        assert!(!patch.is_empty());

        let mut expr = crate::UpdateExpr::default();
        patch.apply(&mut expr);
        let (expression, names, _) = expr.into_parts();
        assert_eq!(expression, "SET #star = :star");
        assert_eq!(names.get("#star").unwrap(), "star");
    }

    #[test]
    fn batch_projections_cover_exactly_the_requested_ids() {
        let ids = vec!["b1".to_string(), "b2".to_string(), "gone".to_string()];
        let sets = HashMap::from([
            ("b1".to_string(), vec!["u-1".to_string(), "u-2".to_string()]),
            ("b2".to_string(), vec!["u-2".to_string()]),
            // present in the table but never asked for
            ("b9".to_string(), vec!["u-1".to_string()]),
        ]);

        let status = project_favorite_status(&ids, &sets, "u-1");
        assert_eq!(status.len(), 3);
        assert_eq!(status["b1"], true);
        assert_eq!(status["b2"], false);
        assert_eq!(status["gone"], false);
        assert!(!status.contains_key("b9"));

        let counts = project_favorite_counts(&ids, &sets);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts["b1"], 2);
        assert_eq!(counts["b2"], 1);
        assert_eq!(counts["gone"], 0);
        assert!(!counts.contains_key("b9"));
    }

    #[test]
    fn patch_accepts_artifacts_alias() {
        let patch: BuildPatch =
            serde_json::from_value(json!({"artifacts": ["A1", "A2"], "display": false})).unwrap();
        assert_eq!(patch.relic_set.as_ref().unwrap().len(), 2);

        let mut expr = crate::UpdateExpr::default();
        patch.apply(&mut expr);
        let (expression, _, values) = expr.into_parts();
        assert!(expression.contains("#relicSet = :relicSet"));
        // display goes to the store in its string form
        assert!(matches!(values.get(":display"), Some(AttributeValue::S(s)) if s == "false"));
    }
}
