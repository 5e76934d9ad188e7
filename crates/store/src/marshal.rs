//! serde_json `Value` ⇄ DynamoDB `AttributeValue` conversion, the local
//! analog of `@aws-sdk/util-dynamodb`'s marshall/unmarshall pair.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Value};

pub type Item = HashMap<String, AttributeValue>;

pub fn to_av(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_av).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter().map(|(k, v)| (k.clone(), to_av(v))).collect(),
        ),
    }
}

pub fn from_av(av: &AttributeValue) -> Value {
    match av {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| n.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(n.clone())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(from_av).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_av(v)))
                .collect::<Map<String, Value>>(),
        ),
        // String/number sets come back as plain JSON arrays.
        AttributeValue::Ss(ss) => Value::Array(ss.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(ns) => Value::Array(
            ns.iter()
                .map(|n| {
                    n.parse::<i64>()
                        .map(Value::from)
                        .or_else(|_| n.parse::<f64>().map(Value::from))
                        .unwrap_or_else(|_| Value::String(n.clone()))
                })
                .collect(),
        ),
        _ => Value::Null,
    }
}

/// Flattens a JSON object into a DynamoDB item. Non-objects produce an
/// empty item; callers only ever pass serialized structs.
pub fn to_item(value: &Value) -> Item {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), to_av(v))).collect(),
        _ => Item::new(),
    }
}

pub fn from_item(item: &Item) -> Value {
    Value::Object(
        item.iter()
            .map(|(k, v)| (k.clone(), from_av(v)))
            .collect::<Map<String, Value>>(),
    )
}

pub fn get_s(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|av| av.as_s().ok()).cloned()
}

pub fn get_n(item: &Item, key: &str) -> i64 {
    item.get(key)
        .and_then(|av| av.as_n().ok())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

pub fn get_ss(item: &Item, key: &str) -> Vec<String> {
    item.get(key)
        .and_then(|av| av.as_ss().ok())
        .cloned()
        .unwrap_or_default()
}

/// The `display` attribute keys `display-index`, so it is stored as the
/// strings "true"/"false" rather than a native boolean.
pub fn bool_to_display(value: bool) -> String {
    if value { "true".into() } else { "false".into() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_nested_documents() {
        let doc = json!({
            "id": "b1",
            "star": 3,
            "display": true,
            "relicSet": ["A1", "A2"],
            "meta": { "ratio": 0.5, "missing": null },
        });

        let item = to_item(&doc);
        assert!(matches!(item.get("star"), Some(AttributeValue::N(n)) if n == "3"));
        assert!(matches!(item.get("display"), Some(AttributeValue::Bool(true))));

        assert_eq!(from_item(&item), doc);
    }

    #[test]
    fn string_sets_unmarshal_to_arrays() {
        let mut item = Item::new();
        item.insert(
            "favorite".into(),
            AttributeValue::Ss(vec!["u1".into(), "u2".into()]),
        );

        assert_eq!(from_item(&item), json!({"favorite": ["u1", "u2"]}));
        assert_eq!(get_ss(&item, "favorite"), vec!["u1", "u2"]);
    }

    #[test]
    fn numeric_accessors_default_to_zero() {
        let mut item = Item::new();
        item.insert("views".into(), AttributeValue::N("12".into()));

        assert_eq!(get_n(&item, "views"), 12);
        assert_eq!(get_n(&item, "like"), 0);
        assert_eq!(get_s(&item, "id"), None);
    }

    #[test]
    fn display_flag_is_stored_as_string() {
        assert_eq!(bool_to_display(true), "true");
        assert_eq!(bool_to_display(false), "false");
    }
}
