//! # Activity Records
//!
//! Typed view over an activity-streams payload. Only `verb` is interpreted by
//! the pipeline; the remaining fields are carried for handlers and kept
//! loosely typed so unknown producer fields survive a decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Ids arrive as strings or as bare numbers; both are kept as text
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

/// A decoded activity.
///
/// ```rust
/// use logistik::activity::ActivityRecord;
///
/// let record: ActivityRecord =
///     serde_json::from_value(serde_json::json!({"verb": "post", "actor": "u1"})).unwrap();
/// assert_eq!(record.verb, "post");
/// assert_eq!(record.actor_id(), Some("u1"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Routing key for handler dispatch
    pub verb: String,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<ActivityObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Fields the pipeline does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActivityRecord {
    /// Minimal record carrying only a verb
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            id: None,
            actor: None,
            object: None,
            target: None,
            provider: None,
            generator: None,
            published: None,
            updated: None,
            title: None,
            content: None,
            url: None,
            extra: Map::new(),
        }
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor.as_ref().and_then(|a| a.id.as_deref())
    }

    pub fn object_id(&self) -> Option<&str> {
        self.object.as_ref().and_then(|o| o.id.as_deref())
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target.as_ref().and_then(|t| t.id.as_deref())
    }
}

/// Actor, object, target, provider or generator of an activity.
///
/// Producers send either a full object or just its id as a bare string; both
/// forms decode to the same type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "ObjectRepr")]
pub struct ActivityObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "objectType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub object_type: Option<String>,
    #[serde(
        rename = "displayName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<ActivityObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActivityObject {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ObjectRepr {
    Id(String),
    Full(ObjectFields),
}

#[derive(Deserialize)]
struct ObjectFields {
    #[serde(default, deserialize_with = "string_or_number")]
    id: Option<String>,
    #[serde(rename = "objectType", default)]
    object_type: Option<String>,
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    attachments: Vec<ActivityObject>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<ObjectRepr> for ActivityObject {
    fn from(repr: ObjectRepr) -> Self {
        match repr {
            ObjectRepr::Id(id) => ActivityObject::with_id(id),
            ObjectRepr::Full(fields) => ActivityObject {
                id: fields.id,
                object_type: fields.object_type,
                display_name: fields.display_name,
                content: fields.content,
                summary: fields.summary,
                url: fields.url,
                attachments: fields.attachments,
                extra: fields.extra,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_string_object_is_an_id() {
        let record: ActivityRecord =
            serde_json::from_value(json!({"verb": "join", "target": "room-7"})).unwrap();
        assert_eq!(record.target_id(), Some("room-7"));
        assert!(record.target.unwrap().object_type.is_none());
    }

    #[test]
    fn test_full_object_keeps_unknown_fields() {
        let record: ActivityRecord = serde_json::from_value(json!({
            "verb": "send",
            "actor": {"id": "u1", "displayName": "Ann", "objectType": "user", "lang": "sv"},
            "object": {"content": "aGk=", "attachments": [{"objectType": "image", "url": "x"}]},
            "provider": {"id": "p1"},
            "published": "2024-05-01T10:00:00Z",
            "region": "eu"
        }))
        .unwrap();

        let actor = record.actor.as_ref().unwrap();
        assert_eq!(actor.display_name.as_deref(), Some("Ann"));
        assert_eq!(actor.object_type.as_deref(), Some("user"));
        assert_eq!(actor.extra.get("lang"), Some(&json!("sv")));

        let object = record.object.as_ref().unwrap();
        assert_eq!(object.attachments.len(), 1);
        assert_eq!(object.attachments[0].url.as_deref(), Some("x"));

        assert!(record.published.is_some());
        assert_eq!(record.extra.get("region"), Some(&json!("eu")));
    }

    #[test]
    fn test_numeric_actor_is_rejected() {
        let result = serde_json::from_value::<ActivityRecord>(json!({"verb": "post", "actor": 5}));
        assert!(result.is_err());
    }

    #[test]
    fn test_numeric_ids_are_kept_as_text() {
        let record: ActivityRecord = serde_json::from_value(json!({
            "verb": "post",
            "id": 7,
            "actor": {"id": 42},
            "object": {"id": "m-1"},
            "target": {"id": null}
        }))
        .unwrap();

        assert_eq!(record.id.as_deref(), Some("7"));
        assert_eq!(record.actor_id(), Some("42"));
        assert_eq!(record.object_id(), Some("m-1"));
        assert_eq!(record.target_id(), None);

        let result =
            serde_json::from_value::<ActivityRecord>(json!({"verb": "post", "id": {"n": 7}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialized_record_omits_empty_fields() {
        let mut record = ActivityRecord::new("post");
        record.actor = Some(ActivityObject::with_id("u1"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"verb": "post", "actor": {"id": "u1"}}));
    }
}
