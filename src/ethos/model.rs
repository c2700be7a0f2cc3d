use super::de;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A member record as returned by the category and user lookup endpoints.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, deserialize_with = "de::lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "de::lenient_u64")]
    pub profile_id: Option<u64>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub primary_address: Option<String>,
    #[serde(default)]
    pub added_at: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<Value>,
    #[serde(
        default,
        deserialize_with = "de::lenient",
        skip_serializing_if = "is_not_verified"
    )]
    pub verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badges: Option<Value>,
}

impl UserRecord {
    /// The username, or an empty string when the record has none.
    pub fn handle(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    pub fn has_username(&self) -> bool {
        non_empty(&self.username).is_some()
    }
}

fn is_not_verified(verified: &Option<bool>) -> bool {
    *verified != Some(true)
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ActivityKind {
    Review,
    Vouch,
    Attestation,
    Other,
}

/// One side of an interaction.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    #[serde(default, deserialize_with = "de::lenient_u64")]
    pub profile_id: Option<u64>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Party {
    /// Display name with the username as fallback.
    pub fn label(&self) -> Option<&str> {
        non_empty(&self.name).or_else(|| non_empty(&self.username))
    }
}

/// An interaction record from the activity history endpoint.
///
/// Fields this crate does not interpret are kept in `extra` and written back
/// unchanged.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "de::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(
        default,
        deserialize_with = "de::lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<i64>,
    #[serde(
        default,
        deserialize_with = "de::lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<i64>,
    #[serde(
        default,
        deserialize_with = "de::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<Party>,
    #[serde(
        default,
        deserialize_with = "de::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub subject: Option<Party>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub content: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Activity {
    pub fn kind(&self) -> ActivityKind {
        match self.kind.as_deref() {
            Some("review") => ActivityKind::Review,
            Some("vouch") => ActivityKind::Vouch,
            Some("attestation") => ActivityKind::Attestation,
            _ => ActivityKind::Other,
        }
    }

    pub fn author_id(&self) -> Option<u64> {
        self.author.as_ref().and_then(|party| party.profile_id)
    }

    pub fn subject_id(&self) -> Option<u64> {
        self.subject.as_ref().and_then(|party| party.profile_id)
    }

    /// The event time, preferring `timestamp` over `createdAt`.
    pub fn time(&self) -> Option<i64> {
        self.timestamp.or(self.created_at)
    }
}

/// One page of a profile's activity history.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ActivityPage {
    #[serde(default, deserialize_with = "de::lenient_vec")]
    pub values: Vec<Activity>,
    #[serde(default, deserialize_with = "de::lenient_u64")]
    pub total: Option<u64>,
}

/// A profile directory entry.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryProfile {
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub invites_available: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub actor: Option<Actor>,
}

impl DirectoryProfile {
    pub fn invites(&self) -> i64 {
        self.invites_available.unwrap_or(0)
    }

    pub fn profile_id(&self) -> Option<u64> {
        self.actor.as_ref().and_then(|actor| actor.profile_id)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(default, deserialize_with = "de::lenient_u64")]
    pub profile_id: Option<u64>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::lenient")]
    pub avatar: Option<String>,
}

/// Profile details from the batch profile lookup.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInfo {
    #[serde(default, deserialize_with = "de::lenient_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "de::lenient_timestamp")]
    pub created_at: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient_timestamp")]
    pub updated_at: Option<i64>,
    #[serde(default, deserialize_with = "de::lenient_u64")]
    pub invited_by: Option<u64>,
    #[serde(default, deserialize_with = "de::lenient_i64")]
    pub invites_available: Option<i64>,
}
