//! List response envelope parsing
//!
//! Different generations of the downstream API nest list results under
//! different keys: `Items`, `Results`, `Data`, or a bare array. Rather than
//! sniffing keys dynamically, the known shapes form one untagged enum whose
//! variants are tried in declaration order; a body matching none of them is
//! an explicit [`RemoteError::UnrecognizedShape`].

use serde::Deserialize;
use serde_json::Value;

use membersync_core::domain::RemoteError;

/// The historically-seen nesting shapes for list responses, in the order
/// they are attempted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope {
    Items {
        #[serde(rename = "Items")]
        items: Vec<Value>,
    },
    Results {
        #[serde(rename = "Results")]
        results: Vec<Value>,
    },
    Data {
        #[serde(rename = "Data")]
        data: Vec<Value>,
    },
    Bare(Vec<Value>),
}

impl ListEnvelope {
    fn into_items(self) -> Vec<Value> {
        match self {
            ListEnvelope::Items { items } => items,
            ListEnvelope::Results { results } => results,
            ListEnvelope::Data { data } => data,
            ListEnvelope::Bare(items) => items,
        }
    }
}

/// Extracts the result list from a response body.
pub fn parse_list(body: &Value) -> Result<Vec<Value>, RemoteError> {
    serde_json::from_value::<ListEnvelope>(body.clone())
        .map(ListEnvelope::into_items)
        .map_err(|_| {
            let mut snippet = body.to_string();
            snippet.truncate(200);
            RemoteError::UnrecognizedShape(snippet)
        })
}

/// Extracts an entity identifier from a response body.
///
/// Create endpoints return the new entity directly (`Id` or `id`), some
/// wrap it under `Data`. Numbers are stringified; anything else is an
/// unrecognized shape.
pub fn extract_id(body: &Value) -> Result<String, RemoteError> {
    fn id_of(obj: &Value) -> Option<String> {
        let id = obj.get("Id").or_else(|| obj.get("id"))?;
        match id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    id_of(body)
        .or_else(|| body.get("Data").and_then(id_of))
        .ok_or_else(|| {
            let mut snippet = body.to_string();
            snippet.truncate(200);
            RemoteError::UnrecognizedShape(snippet)
        })
}
