//! Normalization of raw API responses into flat documents
//!
//! The GraphQL response nests counts, languages, and topics under objects and
//! node lists. Normalization flattens those into scalars and string arrays so
//! the stored document is a flat mapping. Quota information rides along in
//! the same response and is extracted separately.

use crate::credentials::RateLimit;
use crate::storage::Document;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Errors reported while interpreting a raw API response
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Response is missing data.repository")]
    MissingRepository,

    #[error("Repository payload is not an object")]
    NotAnObject,

    #[error("Response is missing data.rateLimit")]
    MissingRateLimit,

    #[error("Malformed rate limit payload: {0}")]
    MalformedRateLimit(String),
}

/// Nested count objects flattened to their `totalCount`
const COUNT_FIELDS: &[&str] = &[
    "watchers",
    "stargazers",
    "commitComments",
    "pullRequests",
    "releases",
    "deployments",
    "labels",
];

/// Normalizes a raw repository response into a flat [`Document`]
///
/// Projections applied per field:
/// - `owner` → its `login` string ("" if absent)
/// - count objects → their `totalCount` (0 if absent or malformed)
/// - `primaryLanguage` / `licenseInfo` → their `name` ("" if malformed)
/// - `languages` → ordered list of node names
/// - `repositoryTopics` → ordered list of topic names ([] on malformed shape)
/// - everything else passes through unchanged
///
/// A numeric `repo_id` is recovered from the opaque encoded `id` field, or
/// set to -1 when decoding fails.
///
/// # Returns
///
/// * `Ok(Document)` - The flattened document
/// * `Err(DocumentError)` - `data.repository` is missing or not an object
pub fn normalize_repository(raw: &Value) -> Result<Document, DocumentError> {
    let repository = raw
        .get("data")
        .and_then(|d| d.get("repository"))
        .ok_or(DocumentError::MissingRepository)?;
    let repository = repository.as_object().ok_or(DocumentError::NotAnObject)?;

    let mut fields = Map::new();
    for (key, value) in repository {
        let projected = match key.as_str() {
            "owner" => json!(value.get("login").and_then(Value::as_str).unwrap_or("")),
            k if COUNT_FIELDS.contains(&k) => {
                json!(value.get("totalCount").and_then(Value::as_i64).unwrap_or(0))
            }
            "primaryLanguage" | "licenseInfo" => {
                json!(value.get("name").and_then(Value::as_str).unwrap_or(""))
            }
            "languages" => match value.as_object() {
                Some(_) => json!(project_language_names(value)),
                None => value.clone(),
            },
            "repositoryTopics" => json!(project_topic_names(value)),
            _ => value.clone(),
        };
        fields.insert(key.clone(), projected);
    }

    let repo_id = repository
        .get("id")
        .and_then(Value::as_str)
        .map(decode_node_id)
        .unwrap_or(-1);
    fields.insert("repo_id".to_string(), json!(repo_id));

    Ok(Document::new(fields))
}

/// Extracts the rate-limit snapshot riding along in a raw response
///
/// # Returns
///
/// * `Ok(RateLimit)` - Parsed `data.rateLimit.{remaining, resetAt}`
/// * `Err(DocumentError)` - Block missing or fields unparseable
pub fn extract_rate_limit(raw: &Value) -> Result<RateLimit, DocumentError> {
    let block = raw
        .get("data")
        .and_then(|d| d.get("rateLimit"))
        .filter(|v| !v.is_null())
        .ok_or(DocumentError::MissingRateLimit)?;

    let remaining = block
        .get("remaining")
        .and_then(Value::as_i64)
        .ok_or_else(|| DocumentError::MalformedRateLimit("remaining".to_string()))?;

    let reset_at = block
        .get("resetAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| DocumentError::MalformedRateLimit("resetAt".to_string()))?;

    Ok(RateLimit { remaining, reset_at })
}

/// Decodes an opaque base64 node id to a numeric repository id
///
/// Node ids decode to text of the form `0NN:Repository<digits>`; the digits
/// after the last `Repository` marker are the numeric id. Returns -1 when
/// any decoding step fails.
pub fn decode_node_id(encoded: &str) -> i64 {
    let decoded = match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(_) => return -1,
    };
    let Ok(text) = String::from_utf8(decoded) else {
        return -1;
    };
    text.split("Repository")
        .last()
        .and_then(|digits| digits.parse::<i64>().ok())
        .unwrap_or(-1)
}

/// Language node names in order, skipping malformed entries
fn project_language_names(value: &Value) -> Vec<String> {
    value
        .get("nodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(Value::as_object)
                .map(|node| {
                    node.get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Topic names in order; any malformed entry empties the whole projection
fn project_topic_names(value: &Value) -> Vec<String> {
    let Some(nodes) = value.get("nodes").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut names = Vec::with_capacity(nodes.len());
    for node in nodes {
        let Some(node) = node.as_object() else {
            return Vec::new();
        };
        match node.get("topic") {
            None => names.push(String::new()),
            Some(topic) => match topic.as_object() {
                Some(topic) => names.push(
                    topic
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                ),
                None => return Vec::new(),
            },
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_repo_id(numeric: u64) -> String {
        base64::engine::general_purpose::STANDARD.encode(format!("010:Repository{}", numeric))
    }

    fn canned_response() -> Value {
        json!({
            "data": {
                "repository": {
                    "id": encode_repo_id(16834251),
                    "name": "implicit",
                    "owner": {"login": "benfred"},
                    "description": "Fast collaborative filtering",
                    "stargazers": {"totalCount": 500},
                    "watchers": {"totalCount": 25},
                    "pullRequests": {"totalCount": 12},
                    "primaryLanguage": {"name": "Python"},
                    "licenseInfo": {"name": "MIT License"},
                    "languages": {"nodes": [{"name": "Python"}, {"name": "C++"}]},
                    "repositoryTopics": {
                        "nodes": [{"topic": {"name": "recommender"}}, {"topic": {"name": "mf"}}]
                    }
                },
                "rateLimit": {
                    "limit": 5000,
                    "cost": 1,
                    "remaining": 4999,
                    "resetAt": "2026-08-26T12:00:00Z"
                }
            }
        })
    }

    #[test]
    fn test_normalize_flattens_projections() {
        let document = normalize_repository(&canned_response()).unwrap();

        assert_eq!(document.get("owner"), Some(&json!("benfred")));
        assert_eq!(document.get("stargazers"), Some(&json!(500)));
        assert_eq!(document.get("watchers"), Some(&json!(25)));
        assert_eq!(document.get("pullRequests"), Some(&json!(12)));
        assert_eq!(document.get("primaryLanguage"), Some(&json!("Python")));
        assert_eq!(document.get("licenseInfo"), Some(&json!("MIT License")));
        assert_eq!(document.get("languages"), Some(&json!(["Python", "C++"])));
        assert_eq!(
            document.get("repositoryTopics"),
            Some(&json!(["recommender", "mf"]))
        );
        // Untouched scalar passes through
        assert_eq!(
            document.get("description"),
            Some(&json!("Fast collaborative filtering"))
        );
        assert_eq!(document.get("repo_id"), Some(&json!(16834251)));
    }

    #[test]
    fn test_normalize_defaults_for_malformed_nested_fields() {
        let raw = json!({
            "data": {
                "repository": {
                    "id": "not base64!!!",
                    "owner": {},
                    "stargazers": "oops",
                    "primaryLanguage": null,
                    "repositoryTopics": {"nodes": ["not an object"]}
                }
            }
        });

        let document = normalize_repository(&raw).unwrap();
        assert_eq!(document.get("owner"), Some(&json!("")));
        assert_eq!(document.get("stargazers"), Some(&json!(0)));
        assert_eq!(document.get("primaryLanguage"), Some(&json!("")));
        assert_eq!(document.get("repositoryTopics"), Some(&json!([])));
        assert_eq!(document.get("repo_id"), Some(&json!(-1)));
    }

    #[test]
    fn test_normalize_rejects_missing_repository() {
        let err = normalize_repository(&json!({"data": {}})).unwrap_err();
        assert!(matches!(err, DocumentError::MissingRepository));

        let err = normalize_repository(&json!("not a mapping")).unwrap_err();
        assert!(matches!(err, DocumentError::MissingRepository));
    }

    #[test]
    fn test_normalize_rejects_null_repository() {
        // GraphQL returns data.repository = null for unknown repositories
        let raw = json!({"data": {"repository": null}});
        let err = normalize_repository(&raw).unwrap_err();
        assert!(matches!(err, DocumentError::NotAnObject));
    }

    #[test]
    fn test_decode_node_id_roundtrip() {
        assert_eq!(decode_node_id(&encode_repo_id(12345)), 12345);
    }

    #[test]
    fn test_decode_node_id_failures() {
        assert_eq!(decode_node_id("###"), -1);
        let no_marker = base64::engine::general_purpose::STANDARD.encode("010:Gist12345");
        assert_eq!(decode_node_id(&no_marker), -1);
    }

    #[test]
    fn test_extract_rate_limit() {
        let limit = extract_rate_limit(&canned_response()).unwrap();
        assert_eq!(limit.remaining, 4999);
        assert_eq!(
            limit.reset_at,
            DateTime::parse_from_rfc3339("2026-08-26T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc)
        );
    }

    #[test]
    fn test_extract_rate_limit_missing_block() {
        let err = extract_rate_limit(&json!({"data": {}})).unwrap_err();
        assert!(matches!(err, DocumentError::MissingRateLimit));
    }

    #[test]
    fn test_extract_rate_limit_bad_timestamp() {
        let raw = json!({"data": {"rateLimit": {"remaining": 10, "resetAt": "yesterday"}}});
        let err = extract_rate_limit(&raw).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedRateLimit(_)));
    }
}
