//! Structured results returned to the model by knowledge-base operations.

use crate::error::Result;
use crate::vector_store::ScoredText;
use serde::Serialize;
use tracing::warn;

/// Result of a tool-facing operation: a success flag, a human-readable
/// message, and an operation-specific payload flattened into the same JSON
/// object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(flatten)]
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    /// A successful outcome with payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// A failed outcome without payload.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Fold a fallible operation into an outcome, prefixing errors with `context`.
    pub fn from_result(context: &str, result: Result<Outcome<T>>) -> Self {
        result.unwrap_or_else(|e| {
            warn!("{}: {}", context, e);
            Self::fail(format!("{}: {}", context, e))
        })
    }
}

/// Payload of a successful `connect_database`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connected {
    pub client: String,
}

/// Payload naming the collection an operation acted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionRef {
    pub collection: String,
}

/// Payload of `add_documents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inserted {
    pub insert_count: usize,
}

/// Payload of `search_documents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHits {
    pub results: Vec<ScoredText>,
    pub count: usize,
    /// Whole-collection fallback attached when the vector search found nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_content: Option<Vec<String>>,
}

/// Payload of `get_collection_content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionContent {
    pub count: usize,
    pub documents: Vec<String>,
}

/// Payload of `list_all_collections`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionNames {
    pub collections: Vec<String>,
}

/// Payload of `read_and_chunk_file`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileChunks {
    pub file_name: String,
    pub chunks: Vec<String>,
    pub chunk_count: usize,
}

/// Payload of `upload_file_to_collection`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Upload {
    pub file_name: String,
    pub collection: String,
    pub chunk_count: usize,
    pub insert_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KimiError;
    use serde_json::json;

    #[test]
    fn test_success_flattens_payload() {
        let outcome = Outcome::ok("done", Inserted { insert_count: 3 });
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": true, "message": "done", "insert_count": 3})
        );
    }

    #[test]
    fn test_failure_has_no_payload() {
        let outcome: Outcome<Inserted> = Outcome::fail("nope");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": false, "message": "nope"})
        );
    }

    #[test]
    fn test_from_result_prefixes_error() {
        let outcome: Outcome<Inserted> = Outcome::from_result(
            "Failed to add documents",
            Err(KimiError::CollectionNotFound("kimi_agent_x".into())),
        );
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Failed to add documents: Collection 'kimi_agent_x' does not exist, create it first"
        );
    }

    #[test]
    fn test_search_hides_absent_fallback() {
        let outcome = Outcome::ok(
            "",
            SearchHits {
                results: vec![],
                count: 0,
                collection_content: None,
            },
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("collection_content").is_none());
        assert!(value.get("message").is_none());
    }
}
