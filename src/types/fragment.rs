//! Retrieval Data Contracts
//!
//! A `Fragment` is the unit of embedding and retrieval: a bounded slice of a
//! document's normalized text. Ordinals within a source are contiguous
//! `0..total_siblings` so downstream consumers can report "chunk i of n".
//!
//! Overlap text prepended to a fragment's rendered `text` is never counted
//! toward `byte_length` or ordinal accounting; overlap is a rendering
//! concern, not a new fragment.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One bounded-size slice of a document, produced by the chunker.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Rendered text: from the second fragment on, prefixed with the tail of
    /// the previous fragment's core, joined by a single space.
    pub text: String,
    /// Opaque id of the originating document
    pub source_id: String,
    /// Position within the source, `0..total_siblings`
    pub index: usize,
    /// Number of fragments the source split into
    pub total_siblings: usize,
    /// Byte length of the pre-overlap core
    pub byte_length: usize,
}

/// One ranked result from a vector-index query. Ephemeral; consumed
/// immediately by the context builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub id: String,
    /// Similarity score in `[0, 1]`
    pub score: f32,
    pub text: String,
    pub metadata: HashMap<String, Value>,
}

impl RetrievalHit {
    /// Originating document id, if the indexer recorded one.
    pub fn source_id(&self) -> Option<&str> {
        self.metadata.get("file_id").and_then(Value::as_str)
    }

    /// Chunk ordinal within the source, if recorded.
    pub fn ordinal(&self) -> Option<u64> {
        self.metadata.get("chunk_index").and_then(Value::as_u64)
    }

    /// Human-readable origin label (filename), if recorded.
    pub fn origin(&self) -> Option<&str> {
        self.metadata.get("filename").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hit_metadata_accessors() {
        let mut metadata = HashMap::new();
        metadata.insert("file_id".to_string(), json!("doc-1"));
        metadata.insert("chunk_index".to_string(), json!(3));
        metadata.insert("filename".to_string(), json!("notes.md"));

        let hit = RetrievalHit {
            id: "p1".to_string(),
            score: 0.9,
            text: "hello".to_string(),
            metadata,
        };

        assert_eq!(hit.source_id(), Some("doc-1"));
        assert_eq!(hit.ordinal(), Some(3));
        assert_eq!(hit.origin(), Some("notes.md"));
    }

    #[test]
    fn test_hit_missing_metadata() {
        let hit = RetrievalHit {
            id: "p1".to_string(),
            score: 0.5,
            text: String::new(),
            metadata: HashMap::new(),
        };
        assert_eq!(hit.source_id(), None);
        assert_eq!(hit.ordinal(), None);
    }
}
