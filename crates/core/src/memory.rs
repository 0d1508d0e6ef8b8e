//! Memory store trait: per-user conversational context.
//!
//! Memory is an opaque JSON object per user, loaded once at the start of a
//! turn and written back once at the end. Storage is last-write-wins with no
//! versioning.

use async_trait::async_trait;
use crate::error::StorageError;

/// The per-user context mapping.
pub type UserMemory = serde_json::Map<String, serde_json::Value>;

/// The core MemoryStore trait.
///
/// Implementations: PostgreSQL, in-memory (for testing and local chat).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The backend name (e.g., "postgres", "in_memory").
    fn name(&self) -> &str;

    /// Load memory for a user. An absent or undecodable record yields an
    /// empty mapping, never an error.
    async fn load(&self, user_id: i64) -> Result<UserMemory, StorageError>;

    /// Overwrite the stored snapshot for a user.
    async fn save(&self, user_id: i64, memory: &UserMemory) -> Result<(), StorageError>;
}

/// Decode a stored snapshot. Anything that is not a JSON object is treated as
/// absent memory.
pub fn decode_memory(raw: Option<&str>) -> UserMemory {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return UserMemory::new();
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        Ok(_) | Err(_) => {
            tracing::warn!("Stored memory is not a JSON object, treating as empty");
            UserMemory::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_absent_memory() {
        assert!(decode_memory(None).is_empty());
        assert!(decode_memory(Some("   ")).is_empty());
    }

    #[test]
    fn decode_corrupt_memory_is_empty() {
        assert!(decode_memory(Some("{not json")).is_empty());
        assert!(decode_memory(Some("[1, 2, 3]")).is_empty());
    }

    #[test]
    fn decode_valid_memory() {
        let memory = decode_memory(Some(r#"{"last_intent":"DOWNTIME_QUERY"}"#));
        assert_eq!(memory["last_intent"], "DOWNTIME_QUERY");
    }
}
