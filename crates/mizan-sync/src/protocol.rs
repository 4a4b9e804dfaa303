//! # Replica Protocol Messages
//!
//! Message types for talking to the remote replicated document store.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Replica Protocol Messages                           │
//! │                                                                         │
//! │  DOCUMENT FETCH (cold start)                                           │
//! │  ───────────────────────────                                           │
//! │  CLIENT ───► Get { request_id, key }                                   │
//! │  SERVER ◄─── Document { request_id, key, document: State | null }      │
//! │                                                                         │
//! │  DOCUMENT PUSH (after every local commit)                              │
//! │  ────────────────────────────────────────                              │
//! │  CLIENT ───► Put { key, document }          (no ack awaited)           │
//! │                                                                         │
//! │  CHANGE FEED                                                           │
//! │  ───────────                                                           │
//! │  CLIENT ───► Watch { key }                  (re-sent on reconnect)     │
//! │  SERVER ───► Changed { key, document }      (on every remote write)    │
//! │                                                                         │
//! │  ERROR                                                                 │
//! │  ─────                                                                 │
//! │  SERVER ───► Error { code, message }                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format (JSON)
//! Messages are serialized as tagged JSON using serde's adjacently tagged enum:
//! ```json
//! { "type": "Get", "payload": { "request_id": "...", "key": "..." } }
//! ```
//!
//! Documents travel whole: there is no field-level patching on the wire,
//! matching the last-writer-wins replication model.

use serde::{Deserialize, Serialize};

use mizan_core::State;

use crate::error::{SyncError, SyncResult};

/// Current protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

// =============================================================================
// Main Message Enum (Tagged Union)
// =============================================================================

/// All replica protocol messages.
///
/// Uses serde's adjacently tagged enum for clean JSON serialization:
/// `{ "type": "Get", "payload": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ReplicaMessage {
    // =========================================================================
    // Client → Server
    // =========================================================================

    /// Fetch the document stored under a key.
    Get { request_id: String, key: String },

    /// Replace the document stored under a key.
    Put { key: String, document: State },

    /// Subscribe to changes of a key.
    Watch { key: String },

    // =========================================================================
    // Server → Client
    // =========================================================================

    /// Response to a Get. `document` is `None` when the key is absent.
    Document {
        request_id: String,
        key: String,
        document: Option<State>,
    },

    /// A watched key was written by some device.
    Changed { key: String, document: State },

    /// The server rejected a request.
    Error { code: String, message: String },
}

impl ReplicaMessage {
    /// Serializes the message to JSON for wire transmission.
    pub fn to_json(&self) -> SyncResult<String> {
        serde_json::to_string(self).map_err(SyncError::from)
    }

    /// Deserializes a message from wire JSON.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json).map_err(SyncError::from)
    }

    /// Message type name, for log fields.
    pub fn type_name(&self) -> &'static str {
        match self {
            ReplicaMessage::Get { .. } => "Get",
            ReplicaMessage::Put { .. } => "Put",
            ReplicaMessage::Watch { .. } => "Watch",
            ReplicaMessage::Document { .. } => "Document",
            ReplicaMessage::Changed { .. } => "Changed",
            ReplicaMessage::Error { .. } => "Error",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_wire_shape() {
        let msg = ReplicaMessage::Get {
            request_id: "r1".to_string(),
            key: "shop-main".to_string(),
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""type":"Get""#));
        assert!(json.contains(r#""request_id":"r1""#));

        match ReplicaMessage::from_json(&json).unwrap() {
            ReplicaMessage::Get { request_id, key } => {
                assert_eq!(request_id, "r1");
                assert_eq!(key, "shop-main");
            }
            other => panic!("unexpected message: {}", other.type_name()),
        }
    }

    #[test]
    fn test_absent_document_round_trips() {
        let msg = ReplicaMessage::Document {
            request_id: "r2".to_string(),
            key: "shop-main".to_string(),
            document: None,
        };
        let json = msg.to_json().unwrap();
        match ReplicaMessage::from_json(&json).unwrap() {
            ReplicaMessage::Document { document, .. } => assert!(document.is_none()),
            other => panic!("unexpected message: {}", other.type_name()),
        }
    }

    #[test]
    fn test_changed_carries_the_whole_document() {
        let mut state = State::default();
        state.last_invoice_number = 12;
        let msg = ReplicaMessage::Changed {
            key: "shop-main".to_string(),
            document: state,
        };
        let json = msg.to_json().unwrap();
        match ReplicaMessage::from_json(&json).unwrap() {
            ReplicaMessage::Changed { document, .. } => {
                assert_eq!(document.last_invoice_number, 12);
            }
            other => panic!("unexpected message: {}", other.type_name()),
        }
    }

    #[test]
    fn test_garbage_is_a_protocol_error() {
        assert!(matches!(
            ReplicaMessage::from_json("{not json"),
            Err(SyncError::SerializationFailed(_))
        ));
    }
}
