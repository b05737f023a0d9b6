//! JSON encoding of cached values.
//!
//! Values are stored as JSON bytes so they stay readable with `redis-cli`.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

/// Serializes a value to JSON bytes.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SerializationError> {
    serde_json::to_vec(value).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes into a value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serializer};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Comment {
        author: String,
        likes: u32,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Thread {
        title: String,
        comments: Vec<Comment>,
        pinned: Option<bool>,
    }

    #[test]
    fn test_nested_structure_survives() {
        let thread = Thread {
            title: "Caching".to_string(),
            comments: vec![
                Comment {
                    author: "ana".to_string(),
                    likes: 3,
                },
                Comment {
                    author: "bo".to_string(),
                    likes: 0,
                },
            ],
            pinned: None,
        };

        let bytes = encode(&thread).expect("encode should succeed");
        let decoded: Thread = decode(&bytes).expect("decode should succeed");

        assert_eq!(decoded, thread);
    }

    #[test]
    fn test_encode_is_plain_json() {
        let bytes = encode(&json!({"ok": true})).unwrap();
        assert_eq!(bytes, br#"{"ok":true}"#);
    }

    #[test]
    fn test_decode_corrupt_bytes() {
        let err = decode::<Thread>(b"\x00\x01not json").unwrap_err();
        assert!(matches!(err, SerializationError::DeserializeFailed(_)));
    }

    #[test]
    fn test_decode_wrong_shape() {
        let err = decode::<Thread>(b"[1, 2, 3]").unwrap_err();
        assert!(matches!(err, SerializationError::DeserializeFailed(_)));
    }

    #[test]
    fn test_encode_failure_is_reported() {
        struct Unencodable;

        impl Serialize for Unencodable {
            fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(<S::Error as serde::ser::Error>::custom(
                    "refusing to serialize",
                ))
            }
        }

        let err = encode(&Unencodable).unwrap_err();
        assert!(matches!(err, SerializationError::SerializeFailed(_)));
    }
}
