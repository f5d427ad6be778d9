//! Content hashing

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256
pub fn sha256_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(bytes.as_ref()))
}

/// Hash of a payload's canonical JSON serialization
pub fn payload_hash<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    Ok(sha256_hex(serde_json::to_vec(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_payload_hash_ignores_key_order() {
        let a = json!({"a": 1, "b": [1, 2]});
        let b = json!({"b": [1, 2], "a": 1});
        assert_eq!(payload_hash(&a).unwrap(), payload_hash(&b).unwrap());
        assert_ne!(payload_hash(&a).unwrap(), payload_hash(&json!({"a": 2})).unwrap());
    }
}
