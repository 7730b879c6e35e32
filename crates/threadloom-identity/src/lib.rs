//! Deterministic one-way mapping of raw user ids to opaque author handles.
//!
//! `hash` is a single pure function over the UTF-8 decimal string form of
//! the id: no salt, so the same raw id always maps to the same handle
//! across sources. The hash is not meant to be secret, only stable and
//! opaque.

use sha2::{Digest, Sha256};

/// Anything that can be rendered as the decimal string form an id would
/// take in the source system: a numeric id or its string equivalent
/// already satisfy this identically (`hash(123) == hash("123")`).
pub trait UserId {
    fn canonical_string(&self) -> String;
}

impl UserId for u64 {
    fn canonical_string(&self) -> String {
        self.to_string()
    }
}

impl UserId for i64 {
    fn canonical_string(&self) -> String {
        self.to_string()
    }
}

impl UserId for &str {
    fn canonical_string(&self) -> String {
        (*self).to_string()
    }
}

impl UserId for String {
    fn canonical_string(&self) -> String {
        self.clone()
    }
}

/// Hashes a user id to a 64-hex-character author handle via SHA-256 over
/// its canonical decimal string form.
pub fn hash<U: UserId>(user_id: U) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.canonical_string().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_hash_identically() {
        assert_eq!(hash(123u64), hash("123"));
    }

    #[test]
    fn hash_is_64_hex_chars() {
        let h = hash(42u64);
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(999u64), hash(999u64));
    }

    #[test]
    fn distinct_ids_hash_distinctly() {
        use std::collections::HashSet;
        let hashes: HashSet<String> = (0u64..1000).map(hash).collect();
        assert_eq!(hashes.len(), 1000);
    }

    proptest::proptest! {
        #[test]
        fn prop_hash_len_always_64(id: u64) {
            proptest::prop_assert_eq!(hash(id).len(), 64);
        }

        #[test]
        fn prop_numeric_string_agree(id: u64) {
            proptest::prop_assert_eq!(hash(id), hash(id.to_string()));
        }
    }
}
