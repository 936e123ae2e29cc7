use sha2::{Digest, Sha256};

/// Stable dedup key for a raw batch: `sha256(user_id || first_sample_ts)`
/// truncated to 24 hex chars, matching the corpus's digest-truncation
/// idiom for deterministic ids.
pub fn raw_batch_dedup_key(user_id: &str, first_sample_ts_micros: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(first_sample_ts_micros.to_be_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..24].to_string()
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_is_deterministic() {
        let a = raw_batch_dedup_key("user-1", 1_700_000_000_000_000);
        let b = raw_batch_dedup_key("user-1", 1_700_000_000_000_000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 24);
    }

    #[test]
    fn dedup_key_differs_by_timestamp() {
        let a = raw_batch_dedup_key("user-1", 1);
        let b = raw_batch_dedup_key("user-1", 2);
        assert_ne!(a, b);
    }
}
