//! SHA-256 checksums of migration SQL, recorded to detect drift between the
//! embedded source and what was actually applied to a given database.

use sha2::{Digest, Sha256};

pub fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_64_hex_chars() {
        assert_eq!(compute_checksum("SELECT 1").len(), 64);
    }

    #[test]
    fn checksum_is_deterministic() {
        assert_eq!(compute_checksum("SELECT 1"), compute_checksum("SELECT 1"));
    }
}
