// File fingerprinting: SHA-256 over the raw bytes, lowercase hex.

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

const CHUNK_SIZE: usize = 8192;

/// Hashes an in-memory file body.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hashes a file on disk in fixed-size chunks.
pub fn hash_file(path: &Path) -> anyhow::Result<String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("File not found: {} ({})", path.display(), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Case-insensitive comparison of two hex fingerprints.
pub fn same_fingerprint(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Salted password digest for the reference identity service.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn known_digest() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn chunked_file_hash_matches_in_memory_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        file.write_all(&body).unwrap();
        assert_eq!(hash_file(file.path()).unwrap(), hash_bytes(&body));
    }

    #[test]
    fn fingerprint_comparison_ignores_case() {
        assert!(same_fingerprint("ABCDEF", "abcdef"));
        assert!(!same_fingerprint("abcdef", "abcdee"));
    }

    #[test]
    fn password_digest_depends_on_salt() {
        assert_ne!(hash_password("s1", "pw"), hash_password("s2", "pw"));
        assert_eq!(hash_password("s1", "pw"), hash_password("s1", "pw"));
    }
}
