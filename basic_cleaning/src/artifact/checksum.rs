//! Content digests for artifact files and manifests.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

use super::ManifestEntry;

/// Calculate the SHA-256 digest of a file's contents.
///
/// # Returns
/// Hexadecimal string representation of the hash.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Calculate the SHA-256 digest of in-memory content.
pub fn content_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Aggregate digest of a manifest, independent of entry order.
///
/// Two artifacts with the same file names and contents hash to the same value.
pub fn manifest_digest(entries: &[ManifestEntry]) -> String {
    let mut lines: Vec<String> = entries
        .iter()
        .map(|e| format!("{}:{}", e.path, e.digest))
        .collect();
    lines.sort();

    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn entry(path: &str, digest: &str) -> ManifestEntry {
        ManifestEntry {
            path: path.to_string(),
            digest: digest.to_string(),
            size: 0,
        }
    }

    #[test]
    fn test_file_digest_matches_content_digest() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "price,last_review\n50,2019-01-01\n").unwrap();

        let from_file = file_digest(file.path()).unwrap();
        let from_bytes = content_digest(b"price,last_review\n50,2019-01-01\n");
        assert_eq!(from_file, from_bytes);
        assert_eq!(from_file.len(), 64);
    }

    #[test]
    fn test_different_content_different_digest() {
        assert_ne!(content_digest(b"a"), content_digest(b"b"));
    }

    #[test]
    fn test_manifest_digest_ignores_order() {
        let a = vec![entry("a.csv", "11"), entry("b.csv", "22")];
        let b = vec![entry("b.csv", "22"), entry("a.csv", "11")];
        assert_eq!(manifest_digest(&a), manifest_digest(&b));

        let c = vec![entry("a.csv", "11"), entry("b.csv", "23")];
        assert_ne!(manifest_digest(&a), manifest_digest(&c));
    }
}
