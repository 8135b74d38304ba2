// Hashing module using BLAKE3

use std::fs::File;
use std::io::Read;
use std::path::Path;
use crate::constants::HASH_CHUNK_SIZE;
use crate::error::{MigrationError, Result};

/// Content address of a stored document
/// Format: "blake3:doc:<hash>"
pub fn compute_document_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    format!("blake3:doc:{}", hash.to_hex())
}

/// Compute full BLAKE3 hash of entire file
pub fn compute_full_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| MigrationError::Backup(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)
            .map_err(|e| MigrationError::Backup(format!("Failed to read {}: {}", path.display(), e)))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let hash = hasher.finalize();
    Ok(format!("blake3:full:{}", hash.to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_document_hash_is_stable() {
        let a = compute_document_hash(br#"{"Name":"Eagles"}"#);
        let b = compute_document_hash(br#"{"Name":"Eagles"}"#);
        let c = compute_document_hash(br#"{"Name":"Hawks"}"#);
        assert!(a.starts_with("blake3:doc:"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_full_hash() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let hash = compute_full_hash(file.path()).unwrap();
        assert!(hash.starts_with("blake3:full:"));
    }
}
