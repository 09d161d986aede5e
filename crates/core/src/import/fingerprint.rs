//! Content fingerprints for change detection.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::constants::HASH_CHUNK_SIZE;
use crate::errors::ImportError;
use crate::Result;

/// Hex-encoded SHA-256 of the file contents, read in fixed-size chunks.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| ImportError::HashFailed(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|e| ImportError::HashFailed(format!("{}: {}", path.display(), e)))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
