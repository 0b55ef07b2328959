//! Atomic page output with content-hash change detection.
//!
//! Pages are written to a temporary file beside the destination and renamed
//! over it, so a reader never observes a partially written page. A page whose
//! SHA-256 digest matches the file already on disk is not rewritten.

use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{RenderError, Result};

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Compute the SHA-256 hash of page content.
pub fn content_hash(bytes: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// What [`write_atomic`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Unchanged,
}

/// Replace `path` with `content` atomically, skipping identical content.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<WriteOutcome> {
    if let Ok(existing) = std::fs::read(path) {
        if content_hash(&existing) == content_hash(content) {
            tracing::debug!(path = %path.display(), "page unchanged");
            return Ok(WriteOutcome::Unchanged);
        }
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| RenderError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| RenderError::io(dir, e))?;
    tmp.write_all(content).map_err(|e| RenderError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| RenderError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| RenderError::io(path, e.error))?;

    tracing::info!(path = %path.display(), hash = %hash_hex(&content_hash(content)), "wrote page");
    Ok(WriteOutcome::Written)
}
