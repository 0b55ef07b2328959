//! Source resolution: turns a directive into a format plus raw bytes.

use std::path::{Path, PathBuf};

use crate::error::{DescriptorError, Result};
use crate::format::Format;
use crate::scan::{Directive, Payload};

/// A descriptor payload ready for parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub format: Format,
    pub bytes: Vec<u8>,
    /// The external file the payload was read from; `None` for inline bodies.
    pub origin: Option<PathBuf>,
}

/// Resolve a directive found in `referencing_file`.
///
/// External paths are taken relative to the referencing file's directory and
/// read on every call, so the result always reflects the file's current
/// content. The format is determined before any I/O: an unknown extension is
/// reported even when the file is also missing.
pub fn resolve_source(directive: &Directive, referencing_file: &Path) -> Result<ResolvedSource> {
    match &directive.payload {
        Payload::Inline { keyword, body } => Ok(ResolvedSource {
            format: Format::from_keyword(keyword)?,
            bytes: body.as_bytes().to_vec(),
            origin: None,
        }),
        Payload::External { path } => {
            let full = referencing_file
                .parent()
                .map(|dir| dir.join(path))
                .unwrap_or_else(|| path.clone());
            let format = Format::from_path(&full)?;
            let bytes = std::fs::read(&full).map_err(|source| DescriptorError::SourceNotFound {
                path: full.clone(),
                source,
            })?;
            tracing::debug!(path = %full.display(), %format, "read external descriptor");
            Ok(ResolvedSource {
                format,
                bytes,
                origin: Some(full),
            })
        }
    }
}
