//! Per-descriptor and per-file resolution pipeline.

use std::path::{Path, PathBuf};

use crate::error::{DescriptorError, LocatedError, Result};
use crate::format::parse_document;
use crate::layout::{resolve_layout, LayoutModel};
use crate::scan::{scan_directives, Directive};
use crate::schema::{validate, SchemaOptions};
use crate::source::{resolve_source, ResolvedSource};

/// Resolve one directive: source, parse, validate, lay out.
pub fn resolve_descriptor(
    directive: &Directive,
    referencing_file: &Path,
    options: &SchemaOptions,
) -> Result<LayoutModel> {
    let source = resolve_source(directive, referencing_file)?;
    resolve_payload(&source, options)
}

fn resolve_payload(source: &ResolvedSource, options: &SchemaOptions) -> Result<LayoutModel> {
    let doc = parse_document(source.format, &source.bytes)?;
    let map = validate(&doc, options)?;
    resolve_layout(&map)
}

/// Like [`resolve_descriptor`], but errors carry the directive's location and,
/// once an external file has been read, that file as their origin.
fn resolve_located(
    directive: &Directive,
    referencing_file: &Path,
    options: &SchemaOptions,
) -> std::result::Result<LayoutModel, LocatedError> {
    let located = |origin: Option<PathBuf>, error| LocatedError {
        file: referencing_file.to_path_buf(),
        line: directive.line,
        origin,
        error,
    };
    let source = resolve_source(directive, referencing_file).map_err(|e| located(None, e))?;
    resolve_payload(&source, options).map_err(|e| located(source.origin.clone(), e))
}

/// Every descriptor outcome for one source file, in directive order.
#[derive(Debug)]
pub struct SourceReport {
    pub file: PathBuf,
    pub descriptors: Vec<std::result::Result<LayoutModel, LocatedError>>,
}

impl SourceReport {
    /// Whether every descriptor in the file resolved.
    pub fn is_ok(&self) -> bool {
        self.descriptors.iter().all(|d| d.is_ok())
    }

    /// Successfully resolved layouts.
    pub fn models(&self) -> impl Iterator<Item = &LayoutModel> {
        self.descriptors.iter().filter_map(|d| d.as_ref().ok())
    }

    /// Failed descriptors.
    pub fn failures(&self) -> impl Iterator<Item = &LocatedError> {
        self.descriptors.iter().filter_map(|d| d.as_ref().err())
    }
}

/// Read a source file and resolve each directive in it independently.
///
/// The file is read on every call. Only failures that affect the whole file
/// (unreadable file, malformed directive) are returned as `Err`.
pub fn resolve_source_file(
    path: &Path,
    options: &SchemaOptions,
) -> std::result::Result<SourceReport, LocatedError> {
    let bytes = std::fs::read(path).map_err(|source| LocatedError {
        file: path.to_path_buf(),
        line: 0,
        origin: None,
        error: DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let text = String::from_utf8_lossy(&bytes);

    let directives = scan_directives(&text).map_err(|error| LocatedError {
        file: path.to_path_buf(),
        line: match &error {
            DescriptorError::MalformedDirective { line, .. } => *line,
            _ => 0,
        },
        origin: None,
        error,
    })?;

    let descriptors = directives
        .iter()
        .map(|directive| {
            let outcome = resolve_located(directive, path, options);
            match &outcome {
                Ok(model) => tracing::debug!(
                    file = %path.display(),
                    line = directive.line,
                    name = %model.name,
                    fields = model.field_count(),
                    "resolved descriptor"
                ),
                Err(e) => tracing::debug!(
                    file = %path.display(),
                    line = directive.line,
                    error = %e.error,
                    "descriptor failed"
                ),
            }
            outcome
        })
        .collect();

    Ok(SourceReport {
        file: path.to_path_buf(),
        descriptors,
    })
}
