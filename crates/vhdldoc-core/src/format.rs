//! Descriptor serialization formats and parsing into a generic value tree.
//!
//! Both formats deserialize into the same `serde_json::Value` tree (built with
//! `preserve_order`, so map keys keep document order). Equivalent TOML and
//! JSON documents therefore produce identical trees.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{DescriptorError, Result, SchemaRule};

/// A supported descriptor serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Parse an inline format keyword (`toml`, `json`; case-insensitive).
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            _ => Err(DescriptorError::UnsupportedFormat {
                name: keyword.to_string(),
            }),
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Format::from_keyword(ext).map_err(|_| DescriptorError::UnsupportedFormat {
            name: if ext.is_empty() {
                path.display().to_string()
            } else {
                format!(".{ext}")
            },
        })
    }

    /// Lowercase display name.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse raw descriptor bytes into a generic ordered value tree.
///
/// On failure no partial tree is returned; the error carries a 1-based
/// line/column within `bytes`.
pub fn parse_document(format: Format, bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        let (line, column) = line_column(bytes, e.valid_up_to());
        DescriptorError::Syntax {
            format,
            line,
            column,
            message: "payload is not valid UTF-8".to_string(),
        }
    })?;

    match format {
        Format::Toml => {
            let table = toml::from_str::<toml::Table>(text).map_err(|e| {
                let offset = e.span().map(|s| s.start).unwrap_or(0);
                let (line, column) = line_column(bytes, offset);
                DescriptorError::Syntax {
                    format,
                    line,
                    column,
                    message: e.message().trim().to_string(),
                }
            })?;
            for (key, value) in &table {
                reject_non_finite(value, key)?;
            }
            serde_json::to_value(table).map_err(|e| DescriptorError::Syntax {
                format,
                line: 1,
                column: 1,
                message: e.to_string(),
            })
        }
        Format::Json => serde_json::from_str::<Value>(text).map_err(|e| DescriptorError::Syntax {
            format,
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }),
    }
}

/// TOML admits `nan` and `inf`, which have no place in the value tree.
fn reject_non_finite(value: &toml::Value, path: &str) -> Result<()> {
    match value {
        toml::Value::Float(x) if !x.is_finite() => Err(DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!("non-finite number {x} is not allowed"),
        )),
        toml::Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| reject_non_finite(item, &format!("{path}[{i}]"))),
        toml::Value::Table(table) => table
            .iter()
            .try_for_each(|(key, item)| reject_non_finite(item, &format!("{path}.{key}"))),
        _ => Ok(()),
    }
}

/// Convert a byte offset into a 1-based (line, column) pair.
fn line_column(bytes: &[u8], offset: usize) -> (usize, usize) {
    let offset = offset.min(bytes.len());
    let before = &bytes[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    let column = String::from_utf8_lossy(&before[line_start..]).chars().count() + 1;
    (line, column)
}
