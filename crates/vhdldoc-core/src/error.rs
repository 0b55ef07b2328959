//! Error types for descriptor resolution.

use std::fmt;
use std::path::PathBuf;

use crate::format::Format;

/// The schema rule a descriptor violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRule {
    /// A required key is absent.
    MissingRequired,
    /// A key holds a value of the wrong shape or domain.
    WrongType,
    /// A field type names more than one variant.
    AmbiguousVariant,
    /// A string is not one of the allowed spellings.
    EnumMismatch,
    /// A key is not part of the schema (strict mode only).
    UnknownField,
}

impl fmt::Display for SchemaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaRule::MissingRequired => "missingRequired",
            SchemaRule::WrongType => "wrongType",
            SchemaRule::AmbiguousVariant => "ambiguousVariant",
            SchemaRule::EnumMismatch => "enumMismatch",
            SchemaRule::UnknownField => "unknownField",
        };
        f.write_str(name)
    }
}

/// The layout rule a resolved field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRule {
    /// Two siblings claim the same addressable unit.
    Overlap,
    /// A child escapes the range of its non-set parent.
    OutOfParentRange,
    /// A field ends beyond the protocol's `addressMax`.
    ExceedsAddressMax,
    /// A fixed-point type has `high < low`.
    InvalidFixedRange,
    /// The protocol's `dataMin` is zero.
    InvalidDataMin,
}

impl fmt::Display for LayoutRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayoutRule::Overlap => "overlap",
            LayoutRule::OutOfParentRange => "outOfParentRange",
            LayoutRule::ExceedsAddressMax => "exceedsAddressMax",
            LayoutRule::InvalidFixedRange => "invalidFixedRange",
            LayoutRule::InvalidDataMin => "invalidDataMin",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while resolving a single descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// An external descriptor file could not be opened.
    #[error("descriptor source not found: {}", path.display())]
    SourceNotFound {
        /// The resolved path of the external file.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Neither the inline keyword nor the file extension names a known format.
    #[error("unsupported descriptor format '{name}' (expected toml or json)")]
    UnsupportedFormat {
        /// The keyword or extension that was not recognized.
        name: String,
    },

    /// The payload is not well-formed in its format.
    #[error("{format} syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// The format the payload was parsed as.
        format: Format,
        /// 1-based line within the payload.
        line: usize,
        /// 1-based column within the payload.
        column: usize,
        /// Parser message.
        message: String,
    },

    /// The value tree does not conform to the descriptor schema.
    #[error("schema error at {path}: {rule}: {detail}")]
    Schema {
        /// Path of the offending key, e.g. `contains[1].type`.
        path: String,
        /// The violated rule.
        rule: SchemaRule,
        /// Human-readable description.
        detail: String,
    },

    /// Address assignment or range checking failed.
    #[error("layout error at {path}: {rule}: {detail}")]
    Layout {
        /// Path of the offending field.
        path: String,
        /// The violated rule.
        rule: LayoutRule,
        /// Human-readable description.
        detail: String,
    },

    /// A field's value is not representable under its declared type.
    #[error("value/type mismatch at {path}: {detail}")]
    ValueTypeMismatch {
        /// Path of the offending field.
        path: String,
        /// Human-readable description.
        detail: String,
    },

    /// A `\memorymap` directive is incomplete or unterminated.
    #[error("malformed directive at line {line}: {detail}")]
    MalformedDirective {
        /// 1-based line of the directive in its source file.
        line: usize,
        /// Human-readable description.
        detail: String,
    },

    /// A source file could not be read.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

impl DescriptorError {
    pub(crate) fn schema(path: &str, rule: SchemaRule, detail: impl Into<String>) -> Self {
        DescriptorError::Schema {
            path: display_path(path),
            rule,
            detail: detail.into(),
        }
    }

    pub(crate) fn layout(path: &str, rule: LayoutRule, detail: impl Into<String>) -> Self {
        DescriptorError::Layout {
            path: display_path(path),
            rule,
            detail: detail.into(),
        }
    }

    pub(crate) fn mismatch(path: &str, detail: impl Into<String>) -> Self {
        DescriptorError::ValueTypeMismatch {
            path: display_path(path),
            detail: detail.into(),
        }
    }

    /// The schema rule, if this is a schema error.
    pub fn schema_rule(&self) -> Option<SchemaRule> {
        match self {
            DescriptorError::Schema { rule, .. } => Some(*rule),
            _ => None,
        }
    }

    /// The layout rule, if this is a layout error.
    pub fn layout_rule(&self) -> Option<LayoutRule> {
        match self {
            DescriptorError::Layout { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

/// A [`DescriptorError`] tied to the source file and directive it came from.
#[derive(Debug, thiserror::Error)]
#[error("{}:{line}: {}{error}", file.display(), origin_prefix(origin))]
pub struct LocatedError {
    /// The source file holding the directive.
    pub file: PathBuf,
    /// 1-based line of the `\memorymap` directive (0 when the whole file failed).
    pub line: usize,
    /// The external descriptor file the error occurred in, if any. Syntax
    /// line/column positions are relative to this file.
    pub origin: Option<PathBuf>,
    /// What went wrong.
    pub error: DescriptorError,
}

fn origin_prefix(origin: &Option<PathBuf>) -> String {
    origin
        .as_ref()
        .map(|path| format!("{}: ", path.display()))
        .unwrap_or_default()
}

/// Render a descriptor path, using `(root)` for the document root.
pub(crate) fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}

/// Result type for descriptor operations.
pub type Result<T> = std::result::Result<T, DescriptorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_names_are_camel_case() {
        assert_eq!(SchemaRule::AmbiguousVariant.to_string(), "ambiguousVariant");
        assert_eq!(LayoutRule::OutOfParentRange.to_string(), "outOfParentRange");
    }

    #[test]
    fn root_path_display() {
        let err = DescriptorError::schema("", SchemaRule::MissingRequired, "missing 'protocol'");
        assert!(err.to_string().contains("(root)"));
        assert_eq!(err.schema_rule(), Some(SchemaRule::MissingRequired));
        assert_eq!(err.layout_rule(), None);
    }

    #[test]
    fn located_error_display() {
        let err = LocatedError {
            file: PathBuf::from("src/top.vhd"),
            line: 12,
            origin: None,
            error: DescriptorError::UnsupportedFormat { name: "yaml".into() },
        };
        assert_eq!(
            err.to_string(),
            "src/top.vhd:12: unsupported descriptor format 'yaml' (expected toml or json)"
        );
    }

    #[test]
    fn located_error_names_external_origin() {
        let err = LocatedError {
            file: PathBuf::from("src/top.vhd"),
            line: 3,
            origin: Some(PathBuf::from("src/regs.toml")),
            error: DescriptorError::Syntax {
                format: Format::Toml,
                line: 4,
                column: 14,
                message: "invalid string".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "src/top.vhd:3: src/regs.toml: toml syntax error at line 4, column 14: invalid string"
        );
    }
}
