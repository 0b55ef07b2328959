//! Directive scanner: finds `\memorymap` directives in VHDL line comments.
//!
//! Two forms are recognized:
//!
//! ```vhdl
//! -- \memorymap toml
//! -- name = "Registers"
//! -- ...
//! -- \endmemorymap
//!
//! --! \memorymap path registers.json
//! ```
//!
//! A doc-comment marker (`--!`) and a single space after the comment marker
//! are stripped from every line before it is interpreted.

use std::path::PathBuf;

use crate::error::{DescriptorError, Result};

const OPEN: &str = "\\memorymap";
const CLOSE: &[&str] = &["\\endmemorymap", "\\end"];
const EXTERNAL_KEYWORDS: &[&str] = &["path", "external"];

/// A located `\memorymap` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// 1-based line of the opening marker.
    pub line: usize,
    pub payload: Payload,
}

/// What a directive carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A descriptor body embedded in the comment block.
    Inline {
        /// Format keyword following the marker, as written.
        keyword: String,
        /// Comment lines between the markers, joined with `\n`.
        body: String,
    },
    /// A reference to a descriptor file, relative to the source file.
    External { path: PathBuf },
}

/// Scan VHDL source text for directives, in order of appearance.
pub fn scan_directives(text: &str) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let Some(comment) = comment_text(line) else {
            continue;
        };
        let mut tokens = comment.split_whitespace();
        if tokens.next() != Some(OPEN) {
            continue;
        }
        let line_no = index + 1;

        let Some(keyword) = tokens.next() else {
            return Err(DescriptorError::MalformedDirective {
                line: line_no,
                detail: "expected a format keyword or 'path <file>' after \\memorymap".into(),
            });
        };

        if EXTERNAL_KEYWORDS.contains(&keyword) {
            let path = tokens.collect::<Vec<_>>().join(" ");
            if path.is_empty() {
                return Err(DescriptorError::MalformedDirective {
                    line: line_no,
                    detail: format!("'{keyword}' needs a file name"),
                });
            }
            directives.push(Directive {
                line: line_no,
                payload: Payload::External {
                    path: PathBuf::from(path),
                },
            });
            continue;
        }

        let mut body = Vec::new();
        loop {
            let Some((_, next)) = lines.next() else {
                return Err(unterminated(line_no, "end of file"));
            };
            let Some(content) = comment_text(next) else {
                return Err(unterminated(line_no, "a non-comment line"));
            };
            if CLOSE.contains(&content.trim()) {
                break;
            }
            body.push(content);
        }

        directives.push(Directive {
            line: line_no,
            payload: Payload::Inline {
                keyword: keyword.to_string(),
                body: body.join("\n"),
            },
        });
    }

    Ok(directives)
}

fn unterminated(line: usize, found: &str) -> DescriptorError {
    DescriptorError::MalformedDirective {
        line,
        detail: format!("inline descriptor reaches {found} before \\endmemorymap"),
    }
}

/// Text of a line comment with its markers removed, or `None` for code lines.
fn comment_text(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("--")?;
    let rest = rest.strip_prefix('!').unwrap_or(rest);
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_toml_block() {
        let src = "\
library ieee;
-- \\memorymap toml
-- name = \"Map\"
-- [protocol]
--   addressMax = 255
-- \\endmemorymap
entity top is
";
        let found = scan_directives(src).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
        assert_eq!(
            found[0].payload,
            Payload::Inline {
                keyword: "toml".into(),
                body: "name = \"Map\"\n[protocol]\n  addressMax = 255".into(),
            }
        );
    }

    #[test]
    fn doc_comments_and_short_end_marker() {
        let src = "    --! \\memorymap json\n    --! {\"a\": 1}\n    --! \\end\n";
        let found = scan_directives(src).unwrap();
        assert_eq!(
            found[0].payload,
            Payload::Inline {
                keyword: "json".into(),
                body: "{\"a\": 1}".into(),
            }
        );
    }

    #[test]
    fn external_reference() {
        let src = "-- ordinary comment\n-- \\memorymap path example.toml\n--! \\memorymap external regs/map.json\n";
        let found = scan_directives(src).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].line, 2);
        assert_eq!(
            found[0].payload,
            Payload::External {
                path: PathBuf::from("example.toml")
            }
        );
        assert_eq!(
            found[1].payload,
            Payload::External {
                path: PathBuf::from("regs/map.json")
            }
        );
    }

    #[test]
    fn code_lines_are_ignored() {
        let src = "signal s : std_logic; -- \\memorymap toml\nconstant c : string := \"\\memorymap\";\n";
        assert!(scan_directives(src).unwrap().is_empty());
    }

    #[test]
    fn unterminated_block_is_malformed() {
        let src = "-- \\memorymap toml\n-- name = \"x\"\nentity top is\n";
        match scan_directives(src).unwrap_err() {
            DescriptorError::MalformedDirective { line, detail } => {
                assert_eq!(line, 1);
                assert!(detail.contains("non-comment"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(scan_directives("-- \\memorymap json\n-- {}\n").is_err());
    }

    #[test]
    fn bare_marker_is_malformed() {
        assert!(matches!(
            scan_directives("\n-- \\memorymap\n"),
            Err(DescriptorError::MalformedDirective { line: 2, .. })
        ));
        assert!(matches!(
            scan_directives("-- \\memorymap path\n"),
            Err(DescriptorError::MalformedDirective { line: 1, .. })
        ));
    }

    #[test]
    fn keyword_is_passed_through() {
        let found = scan_directives("-- \\memorymap yaml\n-- a: 1\n-- \\end\n").unwrap();
        assert!(matches!(&found[0].payload, Payload::Inline { keyword, .. } if keyword == "yaml"));
    }
}
