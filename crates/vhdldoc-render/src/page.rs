//! Page renderers: Markdown, box-drawing text, and JSON.

use serde_json::json;
use vhdldoc_core::LayoutModel;

use crate::error::Result;
use crate::format::{field_rows, protocol_line, FieldRow, PageFormat};

const COLUMNS: [&str; 7] = ["Name", "Address", "Size", "Access", "Type", "Value", "Range"];

/// The descriptors found in one source file.
pub struct SourcePage<'a> {
    /// Source path as shown in the page heading.
    pub source: &'a str,
    pub models: &'a [LayoutModel],
}

/// One line of the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub source: String,
    /// Page path relative to the output directory.
    pub page: String,
}

/// Trait for all page renderers.
pub trait Renderer {
    /// Render the page for one source file.
    fn render(&self, page: &SourcePage<'_>) -> Result<String>;

    /// Render the index of all pages.
    fn render_index(&self, entries: &[IndexEntry]) -> Result<String>;

    /// The format this renderer produces.
    fn format(&self) -> PageFormat;
}

/// Markdown tables.
pub struct MarkdownRenderer;

/// Box-drawing tables for terminals.
pub struct TextRenderer;

/// Serialized layout models.
pub struct JsonRenderer;

/// The renderer for a page format.
pub fn renderer(format: PageFormat) -> &'static dyn Renderer {
    match format {
        PageFormat::Markdown => &MarkdownRenderer,
        PageFormat::Text => &TextRenderer,
        PageFormat::Json => &JsonRenderer,
    }
}

fn cells(row: &FieldRow) -> [&str; 7] {
    [
        row.name.as_str(),
        row.address.as_str(),
        row.size.as_str(),
        row.access.as_str(),
        row.field_type.as_str(),
        row.value.as_str(),
        row.range.as_str(),
    ]
}

impl Renderer for MarkdownRenderer {
    fn format(&self) -> PageFormat {
        PageFormat::Markdown
    }

    fn render(&self, page: &SourcePage<'_>) -> Result<String> {
        let mut text = format!("# {}\n", page.source);
        for model in page.models {
            text.push_str(&format!("\n## {}\n\n", model.name));
            text.push_str(&format!("_{}_\n\n", protocol_line(model)));

            let rows = field_rows(model);
            if rows.is_empty() {
                text.push_str("No fields defined in this memory map.\n");
                continue;
            }
            text.push_str(&format!("| {} |\n", COLUMNS.join(" | ")));
            text.push_str(&format!("|{}\n", "---|".repeat(COLUMNS.len())));
            for row in &rows {
                let escaped: Vec<String> = cells(row).iter().map(|c| escape_markdown(c)).collect();
                text.push_str(&format!("| {} |\n", escaped.join(" | ")));
            }
        }
        Ok(text)
    }

    fn render_index(&self, entries: &[IndexEntry]) -> Result<String> {
        let mut text = String::from("# Memory maps\n\n");
        if entries.is_empty() {
            text.push_str("No memory maps documented.\n");
        }
        for entry in entries {
            text.push_str(&format!("- [{}]({})\n", entry.source, entry.page));
        }
        Ok(text)
    }
}

fn escape_markdown(cell: &str) -> String {
    cell.replace('|', "\\|")
}

impl Renderer for TextRenderer {
    fn format(&self) -> PageFormat {
        PageFormat::Text
    }

    fn render(&self, page: &SourcePage<'_>) -> Result<String> {
        let mut text = format!("=== {} ===\n", page.source);
        for model in page.models {
            text.push_str(&format!("\n{} ({})\n", model.name, protocol_line(model)));
            let rows = field_rows(model);
            if rows.is_empty() {
                text.push_str("No fields defined in this memory map.\n");
                continue;
            }
            let body: Vec<[&str; 7]> = rows.iter().map(cells).collect();
            text.push_str(&box_table(&COLUMNS, &body));
            text.push_str(&format!(
                "\n{} fields, {} units\n",
                model.field_count(),
                model.root.units
            ));
        }
        Ok(text)
    }

    fn render_index(&self, entries: &[IndexEntry]) -> Result<String> {
        let mut text = String::from("=== Memory maps ===\n\n");
        if entries.is_empty() {
            text.push_str("No memory maps documented.\n");
        }
        let width = entries.iter().map(|e| e.source.chars().count()).max().unwrap_or(0);
        for entry in entries {
            text.push_str(&format!("{:<width$}  {}\n", entry.source, entry.page));
        }
        Ok(text)
    }
}

/// Render rows as a box-drawing table.
pub fn box_table<const N: usize>(headers: &[&str; N], rows: &[[&str; N]]) -> String {
    let mut widths = headers.map(|h| h.chars().count());
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let rule = |left: char, mid: char, right: char| {
        let parts: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{left}{}{right}\n", parts.join(mid.to_string().as_str()))
    };
    let line = |row: &[&str; N]| {
        let parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!(" {cell:<w$} "))
            .collect();
        format!("│{}│\n", parts.join("│"))
    };

    let mut text = rule('┌', '┬', '┐');
    text.push_str(&line(headers));
    text.push_str(&rule('├', '┼', '┤'));
    for row in rows {
        text.push_str(&line(row));
    }
    text.push_str(&rule('└', '┴', '┘'));
    text
}

impl Renderer for JsonRenderer {
    fn format(&self) -> PageFormat {
        PageFormat::Json
    }

    fn render(&self, page: &SourcePage<'_>) -> Result<String> {
        let data = json!({
            "source": page.source,
            "descriptors": page.models,
        });
        Ok(serde_json::to_string_pretty(&data)? + "\n")
    }

    fn render_index(&self, entries: &[IndexEntry]) -> Result<String> {
        let pages: Vec<_> = entries
            .iter()
            .map(|e| json!({"source": e.source, "page": e.page}))
            .collect();
        Ok(serde_json::to_string_pretty(&json!({ "pages": pages }))? + "\n")
    }
}
