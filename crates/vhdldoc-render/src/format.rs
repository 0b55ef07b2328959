//! Page formats and shared formatting helpers.

use std::fmt;

use vhdldoc_core::{LayoutModel, ResolvedField};

use crate::error::{RenderError, Result};

/// The output format for documentation pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageFormat {
    #[default]
    Markdown,
    Text,
    Json,
}

impl PageFormat {
    /// Parse a page format from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "markdown" | "md" => Ok(PageFormat::Markdown),
            "text" | "txt" => Ok(PageFormat::Text),
            "json" => Ok(PageFormat::Json),
            _ => Err(RenderError::UnknownFormat {
                name: s.to_string(),
            }),
        }
    }

    /// Display name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            PageFormat::Markdown => "markdown",
            PageFormat::Text => "text",
            PageFormat::Json => "json",
        }
    }

    /// File extension for pages in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            PageFormat::Markdown => "md",
            PageFormat::Text => "txt",
            PageFormat::Json => "json",
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Size of a field in addressable units of `data_min` bytes.
///
/// Byte-addressed maps show plain bytes; wider units show `units × width`.
pub fn format_size(units: u64, data_min: u8) -> String {
    if data_min <= 1 {
        format!("{units} B")
    } else {
        format!("{units} × {data_min} B")
    }
}

/// One table row per field below the root, depth-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    /// Dotted name, e.g. `Control.Enable`.
    pub name: String,
    pub address: String,
    pub size: String,
    pub access: String,
    pub field_type: String,
    pub value: String,
    pub range: String,
}

/// Flatten a layout into table rows.
pub fn field_rows(model: &LayoutModel) -> Vec<FieldRow> {
    let mut rows = Vec::new();
    for child in &model.root.children {
        push_rows(model, child, "", &mut rows);
    }
    rows
}

fn push_rows(model: &LayoutModel, field: &ResolvedField, prefix: &str, rows: &mut Vec<FieldRow>) {
    let name = if prefix.is_empty() {
        field.name.clone()
    } else {
        format!("{prefix}.{}", field.name)
    };
    rows.push(FieldRow {
        name: name.clone(),
        address: model.address(field.start),
        size: format_size(field.units, model.protocol.data_min),
        access: field.access.to_string(),
        field_type: field.field_type.to_string(),
        value: field.value.clone().unwrap_or_else(|| "-".to_string()),
        range: field.range.clone(),
    });
    for child in &field.children {
        push_rows(model, child, &name, rows);
    }
}

/// The protocol summary line shown above each table.
pub fn protocol_line(model: &LayoutModel) -> String {
    let protocol = &model.protocol;
    let mut line = String::new();
    if let Some(name) = &protocol.name {
        line.push_str(&format!("{name}, "));
    }
    line.push_str(&format!(
        "addressMax {}, dataMin {} {}",
        model.address(protocol.address_max),
        protocol.data_min,
        if protocol.data_min == 1 { "byte" } else { "bytes" },
    ));
    line
}
