//! `vhdldoc schema`: print the descriptor JSON Schema.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Render the descriptor schema with four-space indentation.
pub fn render() -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    vhdldoc_core::schema_document()
        .serialize(&mut ser)
        .context("serializing descriptor schema")?;
    String::from_utf8(buf).context("descriptor schema is not UTF-8")
}

/// Print the descriptor schema to stdout.
pub fn run() -> Result<()> {
    println!("{}", render()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_valid_json_with_four_space_indent() {
        let text = render().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(&parsed, vhdldoc_core::schema_document());
        assert!(text.lines().nth(1).unwrap().starts_with("    \""));
    }
}
