//! Documentation output for vhdldoc memory maps.
//!
//! Renders resolved layouts as Markdown, box-drawing text, or JSON pages and
//! drives multi-file builds with atomic, change-detecting writes.

pub mod build;
pub mod error;
pub mod format;
pub mod output;
pub mod page;

pub use build::{
    build, discover_sources, page_path, rebuild_file, BuildConfig, BuildSummary, CancelToken,
    FileOutcome, FileReport, SourceFile,
};
pub use error::RenderError;
pub use format::{field_rows, format_size, FieldRow, PageFormat};
pub use output::{content_hash, write_atomic, WriteOutcome};
pub use page::{box_table, renderer, IndexEntry, Renderer, SourcePage};
