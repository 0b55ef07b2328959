//! Memory map descriptor core for vhdldoc.
//!
//! A descriptor travels through a fixed pipeline:
//! - **Scanner:** finds `\memorymap` directives in VHDL comments
//! - **Source resolver:** inline body or external file, plus its format
//! - **Format parser:** TOML or JSON into one ordered value tree
//! - **Schema validator:** value tree into a typed [`MemoryMap`]
//! - **Layout resolver:** addresses, sizes, and conflict checks into a [`LayoutModel`]
//!
//! The value/type encoder is invoked by the layout resolver for every field.

pub mod encode;
pub mod error;
pub mod format;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod scan;
pub mod schema;
pub mod source;

pub use encode::{encode_field, format_address, Encoded};
pub use error::{DescriptorError, LayoutRule, LocatedError, Result, SchemaRule};
pub use format::{parse_document, Format};
pub use layout::{resolve_layout, LayoutModel, ResolvedField};
pub use model::{Access, Field, FieldAccess, FieldType, MemoryMap, Protocol, Value};
pub use pipeline::{resolve_descriptor, resolve_source_file, SourceReport};
pub use scan::{scan_directives, Directive, Payload};
pub use schema::{schema_document, validate, SchemaOptions};
pub use source::{resolve_source, ResolvedSource};
