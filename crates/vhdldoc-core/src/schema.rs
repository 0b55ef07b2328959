//! Descriptor schema: static key tables, validation into the typed model,
//! and the exported JSON Schema document.
//!
//! Validation is a recursive descent over the generic value tree that mirrors
//! the model in [`crate::model`]. It stops at the first violation and reports
//! the path of the offending key together with the violated [`SchemaRule`].

use std::sync::OnceLock;

use serde_json::{json, Map, Value as Json};

use crate::error::{DescriptorError, Result, SchemaRule};
use crate::model::{Access, Field, FieldAccess, FieldType, MemoryMap, Protocol, Value};

/// Keys recognized on every field.
pub const FIELD_KEYS: &[&str] = &[
    "name", "address", "access", "type", "contains", "value", "unit", "min", "max",
];

/// Keys recognized on the protocol table.
pub const PROTOCOL_KEYS: &[&str] = &["name", "addressMax", "dataMin"];

/// The seven field type variant keys.
pub const TYPE_KEYS: &[&str] = &[
    "set", "string", "vector", "unsigned", "signed", "ufixed", "sfixed",
];

/// Allowed spellings of `access`.
pub const ACCESS_VALUES: &[&str] = &["r", "w", "rw"];

/// JSON Schema pattern for address strings; mirrors [`parse_address_literal`]
/// except for the u64 overflow check.
pub const ADDRESS_PATTERN: &str = "^(0[xX][0-9a-fA-F]+(_[0-9a-fA-F]+)*|0[bB][01]+(_[01]+)*|0[oO][0-7]+(_[0-7]+)*|[0-9]+(_[0-9]+)*)$";

/// Keys of the table form of a fixed-point type.
const FIXED_KEYS: &[&str] = &["high", "low"];

/// Options controlling validation strictness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Reject keys that are not part of the schema.
    pub strict: bool,
}

impl SchemaOptions {
    /// Options that reject unknown keys.
    pub fn strict() -> Self {
        SchemaOptions { strict: true }
    }
}

/// Validate a generic value tree and build the typed descriptor model.
pub fn validate(doc: &Json, options: &SchemaOptions) -> Result<MemoryMap> {
    let obj = expect_object(doc, "")?;

    let mut root_keys: Vec<&str> = vec!["protocol"];
    root_keys.extend_from_slice(FIELD_KEYS);
    check_unknown_keys(obj, "", &root_keys, options)?;

    let protocol = validate_protocol(required(obj, "", "protocol")?, options)?;
    let root = validate_field(obj, "", None, options)?;

    tracing::debug!(name = %root.name, children = root.contains.len(), "descriptor validated");
    Ok(MemoryMap { protocol, root })
}

fn validate_protocol(value: &Json, options: &SchemaOptions) -> Result<Protocol> {
    let path = "protocol";
    let obj = expect_object(value, path)?;
    check_unknown_keys(obj, path, PROTOCOL_KEYS, options)?;

    let name = optional(obj, "name")
        .map(|v| expect_string(v, &join(path, "name")).map(str::to_string))
        .transpose()?;

    let address_max = parse_address(
        required(obj, path, "addressMax")?,
        &join(path, "addressMax"),
    )?;

    let data_min_path = join(path, "dataMin");
    let data_min = required(obj, path, "dataMin")?
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| {
            DescriptorError::schema(
                &data_min_path,
                SchemaRule::WrongType,
                "expected an integer between 0 and 255",
            )
        })?;

    Ok(Protocol {
        name,
        address_max,
        data_min,
    })
}

fn validate_field(
    obj: &Map<String, Json>,
    path: &str,
    inherited: Option<Access>,
    options: &SchemaOptions,
) -> Result<Field> {
    let name = expect_string(required(obj, path, "name")?, &join(path, "name"))?.to_string();

    let address = optional(obj, "address")
        .map(|v| parse_address(v, &join(path, "address")))
        .transpose()?;

    let declared = optional(obj, "access")
        .map(|v| parse_access(v, &join(path, "access")))
        .transpose()?;
    let access = match (declared, inherited) {
        (Some(a), _) => FieldAccess::Declared(a),
        (None, Some(a)) => FieldAccess::Inherited(a),
        (None, None) => FieldAccess::Unspecified,
    };

    let field_type = parse_field_type(required(obj, path, "type")?, &join(path, "type"), options)?;

    let value = optional(obj, "value")
        .map(|v| parse_value(v, &join(path, "value")))
        .transpose()?;

    let unit = optional(obj, "unit")
        .map(|v| expect_string(v, &join(path, "unit")).map(str::to_string))
        .transpose()?;
    let min = optional(obj, "min")
        .map(|v| expect_number(v, &join(path, "min")))
        .transpose()?;
    let max = optional(obj, "max")
        .map(|v| expect_number(v, &join(path, "max")))
        .transpose()?;

    let child_access = access.access();
    let contains = match optional(obj, "contains") {
        None => Vec::new(),
        Some(Json::Object(child)) => {
            let child_path = join(path, "contains");
            check_unknown_keys(child, &child_path, FIELD_KEYS, options)?;
            vec![validate_field(child, &child_path, child_access, options)?]
        }
        Some(Json::Array(items)) => {
            let mut children = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let child_path = format!("{}[{i}]", join(path, "contains"));
                let child = expect_object(item, &child_path)?;
                check_unknown_keys(child, &child_path, FIELD_KEYS, options)?;
                children.push(validate_field(child, &child_path, child_access, options)?);
            }
            children
        }
        Some(other) => {
            return Err(DescriptorError::schema(
                &join(path, "contains"),
                SchemaRule::WrongType,
                format!("expected a field or a list of fields, found {}", kind_of(other)),
            ))
        }
    };

    Ok(Field {
        name,
        path: path.to_string(),
        address,
        access,
        field_type,
        contains,
        value,
        unit,
        min,
        max,
    })
}

fn parse_field_type(value: &Json, path: &str, options: &SchemaOptions) -> Result<FieldType> {
    let obj = match value {
        Json::String(s) if s == "set" => return Ok(FieldType::Set),
        Json::String(s) => {
            return Err(DescriptorError::schema(
                path,
                SchemaRule::EnumMismatch,
                format!("expected \"set\" or a single-variant type table, found \"{s}\""),
            ))
        }
        Json::Object(obj) => obj,
        other => {
            return Err(DescriptorError::schema(
                path,
                SchemaRule::WrongType,
                format!("expected a string or a table, found {}", kind_of(other)),
            ))
        }
    };

    check_unknown_keys(obj, path, TYPE_KEYS, options)?;

    let present: Vec<&str> = TYPE_KEYS
        .iter()
        .copied()
        .filter(|k| obj.contains_key(*k))
        .collect();

    let key = match present.as_slice() {
        [key] => *key,
        [] => {
            return Err(DescriptorError::schema(
                path,
                SchemaRule::MissingRequired,
                format!("expected exactly one of {}", TYPE_KEYS.join(", ")),
            ))
        }
        many => {
            return Err(DescriptorError::schema(
                path,
                SchemaRule::AmbiguousVariant,
                format!("type names {} variants: {}", many.len(), many.join(", ")),
            ))
        }
    };

    let payload = &obj[key];
    let payload_path = join(path, key);
    match key {
        "set" => match payload {
            Json::Bool(true) | Json::Null => Ok(FieldType::Set),
            Json::Object(m) if m.is_empty() => Ok(FieldType::Set),
            other => Err(DescriptorError::schema(
                &payload_path,
                SchemaRule::WrongType,
                format!("expected an empty table or true, found {}", kind_of(other)),
            )),
        },
        "string" => Ok(FieldType::String(parse_width(payload, &payload_path)?)),
        "vector" => Ok(FieldType::Vector(parse_width(payload, &payload_path)?)),
        "unsigned" => Ok(FieldType::Unsigned(parse_width(payload, &payload_path)?)),
        "signed" => Ok(FieldType::Signed(parse_width(payload, &payload_path)?)),
        "ufixed" => {
            let (high, low) = parse_fixed(payload, &payload_path, options)?;
            Ok(FieldType::UFixed { high, low })
        }
        _ => {
            let (high, low) = parse_fixed(payload, &payload_path, options)?;
            Ok(FieldType::SFixed { high, low })
        }
    }
}

fn parse_width(value: &Json, path: &str) -> Result<u64> {
    match value.as_u64() {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!("expected a positive integer length, found {}", describe(value)),
        )),
    }
}

fn parse_fixed(value: &Json, path: &str, options: &SchemaOptions) -> Result<(i64, i64)> {
    let bound = |v: &Json, p: &str| {
        v.as_i64().ok_or_else(|| {
            DescriptorError::schema(
                p,
                SchemaRule::WrongType,
                format!("expected an integer bit index, found {}", describe(v)),
            )
        })
    };

    match value {
        Json::Array(items) if items.len() == 2 => Ok((
            bound(&items[0], &format!("{path}[0]"))?,
            bound(&items[1], &format!("{path}[1]"))?,
        )),
        Json::Object(obj) => {
            check_unknown_keys(obj, path, FIXED_KEYS, options)?;
            let high = bound(required(obj, path, "high")?, &join(path, "high"))?;
            let low = bound(required(obj, path, "low")?, &join(path, "low"))?;
            Ok((high, low))
        }
        other => Err(DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!("expected [high, low] or {{high, low}}, found {}", describe(other)),
        )),
    }
}

fn parse_access(value: &Json, path: &str) -> Result<Access> {
    let s = expect_string(value, path)?;
    Access::parse(s).ok_or_else(|| {
        DescriptorError::schema(
            path,
            SchemaRule::EnumMismatch,
            format!("expected one of {}, found \"{s}\"", ACCESS_VALUES.join(", ")),
        )
    })
}

fn parse_value(value: &Json, path: &str) -> Result<Value> {
    match value {
        Json::String(s) => Ok(Value::String(s.clone())),
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(Value::Unsigned(u))
            } else if let Some(i) = n.as_i64() {
                Ok(Value::Signed(i))
            } else {
                n.as_f64().map(Value::Float).ok_or_else(|| {
                    DescriptorError::schema(path, SchemaRule::WrongType, "unrepresentable number")
                })
            }
        }
        other => Err(DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!("expected a string or a number, found {}", kind_of(other)),
        )),
    }
}

/// Canonicalize an address given as an integer or a numeric string.
fn parse_address(value: &Json, path: &str) -> Result<u64> {
    let parsed = match value {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => parse_address_literal(s),
        _ => None,
    };
    parsed.ok_or_else(|| {
        DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!(
                "expected a non-negative integer or numeric string (e.g. \"0xFFFF\"), found {}",
                describe(value)
            ),
        )
    })
}

/// Parse a numeric address literal.
///
/// Accepts decimal digits or a `0x`, `0b`, `0o` prefix (either case), with
/// single underscores allowed between digits: `"0xFFFF_0000"`.
pub fn parse_address_literal(s: &str) -> Option<u64> {
    let (digits, radix) = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (rest, 16)
    } else if let Some(rest) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        (rest, 2)
    } else if let Some(rest) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        (rest, 8)
    } else {
        (s, 10)
    };

    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') || digits.contains("__")
    {
        return None;
    }
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    if !cleaned.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(&cleaned, radix).ok()
}

// ── helpers ─────────────────────────────────────────────────────────────────

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Look up an optional key; explicit `null` counts as absent.
fn optional<'v>(obj: &'v Map<String, Json>, key: &str) -> Option<&'v Json> {
    match obj.get(key) {
        None | Some(Json::Null) => None,
        Some(v) => Some(v),
    }
}

fn required<'v>(obj: &'v Map<String, Json>, path: &str, key: &str) -> Result<&'v Json> {
    obj.get(key).ok_or_else(|| {
        DescriptorError::schema(
            &join(path, key),
            SchemaRule::MissingRequired,
            format!("missing required key '{key}'"),
        )
    })
}

fn check_unknown_keys(
    obj: &Map<String, Json>,
    path: &str,
    allowed: &[&str],
    options: &SchemaOptions,
) -> Result<()> {
    if !options.strict {
        return Ok(());
    }
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(DescriptorError::schema(
            &join(path, key),
            SchemaRule::UnknownField,
            format!("unknown key '{key}'"),
        )),
        None => Ok(()),
    }
}

fn expect_object<'v>(value: &'v Json, path: &str) -> Result<&'v Map<String, Json>> {
    value.as_object().ok_or_else(|| {
        DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!("expected a table, found {}", kind_of(value)),
        )
    })
}

fn expect_string<'v>(value: &'v Json, path: &str) -> Result<&'v str> {
    value.as_str().ok_or_else(|| {
        DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!("expected a string, found {}", kind_of(value)),
        )
    })
}

fn expect_number(value: &Json, path: &str) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        DescriptorError::schema(
            path,
            SchemaRule::WrongType,
            format!("expected a number, found {}", kind_of(value)),
        )
    })
}

fn kind_of(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "a list",
        Json::Object(_) => "a table",
    }
}

fn describe(value: &Json) -> String {
    match value {
        Json::Number(n) => n.to_string(),
        Json::String(s) => format!("\"{s}\""),
        other => kind_of(other).to_string(),
    }
}

// ── exported schema ─────────────────────────────────────────────────────────

/// The descriptor schema as a JSON Schema document.
///
/// Built on first use and shared for the life of the process.
pub fn schema_document() -> &'static Json {
    static SCHEMA: OnceLock<Json> = OnceLock::new();
    SCHEMA.get_or_init(build_schema_document)
}

fn build_schema_document() -> Json {
    let fixed = json!({
        "oneOf": [
            {
                "type": "array",
                "items": { "type": "integer", "format": "int64" },
                "minItems": 2,
                "maxItems": 2,
                "description": "[high, low] bit indices"
            },
            {
                "type": "object",
                "required": ["high", "low"],
                "properties": {
                    "high": { "type": "integer", "format": "int64" },
                    "low": { "type": "integer", "format": "int64" }
                }
            }
        ]
    });
    let width = json!({ "type": "integer", "format": "uint64", "minimum": 1 });
    let variant = |key: &str, payload: &Json| {
        json!({
            "type": "object",
            "required": [key],
            "properties": { key: payload },
            "additionalProperties": false
        })
    };

    let field_properties = json!({
        "name": { "type": "string" },
        "address": {
            "anyOf": [{ "$ref": "#/$defs/Address" }, { "type": "null" }],
            "description": "Memory address in addressable units. Omit to pack the field directly after its previous sibling."
        },
        "access": {
            "anyOf": [{ "$ref": "#/$defs/Access" }, { "type": "null" }],
            "description": "Register access permission. Inherited from the nearest ancestor when omitted."
        },
        "type": { "$ref": "#/$defs/FieldType" },
        "contains": {
            "anyOf": [
                { "$ref": "#/$defs/Field" },
                { "type": "array", "items": { "$ref": "#/$defs/Field" } },
                { "type": "null" }
            ],
            "description": "A single field or an ordered list of fields."
        },
        "value": {
            "anyOf": [{ "$ref": "#/$defs/Value" }, { "type": "null" }],
            "description": "Default value; must be representable under the field type."
        },
        "unit": { "type": ["string", "null"], "description": "Unit of measurement of a numeric type." },
        "min": { "type": ["number", "null"], "description": "Minimum allowed value of a numeric type." },
        "max": { "type": ["number", "null"], "description": "Maximum allowed value of a numeric type." }
    });

    let mut root_properties = field_properties.clone();
    if let Some(props) = root_properties.as_object_mut() {
        props.insert("protocol".into(), json!({ "$ref": "#/$defs/Protocol" }));
    }

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "MemoryMap",
        "type": "object",
        "required": ["protocol", "name", "type"],
        "properties": root_properties,
        "$defs": {
            "Protocol": {
                "type": "object",
                "required": ["addressMax", "dataMin"],
                "properties": {
                    "name": { "type": ["string", "null"], "description": "An optional name for the protocol." },
                    "addressMax": {
                        "$ref": "#/$defs/Address",
                        "description": "Maximum address in terms of dataMin. Accepts '0x' prefixed hex strings with underscores between digits."
                    },
                    "dataMin": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": 255,
                        "description": "Minimum addressable data size in bytes."
                    }
                }
            },
            "Address": {
                "anyOf": [
                    { "type": "integer", "format": "uint64", "minimum": 0 },
                    { "type": "string", "pattern": ADDRESS_PATTERN }
                ]
            },
            "Access": { "type": "string", "enum": ACCESS_VALUES },
            "FieldType": {
                "oneOf": [
                    { "type": "string", "enum": ["set"] },
                    variant("set", &json!({ "type": ["object", "boolean", "null"] })),
                    variant("string", &width),
                    variant("vector", &width),
                    variant("unsigned", &width),
                    variant("signed", &width),
                    variant("ufixed", &fixed),
                    variant("sfixed", &fixed)
                ]
            },
            "Field": {
                "type": "object",
                "required": ["name", "type"],
                "properties": field_properties
            },
            "Value": {
                "anyOf": [
                    { "type": "string" },
                    { "type": "integer", "format": "uint64" },
                    { "type": "integer", "format": "int64" },
                    { "type": "number", "format": "double" }
                ]
            }
        }
    })
}
