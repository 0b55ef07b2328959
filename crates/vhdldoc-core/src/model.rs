//! Descriptor model: the typed form of a validated memory map.
//!
//! Built fresh for every resolution by [`crate::schema::validate`] and
//! immutable afterwards.

use std::fmt;

use serde::Serialize;

/// Bus-level addressing parameters shared by a whole descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Protocol {
    /// Optional protocol name (e.g., "AXI4-Lite").
    pub name: Option<String>,
    /// Inclusive upper bound of the address range, in addressable units.
    pub address_max: u64,
    /// Size of one addressable unit in bytes.
    pub data_min: u8,
}

/// Register access permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Access {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Access {
    /// Parse the serialized spelling (`r`, `w`, `rw`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "r" => Some(Access::Read),
            "w" => Some(Access::Write),
            "rw" => Some(Access::ReadWrite),
            _ => None,
        }
    }

    /// Serialized spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "r",
            Access::Write => "w",
            Access::ReadWrite => "rw",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a field's access permission came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "access", rename_all = "lowercase")]
pub enum FieldAccess {
    /// Stated on the field itself.
    Declared(Access),
    /// Taken from the nearest ancestor that states one.
    Inherited(Access),
    /// Neither the field nor any ancestor states one.
    Unspecified,
}

impl FieldAccess {
    /// The effective permission, if any.
    pub fn access(&self) -> Option<Access> {
        match self {
            FieldAccess::Declared(a) | FieldAccess::Inherited(a) => Some(*a),
            FieldAccess::Unspecified => None,
        }
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.access() {
            Some(a) => write!(f, "{a}"),
            None => f.write_str("unspecified"),
        }
    }
}

/// The closed set of field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Pure container; no intrinsic size.
    Set,
    /// ASCII string of the given length in characters.
    String(u64),
    /// Bit vector of the given length in bits.
    Vector(u64),
    /// Unsigned integer of the given length in bits.
    Unsigned(u64),
    /// Two's-complement integer of the given length in bits.
    Signed(u64),
    /// Unsigned fixed point, bits `high downto low`.
    UFixed { high: i64, low: i64 },
    /// Signed fixed point, bits `high downto low`.
    SFixed { high: i64, low: i64 },
}

impl FieldType {
    /// Serialized variant key.
    pub fn key(&self) -> &'static str {
        match self {
            FieldType::Set => "set",
            FieldType::String(_) => "string",
            FieldType::Vector(_) => "vector",
            FieldType::Unsigned(_) => "unsigned",
            FieldType::Signed(_) => "signed",
            FieldType::UFixed { .. } => "ufixed",
            FieldType::SFixed { .. } => "sfixed",
        }
    }

    /// Whether this type carries a numeric domain (`min`/`max` apply).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Unsigned(_)
                | FieldType::Signed(_)
                | FieldType::UFixed { .. }
                | FieldType::SFixed { .. }
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Set => f.write_str("set"),
            FieldType::String(n) => write!(f, "string(1 to {n})"),
            FieldType::Vector(b) => write!(f, "std_logic_vector({} downto 0)", b.saturating_sub(1)),
            FieldType::Unsigned(b) => write!(f, "unsigned({} downto 0)", b.saturating_sub(1)),
            FieldType::Signed(b) => write!(f, "signed({} downto 0)", b.saturating_sub(1)),
            FieldType::UFixed { high, low } => write!(f, "ufixed({high} downto {low})"),
            FieldType::SFixed { high, low } => write!(f, "sfixed({high} downto {low})"),
        }
    }
}

/// A declared default value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Unsigned(u) => write!(f, "{u}"),
            Value::Signed(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
        }
    }
}

/// A named unit within a memory map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Path of this field in the descriptor (empty for the root).
    pub path: String,
    /// Explicit address; `None` means auto-assign.
    pub address: Option<u64>,
    /// Access permission after inheritance.
    pub access: FieldAccess,
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Child fields in document order.
    pub contains: Vec<Field>,
    /// Declared default value.
    pub value: Option<Value>,
    /// Unit of measurement for numeric types.
    pub unit: Option<String>,
    /// Declared minimum for numeric types.
    pub min: Option<f64>,
    /// Declared maximum for numeric types.
    pub max: Option<f64>,
}

/// The descriptor root: a field plus its protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryMap {
    pub protocol: Protocol,
    pub root: Field,
}
