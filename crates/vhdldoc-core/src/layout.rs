//! Layout resolution: addresses, sizes, and conflict checks.
//!
//! Addresses and sizes are counted in addressable units of `dataMin` bytes.
//! Addresses are assigned top-down in document order; set sizes are
//! aggregated bottom-up from their children.

use serde::Serialize;

use crate::encode::{self, Encoded};
use crate::error::{DescriptorError, LayoutRule, Result};
use crate::model::{Field, FieldAccess, FieldType, MemoryMap, Protocol};

/// A fully resolved memory map, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutModel {
    /// Name of the root field.
    pub name: String,
    pub protocol: Protocol,
    pub root: ResolvedField,
}

impl LayoutModel {
    /// Number of fields below the root.
    pub fn field_count(&self) -> usize {
        self.root.walk().count() - 1
    }

    /// Canonical display of an address in this map.
    pub fn address(&self, address: u64) -> String {
        encode::format_address(address, self.protocol.address_max)
    }
}

/// A field with its concrete placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedField {
    pub name: String,
    /// Descriptor path, used in diagnostics.
    pub path: String,
    /// Absolute start address.
    pub start: u64,
    /// Occupied addressable units.
    pub units: u64,
    pub access: FieldAccess,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Canonical value display.
    pub value: Option<String>,
    /// Values the field can hold (address range for sets).
    pub range: String,
    pub unit: Option<String>,
    pub children: Vec<ResolvedField>,
}

impl ResolvedField {
    /// Address of the last occupied unit, or `None` when the field is empty.
    pub fn end(&self) -> Option<u64> {
        if self.units == 0 {
            None
        } else {
            Some(self.start + (self.units - 1))
        }
    }

    /// Depth-first pre-order traversal, starting with this field.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// One past the last occupied unit.
    fn limit(&self) -> u64 {
        self.start + self.units
    }
}

/// Iterator returned by [`ResolvedField::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a ResolvedField>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a ResolvedField;

    fn next(&mut self) -> Option<Self::Item> {
        let field = self.stack.pop()?;
        self.stack.extend(field.children.iter().rev());
        Some(field)
    }
}

/// Resolve a validated memory map into a layout.
pub fn resolve_layout(map: &MemoryMap) -> Result<LayoutModel> {
    let protocol = &map.protocol;
    if protocol.data_min == 0 {
        return Err(DescriptorError::layout(
            "protocol.dataMin",
            LayoutRule::InvalidDataMin,
            "dataMin must be at least 1 byte",
        ));
    }

    let start = map.root.address.unwrap_or(0);
    let root = resolve_field(&map.root, start, protocol)?;

    tracing::debug!(
        name = %root.name,
        units = root.units,
        fields = root.walk().count(),
        "resolved layout"
    );

    Ok(LayoutModel {
        name: map.root.name.clone(),
        protocol: protocol.clone(),
        root,
    })
}

/// Occupied units for a non-set type.
pub fn unit_count(field_type: &FieldType, data_min: u8) -> u64 {
    let unit_bytes = u64::from(data_min.max(1));
    match *field_type {
        FieldType::Set => 0,
        FieldType::String(chars) => chars.div_ceil(unit_bytes),
        FieldType::Vector(bits) | FieldType::Unsigned(bits) | FieldType::Signed(bits) => {
            bits.div_ceil(8 * unit_bytes)
        }
        FieldType::UFixed { high, low } | FieldType::SFixed { high, low } => {
            fixed_width(high, low).div_ceil(8 * unit_bytes)
        }
    }
}

fn fixed_width(high: i64, low: i64) -> u64 {
    let bits = i128::from(high) - i128::from(low) + 1;
    u64::try_from(bits.max(0)).unwrap_or(u64::MAX)
}

/// Resolve one field placed at `start`, recursing into its children.
///
/// A `Set` occupies the envelope of its children: from its own start to the
/// furthest child end, so gaps between children count towards its size.
/// Sized fields are bounds-checked against `addressMax` before their value
/// is encoded; sets are checked once their children are placed.
fn resolve_field(field: &Field, start: u64, protocol: &Protocol) -> Result<ResolvedField> {
    let path = field.path.as_str();

    // Fixed-point bounds
    if let FieldType::UFixed { high, low } | FieldType::SFixed { high, low } = field.field_type {
        if high < low {
            return Err(DescriptorError::layout(
                path,
                LayoutRule::InvalidFixedRange,
                format!("high bit {high} is below low bit {low}"),
            ));
        }
    }

    let is_set = field.field_type == FieldType::Set;
    let sized = if is_set {
        None
    } else {
        let units = unit_count(&field.field_type, protocol.data_min);
        Some((units, check_bound(field, start, units, protocol)?))
    };

    // Value against type
    let Encoded { value, range } = encode::encode_field(field)?;

    // Children, in document order
    let mut children = Vec::with_capacity(field.contains.len());
    let mut cursor = start;
    for child in &field.contains {
        let child_start = child.address.unwrap_or(cursor);
        let resolved = resolve_field(child, child_start, protocol)?;
        cursor = resolved.limit();
        children.push(resolved);
    }
    if !children.is_empty() {
        tracing::debug!(
            path = %crate::error::display_path(path),
            children = children.len(),
            "placed field group"
        );
    }

    check_overlap(&children)?;

    let (units, range) = match sized {
        Some((units, limit)) => {
            check_containment(field, start, units, limit, &children, protocol)?;
            (units, range)
        }
        None => {
            let units = children
                .iter()
                .map(ResolvedField::limit)
                .max()
                .unwrap_or(start)
                .saturating_sub(start);
            check_bound(field, start, units, protocol)?;
            (units, encode::set_range(start, units, protocol.address_max))
        }
    };

    Ok(ResolvedField {
        name: field.name.clone(),
        path: field.path.clone(),
        start,
        units,
        access: field.access,
        field_type: field.field_type,
        value,
        range,
        unit: field.unit.clone(),
        children,
    })
}

/// Check that `units` units from `start` stay within `addressMax`; returns the limit.
///
/// An empty field must still start at or below `addressMax`.
fn check_bound(field: &Field, start: u64, units: u64, protocol: &Protocol) -> Result<u64> {
    let exceeds = |detail: String| {
        DescriptorError::layout(&field.path, LayoutRule::ExceedsAddressMax, detail)
    };
    let max = encode::format_address(protocol.address_max, protocol.address_max);
    let limit = start.checked_add(units).ok_or_else(|| {
        exceeds(format!(
            "{units} units starting at 0x{start:X} overflow the address space"
        ))
    })?;
    if units == 0 {
        if start > protocol.address_max {
            return Err(exceeds(format!(
                "'{}' starts at 0x{start:X}, beyond addressMax {max}",
                field.name
            )));
        }
    } else if limit - 1 > protocol.address_max {
        return Err(exceeds(format!(
            "'{}' ends at 0x{:X}, beyond addressMax {max}",
            field.name,
            limit - 1
        )));
    }
    Ok(limit)
}

/// Children of a non-set field must lie within `[start, limit)`.
fn check_containment(
    field: &Field,
    start: u64,
    units: u64,
    limit: u64,
    children: &[ResolvedField],
    protocol: &Protocol,
) -> Result<()> {
    for child in children {
        let inside = if child.units == 0 {
            child.start >= start && child.start <= limit
        } else {
            child.start >= start && child.limit() <= limit
        };
        if !inside {
            return Err(DescriptorError::layout(
                &child.path,
                LayoutRule::OutOfParentRange,
                format!(
                    "'{}' at {} ({} units) lies outside parent '{}' at {} ({} units)",
                    child.name,
                    encode::format_address(child.start, protocol.address_max),
                    child.units,
                    field.name,
                    encode::format_address(start, protocol.address_max),
                    units,
                ),
            ));
        }
    }
    Ok(())
}

/// Pairwise sibling overlap check; the later-declared sibling is cited.
fn check_overlap(siblings: &[ResolvedField]) -> Result<()> {
    for j in 1..siblings.len() {
        let b = &siblings[j];
        if b.units == 0 {
            continue;
        }
        for a in &siblings[..j] {
            if a.units == 0 {
                continue;
            }
            if a.start < b.limit() && b.start < a.limit() {
                return Err(DescriptorError::layout(
                    &b.path,
                    LayoutRule::Overlap,
                    format!(
                        "'{}' (0x{:X}..0x{:X}) overlaps '{}' (0x{:X}..0x{:X})",
                        b.name,
                        b.start,
                        b.limit(),
                        a.name,
                        a.start,
                        a.limit()
                    ),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Access;
    use crate::schema::{validate, SchemaOptions};
    use serde_json::json;

    fn layout(doc: serde_json::Value) -> Result<LayoutModel> {
        let map = validate(&doc, &SchemaOptions::default())?;
        resolve_layout(&map)
    }

    fn rule(result: Result<LayoutModel>) -> Option<LayoutRule> {
        result.err().and_then(|e| e.layout_rule())
    }

    fn root(data_min: u64, contains: serde_json::Value) -> serde_json::Value {
        json!({
            "protocol": {"addressMax": "0xFFFF", "dataMin": data_min},
            "name": "Map",
            "type": "set",
            "contains": contains,
        })
    }

    #[test]
    fn end_to_end_example() {
        let model = layout(root(
            1,
            json!([{
                "name": "Description String",
                "address": "0x0000",
                "value": "My Great Memory Map",
                "access": "r",
                "type": {"string": 20}
            }]),
        ))
        .unwrap();

        assert_eq!(model.field_count(), 1);
        let field = &model.root.children[0];
        assert_eq!(field.start, 0);
        assert_eq!(field.units, 20);
        assert_eq!(field.end(), Some(0x13));
        assert_eq!(field.access, FieldAccess::Declared(Access::Read));
        assert_eq!(model.address(field.start), "0x0000");
        assert_eq!(model.root.range, "0x0000 to 0x0013");
    }

    #[test]
    fn unit_sizes_follow_data_min() {
        assert_eq!(unit_count(&FieldType::String(20), 4), 5);
        assert_eq!(unit_count(&FieldType::Unsigned(32), 4), 1);
        assert_eq!(unit_count(&FieldType::Unsigned(33), 4), 2);
        assert_eq!(unit_count(&FieldType::Vector(1), 1), 1);
        assert_eq!(unit_count(&FieldType::SFixed { high: 11, low: -4 }, 1), 2);
        assert_eq!(unit_count(&FieldType::Set, 1), 0);
    }

    #[test]
    fn auto_addresses_follow_previous_sibling() {
        let model = layout(root(
            1,
            json!([
                {"name": "a", "type": {"unsigned": 16}},
                {"name": "b", "address": 8, "type": {"unsigned": 8}},
                {"name": "c", "type": {"string": 3}},
            ]),
        ))
        .unwrap();
        let starts: Vec<u64> = model.root.children.iter().map(|f| f.start).collect();
        assert_eq!(starts, vec![0, 8, 9]);
        assert_eq!(model.root.units, 12);
    }

    #[test]
    fn nested_sets_are_address_scoped() {
        let model = layout(root(
            1,
            json!([
                {"name": "ctrl", "address": "0x10", "type": "set", "contains": [
                    {"name": "enable", "type": {"vector": 8}},
                    {"name": "mode", "type": {"unsigned": 8}},
                ]},
                {"name": "status", "type": {"unsigned": 8}},
            ]),
        ))
        .unwrap();
        let ctrl = &model.root.children[0];
        assert_eq!(ctrl.children[1].start, 0x11);
        assert_eq!(ctrl.units, 2);
        assert_eq!(model.root.children[1].start, 0x12);
        let names: Vec<&str> = model.root.walk().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Map", "ctrl", "enable", "mode", "status"]);
    }

    #[test]
    fn overlap_cites_later_field() {
        let err = layout(root(
            1,
            json!([
                {"name": "first", "address": 0, "type": {"unsigned": 32}},
                {"name": "second", "address": 2, "type": {"unsigned": 8}},
            ]),
        ))
        .unwrap_err();
        assert_eq!(err.layout_rule(), Some(LayoutRule::Overlap));
        match err {
            DescriptorError::Layout { path, detail, .. } => {
                assert_eq!(path, "contains[1]");
                assert!(detail.starts_with("'second'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_fields_never_overlap() {
        let model = layout(root(
            1,
            json!([
                {"name": "group", "address": 4, "type": "set"},
                {"name": "reg", "address": 4, "type": {"unsigned": 8}},
            ]),
        ))
        .unwrap();
        assert_eq!(model.root.children[0].end(), None);
    }

    #[test]
    fn child_outside_register_is_rejected() {
        let result = layout(root(
            1,
            json!([{
                "name": "reg", "address": 0, "type": {"unsigned": 16},
                "contains": {"name": "bit", "address": 4, "type": {"vector": 1}}
            }]),
        ));
        assert_eq!(rule(result), Some(LayoutRule::OutOfParentRange));
    }

    #[test]
    fn set_parents_do_not_constrain() {
        let result = layout(root(
            1,
            json!([{
                "name": "group", "address": 8, "type": "set",
                "contains": {"name": "far", "address": 0, "type": {"unsigned": 8}}
            }]),
        ));
        assert!(result.is_ok());
    }

    #[test]
    fn address_max_is_inclusive() {
        let doc = |address: u64| {
            json!({
                "protocol": {"addressMax": 255, "dataMin": 1},
                "name": "Map", "type": "set",
                "contains": {"name": "r", "address": address, "type": {"unsigned": 16}}
            })
        };
        assert!(layout(doc(254)).is_ok());
        assert_eq!(rule(layout(doc(255))), Some(LayoutRule::ExceedsAddressMax));
    }

    #[test]
    fn address_overflow_is_reported() {
        let result = layout(json!({
            "protocol": {"addressMax": "0xFFFF_FFFF_FFFF_FFFF", "dataMin": 1},
            "name": "Map", "type": "set",
            "contains": {"name": "r", "address": "0xFFFF_FFFF_FFFF_FFFF", "type": {"unsigned": 16}}
        }));
        assert_eq!(rule(result), Some(LayoutRule::ExceedsAddressMax));
    }

    #[test]
    fn invalid_fixed_range() {
        let result = layout(root(
            1,
            json!([{"name": "gain", "type": {"sfixed": [-4, 3]}}]),
        ));
        assert_eq!(rule(result), Some(LayoutRule::InvalidFixedRange));
    }

    #[test]
    fn zero_data_min_is_rejected() {
        let result = layout(root(0, json!([])));
        assert_eq!(rule(result), Some(LayoutRule::InvalidDataMin));
    }

    #[test]
    fn value_mismatch_propagates() {
        let err = layout(root(
            1,
            json!([{"name": "r", "type": {"unsigned": 4}, "value": 16}]),
        ))
        .unwrap_err();
        assert!(matches!(err, DescriptorError::ValueTypeMismatch { .. }));
    }

    #[test]
    fn model_serializes() {
        let model = layout(root(
            1,
            json!([{"name": "r", "type": {"unsigned": 8}, "value": 10}]),
        ))
        .unwrap();
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["protocol"]["addressMax"], 0xFFFF);
        assert_eq!(json["root"]["children"][0]["value"], "0x0A");
        assert_eq!(json["root"]["children"][0]["type"], json!({"unsigned": 8}));
    }

    #[test]
    fn empty_set_past_address_max_is_rejected() {
        let doc = |address: u64| {
            json!({
                "protocol": {"addressMax": 255, "dataMin": 1},
                "name": "Map", "type": "set",
                "contains": {"name": "spare", "address": address, "type": "set"}
            })
        };
        assert!(layout(doc(255)).is_ok());
        assert_eq!(rule(layout(doc(256))), Some(LayoutRule::ExceedsAddressMax));
    }

    #[test]
    fn oversized_register_fails_before_encoding() {
        let result = layout(json!({
            "protocol": {"addressMax": "0xFFFF", "dataMin": 1},
            "name": "Map", "type": "set",
            "contains": {"name": "wide", "type": {"unsigned": 400_000_000u64}, "value": 1}
        }));
        assert_eq!(rule(result), Some(LayoutRule::ExceedsAddressMax));
    }

    #[test]
    fn very_wide_register_within_bounds() {
        let model = layout(json!({
            "protocol": {"addressMax": "0xFFFF", "dataMin": 1},
            "name": "Map", "type": "set",
            "contains": {"name": "wide", "type": {"unsigned": 300_000u64}, "value": 1}
        }))
        .unwrap();
        let wide = &model.root.children[0];
        assert_eq!(wide.units, 37_500);
        assert_eq!(wide.end(), Some(0x927B));
        let value = wide.value.as_deref().unwrap();
        assert!(value.starts_with("0x"));
        assert!(value.ends_with("01"));
    }
}
