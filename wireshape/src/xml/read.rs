//! XML response walking.

use indexmap::IndexMap;
use wireshape_core::{MapShape, Shape, ShapeKind, StructureShape, UnmarshallingError, Value};

use super::node::XmlNode;
use crate::text::scalar_from_text;

/// Convert an element into a value guided by the shape.
///
/// Elements the shape does not name are skipped; absent members stay
/// absent rather than erroring.
pub(crate) fn value_from_node(
    node: &XmlNode,
    shape: &Shape,
    path: &str,
) -> Result<Value, UnmarshallingError> {
    match shape.kind() {
        ShapeKind::Scalar(kind) => scalar_from_text(&node.text, *kind, path),
        ShapeKind::Structure(structure) => structure_from_node(node, structure, path),
        ShapeKind::List(list) => {
            let mut items = Vec::new();
            for (index, child) in node.children_named(list.element_name()).enumerate() {
                let child_path = format!("{path}[{index}]");
                items.push(value_from_node(child, list.element(), &child_path)?);
            }
            Ok(Value::List(items))
        }
        ShapeKind::Map(map) => {
            let mut entries = IndexMap::new();
            for entry in node.children_named("entry") {
                let (key, value) = entry_from_node(entry, map, path)?;
                entries.insert(key, value);
            }
            Ok(Value::Map(entries))
        }
    }
}

fn structure_from_node(
    node: &XmlNode,
    structure: &StructureShape,
    path: &str,
) -> Result<Value, UnmarshallingError> {
    let mut fields = IndexMap::new();

    for (name, member) in structure.members() {
        let key = member.wire_name().unwrap_or(name);
        let child_path = format!("{path}.{name}");

        if member.is_xml_attribute() {
            if let (Some(text), Some(kind)) = (node.attribute(key), member.shape().as_scalar()) {
                fields.insert(name.clone(), scalar_from_text(text, kind, &child_path)?);
            }
            continue;
        }

        match member.shape().kind() {
            ShapeKind::List(list) if list.is_flattened() => {
                let mut items = Vec::new();
                for (index, child) in node.children_named(key).enumerate() {
                    let item_path = format!("{child_path}[{index}]");
                    items.push(value_from_node(child, list.element(), &item_path)?);
                }
                if !items.is_empty() {
                    fields.insert(name.clone(), Value::List(items));
                }
            }
            ShapeKind::Map(map) if map.is_flattened() => {
                let mut entries = IndexMap::new();
                for entry in node.children_named(key) {
                    let (entry_key, entry_value) = entry_from_node(entry, map, &child_path)?;
                    entries.insert(entry_key, entry_value);
                }
                if !entries.is_empty() {
                    fields.insert(name.clone(), Value::Map(entries));
                }
            }
            _ => {
                if let Some(child) = node.child(key) {
                    fields.insert(
                        name.clone(),
                        value_from_node(child, member.shape(), &child_path)?,
                    );
                }
            }
        }
    }

    Ok(Value::Map(fields))
}

fn entry_from_node(
    entry: &XmlNode,
    map: &MapShape,
    path: &str,
) -> Result<(String, Value), UnmarshallingError> {
    let key = entry
        .child(map.key_name())
        .map(|n| n.text.clone())
        .ok_or_else(|| UnmarshallingError::TypeMismatch {
            path: path.to_owned(),
            expected: "map entry key",
        })?;

    let value_node =
        entry
            .child(map.value_name())
            .ok_or_else(|| UnmarshallingError::TypeMismatch {
                path: format!("{path}.{key}"),
                expected: "map entry value",
            })?;
    let value = value_from_node(value_node, map.value(), &format!("{path}.{key}"))?;

    Ok((key, value))
}
