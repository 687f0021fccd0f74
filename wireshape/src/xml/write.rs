//! XML body writer.

use indexmap::IndexMap;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use wireshape_core::{
    BindingLocation, MapShape, MarshallingError, Member, Shape, ShapeKind, StructureShape,
    TimestampFormat, Value,
};

use crate::bind::scalar_to_string;
use crate::timestamp;

type XmlWriter = Writer<Vec<u8>>;

/// Write a structure's body members as a document rooted at `root`.
pub(crate) fn write_document(
    root: &str,
    fields: &IndexMap<String, Value>,
    structure: &StructureShape,
) -> Result<Vec<u8>, MarshallingError> {
    let mut writer = Writer::new(Vec::new());
    write_structure_element(
        &mut writer,
        root,
        fields,
        structure,
        structure.xml_namespace(),
        true,
    )?;
    Ok(writer.into_inner())
}

/// Write an explicit payload member's subtree as its own document.
pub(crate) fn write_payload_member(
    member: &Member,
    value: &Value,
) -> Result<Vec<u8>, MarshallingError> {
    let shape = member.shape();
    let name = member
        .wire_name()
        .or_else(|| shape.as_structure().and_then(|s| s.xml_name()))
        .unwrap_or_else(|| shape.name());

    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, name, value, shape, member.timestamp_format())?;
    Ok(writer.into_inner())
}

fn write_structure_element(
    writer: &mut XmlWriter,
    name: &str,
    fields: &IndexMap<String, Value>,
    structure: &StructureShape,
    namespace: Option<&str>,
    body_members_only: bool,
) -> Result<(), MarshallingError> {
    // Attribute text must outlive the start event it is borrowed into.
    let mut attributes: Vec<(&str, String)> = Vec::new();
    for (member_name, member) in structure.members() {
        if !member.is_xml_attribute() {
            continue;
        }
        let Some(field) = fields.get(member_name) else {
            continue;
        };
        if field.is_null() {
            continue;
        }
        attributes.push((
            member.wire_name().unwrap_or(member_name),
            scalar_to_string(member_name, member, field)?,
        ));
    }

    let mut start = BytesStart::new(name);
    if let Some(ns) = namespace {
        start.push_attribute(("xmlns", ns));
    }
    for (key, text) in &attributes {
        start.push_attribute((*key, text.as_str()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(MarshallingError::serialization)?;

    for (member_name, member) in structure.members() {
        if member.is_xml_attribute() {
            continue;
        }
        if body_members_only
            && (!matches!(member.location(), BindingLocation::Body)
                || member.is_payload()
                || member.is_streaming())
        {
            continue;
        }
        let Some(field) = fields.get(member_name) else {
            continue;
        };
        if field.is_null() {
            continue;
        }

        let key = member.wire_name().unwrap_or(member_name);
        match member.shape().kind() {
            ShapeKind::List(list) if list.is_flattened() => {
                let items = field.as_list().ok_or_else(|| mismatch(member.shape(), field))?;
                for item in items {
                    write_element(
                        writer,
                        key,
                        item,
                        list.element(),
                        TimestampFormat::default(),
                    )?;
                }
            }
            ShapeKind::Map(map) if map.is_flattened() => {
                let entries = field.as_map().ok_or_else(|| mismatch(member.shape(), field))?;
                for (entry_key, entry_value) in entries {
                    write_map_entry(writer, key, entry_key, entry_value, map)?;
                }
            }
            _ => write_element(writer, key, field, member.shape(), member.timestamp_format())?,
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(MarshallingError::serialization)
}

fn write_element(
    writer: &mut XmlWriter,
    name: &str,
    value: &Value,
    shape: &Shape,
    ts_format: TimestampFormat,
) -> Result<(), MarshallingError> {
    match shape.kind() {
        ShapeKind::Structure(structure) => {
            let fields = value.as_map().ok_or_else(|| mismatch(shape, value))?;
            write_structure_element(writer, name, fields, structure, None, false)
        }
        ShapeKind::List(list) => {
            let items = value.as_list().ok_or_else(|| mismatch(shape, value))?;
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(MarshallingError::serialization)?;
            for item in items {
                write_element(
                    writer,
                    list.element_name(),
                    item,
                    list.element(),
                    TimestampFormat::default(),
                )?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(MarshallingError::serialization)
        }
        ShapeKind::Map(map) => {
            let entries = value.as_map().ok_or_else(|| mismatch(shape, value))?;
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(MarshallingError::serialization)?;
            for (entry_key, entry_value) in entries {
                write_map_entry(writer, "entry", entry_key, entry_value, map)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(MarshallingError::serialization)
        }
        ShapeKind::Scalar(_) => {
            let text = scalar_text(value, shape, ts_format)?;
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(MarshallingError::serialization)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(MarshallingError::serialization)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(MarshallingError::serialization)
        }
    }
}

fn write_map_entry(
    writer: &mut XmlWriter,
    entry_name: &str,
    key: &str,
    value: &Value,
    map: &MapShape,
) -> Result<(), MarshallingError> {
    writer
        .write_event(Event::Start(BytesStart::new(entry_name)))
        .map_err(MarshallingError::serialization)?;

    writer
        .write_event(Event::Start(BytesStart::new(map.key_name())))
        .map_err(MarshallingError::serialization)?;
    writer
        .write_event(Event::Text(BytesText::new(key)))
        .map_err(MarshallingError::serialization)?;
    writer
        .write_event(Event::End(BytesEnd::new(map.key_name())))
        .map_err(MarshallingError::serialization)?;

    write_element(
        writer,
        map.value_name(),
        value,
        map.value(),
        TimestampFormat::default(),
    )?;

    writer
        .write_event(Event::End(BytesEnd::new(entry_name)))
        .map_err(MarshallingError::serialization)
}

fn scalar_text(
    value: &Value,
    shape: &Shape,
    ts_format: TimestampFormat,
) -> Result<String, MarshallingError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_owned()),
        Value::Timestamp(t) => Ok(match ts_format {
            TimestampFormat::Iso8601 => timestamp::format_iso8601(t),
            TimestampFormat::EpochSeconds => t.timestamp().to_string(),
        }),
        Value::Blob(bytes) => {
            use base64::Engine;
            Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        other => Err(mismatch(shape, other)),
    }
}

fn mismatch(shape: &Shape, value: &Value) -> MarshallingError {
    MarshallingError::UnsupportedValue {
        shape: shape.name().to_owned(),
        expected: shape.kind_name(),
        found: value.kind_name(),
    }
}
