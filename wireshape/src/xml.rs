//! REST-XML protocol marshalling and unmarshalling.
//!
//! Bodies are XML documents built with `quick-xml` events. The writer
//! walks the value tree depth-first against the shape tree; the reader
//! first parses the body into a lightweight element tree
//! ([`node::XmlNode`]) and then walks that tree against the shape, so
//! unknown elements fall away without bookkeeping.
//!
//! Wrapped lists nest entries under a `member` element; flattened lists
//! and maps repeat the member element directly. Root-element unwrapping
//! on responses is controlled per operation.

mod node;
mod read;
mod write;

use http::header::{CONTENT_TYPE, HeaderValue};
use wireshape_core::{
    MarshalledRequest, MarshallingError, OperationBinding, Payload, Shape, UnmarshallingError,
    Value,
};

use crate::bind::{BodyBinding, bind_request};
use crate::json::CONTENT_TYPE_OCTET_STREAM;

pub(crate) use node::{XmlNode, parse_xml};
pub(crate) use read::value_from_node;

pub(crate) const CONTENT_TYPE_XML: &str = "application/xml";

/// Marshall a request with an XML body.
pub(crate) fn marshall_request(
    value: &Value,
    shape: &Shape,
    binding: &OperationBinding,
) -> Result<MarshalledRequest, MarshallingError> {
    let bound = bind_request(value, shape, binding)?;
    let mut request = bound.request;

    match bound.body {
        BodyBinding::Empty => {}
        BodyBinding::Fields { fields, structure } => {
            let root = structure.xml_name().unwrap_or(shape.name());
            let bytes = write::write_document(root, fields, structure)?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_XML));
            request.set_payload(Payload::Bytes(bytes.into()));
        }
        BodyBinding::Explicit { member, value } => match value {
            Value::Blob(bytes) => {
                request.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static(CONTENT_TYPE_OCTET_STREAM),
                );
                request.set_payload(Payload::Bytes(bytes.clone()));
            }
            other => {
                let bytes = write::write_payload_member(member, other)?;
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_XML));
                request.set_payload(Payload::Bytes(bytes.into()));
            }
        },
        BodyBinding::Streaming => {
            request.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static(CONTENT_TYPE_OCTET_STREAM),
            );
            request.set_payload(Payload::Streaming);
        }
    }

    Ok(request)
}

/// Serialize a whole structure value as an XML document (event payloads).
pub(crate) fn serialize_document(value: &Value, shape: &Shape) -> Result<Vec<u8>, MarshallingError> {
    let structure = shape
        .as_structure()
        .ok_or_else(|| MarshallingError::UnsupportedValue {
            shape: shape.name().to_owned(),
            expected: "structure",
            found: shape.kind_name(),
        })?;
    let fields = value
        .as_map()
        .ok_or_else(|| MarshallingError::UnsupportedValue {
            shape: shape.name().to_owned(),
            expected: "map",
            found: value.kind_name(),
        })?;
    let root = structure.xml_name().unwrap_or(shape.name());
    write::write_document(root, fields, structure)
}

/// Parse an XML body into a value guided by the shape.
///
/// When `expected_root` is set the root element must carry that name and
/// is unwrapped; otherwise the root element is taken as the structure
/// itself without a name check.
pub(crate) fn parse_document(
    body: &[u8],
    shape: &Shape,
    expected_root: Option<&str>,
) -> Result<Value, UnmarshallingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Map(indexmap::IndexMap::new()));
    }

    let root = parse_xml(body)?;
    if let Some(expected) = expected_root {
        if root.name != expected {
            return Err(UnmarshallingError::MissingRootElement {
                expected: expected.to_owned(),
            });
        }
    }
    value_from_node(&root, shape, "$")
}
