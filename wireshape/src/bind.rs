//! Shared request binding walk.
//!
//! Every protocol marshaller starts the same way: walk the top-level
//! structure members, lift header/query/URI-label members out of the
//! body, expand the URI template, and decide what kind of body the
//! protocol serializer must produce. The protocol-specific part is only
//! the body encoding, so that split lives here.

use std::collections::HashMap;

use http::header::{HeaderName, HeaderValue};
use wireshape_core::{
    BindingLocation, MarshalledRequest, MarshallingError, Member, OperationBinding, Shape,
    StructureShape, TimestampFormat, Value,
};

use crate::timestamp;
use crate::uri::expand_uri_template;

/// The body a protocol serializer must produce for a bound request.
pub(crate) enum BodyBinding<'a> {
    /// No payload members: no body at all.
    Empty,
    /// Serialize the body-located members of the top-level structure.
    Fields {
        fields: &'a indexmap::IndexMap<String, Value>,
        structure: &'a StructureShape,
    },
    /// One member's subtree alone is the body.
    Explicit { member: &'a Member, value: &'a Value },
    /// A streaming member: the transport attaches the byte stream.
    Streaming,
}

/// A request shell plus its body disposition.
pub(crate) struct BoundRequest<'a> {
    pub request: MarshalledRequest,
    pub body: BodyBinding<'a>,
}

/// Route the top-level members of `value` into a request shell.
///
/// Fails without side effects: a half-routed request is never returned.
pub(crate) fn bind_request<'a>(
    value: &'a Value,
    shape: &'a Shape,
    binding: &OperationBinding,
) -> Result<BoundRequest<'a>, MarshallingError> {
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

    let mut headers = Vec::new();
    let mut query_params = Vec::new();
    let mut labels = HashMap::new();

    for (name, member) in structure.members() {
        let Some(field) = fields.get(name) else {
            continue;
        };
        if field.is_null() {
            continue;
        }

        match member.location() {
            BindingLocation::Body => {}
            BindingLocation::Header(header) => {
                let text = scalar_to_string(name, member, field)?;
                let header_name = HeaderName::try_from(header.as_str()).map_err(|_| {
                    MarshallingError::InvalidHeaderValue {
                        member: name.clone(),
                    }
                })?;
                let header_value = HeaderValue::try_from(text).map_err(|_| {
                    MarshallingError::InvalidHeaderValue {
                        member: name.clone(),
                    }
                })?;
                headers.push((header_name, header_value));
            }
            BindingLocation::QueryParam(param) => match field {
                Value::List(items) => {
                    for item in items {
                        query_params.push((param.clone(), scalar_to_string(name, member, item)?));
                    }
                }
                other => {
                    query_params.push((param.clone(), scalar_to_string(name, member, other)?));
                }
            },
            BindingLocation::UriLabel(label) => {
                labels.insert(label.clone(), scalar_to_string(name, member, field)?);
            }
        }
    }

    let path = expand_uri_template(binding.request_uri(), &labels)?;
    let mut request = MarshalledRequest::new(binding.http_method().clone(), path);
    for (name, value) in headers {
        request.headers_mut().insert(name, value);
    }
    for (key, value) in query_params {
        request.add_query_param(key, value);
    }

    let body = body_binding(fields, structure, binding);
    Ok(BoundRequest { request, body })
}

fn body_binding<'a>(
    fields: &'a indexmap::IndexMap<String, Value>,
    structure: &'a StructureShape,
    binding: &OperationBinding,
) -> BodyBinding<'a> {
    if binding.has_streaming_member() && structure.has_streaming_member() {
        return BodyBinding::Streaming;
    }

    if binding.has_explicit_payload_member() {
        if let Some((name, member)) = structure.payload_member() {
            if let Some(value) = fields.get(name).filter(|v| !v.is_null()) {
                return BodyBinding::Explicit { member, value };
            }
        }
        return BodyBinding::Empty;
    }

    if binding.has_payload_members() {
        return BodyBinding::Fields { fields, structure };
    }

    BodyBinding::Empty
}

/// Render a scalar member value as a string for headers, query
/// parameters, URI labels, and Query-protocol parameters.
pub(crate) fn scalar_to_string(
    member_name: &str,
    member: &Member,
    value: &Value,
) -> Result<String, MarshallingError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_owned()),
        Value::Timestamp(t) => Ok(match member.timestamp_format() {
            TimestampFormat::Iso8601 => timestamp::format_iso8601(t),
            TimestampFormat::EpochSeconds => t.timestamp().to_string(),
        }),
        Value::Blob(bytes) => {
            use base64::Engine;
            Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        other => Err(MarshallingError::UnsupportedValue {
            shape: member_name.to_owned(),
            expected: "scalar",
            found: other.kind_name(),
        }),
    }
}
