//! Protocol selection, validation, and dispatch.
//!
//! A [`ProtocolFactory`] pairs a wire protocol with the marshalling
//! entry points. Constructing a factory through
//! [`ProtocolFactory::validated`] walks every shape reachable from the
//! registered operations and rejects anything the protocol cannot
//! serialize: an unsupported nesting is a configuration defect, caught
//! here rather than surfacing as a runtime marshalling error.

use std::sync::Arc;

use wireshape_core::{
    BindingLocation, ConfigurationError, MarshalledRequest, MarshallingError, OperationBinding,
    ScalarKind, Shape, ShapeKind, UnmarshallingError, Value, WireResponse,
};

use crate::text::scalar_from_text;
use crate::{json, query, xml};

/// The wire protocol family an operation marshals with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireProtocol {
    /// JSON body protocol.
    Json,
    /// REST-XML: XML bodies with HTTP binding traits.
    RestXml,
    /// Query: form-encoded request parameters, XML responses.
    Query,
}

impl WireProtocol {
    /// Request body Content-Type.
    pub fn content_type(&self) -> &'static str {
        match self {
            WireProtocol::Json => json::CONTENT_TYPE_JSON,
            WireProtocol::RestXml => xml::CONTENT_TYPE_XML,
            WireProtocol::Query => query::CONTENT_TYPE_FORM,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WireProtocol::Json => "json",
            WireProtocol::RestXml => "rest-xml",
            WireProtocol::Query => "query",
        }
    }
}

/// Marshalling entry points for one protocol.
///
/// Cheap to clone and share across threads; holds no per-call state.
#[derive(Debug, Clone)]
pub struct ProtocolFactory {
    protocol: WireProtocol,
}

impl ProtocolFactory {
    /// A factory without up-front shape validation.
    ///
    /// Unsupported nestings then surface as marshalling errors at call
    /// time; prefer [`validated`](Self::validated).
    pub fn new(protocol: WireProtocol) -> Self {
        Self { protocol }
    }

    /// A factory that has checked every given shape tree against the
    /// protocol's capabilities.
    ///
    /// # Errors
    /// Fails with [`ConfigurationError`] on the first unsupported shape.
    pub fn validated<'a, I>(protocol: WireProtocol, shapes: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = &'a Arc<Shape>>,
    {
        for shape in shapes {
            validate_shape(protocol, shape, true)?;
        }
        Ok(Self { protocol })
    }

    pub fn protocol(&self) -> WireProtocol {
        self.protocol
    }

    /// Convert a typed request value plus its operation binding into an
    /// HTTP request.
    ///
    /// # Errors
    /// Fails with a [`MarshallingError`] wrapped with the operation name;
    /// a partially built request is never returned.
    pub fn marshall(
        &self,
        value: &Value,
        shape: &Shape,
        binding: &OperationBinding,
    ) -> Result<MarshalledRequest, MarshallingError> {
        let result = match self.protocol {
            WireProtocol::Json => json::marshall_request(value, shape, binding),
            WireProtocol::RestXml => xml::marshall_request(value, shape, binding),
            WireProtocol::Query => query::marshall_request(value, shape, binding),
        };
        result.map_err(|err| err.in_operation(binding.name()))
    }

    /// Convert an HTTP response into a typed value guided by the shape.
    ///
    /// Header-located members are read from the response headers; the
    /// body is parsed per protocol. Absent fields stay absent, unknown
    /// payload fields are ignored.
    ///
    /// # Errors
    /// Fails with an [`UnmarshallingError`] wrapped with the operation
    /// name.
    pub fn unmarshall(
        &self,
        response: &WireResponse,
        shape: &Shape,
        binding: &OperationBinding,
    ) -> Result<Value, UnmarshallingError> {
        self.unmarshall_inner(response, shape, binding)
            .map_err(|err| err.in_operation(binding.name()))
    }

    fn unmarshall_inner(
        &self,
        response: &WireResponse,
        shape: &Shape,
        binding: &OperationBinding,
    ) -> Result<Value, UnmarshallingError> {
        let body = match self.protocol {
            WireProtocol::Json => json::parse_document(response.body(), shape)?,
            WireProtocol::RestXml => {
                let expected_root = binding.use_root_xml_element().then(|| {
                    shape
                        .as_structure()
                        .and_then(|s| s.xml_name())
                        .unwrap_or(shape.name())
                });
                xml::parse_document(response.body(), shape, expected_root)?
            }
            WireProtocol::Query => query::parse_response(response.body(), shape, binding.name())?,
        };

        let Some(structure) = shape.as_structure() else {
            return Ok(body);
        };
        let mut fields = match body {
            Value::Map(fields) => fields,
            other => return Ok(other),
        };

        for (name, member) in structure.members() {
            let BindingLocation::Header(header) = member.location() else {
                continue;
            };
            let Some(raw) = response.headers().get(header.as_str()) else {
                continue;
            };
            let text = raw.to_str().map_err(|_| UnmarshallingError::InvalidHeader {
                header: header.clone(),
            })?;
            let Some(kind) = member.shape().as_scalar() else {
                continue;
            };
            let value = scalar_from_text(text, kind, name).map_err(|_| {
                UnmarshallingError::InvalidHeader {
                    header: header.clone(),
                }
            })?;
            fields.insert(name.clone(), value);
        }

        Ok(Value::Map(fields))
    }
}

/// Check one shape tree against a protocol's capabilities.
fn validate_shape(
    protocol: WireProtocol,
    shape: &Arc<Shape>,
    top_level: bool,
) -> Result<(), ConfigurationError> {
    let unsupported = |reason: &str| ConfigurationError::UnsupportedShape {
        shape: shape.name().to_owned(),
        protocol: protocol.as_str(),
        reason: reason.to_owned(),
    };

    match shape.kind() {
        ShapeKind::Scalar(_) => Ok(()),
        ShapeKind::List(list) => validate_shape(protocol, list.element(), false),
        ShapeKind::Map(map) => {
            if map.key().as_scalar() != Some(ScalarKind::String) {
                return Err(unsupported("map keys must be string scalars"));
            }
            validate_shape(protocol, map.value(), false)
        }
        ShapeKind::Structure(structure) => {
            for (name, member) in structure.members() {
                if member.is_streaming() {
                    if !top_level {
                        return Err(unsupported(&format!(
                            "streaming member `{name}` must be a top-level member"
                        )));
                    }
                    if protocol == WireProtocol::Query {
                        return Err(unsupported(&format!(
                            "streaming member `{name}` cannot be carried by form-encoded requests"
                        )));
                    }
                    if member.shape().as_scalar() != Some(ScalarKind::Blob) {
                        return Err(unsupported(&format!(
                            "streaming member `{name}` must be a blob"
                        )));
                    }
                }
                if member.is_payload()
                    && member.shape().as_structure().is_none()
                    && member.shape().as_scalar() != Some(ScalarKind::Blob)
                {
                    return Err(unsupported(&format!(
                        "payload member `{name}` must be a blob or structure"
                    )));
                }
                if member.is_xml_attribute() && member.shape().as_scalar().is_none() {
                    return Err(unsupported(&format!(
                        "attribute member `{name}` must be a scalar"
                    )));
                }
                if !top_level && !matches!(member.location(), BindingLocation::Body) {
                    return Err(unsupported(&format!(
                        "member `{name}` binds to HTTP parts from a nested structure"
                    )));
                }
                validate_shape(protocol, member.shape(), false)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use wireshape_core::Member;

    fn thing_shape() -> Arc<Shape> {
        Shape::structure("DescribeThingResponse")
            .member("Name", Member::new(Shape::string()))
            .member("RequestId", Member::new(Shape::string()).in_header("x-request-id"))
            .build()
    }

    #[test]
    fn test_validated_accepts_nested_containers() {
        let inner = Shape::map("Attributes", Shape::string()).build();
        let shape = Shape::structure("Request")
            .member("Attributes", Member::new(inner))
            .build();

        assert!(ProtocolFactory::validated(WireProtocol::Json, [&shape]).is_ok());
    }

    #[test]
    fn test_validated_rejects_non_string_map_keys() {
        let bad_map = Shape::map("Counters", Shape::integer())
            .key_shape(Shape::integer())
            .build();
        let shape = Shape::structure("Request")
            .member("Counters", Member::new(bad_map))
            .build();

        let err = ProtocolFactory::validated(WireProtocol::Json, [&shape]).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedShape { .. }));
    }

    #[test]
    fn test_validated_rejects_nested_streaming_member() {
        let inner = Shape::structure("Inner")
            .member("Body", Member::new(Shape::blob()).streaming())
            .build();
        let shape = Shape::structure("Request")
            .member("Inner", Member::new(inner))
            .build();

        let err = ProtocolFactory::validated(WireProtocol::Json, [&shape]).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedShape { .. }));
    }

    #[test]
    fn test_validated_rejects_streaming_for_query() {
        let shape = Shape::structure("Request")
            .member("Body", Member::new(Shape::blob()).streaming().as_payload())
            .build();

        assert!(ProtocolFactory::validated(WireProtocol::Json, [&shape]).is_ok());
        let err = ProtocolFactory::validated(WireProtocol::Query, [&shape]).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnsupportedShape { .. }));
    }

    #[test]
    fn test_unmarshall_binds_headers() {
        let factory = ProtocolFactory::new(WireProtocol::Json);
        let binding = OperationBinding::builder("DescribeThing").build();
        let response = WireResponse::new(StatusCode::OK)
            .with_header(
                http::header::HeaderName::from_static("x-request-id"),
                http::HeaderValue::from_static("req-123"),
            )
            .with_body(r#"{"Name":"thing-a"}"#);

        let value = factory
            .unmarshall(&response, &thing_shape(), &binding)
            .unwrap();
        assert_eq!(value.get("Name").unwrap().as_str(), Some("thing-a"));
        assert_eq!(value.get("RequestId").unwrap().as_str(), Some("req-123"));
    }

    #[test]
    fn test_marshall_wraps_operation_context() {
        let factory = ProtocolFactory::new(WireProtocol::Json);
        let shape = Shape::structure("Request")
            .member("Name", Member::new(Shape::string()))
            .build();
        let binding = OperationBinding::builder("CreateThing")
            .http_method(Method::POST)
            .has_payload_members(true)
            .build();

        // A list where a structure is expected fails, naming the operation.
        let err = factory
            .marshall(&Value::List(vec![]), &shape, &binding)
            .unwrap_err();
        assert!(err.to_string().contains("CreateThing"));
    }

    #[test]
    fn test_json_round_trip_through_factory() {
        let factory = ProtocolFactory::new(WireProtocol::Json);
        let shape = Shape::structure("Request")
            .member("Name", Member::new(Shape::string()))
            .member("Count", Member::new(Shape::integer()))
            .build();
        let binding = OperationBinding::builder("PutThing")
            .has_payload_members(true)
            .build();
        let value = Value::from_entries([
            ("Name", "a".into()),
            ("Count", Value::from(2i64)),
        ]);

        let request = factory.marshall(&value, &shape, &binding).unwrap();
        let response =
            WireResponse::new(StatusCode::OK).with_body(request.body_bytes().unwrap().clone());
        let parsed = factory.unmarshall(&response, &shape, &binding).unwrap();
        assert_eq!(parsed, value);
    }
}
