//! JSON protocol marshalling and unmarshalling.
//!
//! The request body is a JSON object of the body-located members.
//! Serialization walks the value tree depth-first against the shape tree:
//! scalars are written directly, lists preserve element order, maps and
//! nested structures recurse with the same dispatch. Blobs are base64
//! strings; timestamps are ISO-8601 strings or epoch-second numbers per
//! member.
//!
//! Unmarshalling is tolerant by design: absent fields stay absent and
//! unknown extra fields in the payload are ignored.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::header::{CONTENT_TYPE, HeaderValue};
use wireshape_core::{
    BindingLocation, MarshalledRequest, MarshallingError, OperationBinding, Payload, ScalarKind,
    Shape, ShapeKind, TimestampFormat, UnmarshallingError, Value,
};

use crate::bind::{BodyBinding, bind_request};
use crate::timestamp;

pub(crate) const CONTENT_TYPE_JSON: &str = "application/x-amz-json-1.1";
pub(crate) const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Marshall a request with a JSON body.
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
            let mut object = serde_json::Map::new();
            for (name, member) in structure.members() {
                if !matches!(member.location(), BindingLocation::Body)
                    || member.is_payload()
                    || member.is_streaming()
                {
                    continue;
                }
                let Some(field) = fields.get(name) else {
                    continue;
                };
                if field.is_null() {
                    continue;
                }
                let key = member.wire_name().unwrap_or(name);
                object.insert(
                    key.to_owned(),
                    json_from_value(field, member.shape(), member.timestamp_format())?,
                );
            }

            let bytes = serde_json::to_vec(&serde_json::Value::Object(object))
                .map_err(MarshallingError::serialization)?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
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
                let json = json_from_value(other, member.shape(), member.timestamp_format())?;
                let bytes =
                    serde_json::to_vec(&json).map_err(MarshallingError::serialization)?;
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
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

/// Serialize a whole structure value as a JSON document (event payloads).
pub(crate) fn serialize_document(value: &Value, shape: &Shape) -> Result<Vec<u8>, MarshallingError> {
    let json = json_from_value(value, shape, TimestampFormat::default())?;
    serde_json::to_vec(&json).map_err(MarshallingError::serialization)
}

/// Parse a JSON body into a value guided by the shape.
///
/// An empty body with a structure shape yields an empty structure value.
pub(crate) fn parse_document(body: &[u8], shape: &Shape) -> Result<Value, UnmarshallingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(match shape.kind() {
            ShapeKind::Structure(_) => Value::Map(indexmap::IndexMap::new()),
            _ => Value::Null,
        });
    }

    let json: serde_json::Value =
        serde_json::from_slice(body).map_err(UnmarshallingError::deserialization)?;
    value_from_json(&json, shape, "$")
}

fn json_from_value(
    value: &Value,
    shape: &Shape,
    ts_format: TimestampFormat,
) -> Result<serde_json::Value, MarshallingError> {
    let mismatch = |expected: &'static str| MarshallingError::UnsupportedValue {
        shape: shape.name().to_owned(),
        expected,
        found: value.kind_name(),
    };

    match shape.kind() {
        ShapeKind::Scalar(kind) => scalar_to_json(value, shape, *kind, ts_format),
        ShapeKind::Structure(structure) => {
            let fields = value.as_map().ok_or_else(|| mismatch("map"))?;
            let mut object = serde_json::Map::new();
            for (name, member) in structure.members() {
                let Some(field) = fields.get(name) else {
                    continue;
                };
                if field.is_null() {
                    continue;
                }
                let key = member.wire_name().unwrap_or(name);
                object.insert(
                    key.to_owned(),
                    json_from_value(field, member.shape(), member.timestamp_format())?,
                );
            }
            Ok(serde_json::Value::Object(object))
        }
        ShapeKind::List(list) => {
            let items = value.as_list().ok_or_else(|| mismatch("list"))?;
            let mut array = Vec::with_capacity(items.len());
            for item in items {
                array.push(json_from_value(
                    item,
                    list.element(),
                    TimestampFormat::default(),
                )?);
            }
            Ok(serde_json::Value::Array(array))
        }
        ShapeKind::Map(map) => {
            let entries = value.as_map().ok_or_else(|| mismatch("map"))?;
            let mut object = serde_json::Map::new();
            for (key, entry) in entries {
                object.insert(
                    key.clone(),
                    json_from_value(entry, map.value(), TimestampFormat::default())?,
                );
            }
            Ok(serde_json::Value::Object(object))
        }
    }
}

fn scalar_to_json(
    value: &Value,
    shape: &Shape,
    kind: ScalarKind,
    ts_format: TimestampFormat,
) -> Result<serde_json::Value, MarshallingError> {
    let mismatch = || MarshallingError::UnsupportedValue {
        shape: shape.name().to_owned(),
        expected: kind.as_str(),
        found: value.kind_name(),
    };

    match (kind, value) {
        (ScalarKind::String, Value::String(s)) => Ok(serde_json::Value::String(s.clone())),
        (ScalarKind::Integer | ScalarKind::Long, Value::Number(n)) => match *n {
            wireshape_core::Number::Int(v) => Ok(serde_json::Value::from(v)),
            wireshape_core::Number::UInt(v) => Ok(serde_json::Value::from(v)),
            wireshape_core::Number::Float(_) => Err(mismatch()),
        },
        (ScalarKind::Float | ScalarKind::Double, Value::Number(n)) => {
            serde_json::Number::from_f64(n.as_f64())
                .map(serde_json::Value::Number)
                .ok_or_else(mismatch)
        }
        (ScalarKind::Boolean, Value::Bool(b)) => Ok(serde_json::Value::Bool(*b)),
        (ScalarKind::Blob, Value::Blob(bytes)) => {
            Ok(serde_json::Value::String(BASE64.encode(bytes)))
        }
        (ScalarKind::Timestamp, Value::Timestamp(t)) => Ok(match ts_format {
            TimestampFormat::Iso8601 => serde_json::Value::String(timestamp::format_iso8601(t)),
            TimestampFormat::EpochSeconds => serde_json::Value::from(t.timestamp()),
        }),
        _ => Err(mismatch()),
    }
}

fn value_from_json(
    json: &serde_json::Value,
    shape: &Shape,
    path: &str,
) -> Result<Value, UnmarshallingError> {
    let mismatch = |expected: &'static str| UnmarshallingError::TypeMismatch {
        path: path.to_owned(),
        expected,
    };

    match shape.kind() {
        ShapeKind::Scalar(kind) => scalar_from_json(json, *kind, path),
        ShapeKind::Structure(structure) => {
            let object = json.as_object().ok_or_else(|| mismatch("object"))?;
            let mut fields = indexmap::IndexMap::new();
            // Walk the shape, not the document: unknown extra fields in the
            // payload are skipped without comment.
            for (name, member) in structure.members() {
                let key = member.wire_name().unwrap_or(name);
                let Some(field) = object.get(key) else {
                    continue;
                };
                if field.is_null() {
                    continue;
                }
                let child_path = format!("{path}.{name}");
                fields.insert(
                    name.clone(),
                    value_from_json(field, member.shape(), &child_path)?,
                );
            }
            Ok(Value::Map(fields))
        }
        ShapeKind::List(list) => {
            let array = json.as_array().ok_or_else(|| mismatch("array"))?;
            let mut items = Vec::with_capacity(array.len());
            for (index, item) in array.iter().enumerate() {
                let child_path = format!("{path}[{index}]");
                items.push(value_from_json(item, list.element(), &child_path)?);
            }
            Ok(Value::List(items))
        }
        ShapeKind::Map(map) => {
            let object = json.as_object().ok_or_else(|| mismatch("object"))?;
            let mut entries = indexmap::IndexMap::new();
            for (key, entry) in object {
                let child_path = format!("{path}.{key}");
                entries.insert(
                    key.clone(),
                    value_from_json(entry, map.value(), &child_path)?,
                );
            }
            Ok(Value::Map(entries))
        }
    }
}

fn scalar_from_json(
    json: &serde_json::Value,
    kind: ScalarKind,
    path: &str,
) -> Result<Value, UnmarshallingError> {
    let mismatch = |expected: &'static str| UnmarshallingError::TypeMismatch {
        path: path.to_owned(),
        expected,
    };

    match kind {
        ScalarKind::String => json
            .as_str()
            .map(Value::from)
            .ok_or_else(|| mismatch("string")),
        ScalarKind::Integer | ScalarKind::Long => {
            if let Some(v) = json.as_i64() {
                Ok(Value::from(v))
            } else if let Some(v) = json.as_u64() {
                Ok(Value::from(v))
            } else {
                Err(mismatch("integer"))
            }
        }
        ScalarKind::Float | ScalarKind::Double => json
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| mismatch("number")),
        ScalarKind::Boolean => json
            .as_bool()
            .map(Value::from)
            .ok_or_else(|| mismatch("boolean")),
        ScalarKind::Blob => {
            let text = json.as_str().ok_or_else(|| mismatch("base64 string"))?;
            BASE64
                .decode(text)
                .map(|bytes| Value::Blob(bytes.into()))
                .map_err(|_| mismatch("base64 string"))
        }
        ScalarKind::Timestamp => {
            // Both wire formats are recognized by value kind.
            if let Some(text) = json.as_str() {
                timestamp::parse_iso8601(text)
                    .map(Value::from)
                    .ok_or_else(|| mismatch("timestamp"))
            } else if let Some(seconds) = json.as_f64() {
                timestamp::from_epoch_seconds(seconds)
                    .map(Value::from)
                    .ok_or_else(|| mismatch("timestamp"))
            } else {
                Err(mismatch("timestamp"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use wireshape_core::Member;

    fn nested_containers_shape() -> std::sync::Arc<Shape> {
        let list_of_strings = Shape::list("ListOfStrings", Shape::string()).build();
        let map_of_lists =
            Shape::map("MapOfListOfStrings", list_of_strings.clone()).build();
        let list_of_maps = Shape::list("ListOfMaps", map_of_lists.clone()).build();

        Shape::structure("NestedContainersRequest")
            .member("ListOfStrings", Member::new(list_of_strings))
            .member("ListOfMaps", Member::new(list_of_maps))
            .member("Count", Member::new(Shape::integer()))
            .build()
    }

    fn nested_containers_binding() -> OperationBinding {
        OperationBinding::builder("NestedContainers")
            .request_uri("/")
            .http_method(Method::POST)
            .has_payload_members(true)
            .build()
    }

    fn nested_containers_value() -> Value {
        Value::from_entries([
            (
                "ListOfStrings",
                Value::List(vec!["one".into(), "two".into(), "three".into()]),
            ),
            (
                "ListOfMaps",
                Value::List(vec![Value::from_entries([(
                    "inner",
                    Value::List(vec!["a".into(), "b".into()]),
                )])]),
            ),
            ("Count", Value::from(3i64)),
        ])
    }

    #[test]
    fn test_nested_containers_round_trip() {
        let shape = nested_containers_shape();
        let value = nested_containers_value();

        let request =
            marshall_request(&value, &shape, &nested_containers_binding()).unwrap();
        let body = request.body_bytes().unwrap();

        let parsed = parse_document(body, &shape).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_list_order_preserved() {
        let shape = nested_containers_shape();
        let value = nested_containers_value();

        let request =
            marshall_request(&value, &shape, &nested_containers_binding()).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(request.body_bytes().unwrap()).unwrap();

        let items: Vec<&str> = json["ListOfStrings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(items, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_no_payload_members_sends_no_body() {
        let shape = Shape::structure("EmptyRequest").build();
        let binding = OperationBinding::builder("Empty").build();

        let request = marshall_request(&Value::from_entries::<&str, _>([]), &shape, &binding)
            .unwrap();
        assert!(request.payload().is_none());
        assert!(!request.headers().contains_key(CONTENT_TYPE));
    }

    #[test]
    fn test_unknown_response_fields_ignored() {
        let shape = Shape::structure("GetThingResponse")
            .member("Name", Member::new(Shape::string()))
            .build();

        let parsed =
            parse_document(br#"{"Name":"a","Mystery":{"deep":[1,2]}}"#, &shape).unwrap();
        assert_eq!(parsed, Value::from_entries([("Name", Value::from("a"))]));
    }

    #[test]
    fn test_absent_fields_are_tolerated() {
        let shape = Shape::structure("GetThingResponse")
            .member("Name", Member::new(Shape::string()))
            .member("Count", Member::new(Shape::integer()))
            .build();

        let parsed = parse_document(br#"{}"#, &shape).unwrap();
        assert_eq!(parsed, Value::Map(indexmap::IndexMap::new()));
    }

    #[test]
    fn test_empty_body_yields_empty_structure() {
        let shape = Shape::structure("DeleteThingResponse").build();
        let parsed = parse_document(b"", &shape).unwrap();
        assert_eq!(parsed, Value::Map(indexmap::IndexMap::new()));
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let shape = Shape::structure("Response")
            .member(
                "Things",
                Member::new(Shape::list("Things", Shape::string()).build()),
            )
            .build();

        let err = parse_document(br#"{"Things":["ok",7]}"#, &shape).unwrap_err();
        match err {
            UnmarshallingError::TypeMismatch { path, .. } => {
                assert_eq!(path, "$.Things[1]");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_wire_name_override() {
        let shape = Shape::structure("Request")
            .member(
                "LocalName",
                Member::new(Shape::string()).with_wire_name("remoteName"),
            )
            .build();
        let binding = OperationBinding::builder("Op").has_payload_members(true).build();
        let value = Value::from_entries([("LocalName", Value::from("x"))]);

        let request = marshall_request(&value, &shape, &binding).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(request.body_bytes().unwrap()).unwrap();
        assert_eq!(json["remoteName"], "x");

        let parsed = parse_document(request.body_bytes().unwrap(), &shape).unwrap();
        assert_eq!(parsed.get("LocalName").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_blob_round_trips_as_base64() {
        let shape = Shape::structure("Request")
            .member("Data", Member::new(Shape::blob()))
            .build();
        let binding = OperationBinding::builder("Op").has_payload_members(true).build();
        let value = Value::from_entries([("Data", Value::Blob(bytes::Bytes::from_static(b"\x00\x01binary")))]);

        let request = marshall_request(&value, &shape, &binding).unwrap();
        let parsed = parse_document(request.body_bytes().unwrap(), &shape).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_explicit_blob_payload_is_raw_body() {
        let shape = Shape::structure("PutDocumentRequest")
            .member("ContentType", Member::new(Shape::string()).in_header("Content-Type"))
            .member("Body", Member::new(Shape::blob()).as_payload())
            .build();
        let binding = OperationBinding::builder("PutDocument")
            .request_uri("/doc")
            .has_explicit_payload_member(true)
            .has_payload_members(true)
            .build();
        let value = Value::from_entries([
            ("Body", Value::Blob(bytes::Bytes::from_static(b"raw-bytes"))),
        ]);

        let request = marshall_request(&value, &shape, &binding).unwrap();
        assert_eq!(&request.body_bytes().unwrap()[..], b"raw-bytes");
    }

    #[test]
    fn test_streaming_member_marks_body_slot() {
        let shape = Shape::structure("UploadRequest")
            .member("Key", Member::new(Shape::string()).in_uri_label("Key"))
            .member("Body", Member::new(Shape::blob()).streaming().as_payload())
            .build();
        let binding = OperationBinding::builder("Upload")
            .request_uri("/upload/{Key}")
            .has_streaming_member(true)
            .has_explicit_payload_member(true)
            .has_payload_members(true)
            .build();
        let value = Value::from_entries([("Key", Value::from("k1"))]);

        let request = marshall_request(&value, &shape, &binding).unwrap();
        assert_eq!(request.path(), "/upload/k1");
        assert_eq!(request.payload(), &Payload::Streaming);
    }
}
