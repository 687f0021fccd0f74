//! Query protocol marshalling.
//!
//! The whole value tree flattens into `application/x-www-form-urlencoded`
//! parameters: nested names join with `.`, list entries are 1-indexed
//! (`List.member.1`, or `List.1` when flattened), and map entries expand
//! to `Map.entry.1.key` / `Map.entry.1.value`. `Action` and `Version`
//! from the operation binding lead the parameter list.
//!
//! Responses are XML wrapped in `<OpNameResponse><OpNameResult>…`; the
//! result wrapper is unwrapped before the shape walk.

use http::header::{CONTENT_TYPE, HeaderValue};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use wireshape_core::{
    BindingLocation, MarshalledRequest, MarshallingError, Member, OperationBinding, Payload, Shape,
    ShapeKind, TimestampFormat, UnmarshallingError, Value,
};

use crate::bind::{BodyBinding, bind_request};
use crate::xml;

pub(crate) const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// Form encode set: unreserved characters pass through, space becomes `%20`.
const FORM_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Marshall a request with a form-encoded Query body.
pub(crate) fn marshall_request(
    value: &Value,
    shape: &Shape,
    binding: &OperationBinding,
) -> Result<MarshalledRequest, MarshallingError> {
    let bound = bind_request(value, shape, binding)?;
    let mut request = bound.request;

    let mut params: Vec<(String, String)> = Vec::new();
    params.push(("Action".to_owned(), binding.name().to_owned()));
    if let Some(version) = binding.api_version() {
        params.push(("Version".to_owned(), version.to_owned()));
    }

    if let BodyBinding::Fields { fields, structure } = bound.body {
        for (name, member) in structure.members() {
            if !matches!(member.location(), BindingLocation::Body) {
                continue;
            }
            let Some(field) = fields.get(name) else {
                continue;
            };
            if field.is_null() {
                continue;
            }
            let prefix = member.wire_name().unwrap_or(name).to_owned();
            write_query_value(&prefix, field, member, member.shape(), &mut params)?;
        }
    }

    let body = params
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                utf8_percent_encode(k, FORM_ENCODE),
                utf8_percent_encode(v, FORM_ENCODE)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    request
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_FORM));
    request.set_payload(Payload::Bytes(body.into_bytes().into()));
    Ok(request)
}

/// Unmarshall a Query response: XML with a result wrapper.
///
/// The root must be `{OpName}Response`; the `{OpName}Result` child, when
/// present, is the structure to walk (some operations answer with no
/// result wrapper).
pub(crate) fn parse_response(
    body: &[u8],
    shape: &Shape,
    operation_name: &str,
) -> Result<Value, UnmarshallingError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Map(indexmap::IndexMap::new()));
    }

    let expected = format!("{operation_name}Response");
    let root = xml::parse_xml(body)?;
    if root.name != expected {
        return Err(UnmarshallingError::MissingRootElement { expected });
    }

    let result_name = format!("{operation_name}Result");
    let target = root.child(&result_name).unwrap_or(&root);
    xml::value_from_node(target, shape, "$")
}

fn write_query_value(
    prefix: &str,
    value: &Value,
    member: &Member,
    shape: &Shape,
    params: &mut Vec<(String, String)>,
) -> Result<(), MarshallingError> {
    match shape.kind() {
        ShapeKind::Scalar(_) => {
            params.push((prefix.to_owned(), scalar_param(value, member, shape)?));
            Ok(())
        }
        ShapeKind::Structure(structure) => {
            let fields = value.as_map().ok_or_else(|| mismatch(shape, value))?;
            for (name, inner) in structure.members() {
                let Some(field) = fields.get(name) else {
                    continue;
                };
                if field.is_null() {
                    continue;
                }
                let child_prefix = format!("{prefix}.{}", inner.wire_name().unwrap_or(name));
                write_query_value(&child_prefix, field, inner, inner.shape(), params)?;
            }
            Ok(())
        }
        ShapeKind::List(list) => {
            let items = value.as_list().ok_or_else(|| mismatch(shape, value))?;
            // An empty list still serializes, as a bare parameter.
            if items.is_empty() {
                params.push((prefix.to_owned(), String::new()));
                return Ok(());
            }
            for (index, item) in items.iter().enumerate() {
                let child_prefix = if list.is_flattened() {
                    format!("{prefix}.{}", index + 1)
                } else {
                    format!("{prefix}.{}.{}", list.element_name(), index + 1)
                };
                write_query_value(&child_prefix, item, member, list.element(), params)?;
            }
            Ok(())
        }
        ShapeKind::Map(map) => {
            let entries = value.as_map().ok_or_else(|| mismatch(shape, value))?;
            for (index, (key, entry)) in entries.iter().enumerate() {
                let entry_prefix = if map.is_flattened() {
                    format!("{prefix}.{}", index + 1)
                } else {
                    format!("{prefix}.entry.{}", index + 1)
                };
                params.push((format!("{entry_prefix}.{}", map.key_name()), key.clone()));
                let value_prefix = format!("{entry_prefix}.{}", map.value_name());
                write_query_value(&value_prefix, entry, member, map.value(), params)?;
            }
            Ok(())
        }
    }
}

fn scalar_param(
    value: &Value,
    member: &Member,
    shape: &Shape,
) -> Result<String, MarshallingError> {
    use crate::timestamp;

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

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use wireshape_core::OperationBinding;

    fn run_instances_binding() -> OperationBinding {
        OperationBinding::builder("RunInstances")
            .http_method(Method::POST)
            .request_uri("/")
            .has_payload_members(true)
            .api_version("2016-11-15")
            .build()
    }

    fn body_of(request: &MarshalledRequest) -> String {
        String::from_utf8(request.body_bytes().unwrap().to_vec()).unwrap()
    }

    #[test]
    fn test_action_and_version_lead() {
        let shape = Shape::structure("RunInstancesRequest").build();
        let request = marshall_request(
            &Value::from_entries::<&str, _>([]),
            &shape,
            &run_instances_binding(),
        )
        .unwrap();

        assert_eq!(body_of(&request), "Action=RunInstances&Version=2016-11-15");
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            CONTENT_TYPE_FORM
        );
    }

    #[test]
    fn test_wrapped_list_is_one_indexed() {
        let shape = Shape::structure("Request")
            .member(
                "InstanceIds",
                Member::new(Shape::list("InstanceIds", Shape::string()).build())
                    .with_wire_name("InstanceId"),
            )
            .build();
        let value = Value::from_entries([(
            "InstanceIds",
            Value::List(vec!["i-1".into(), "i-2".into(), "i-3".into()]),
        )]);

        let request = marshall_request(&value, &shape, &run_instances_binding()).unwrap();
        let body = body_of(&request);
        assert!(body.contains("InstanceId.member.1=i-1"));
        assert!(body.contains("InstanceId.member.2=i-2"));
        assert!(body.contains("InstanceId.member.3=i-3"));
        // Order of the serialized list follows the value.
        let one = body.find("InstanceId.member.1").unwrap();
        let three = body.find("InstanceId.member.3").unwrap();
        assert!(one < three);
    }

    #[test]
    fn test_flattened_list_drops_member_level() {
        let shape = Shape::structure("Request")
            .member(
                "Filters",
                Member::new(Shape::list("Filters", Shape::string()).flattened().build())
                    .with_wire_name("Filter"),
            )
            .build();
        let value = Value::from_entries([(
            "Filters",
            Value::List(vec!["a".into(), "b".into()]),
        )]);

        let request = marshall_request(&value, &shape, &run_instances_binding()).unwrap();
        let body = body_of(&request);
        assert!(body.contains("Filter.1=a&Filter.2=b"));
    }

    #[test]
    fn test_empty_list_serializes_bare_key() {
        let shape = Shape::structure("Request")
            .member(
                "InstanceIds",
                Member::new(Shape::list("InstanceIds", Shape::string()).build()),
            )
            .build();
        let value = Value::from_entries([("InstanceIds", Value::List(vec![]))]);

        let request = marshall_request(&value, &shape, &run_instances_binding()).unwrap();
        assert!(body_of(&request).contains("InstanceIds="));
    }

    #[test]
    fn test_map_entries() {
        let shape = Shape::structure("Request")
            .member(
                "Tags",
                Member::new(Shape::map("Tags", Shape::string()).build()),
            )
            .build();
        let value = Value::from_entries([(
            "Tags",
            Value::from_entries([("env", "prod".into())]),
        )]);

        let request = marshall_request(&value, &shape, &run_instances_binding()).unwrap();
        let body = body_of(&request);
        assert!(body.contains("Tags.entry.1.key=env"));
        assert!(body.contains("Tags.entry.1.value=prod"));
    }

    #[test]
    fn test_nested_structure_dotted_path() {
        let placement = Shape::structure("Placement")
            .member("AvailabilityZone", Member::new(Shape::string()))
            .build();
        let shape = Shape::structure("Request")
            .member("Placement", Member::new(placement))
            .build();
        let value = Value::from_entries([(
            "Placement",
            Value::from_entries([("AvailabilityZone", "us-east-1a".into())]),
        )]);

        let request = marshall_request(&value, &shape, &run_instances_binding()).unwrap();
        assert!(body_of(&request).contains("Placement.AvailabilityZone=us-east-1a"));
    }

    #[test]
    fn test_values_are_form_encoded() {
        let shape = Shape::structure("Request")
            .member("UserData", Member::new(Shape::string()))
            .build();
        let value = Value::from_entries([("UserData", "a b&c=d".into())]);

        let request = marshall_request(&value, &shape, &run_instances_binding()).unwrap();
        assert!(body_of(&request).contains("UserData=a%20b%26c%3Dd"));
    }

    #[test]
    fn test_response_result_wrapper_unwrapped() {
        let shape = Shape::structure("DescribeThingsResult")
            .member("NextToken", Member::new(Shape::string()))
            .build();
        let body = b"<DescribeThingsResponse><DescribeThingsResult>\
                     <NextToken>abc</NextToken>\
                     </DescribeThingsResult><ResponseMetadata><RequestId>r</RequestId></ResponseMetadata>\
                     </DescribeThingsResponse>";

        let parsed = parse_response(body, &shape, "DescribeThings").unwrap();
        assert_eq!(
            parsed,
            Value::from_entries([("NextToken", Value::from("abc"))])
        );
    }

    #[test]
    fn test_response_wrong_root_rejected() {
        let shape = Shape::structure("Result").build();
        let err = parse_response(b"<Oops/>", &shape, "DescribeThings").unwrap_err();
        assert!(matches!(
            err,
            UnmarshallingError::MissingRootElement { expected } if expected == "DescribeThingsResponse"
        ));
    }
}
