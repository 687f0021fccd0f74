//! HTTP request/response carrier types.
//!
//! [`MarshalledRequest`] is the marshaller's output: method, expanded
//! path, canonical query parameters, headers, and a body slot. It is a
//! value handed to an HTTP transport, not a connection. [`WireResponse`]
//! is the transport's answer, handed to an unmarshaller.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Query string encode set: everything but unreserved characters.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The body of a marshalled request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No body at all (operations without payload members).
    #[default]
    None,
    /// A fully serialized body.
    Bytes(Bytes),
    /// A streaming member: the transport attaches the byte stream; the
    /// marshaller only marks the slot.
    Streaming,
}

impl Payload {
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// A fully formed HTTP request, ready for a transport.
#[derive(Debug, Clone)]
pub struct MarshalledRequest {
    method: Method,
    path: String,
    query_params: Vec<(String, String)>,
    headers: HeaderMap,
    payload: Payload,
}

impl MarshalledRequest {
    /// A request with the given method and already-expanded path.
    pub fn new<S: Into<String>>(method: Method, path: S) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: Vec::new(),
            headers: HeaderMap::new(),
            payload: Payload::None,
        }
    }

    /// Append a query parameter. Parameters keep insertion order; values
    /// are stored raw and percent-encoded by [`uri`](Self::uri).
    pub fn add_query_param<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.query_params.push((key.into(), value.into()));
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query_params
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.payload.as_bytes()
    }

    /// Path plus percent-encoded query string.
    pub fn uri(&self) -> String {
        if self.query_params.is_empty() {
            return self.path.clone();
        }

        let query = self
            .query_params
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    format!("{}=", utf8_percent_encode(k, QUERY_ENCODE))
                } else {
                    format!(
                        "{}={}",
                        utf8_percent_encode(k, QUERY_ENCODE),
                        utf8_percent_encode(v, QUERY_ENCODE)
                    )
                }
            })
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.path, query)
    }
}

/// An HTTP response as received from the transport.
#[derive(Debug, Clone)]
pub struct WireResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl WireResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_without_query() {
        let request = MarshalledRequest::new(Method::GET, "/things/abc");
        assert_eq!(request.uri(), "/things/abc");
    }

    #[test]
    fn test_uri_encodes_query_values() {
        let mut request = MarshalledRequest::new(Method::GET, "/");
        request.add_query_param("prefix", "a b/c");
        request.add_query_param("marker", "");

        assert_eq!(request.uri(), "/?prefix=a%20b%2Fc&marker=");
    }

    #[test]
    fn test_query_param_order_preserved() {
        let mut request = MarshalledRequest::new(Method::GET, "/");
        request.add_query_param("z", "1");
        request.add_query_param("a", "2");

        assert_eq!(request.uri(), "/?z=1&a=2");
    }

    #[test]
    fn test_response_accessors() {
        let response = WireResponse::new(StatusCode::OK).with_body("{}");
        assert!(response.is_success());
        assert_eq!(&response.body()[..], b"{}");
    }
}
