//! Per-operation wire metadata.
//!
//! An [`OperationBinding`] pairs a request shape with everything the
//! marshaller needs to know about the operation's HTTP binding: method,
//! URI template, payload flags, and XML root handling. Bindings are built
//! once by generated client code and shared read-only across calls.

use http::Method;

/// Wire-level metadata for one API operation.
///
/// # Example
///
/// ```
/// use wireshape_core::OperationBinding;
/// use http::Method;
///
/// let binding = OperationBinding::builder("NestedContainers")
///     .request_uri("/")
///     .http_method(Method::POST)
///     .has_payload_members(true)
///     .build();
///
/// assert_eq!(binding.request_uri(), "/");
/// assert!(!binding.has_explicit_payload_member());
/// ```
#[derive(Debug, Clone)]
pub struct OperationBinding {
    name: String,
    http_method: Method,
    request_uri: String,
    has_explicit_payload_member: bool,
    has_payload_members: bool,
    has_streaming_member: bool,
    use_root_xml_element: bool,
    api_version: Option<String>,
}

impl OperationBinding {
    /// Start building a binding for the named operation.
    ///
    /// Defaults: `POST` to `/`, no payload members, no root XML element.
    pub fn builder<S: Into<String>>(name: S) -> OperationBindingBuilder {
        OperationBindingBuilder {
            name: name.into(),
            http_method: Method::POST,
            request_uri: "/".to_owned(),
            has_explicit_payload_member: false,
            has_payload_members: false,
            has_streaming_member: false,
            use_root_xml_element: false,
            api_version: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn http_method(&self) -> &Method {
        &self.http_method
    }

    /// Request URI template, e.g. `/things/{thingName}`.
    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    /// Whether one member's subtree alone is the request body.
    pub fn has_explicit_payload_member(&self) -> bool {
        self.has_explicit_payload_member
    }

    /// Whether any members serialize into the body at all. Operations
    /// without payload members send no body.
    pub fn has_payload_members(&self) -> bool {
        self.has_payload_members
    }

    pub fn has_streaming_member(&self) -> bool {
        self.has_streaming_member
    }

    /// Whether XML marshalling/unmarshalling wraps/unwraps a root element.
    pub fn use_root_xml_element(&self) -> bool {
        self.use_root_xml_element
    }

    /// Query protocol `Version` parameter.
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }
}

/// Builder for [`OperationBinding`].
#[derive(Debug)]
pub struct OperationBindingBuilder {
    name: String,
    http_method: Method,
    request_uri: String,
    has_explicit_payload_member: bool,
    has_payload_members: bool,
    has_streaming_member: bool,
    use_root_xml_element: bool,
    api_version: Option<String>,
}

impl OperationBindingBuilder {
    pub fn http_method(mut self, method: Method) -> Self {
        self.http_method = method;
        self
    }

    pub fn request_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.request_uri = uri.into();
        self
    }

    pub fn has_explicit_payload_member(mut self, value: bool) -> Self {
        self.has_explicit_payload_member = value;
        self
    }

    pub fn has_payload_members(mut self, value: bool) -> Self {
        self.has_payload_members = value;
        self
    }

    pub fn has_streaming_member(mut self, value: bool) -> Self {
        self.has_streaming_member = value;
        self
    }

    pub fn use_root_xml_element(mut self, value: bool) -> Self {
        self.use_root_xml_element = value;
        self
    }

    pub fn api_version<S: Into<String>>(mut self, version: S) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn build(self) -> OperationBinding {
        OperationBinding {
            name: self.name,
            http_method: self.http_method,
            request_uri: self.request_uri,
            has_explicit_payload_member: self.has_explicit_payload_member,
            has_payload_members: self.has_payload_members,
            has_streaming_member: self.has_streaming_member,
            use_root_xml_element: self.use_root_xml_element,
            api_version: self.api_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let binding = OperationBinding::builder("DescribeThings").build();

        assert_eq!(binding.name(), "DescribeThings");
        assert_eq!(binding.http_method(), &Method::POST);
        assert_eq!(binding.request_uri(), "/");
        assert!(!binding.has_payload_members());
        assert!(!binding.has_streaming_member());
        assert!(!binding.use_root_xml_element());
        assert_eq!(binding.api_version(), None);
    }

    #[test]
    fn test_builder_overrides() {
        let binding = OperationBinding::builder("GetThing")
            .http_method(Method::GET)
            .request_uri("/things/{thingName}")
            .use_root_xml_element(true)
            .api_version("2016-11-15")
            .build();

        assert_eq!(binding.http_method(), &Method::GET);
        assert_eq!(binding.request_uri(), "/things/{thingName}");
        assert!(binding.use_root_xml_element());
        assert_eq!(binding.api_version(), Some("2016-11-15"));
    }
}
