//! Shape schema model.
//!
//! A [`Shape`] describes one node of a request/response field tree:
//! - [`ShapeKind::Structure`]: an ordered member map with per-member wire
//!   bindings
//! - [`ShapeKind::List`] / [`ShapeKind::Map`]: containers that recurse into
//!   their element/value shapes
//! - [`ShapeKind::Scalar`]: leaf fields written directly
//!
//! Shapes are built once with the builders here, shared via `Arc`, and
//! never mutated afterwards. Marshalling calls on different threads walk
//! the same shape tree concurrently.

use std::sync::Arc;

use indexmap::IndexMap;

/// Leaf field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    /// Raw bytes, base64-encoded in structured bodies.
    Blob,
    Timestamp,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Long => "long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Blob => "blob",
            ScalarKind::Timestamp => "timestamp",
        }
    }
}

/// Wire encoding for timestamp members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampFormat {
    /// `2019-12-16T23:48:18Z`
    #[default]
    Iso8601,
    /// Seconds since the Unix epoch, as a number.
    EpochSeconds,
}

/// Where a structure member is carried in the HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BindingLocation {
    /// Serialized into the structured body (the default).
    #[default]
    Body,
    /// Lifted into the named HTTP header.
    Header(String),
    /// Lifted into the named query string parameter.
    QueryParam(String),
    /// Substituted into the request URI template label of this name.
    UriLabel(String),
}

/// One member of a structure shape: a target shape plus wire bindings.
#[derive(Debug, Clone)]
pub struct Member {
    shape: Arc<Shape>,
    wire_name: Option<String>,
    location: BindingLocation,
    streaming: bool,
    payload: bool,
    xml_attribute: bool,
    timestamp_format: TimestampFormat,
}

impl Member {
    /// A body-bound member with no overrides.
    pub fn new(shape: Arc<Shape>) -> Self {
        Self {
            shape,
            wire_name: None,
            location: BindingLocation::Body,
            streaming: false,
            payload: false,
            xml_attribute: false,
            timestamp_format: TimestampFormat::default(),
        }
    }

    /// Override the wire name (JSON key, XML element, Query key).
    pub fn with_wire_name<S: Into<String>>(mut self, name: S) -> Self {
        self.wire_name = Some(name.into());
        self
    }

    /// Carry this member in the named HTTP header.
    pub fn in_header<S: Into<String>>(mut self, name: S) -> Self {
        self.location = BindingLocation::Header(name.into());
        self
    }

    /// Carry this member in the named query string parameter.
    pub fn in_query<S: Into<String>>(mut self, name: S) -> Self {
        self.location = BindingLocation::QueryParam(name.into());
        self
    }

    /// Substitute this member into the URI template label of this name.
    pub fn in_uri_label<S: Into<String>>(mut self, name: S) -> Self {
        self.location = BindingLocation::UriLabel(name.into());
        self
    }

    /// Mark this member as a streaming body: it bypasses structured
    /// serialization and the transport attaches the byte stream.
    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Mark this member as the explicit payload: its subtree alone becomes
    /// the request body.
    pub fn as_payload(mut self) -> Self {
        self.payload = true;
        self
    }

    /// Serialize as an XML attribute on the enclosing element.
    pub fn as_xml_attribute(mut self) -> Self {
        self.xml_attribute = true;
        self
    }

    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn wire_name(&self) -> Option<&str> {
        self.wire_name.as_deref()
    }

    pub fn location(&self) -> &BindingLocation {
        &self.location
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn is_payload(&self) -> bool {
        self.payload
    }

    pub fn is_xml_attribute(&self) -> bool {
        self.xml_attribute
    }

    pub fn timestamp_format(&self) -> TimestampFormat {
        self.timestamp_format
    }
}

/// A named schema node.
#[derive(Debug)]
pub struct Shape {
    name: String,
    kind: ShapeKind,
}

/// The kind of a shape, with kind-specific data.
#[derive(Debug)]
pub enum ShapeKind {
    Structure(StructureShape),
    List(ListShape),
    Map(MapShape),
    Scalar(ScalarKind),
}

/// Structure kind: ordered members plus XML root metadata.
#[derive(Debug)]
pub struct StructureShape {
    members: IndexMap<String, Member>,
    xml_name: Option<String>,
    xml_namespace: Option<String>,
}

impl StructureShape {
    pub fn members(&self) -> &IndexMap<String, Member> {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// The explicit payload member, if one was declared.
    pub fn payload_member(&self) -> Option<(&str, &Member)> {
        self.members
            .iter()
            .find(|(_, m)| m.is_payload())
            .map(|(n, m)| (n.as_str(), m))
    }

    /// The streaming member, if one was declared.
    pub fn streaming_member(&self) -> Option<(&str, &Member)> {
        self.members
            .iter()
            .find(|(_, m)| m.is_streaming())
            .map(|(n, m)| (n.as_str(), m))
    }

    pub fn has_explicit_payload_member(&self) -> bool {
        self.payload_member().is_some()
    }

    pub fn has_streaming_member(&self) -> bool {
        self.streaming_member().is_some()
    }

    /// Root XML element name used when the operation marshals with a root
    /// element; callers fall back to the shape name when unset.
    pub fn xml_name(&self) -> Option<&str> {
        self.xml_name.as_deref()
    }

    pub fn xml_namespace(&self) -> Option<&str> {
        self.xml_namespace.as_deref()
    }
}

/// List kind: element shape plus XML/Query element naming.
#[derive(Debug)]
pub struct ListShape {
    element: Arc<Shape>,
    element_name: Option<String>,
    flattened: bool,
}

impl ListShape {
    pub fn element(&self) -> &Arc<Shape> {
        &self.element
    }

    /// XML/Query element name for each entry; `member` when not overridden.
    pub fn element_name(&self) -> &str {
        self.element_name.as_deref().unwrap_or("member")
    }

    /// Flattened lists repeat the member element with no enclosing level.
    pub fn is_flattened(&self) -> bool {
        self.flattened
    }
}

/// Map kind: string keys, value shape, entry naming.
#[derive(Debug)]
pub struct MapShape {
    key: Arc<Shape>,
    value: Arc<Shape>,
    key_name: Option<String>,
    value_name: Option<String>,
    flattened: bool,
}

impl MapShape {
    pub fn key(&self) -> &Arc<Shape> {
        &self.key
    }

    pub fn value(&self) -> &Arc<Shape> {
        &self.value
    }

    pub fn key_name(&self) -> &str {
        self.key_name.as_deref().unwrap_or("key")
    }

    pub fn value_name(&self) -> &str {
        self.value_name.as_deref().unwrap_or("value")
    }

    pub fn is_flattened(&self) -> bool {
        self.flattened
    }
}

impl Shape {
    /// A named scalar shape.
    pub fn scalar<S: Into<String>>(name: S, kind: ScalarKind) -> Arc<Shape> {
        Arc::new(Shape {
            name: name.into(),
            kind: ShapeKind::Scalar(kind),
        })
    }

    pub fn string() -> Arc<Shape> {
        Shape::scalar("String", ScalarKind::String)
    }

    pub fn integer() -> Arc<Shape> {
        Shape::scalar("Integer", ScalarKind::Integer)
    }

    pub fn long() -> Arc<Shape> {
        Shape::scalar("Long", ScalarKind::Long)
    }

    pub fn float() -> Arc<Shape> {
        Shape::scalar("Float", ScalarKind::Float)
    }

    pub fn double() -> Arc<Shape> {
        Shape::scalar("Double", ScalarKind::Double)
    }

    pub fn boolean() -> Arc<Shape> {
        Shape::scalar("Boolean", ScalarKind::Boolean)
    }

    pub fn blob() -> Arc<Shape> {
        Shape::scalar("Blob", ScalarKind::Blob)
    }

    pub fn timestamp() -> Arc<Shape> {
        Shape::scalar("Timestamp", ScalarKind::Timestamp)
    }

    /// Start building a structure shape.
    pub fn structure<S: Into<String>>(name: S) -> StructureBuilder {
        StructureBuilder {
            name: name.into(),
            members: IndexMap::new(),
            xml_name: None,
            xml_namespace: None,
        }
    }

    /// Start building a list shape over the given element shape.
    pub fn list<S: Into<String>>(name: S, element: Arc<Shape>) -> ListBuilder {
        ListBuilder {
            name: name.into(),
            element,
            element_name: None,
            flattened: false,
        }
    }

    /// Start building a string-keyed map shape over the given value shape.
    pub fn map<S: Into<String>>(name: S, value: Arc<Shape>) -> MapBuilder {
        MapBuilder {
            name: name.into(),
            key: Shape::string(),
            value,
            key_name: None,
            value_name: None,
            flattened: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Short name of the kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ShapeKind::Structure(_) => "structure",
            ShapeKind::List(_) => "list",
            ShapeKind::Map(_) => "map",
            ShapeKind::Scalar(kind) => kind.as_str(),
        }
    }

    pub fn as_structure(&self) -> Option<&StructureShape> {
        match &self.kind {
            ShapeKind::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListShape> {
        match &self.kind {
            ShapeKind::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapShape> {
        match &self.kind {
            ShapeKind::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<ScalarKind> {
        match &self.kind {
            ShapeKind::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Builder for structure shapes.
pub struct StructureBuilder {
    name: String,
    members: IndexMap<String, Member>,
    xml_name: Option<String>,
    xml_namespace: Option<String>,
}

impl StructureBuilder {
    /// Add a member. Member order is serialization order.
    pub fn member<S: Into<String>>(mut self, name: S, member: Member) -> Self {
        self.members.insert(name.into(), member);
        self
    }

    /// Root XML element name for this structure.
    pub fn xml_name<S: Into<String>>(mut self, name: S) -> Self {
        self.xml_name = Some(name.into());
        self
    }

    /// XML namespace written on the root element.
    pub fn xml_namespace<S: Into<String>>(mut self, uri: S) -> Self {
        self.xml_namespace = Some(uri.into());
        self
    }

    pub fn build(self) -> Arc<Shape> {
        Arc::new(Shape {
            name: self.name,
            kind: ShapeKind::Structure(StructureShape {
                members: self.members,
                xml_name: self.xml_name,
                xml_namespace: self.xml_namespace,
            }),
        })
    }
}

/// Builder for list shapes.
pub struct ListBuilder {
    name: String,
    element: Arc<Shape>,
    element_name: Option<String>,
    flattened: bool,
}

impl ListBuilder {
    /// Override the per-entry element name (`member` by default).
    pub fn element_name<S: Into<String>>(mut self, name: S) -> Self {
        self.element_name = Some(name.into());
        self
    }

    /// Serialize without an enclosing member level.
    pub fn flattened(mut self) -> Self {
        self.flattened = true;
        self
    }

    pub fn build(self) -> Arc<Shape> {
        Arc::new(Shape {
            name: self.name,
            kind: ShapeKind::List(ListShape {
                element: self.element,
                element_name: self.element_name,
                flattened: self.flattened,
            }),
        })
    }
}

/// Builder for map shapes.
pub struct MapBuilder {
    name: String,
    key: Arc<Shape>,
    value: Arc<Shape>,
    key_name: Option<String>,
    value_name: Option<String>,
    flattened: bool,
}

impl MapBuilder {
    /// Override the key shape. The wire requires a string scalar here;
    /// the protocol factory rejects anything else at construction time.
    pub fn key_shape(mut self, key: Arc<Shape>) -> Self {
        self.key = key;
        self
    }

    pub fn key_name<S: Into<String>>(mut self, name: S) -> Self {
        self.key_name = Some(name.into());
        self
    }

    pub fn value_name<S: Into<String>>(mut self, name: S) -> Self {
        self.value_name = Some(name.into());
        self
    }

    /// Serialize entries without an enclosing `entry` level.
    pub fn flattened(mut self) -> Self {
        self.flattened = true;
        self
    }

    pub fn build(self) -> Arc<Shape> {
        Arc::new(Shape {
            name: self.name,
            kind: ShapeKind::Map(MapShape {
                key: self.key,
                value: self.value,
                key_name: self.key_name,
                value_name: self.value_name,
                flattened: self.flattened,
            }),
        })
    }
}
