//! Error taxonomy for marshalling, unmarshalling, and dispatch.
//!
//! - [`MarshallingError`]: serialization failed; fatal to the single
//!   request, never to the process
//! - [`UnmarshallingError`]: malformed response body; fatal to the single
//!   response
//! - [`UnknownEventTypeError`]: recoverable per-frame dispatch miss
//! - [`ConfigurationError`]: a construction-time defect, never expected at
//!   steady state
//! - [`EnvelopeError`]: event frame framing errors
//!
//! Marshalling and unmarshalling errors are wrapped with the operation
//! name via `in_operation` before they surface to the caller.

/// A dynamic source error from an underlying serializer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Serialization of a request failed.
#[derive(Debug, thiserror::Error)]
pub enum MarshallingError {
    /// The underlying serializer rejected the body.
    #[error("failed to serialize request body: {source}")]
    Serialization {
        #[source]
        source: BoxError,
    },

    /// The value tree does not match the shape tree.
    #[error("value for shape `{shape}` has the wrong kind: expected {expected}, found {found}")]
    UnsupportedValue {
        shape: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The URI template references a label no member filled in.
    #[error("request URI references unbound path label `{name}`")]
    MissingPathLabel { name: String },

    /// A header-bound member could not be encoded as an HTTP header value.
    #[error("member `{member}` cannot be carried as an HTTP header")]
    InvalidHeaderValue { member: String },

    /// Context wrapper naming the failing operation.
    #[error("unable to marshall request for operation `{operation}`: {source}")]
    InOperation {
        operation: String,
        #[source]
        source: Box<MarshallingError>,
    },
}

impl MarshallingError {
    pub fn serialization<E: Into<BoxError>>(source: E) -> Self {
        MarshallingError::Serialization {
            source: source.into(),
        }
    }

    /// Wrap with the operation name. Already-wrapped errors pass through.
    pub fn in_operation<S: Into<String>>(self, operation: S) -> Self {
        match self {
            err @ MarshallingError::InOperation { .. } => err,
            err => MarshallingError::InOperation {
                operation: operation.into(),
                source: Box::new(err),
            },
        }
    }
}

/// Parsing a response into a typed value failed.
#[derive(Debug, thiserror::Error)]
pub enum UnmarshallingError {
    /// The body is not well-formed for the protocol's format.
    #[error("failed to parse response body: {source}")]
    Deserialization {
        #[source]
        source: BoxError,
    },

    /// A present field has the wrong kind for its shape.
    #[error("response value at `{path}` has the wrong kind: expected {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
    },

    /// The XML root element the operation expects is absent.
    #[error("response is missing expected root element `{expected}`")]
    MissingRootElement { expected: String },

    /// A header-bound member carries a value that is not valid for its shape.
    #[error("response header `{header}` could not be parsed")]
    InvalidHeader { header: String },

    /// Context wrapper naming the failing operation.
    #[error("unable to unmarshall response for operation `{operation}`: {source}")]
    InOperation {
        operation: String,
        #[source]
        source: Box<UnmarshallingError>,
    },
}

impl UnmarshallingError {
    pub fn deserialization<E: Into<BoxError>>(source: E) -> Self {
        UnmarshallingError::Deserialization {
            source: source.into(),
        }
    }

    /// Wrap with the operation name. Already-wrapped errors pass through.
    pub fn in_operation<S: Into<String>>(self, operation: S) -> Self {
        match self {
            err @ UnmarshallingError::InOperation { .. } => err,
            err => UnmarshallingError::InOperation {
                operation: operation.into(),
                source: Box::new(err),
            },
        }
    }
}

/// An event frame named an event with no registered mapping.
///
/// Recoverable: the decoder reports the frame and continues with the
/// next one; a single unknown event never terminates the stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no event type registered for `{event_name}`")]
pub struct UnknownEventTypeError {
    pub event_name: String,
}

impl UnknownEventTypeError {
    pub fn new<S: Into<String>>(event_name: S) -> Self {
        Self {
            event_name: event_name.into(),
        }
    }
}

/// A construction-time defect in shapes or dispatch tables.
///
/// Raised while building a protocol factory or event dispatcher, never
/// during steady-state marshalling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A reachable shape cannot be serialized by the selected protocol.
    #[error("shape `{shape}` is not supported by the {protocol} protocol: {reason}")]
    UnsupportedShape {
        shape: String,
        protocol: &'static str,
        reason: String,
    },

    /// The same event name was registered twice.
    #[error("event `{name}` is registered more than once")]
    DuplicateEvent { name: String },

    /// An event name that cannot be carried in a frame envelope.
    #[error("`{name}` is not a valid event name: {reason}")]
    InvalidEventName { name: String, reason: String },

    /// An event dispatch table with no entries is useless.
    #[error("event stream dispatch table has no registered events")]
    EmptyEventSet,

    /// The protocol has no event payload encoding.
    #[error("the {protocol} protocol cannot encode event streams")]
    UnsupportedEventProtocol { protocol: &'static str },
}

/// Event frame framing errors.
///
/// Unlike an unknown event name, framing corruption is fatal to the
/// stream: once the byte boundaries are lost there is no next frame to
/// resynchronize on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("event name length {len} exceeds maximum {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("invalid event frame flags: 0x{flags:02x}")]
    InvalidFlags { flags: u8 },

    #[error("event name is not valid UTF-8")]
    InvalidName,

    #[error("truncated event frame: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}
