//! # wireshape
//!
//! A shape-directed protocol marshalling runtime for generated cloud
//! service clients. Given a typed request value and its operation
//! binding, wireshape produces a fully formed HTTP request; given an
//! HTTP response and a shape, it produces a typed value back.
//!
//! ## Features
//!
//! - **Three wire formats:** JSON bodies, REST-XML bodies, and
//!   form-encoded Query requests with XML responses, selected through a
//!   [`ProtocolFactory`].
//! - **HTTP binding traits:** members lift into headers, query string
//!   parameters, and URI template labels; payload and streaming members
//!   bypass structured serialization.
//! - **Construction-time validation:** [`ProtocolFactory::validated`]
//!   walks every reachable shape and rejects unsupported nestings before
//!   the first request is marshalled.
//! - **Event streams:** a tagged-union [`EventStreamDispatcher`] plus
//!   async frame adapters ([`EventFrameEncoder`], [`EventFrameDecoder`])
//!   that survive unknown event types frame by frame.
//!
//! Everything is immutable after construction; marshalling calls on
//! independent requests may run concurrently without locking.
//!
//! [`EventStreamDispatcher`]: eventstream::EventStreamDispatcher
//! [`EventFrameEncoder`]: eventstream::EventFrameEncoder
//! [`EventFrameDecoder`]: eventstream::EventFrameDecoder

pub mod eventstream;
pub mod factory;

mod bind;
mod json;
mod query;
mod text;
mod timestamp;
mod uri;
mod xml;

pub use factory::{ProtocolFactory, WireProtocol};

// Re-export the core model so generated code depends on one crate.
pub use wireshape_core::{
    BindingLocation, ConfigurationError, EnvelopeError, MarshalledRequest, MarshallingError,
    Member, Number, OperationBinding, OperationBindingBuilder, Payload, ScalarKind, Shape,
    ShapeKind, TimestampFormat, UnknownEventTypeError, UnmarshallingError, Value, WireResponse,
};

pub mod prelude {
    //! The most common types in one import.
    pub use crate::eventstream::{
        EventFrameDecoder, EventFrameEncoder, EventStreamDispatcher, OutboundEvent,
    };
    pub use crate::factory::{ProtocolFactory, WireProtocol};
    pub use wireshape_core::{
        Member, OperationBinding, Payload, Shape, Value, WireResponse,
    };
}
