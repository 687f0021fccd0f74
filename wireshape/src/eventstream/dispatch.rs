//! Event name to payload shape dispatch.

use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexMap;
use wireshape_core::{
    ConfigurationError, MAX_EVENT_NAME_LEN, MarshallingError, Shape, UnknownEventTypeError,
    UnmarshallingError, wrap_event_frame,
};

use crate::factory::WireProtocol;
use crate::{json, xml};

/// Payload encoding for event frames.
///
/// Derived from the wire protocol at build time; the Query protocol has
/// no event encoding and is rejected by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventEncoding {
    Json,
    Xml,
}

/// Immutable mapping from event name to payload shape.
///
/// Built once with [`builder`](EventStreamDispatcher::builder), validated
/// for completeness at construction, and shared read-only by encoder and
/// decoder. Holds no per-call state, so resuming a stream after
/// cancellation reuses it as-is.
#[derive(Debug, Clone)]
pub struct EventStreamDispatcher {
    encoding: EventEncoding,
    events: IndexMap<String, Arc<Shape>>,
}

impl EventStreamDispatcher {
    pub fn builder() -> EventStreamDispatcherBuilder {
        EventStreamDispatcherBuilder {
            protocol: WireProtocol::Json,
            events: Vec::new(),
        }
    }

    /// Registered event names, in registration order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    pub fn contains(&self, event_name: &str) -> bool {
        self.events.contains_key(event_name)
    }

    /// The payload shape registered for an event name.
    ///
    /// # Errors
    /// Fails with [`UnknownEventTypeError`] for unregistered names; the
    /// caller reports it and continues with the next frame.
    pub fn shape_for(&self, event_name: &str) -> Result<&Arc<Shape>, UnknownEventTypeError> {
        self.events
            .get(event_name)
            .ok_or_else(|| UnknownEventTypeError::new(event_name))
    }

    /// The outbound marshaller for an event name.
    pub fn marshaller_for(
        &self,
        event_name: &str,
    ) -> Result<EventMarshaller<'_>, UnknownEventTypeError> {
        let (name, shape) = self
            .events
            .get_key_value(event_name)
            .ok_or_else(|| UnknownEventTypeError::new(event_name))?;
        Ok(EventMarshaller {
            name: name.as_str(),
            shape,
            encoding: self.encoding,
        })
    }

    /// The inbound unmarshaller for an event name.
    pub fn unmarshaller_for(
        &self,
        event_name: &str,
    ) -> Result<EventUnmarshaller<'_>, UnknownEventTypeError> {
        let (name, shape) = self
            .events
            .get_key_value(event_name)
            .ok_or_else(|| UnknownEventTypeError::new(event_name))?;
        Ok(EventUnmarshaller {
            name: name.as_str(),
            shape,
            encoding: self.encoding,
        })
    }
}

/// Builder for [`EventStreamDispatcher`].
#[derive(Debug)]
pub struct EventStreamDispatcherBuilder {
    protocol: WireProtocol,
    events: Vec<(String, Arc<Shape>)>,
}

impl EventStreamDispatcherBuilder {
    /// Payload encoding protocol; JSON by default.
    pub fn protocol(mut self, protocol: WireProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Register an event name with its payload shape.
    pub fn event<S: Into<String>>(mut self, name: S, shape: Arc<Shape>) -> Self {
        self.events.push((name.into(), shape));
        self
    }

    /// Validate the event set and build the dispatch table.
    ///
    /// # Errors
    /// Fails with [`ConfigurationError`] on an empty set, duplicate or
    /// unframeable names, or a protocol without an event encoding.
    pub fn build(self) -> Result<EventStreamDispatcher, ConfigurationError> {
        let encoding = match self.protocol {
            WireProtocol::Json => EventEncoding::Json,
            WireProtocol::RestXml => EventEncoding::Xml,
            WireProtocol::Query => {
                return Err(ConfigurationError::UnsupportedEventProtocol {
                    protocol: self.protocol.as_str(),
                });
            }
        };

        if self.events.is_empty() {
            return Err(ConfigurationError::EmptyEventSet);
        }

        let mut events = IndexMap::with_capacity(self.events.len());
        for (name, shape) in self.events {
            if name.is_empty() {
                return Err(ConfigurationError::InvalidEventName {
                    name,
                    reason: "event names cannot be empty".to_owned(),
                });
            }
            if name.len() > MAX_EVENT_NAME_LEN {
                return Err(ConfigurationError::InvalidEventName {
                    name,
                    reason: format!("event names are limited to {MAX_EVENT_NAME_LEN} bytes"),
                });
            }
            if events.insert(name.clone(), shape).is_some() {
                return Err(ConfigurationError::DuplicateEvent { name });
            }
        }

        Ok(EventStreamDispatcher { encoding, events })
    }
}

/// Marshals one event kind into framed bytes.
#[derive(Debug, Clone, Copy)]
pub struct EventMarshaller<'a> {
    name: &'a str,
    shape: &'a Arc<Shape>,
    encoding: EventEncoding,
}

impl EventMarshaller<'_> {
    pub fn event_name(&self) -> &str {
        self.name
    }

    /// Serialize the payload and wrap it in a frame envelope.
    pub fn marshall(&self, value: &wireshape_core::Value) -> Result<Bytes, MarshallingError> {
        let payload = match self.encoding {
            EventEncoding::Json => json::serialize_document(value, self.shape)?,
            EventEncoding::Xml => xml::serialize_document(value, self.shape)?,
        };
        wrap_event_frame(self.name, &payload)
            .map(Bytes::from)
            .map_err(MarshallingError::serialization)
    }
}

/// Unmarshals one event kind's payload bytes.
#[derive(Debug, Clone, Copy)]
pub struct EventUnmarshaller<'a> {
    name: &'a str,
    shape: &'a Arc<Shape>,
    encoding: EventEncoding,
}

impl EventUnmarshaller<'_> {
    pub fn event_name(&self) -> &str {
        self.name
    }

    /// Parse an event payload into a typed value.
    pub fn unmarshall(
        &self,
        payload: &[u8],
    ) -> Result<wireshape_core::Value, UnmarshallingError> {
        match self.encoding {
            EventEncoding::Json => json::parse_document(payload, self.shape),
            EventEncoding::Xml => {
                let root = self
                    .shape
                    .as_structure()
                    .and_then(|s| s.xml_name())
                    .unwrap_or_else(|| self.shape.name());
                xml::parse_document(payload, self.shape, Some(root))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wireshape_core::{Member, Value};

    fn record_shape() -> Arc<Shape> {
        Shape::structure("RecordEvent")
            .member("Data", Member::new(Shape::string()))
            .build()
    }

    fn stats_shape() -> Arc<Shape> {
        Shape::structure("StatsEvent")
            .member("BytesScanned", Member::new(Shape::long()))
            .build()
    }

    fn dispatcher() -> EventStreamDispatcher {
        EventStreamDispatcher::builder()
            .event("Records", record_shape())
            .event("Stats", stats_shape())
            .build()
            .unwrap()
    }

    #[test]
    fn test_registered_names_dispatch() {
        let dispatcher = dispatcher();
        assert!(dispatcher.marshaller_for("Records").is_ok());
        assert!(dispatcher.unmarshaller_for("Stats").is_ok());
    }

    #[test]
    fn test_unregistered_name_is_recoverable_error() {
        let dispatcher = dispatcher();
        let err = dispatcher.marshaller_for("Progress").unwrap_err();
        assert_eq!(err.event_name, "Progress");
    }

    #[test]
    fn test_empty_event_set_rejected() {
        let err = EventStreamDispatcher::builder().build().unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyEventSet);
    }

    #[test]
    fn test_duplicate_event_rejected() {
        let err = EventStreamDispatcher::builder()
            .event("Records", record_shape())
            .event("Records", record_shape())
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateEvent { name } if name == "Records"));
    }

    #[test]
    fn test_query_protocol_rejected() {
        let err = EventStreamDispatcher::builder()
            .protocol(WireProtocol::Query)
            .event("Records", record_shape())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnsupportedEventProtocol { protocol: "query" }
        ));
    }

    #[test]
    fn test_marshall_unmarshall_round_trip() {
        let dispatcher = dispatcher();
        let value = Value::from_entries([("Data", Value::from("payload"))]);

        let framed = dispatcher
            .marshaller_for("Records")
            .unwrap()
            .marshall(&value)
            .unwrap();
        let frame = wireshape_core::split_event_frame(&framed).unwrap();
        assert_eq!(frame.name, "Records");

        let parsed = dispatcher
            .unmarshaller_for("Records")
            .unwrap()
            .unmarshall(&frame.payload)
            .unwrap();
        assert_eq!(parsed, value);
    }
}
