//! Outbound event frame encoding.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use wireshape_core::{Value, end_stream_frame};

use super::EventStreamError;
use super::dispatch::EventStreamDispatcher;

/// One event to send: a discriminator name plus its payload value.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEvent {
    pub name: String,
    pub value: Value,
}

impl OutboundEvent {
    pub fn new<S: Into<String>>(name: S, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// State of the frame encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderState {
    /// Encoding events from the inner stream.
    Streaming,
    /// Need to send the end-stream frame.
    SendEndStream,
    /// All frames have been sent.
    Done,
}

/// Stream adapter that encodes outbound events into framed bytes.
///
/// Wraps a stream of [`OutboundEvent`]s and yields frame bytes suitable
/// for a streaming request body, appending the end-stream frame after
/// the inner stream ends. An event that fails to dispatch or marshall
/// yields a recoverable error item and encoding continues with the next
/// event.
pub struct EventFrameEncoder<S> {
    stream: S,
    dispatcher: Arc<EventStreamDispatcher>,
    state: EncoderState,
}

impl<S> EventFrameEncoder<S> {
    pub fn new(stream: S, dispatcher: Arc<EventStreamDispatcher>) -> Self {
        Self {
            stream,
            dispatcher,
            state: EncoderState::Streaming,
        }
    }
}

impl<S> Unpin for EventFrameEncoder<S> where S: Unpin {}

impl<S> Stream for EventFrameEncoder<S>
where
    S: Stream<Item = OutboundEvent> + Unpin,
{
    type Item = Result<Bytes, EventStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match this.state {
                EncoderState::Done => return Poll::Ready(None),
                EncoderState::SendEndStream => {
                    this.state = EncoderState::Done;
                    return Poll::Ready(Some(Ok(Bytes::from(end_stream_frame()))));
                }
                EncoderState::Streaming => match Pin::new(&mut this.stream).poll_next(cx) {
                    Poll::Ready(Some(event)) => {
                        let marshaller = match this.dispatcher.marshaller_for(&event.name) {
                            Ok(marshaller) => marshaller,
                            Err(err) => {
                                tracing::warn!(
                                    event = %event.name,
                                    "dropping outbound event with no registered type"
                                );
                                return Poll::Ready(Some(Err(err.into())));
                            }
                        };
                        match marshaller.marshall(&event.value) {
                            Ok(frame) => return Poll::Ready(Some(Ok(frame))),
                            Err(source) => {
                                return Poll::Ready(Some(Err(EventStreamError::Marshalling {
                                    name: event.name,
                                    source,
                                })));
                            }
                        }
                    }
                    Poll::Ready(None) => {
                        this.state = EncoderState::SendEndStream;
                    }
                    Poll::Pending => return Poll::Pending,
                },
            }
        }
    }
}
