//! Answer stream client
//!
//! Opens one long-lived request per question and turns the server's
//! Server-Sent Events into a cancellable sequence of [`StreamEvent`]s.

mod client;
mod error;
mod event;
mod sse;

pub use client::HttpEventSource;
pub use error::{StreamError, StreamErrorKind};
pub use event::StreamEvent;

use crate::chat::ConversationId;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Decoded events of one session, ending after a terminal event
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Parameters of one streaming exchange
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub question: String,
    /// Fresh per request, only used by the backend for correlation
    pub session_id: Uuid,
    /// Conversation the answer belongs to
    pub conversation_id: ConversationId,
}

impl StreamRequest {
    #[must_use]
    pub fn new(question: impl Into<String>, conversation_id: ConversationId) -> Self {
        Self {
            question: question.into(),
            session_id: Uuid::new_v4(),
            conversation_id,
        }
    }
}

/// Something that can answer a question as a stream of events.
///
/// Implementations never fail to open: transport problems are reported as a
/// single [`StreamEvent::Error`] followed by the end of the stream. Once
/// `cancel` fires, the stream yields nothing more.
pub trait EventSource: Send + Sync {
    fn open(&self, request: StreamRequest, cancel: CancellationToken) -> EventStream;
}

impl<T: EventSource + ?Sized> EventSource for Arc<T> {
    fn open(&self, request: StreamRequest, cancel: CancellationToken) -> EventStream {
        (**self).open(request, cancel)
    }
}

/// End `events` as soon as `cancel` fires, even if items are ready.
///
/// Cancellation is checked before the inner stream on every poll, so buffered
/// events are never delivered after it. The inner stream is dropped at that
/// point, which closes whatever connection it holds even if the caller keeps
/// the returned stream around.
#[must_use]
pub fn until_cancelled<S>(events: S, cancel: CancellationToken) -> EventStream
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    futures::stream::unfold((events.boxed(), cancel), |(mut events, cancel)| async move {
        let event = tokio::select! {
            biased;
            () = cancel.cancelled() => return None,
            event = events.next() => event?,
        };
        Some((event, (events, cancel)))
    })
    .fuse()
    .boxed()
}
