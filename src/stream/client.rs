//! HTTP implementation of the answer stream

use super::error::StreamError;
use super::event::StreamEvent;
use super::sse::SseDecoder;
use super::{until_cancelled, EventSource, EventStream, StreamRequest};
use crate::config::ClientConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const EVENT_STREAM_MIME: &str = "text/event-stream";
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Streams answers from `POST /api/chat/stream`
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: Client,
    url: String,
    user_type: String,
    feature_area: String,
}

impl HttpEventSource {
    /// The client has a connect timeout but no request timeout: an answer
    /// stream may stay silent for a long time without being torn down.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, StreamError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(TCP_KEEPALIVE)
            .build()
            .map_err(|e| StreamError::connect(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.chat_stream_url(),
            user_type: config.user_type.clone(),
            feature_area: config.feature_area.clone(),
        })
    }

    fn build_request(&self, request: &StreamRequest) -> RequestBuilder {
        let body = ChatStreamRequest {
            question: &request.question,
            metadata: RequestMetadata {
                user_type: &self.user_type,
                feature_area: &self.feature_area,
                session_id: request.session_id.to_string(),
                thread_id: request.conversation_id.to_string(),
            },
        };

        self.client
            .post(&self.url)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .json(&body)
    }
}

impl EventSource for HttpEventSource {
    fn open(&self, request: StreamRequest, cancel: CancellationToken) -> EventStream {
        tracing::info!(
            session_id = %request.session_id,
            conv_id = %request.conversation_id,
            url = %self.url,
            "Opening answer stream"
        );

        let initial = Phase::Connect(self.build_request(&request));
        let token = cancel.clone();
        let events = futures::stream::unfold(initial, move |phase| {
            let token = token.clone();
            async move { advance(phase, &token).await }
        });

        until_cancelled(events, cancel)
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ChatStreamRequest<'a> {
    question: &'a str,
    metadata: RequestMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct RequestMetadata<'a> {
    user_type: &'a str,
    feature_area: &'a str,
    session_id: String,
    /// Lets the backend group traces of one conversation
    thread_id: String,
}

// Stream state machine

enum Phase {
    Connect(RequestBuilder),
    Read(Box<Reader>),
    Finished,
}

struct Reader {
    response: Response,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
}

impl Reader {
    fn new(response: Response) -> Self {
        Self {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    fn decode(&mut self, chunk: &[u8]) {
        for frame in self.decoder.feed(chunk) {
            match StreamEvent::decode(&frame.data) {
                Some(StreamEvent::Unrecognized) => {
                    tracing::debug!(data = %frame.data, "Unrecognized stream event");
                    self.pending.push_back(StreamEvent::Unrecognized);
                }
                Some(event) => self.pending.push_back(event),
                None => tracing::debug!(data = %frame.data, "Dropping malformed stream frame"),
            }
        }
    }
}

/// Produce the next event and the phase that follows it.
///
/// Cancellation is checked before every step and raced against every
/// network wait, so nothing is yielded once `cancel` has fired.
async fn advance(mut phase: Phase, cancel: &CancellationToken) -> Option<(StreamEvent, Phase)> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        phase = match phase {
            Phase::Finished => return None,

            Phase::Connect(request) => {
                let result = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return None,
                    result = request.send() => result,
                };
                match result
                    .map_err(|e| StreamError::from_reqwest(&e))
                    .and_then(check_response)
                {
                    Ok(response) => Phase::Read(Box::new(Reader::new(response))),
                    Err(err) => return Some((fail(&err), Phase::Finished)),
                }
            }

            Phase::Read(mut reader) => {
                if let Some(event) = reader.pending.pop_front() {
                    let next = if event.is_terminal() {
                        Phase::Finished
                    } else {
                        Phase::Read(reader)
                    };
                    return Some((event, next));
                }

                let chunk = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return None,
                    chunk = reader.response.chunk() => chunk,
                };
                match chunk {
                    Ok(Some(bytes)) => {
                        reader.decode(&bytes);
                        Phase::Read(reader)
                    }
                    Ok(None) => {
                        if reader.decoder.has_pending() {
                            tracing::debug!("Discarding incomplete trailing frame");
                        }
                        return Some((fail(&StreamError::closed_early()), Phase::Finished));
                    }
                    Err(e) => return Some((fail(&StreamError::from_reqwest(&e)), Phase::Finished)),
                }
            }
        };
    }
}

fn check_response(response: Response) -> Result<Response, StreamError> {
    let status = response.status();
    if !status.is_success() {
        return Err(StreamError::status(format!("HTTP {status}")));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with(EVENT_STREAM_MIME) {
        return Err(StreamError::content_type(format!(
            "Expected {EVENT_STREAM_MIME}, got '{content_type}'"
        )));
    }

    Ok(response)
}

fn fail(err: &StreamError) -> StreamEvent {
    tracing::warn!(
        error = %err,
        kind = ?err.kind,
        mid_stream = err.kind.is_mid_stream(),
        "Answer stream failed"
    );
    StreamEvent::Error(err.message.clone())
}
