//! Mock collaborators for testing
//!
//! These mocks let the store and the health monitor run without a backend.

use crate::health::HealthProbe;
use crate::stream::{until_cancelled, EventSource, EventStream, StreamEvent, StreamRequest};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scripted Event Source
// ============================================================================

/// Event source whose sessions are fed by the test through channels.
///
/// Each call to `open` consumes the next scripted session. Events pushed into
/// the returned sender are delivered in order; dropping the sender ends the
/// stream without a terminal event.
#[derive(Default)]
pub struct ScriptedEventSource {
    sessions: Mutex<VecDeque<mpsc::UnboundedReceiver<StreamEvent>>>,
    requests: Mutex<Vec<StreamRequest>>,
    cancel_tokens: Mutex<Vec<CancellationToken>>,
}

impl ScriptedEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a session and return the sender that drives it
    pub fn script_session(&self) -> mpsc::UnboundedSender<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.lock().unwrap().push_back(rx);
        tx
    }

    /// Queue a session whose events are all available immediately
    pub fn script_events(&self, events: impl IntoIterator<Item = StreamEvent>) {
        let tx = self.script_session();
        for event in events {
            tx.send(event).unwrap();
        }
    }

    pub fn recorded_requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Cancellation tokens handed to each opened session, in order
    pub fn cancel_tokens(&self) -> Vec<CancellationToken> {
        self.cancel_tokens.lock().unwrap().clone()
    }
}

impl EventSource for ScriptedEventSource {
    fn open(&self, request: StreamRequest, cancel: CancellationToken) -> EventStream {
        self.requests.lock().unwrap().push(request);
        self.cancel_tokens.lock().unwrap().push(cancel.clone());

        match self.sessions.lock().unwrap().pop_front() {
            Some(rx) => until_cancelled(UnboundedReceiverStream::new(rx), cancel),
            None => until_cancelled(
                futures::stream::iter([StreamEvent::Error("No scripted session".to_string())]),
                cancel,
            ),
        }
    }
}

// ============================================================================
// Scripted Health Probe
// ============================================================================

/// Health probe returning queued results, then repeating the last one
pub struct ScriptedProbe {
    results: Mutex<VecDeque<bool>>,
    last: Mutex<bool>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProbe {
    pub fn new(results: impl IntoIterator<Item = bool>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
            last: Mutex::new(false),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of completed probes
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn probe(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.results.lock().unwrap().pop_front() {
            *last = next;
        }
        *last
    }
}
