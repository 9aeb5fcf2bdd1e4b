//! Command loop that owns the conversation state
//!
//! Commands from store handles and events from the active answer stream are
//! processed one at a time on a single task, so there is exactly one writer
//! and folds never overlap.

use super::state::{ConversationState, StoreSnapshot};
use crate::chat::ConversationId;
use crate::stream::{EventSource, EventStream, StreamEvent, StreamRequest};
use futures::StreamExt;
use std::ops::ControlFlow;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Requests sent from a handle to the command loop
pub(super) enum Command {
    Send {
        question: String,
        reply: oneshot::Sender<Option<ConversationId>>,
    },
    Stop {
        reply: oneshot::Sender<bool>,
    },
    NewChat {
        reply: oneshot::Sender<()>,
    },
    Select {
        id: ConversationId,
        reply: oneshot::Sender<bool>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// The in-flight answer stream and the conversation it writes to
struct StreamSession {
    conversation_id: ConversationId,
    session_id: Uuid,
    cancel: CancellationToken,
    events: EventStream,
}

pub(super) struct StoreRuntime<E: EventSource> {
    state: ConversationState,
    source: E,
    session: Option<StreamSession>,
    command_rx: mpsc::Receiver<Command>,
    snapshot_tx: watch::Sender<StoreSnapshot>,
}

impl<E: EventSource + 'static> StoreRuntime<E> {
    pub(super) fn new(
        source: E,
        command_rx: mpsc::Receiver<Command>,
        snapshot_tx: watch::Sender<StoreSnapshot>,
    ) -> Self {
        Self {
            state: ConversationState::new(),
            source,
            session: None,
            command_rx,
            snapshot_tx,
        }
    }

    pub(super) async fn run(mut self) {
        tracing::info!("Conversation store started");

        loop {
            tokio::select! {
                // Commands first: a stop that is already queued wins over
                // stream events that are already buffered.
                biased;

                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        self.cancel_session("all handles dropped");
                        break;
                    };
                    if self.handle_command(command).is_break() {
                        break;
                    }
                }

                event = next_event(&mut self.session) => self.handle_event(event),
            }
        }

        tracing::info!("Conversation store stopped");
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Send { question, reply } => {
                let _ = reply.send(self.send(&question));
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.cancel_session("user stop"));
            }
            Command::NewChat { reply } => {
                self.state.new_chat();
                self.publish();
                let _ = reply.send(());
            }
            Command::Select { id, reply } => {
                let selected = self.state.select(id);
                if selected {
                    self.publish();
                } else {
                    tracing::debug!(conv_id = %id, "Ignoring selection of unknown conversation");
                }
                let _ = reply.send(selected);
            }
            Command::Shutdown { reply } => {
                self.cancel_session("shutdown");
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn send(&mut self, question: &str) -> Option<ConversationId> {
        let question = question.trim();
        if question.is_empty() {
            tracing::debug!("Ignoring empty question");
            return None;
        }
        if let Some(active) = &self.session {
            tracing::debug!(
                session_id = %active.session_id,
                "Rejecting question while an answer is streaming"
            );
            return None;
        }

        let conversation_id = self.state.start_conversation(question);
        let request = StreamRequest::new(question, conversation_id);
        let session_id = request.session_id;
        let cancel = CancellationToken::new();
        let events = self.source.open(request, cancel.clone());

        tracing::info!(conv_id = %conversation_id, session_id = %session_id, "Answer stream started");
        self.session = Some(StreamSession {
            conversation_id,
            session_id,
            cancel,
            events,
        });
        self.publish();
        Some(conversation_id)
    }

    /// Tear down the active session and settle its answer.
    ///
    /// Dropping the event stream here means no event of that session can be
    /// folded afterwards, whatever the transport still has buffered.
    fn cancel_session(&mut self, reason: &str) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        session.cancel.cancel();
        drop(session.events);

        self.state.finish(session.conversation_id);
        tracing::info!(
            conv_id = %session.conversation_id,
            session_id = %session.session_id,
            reason,
            "Answer stream cancelled"
        );
        self.publish();
        true
    }

    fn handle_event(&mut self, event: Option<StreamEvent>) {
        let Some(session) = &self.session else {
            return;
        };
        let conversation_id = session.conversation_id;
        let session_id = session.session_id;

        let event = event.unwrap_or_else(|| {
            tracing::warn!(
                conv_id = %conversation_id,
                session_id = %session_id,
                "Answer stream ended without a terminal event"
            );
            StreamEvent::Error("Stream ended unexpectedly".to_string())
        });

        match &event {
            StreamEvent::Unrecognized => return,
            StreamEvent::Error(message) => tracing::warn!(
                conv_id = %conversation_id,
                session_id = %session_id,
                error = %message,
                "Answer stream failed"
            ),
            StreamEvent::Done => tracing::info!(
                conv_id = %conversation_id,
                session_id = %session_id,
                "Answer stream finished"
            ),
            StreamEvent::Token(_) | StreamEvent::Sources(_) => {}
        }

        self.state.apply(conversation_id, &event);
        if event.is_terminal() {
            self.session = None;
        }
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(self.state.snapshot(self.session.is_some()));
    }
}

/// Next event of the active session; never resolves when idle
async fn next_event(session: &mut Option<StreamSession>) -> Option<StreamEvent> {
    match session {
        Some(session) => session.events.next().await,
        None => std::future::pending().await,
    }
}
