//! Conversation store
//!
//! Owns every conversation and the active-conversation pointer, runs at most
//! one answer stream at a time and publishes a [`StoreSnapshot`] after each
//! change. The presentation layer talks to it through a cloneable
//! [`StoreHandle`].

mod runtime;
mod state;

pub use state::{ConversationState, StoreSnapshot};

use crate::chat::ConversationId;
use crate::stream::EventSource;
use runtime::{Command, StoreRuntime};
use tokio::sync::{mpsc, oneshot, watch};

const COMMAND_BUFFER: usize = 32;

/// Constructor for the store task
pub struct ConversationStore;

impl ConversationStore {
    /// Start the store on the current runtime.
    ///
    /// The store lives until [`StoreHandle::shutdown`] is called or every
    /// handle has been dropped; either way an in-flight stream is cancelled.
    #[must_use]
    pub fn spawn<E>(source: E) -> StoreHandle
    where
        E: EventSource + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(StoreSnapshot::default());

        tokio::spawn(StoreRuntime::new(source, command_rx, snapshot_tx).run());

        StoreHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
        }
    }
}

/// Command surface and state feed of a running store
#[derive(Clone)]
pub struct StoreHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<StoreSnapshot>,
}

impl StoreHandle {
    /// Ask a question.
    ///
    /// Returns the conversation the answer streams into, or `None` when the
    /// question is blank or another answer is still streaming. Stream
    /// failures never surface here; they end up in the answer message.
    pub async fn send(&self, question: impl Into<String>) -> Option<ConversationId> {
        let question = question.into();
        self.request(|reply| Command::Send { question, reply })
            .await
            .flatten()
    }

    /// Cancel the in-flight answer, keeping whatever text already arrived.
    ///
    /// Once this returns no further event of that stream is applied.
    /// Returns `false` when nothing was streaming.
    pub async fn stop(&self) -> bool {
        self.request(|reply| Command::Stop { reply })
            .await
            .unwrap_or(false)
    }

    /// Deselect the active conversation so the next question starts a new one
    pub async fn new_chat(&self) {
        self.request(|reply| Command::NewChat { reply }).await;
    }

    /// Make an existing conversation active. Unknown ids return `false`.
    pub async fn select_conversation(&self, id: ConversationId) -> bool {
        self.request(|reply| Command::Select { id, reply })
            .await
            .unwrap_or(false)
    }

    /// Stop the store, cancelling any in-flight answer
    pub async fn shutdown(&self) {
        self.request(|reply| Command::Shutdown { reply }).await;
    }

    /// Latest published state
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified after every published change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.snapshot.clone()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.commands.send(build(reply_tx)).await.is_err() {
            tracing::warn!("Conversation store is not running");
            return None;
        }
        reply_rx.await.ok()
    }
}
