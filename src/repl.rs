//! Line-based terminal front-end
//!
//! Reads commands from stdin and prints the store's published state as it
//! changes. Streaming text is printed incrementally; citations follow once
//! the answer is complete.

use docs_portal::{
    ConversationId, MessageId, StoreHandle, StoreSnapshot, SAMPLE_QUERIES,
};
use futures::StreamExt;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::WatchStream;

const HELP: &str = "\
Commands:
  <question>      ask a question
  /new            start a new conversation
  /stop           stop the current answer
  /list           list conversations
  /select <n>     switch to conversation n
  /samples        show sample questions
  /sample <n>     ask sample question n
  /quit           exit";

/// One parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Question(String),
    NewChat,
    Stop,
    List,
    Select(usize),
    Samples,
    Sample(usize),
    Help,
    Quit,
    Invalid(String),
    Empty,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Input::Question(line.to_string());
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let index = parts.next().and_then(|n| n.parse::<usize>().ok());

        match (name, index) {
            ("new", _) => Input::NewChat,
            ("stop", _) => Input::Stop,
            ("list", _) => Input::List,
            ("samples", _) => Input::Samples,
            ("help", _) => Input::Help,
            ("quit" | "exit", _) => Input::Quit,
            ("select", Some(n)) if n > 0 => Input::Select(n),
            ("sample", Some(n)) if n > 0 => Input::Sample(n),
            _ => Input::Invalid(line.to_string()),
        }
    }
}

/// Run the prompt loop until `/quit` or end of input
pub async fn run(store: StoreHandle, health: watch::Receiver<bool>) -> io::Result<()> {
    let (follow_tx, follow_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(render(store.subscribe(), follow_rx));
    let status = tokio::spawn(report_health(health));

    println!("Docs Portal. Type a question, or /help.");
    print_samples();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Empty => {}
            Input::Question(question) => ask(&store, &follow_tx, question).await,
            Input::Sample(n) => match SAMPLE_QUERIES.get(n - 1) {
                Some(question) => ask(&store, &follow_tx, (*question).to_string()).await,
                None => println!("No sample {n}."),
            },
            Input::NewChat => {
                store.new_chat().await;
                println!("(new conversation)");
            }
            Input::Stop => {
                if !store.stop().await {
                    println!("(nothing to stop)");
                }
            }
            Input::List => print_list(&store.snapshot()),
            Input::Select(n) => {
                let target = store.snapshot().conversations.get(n - 1).map(|c| c.id);
                let selected = match target {
                    Some(id) => store.select_conversation(id).await,
                    None => false,
                };
                if selected {
                    print_active(&store.snapshot());
                } else {
                    println!("No conversation {n}.");
                }
            }
            Input::Samples => print_samples(),
            Input::Help => println!("{HELP}"),
            Input::Invalid(text) => println!("Unknown command: {text}"),
            Input::Quit => break,
        }
    }

    renderer.abort();
    status.abort();
    Ok(())
}

async fn ask(store: &StoreHandle, follow: &mpsc::UnboundedSender<ConversationId>, question: String) {
    match store.send(question).await {
        Some(id) => {
            let _ = follow.send(id);
        }
        None => println!("(still answering, /stop to cancel)"),
    }
}

fn print_samples() {
    println!("Try:");
    for (i, query) in SAMPLE_QUERIES.iter().enumerate() {
        println!("  {}. {query}", i + 1);
    }
}

fn print_list(snapshot: &StoreSnapshot) {
    if snapshot.conversations.is_empty() {
        println!("(no conversations)");
        return;
    }
    for (i, conv) in snapshot.conversations.iter().enumerate() {
        let marker = if Some(conv.id) == snapshot.active_conversation_id { '*' } else { ' ' };
        println!("{marker} {}. {}", i + 1, conv.title);
    }
}

fn print_active(snapshot: &StoreSnapshot) {
    let Some(conv) = snapshot.active_conversation() else {
        return;
    };
    println!("== {}", conv.title);
    for message in &conv.messages {
        let who = if message.is_assistant() { "assistant" } else { "you" };
        println!("{who}> {}", message.content);
    }
}

async fn report_health(health: watch::Receiver<bool>) {
    let mut updates = WatchStream::new(health);
    let mut last = None;
    while let Some(connected) = updates.next().await {
        if last != Some(connected) {
            println!("[{}]", if connected { "connected" } else { "disconnected" });
            last = Some(connected);
        }
    }
}

async fn render(
    mut snapshots: watch::Receiver<StoreSnapshot>,
    mut follow: mpsc::UnboundedReceiver<ConversationId>,
) {
    let mut transcript = Transcript::default();
    loop {
        tokio::select! {
            Some(id) = follow.recv() => transcript.follow(id),
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let snapshot = snapshots.borrow_and_update().clone();
        if let Err(e) = transcript.render(&snapshot, &mut io::stdout().lock()) {
            tracing::warn!(error = %e, "Failed to write transcript");
            break;
        }
    }
}

/// Tracks how much of the followed answer has been printed
#[derive(Debug, Default)]
pub struct Transcript {
    conversation: Option<ConversationId>,
    message: Option<MessageId>,
    printed: usize,
    finished: bool,
}

impl Transcript {
    /// Print the answer streaming into `id` from now on
    pub fn follow(&mut self, id: ConversationId) {
        self.conversation = Some(id);
    }

    /// Print whatever the followed answer gained since the last call
    pub fn render(&mut self, snapshot: &StoreSnapshot, out: &mut impl Write) -> io::Result<()> {
        let Some(message) = self
            .conversation
            .and_then(|id| snapshot.conversation(id))
            .and_then(|c| c.last_message())
            .filter(|m| m.is_assistant())
        else {
            return Ok(());
        };

        if self.message != Some(message.id) {
            self.message = Some(message.id);
            self.printed = 0;
            self.finished = false;
            write!(out, "assistant> ")?;
        }
        if self.finished {
            return Ok(());
        }

        if let Some(delta) = message.content.get(self.printed..) {
            write!(out, "{delta}")?;
        }
        self.printed = message.content.len();

        if !message.is_streaming {
            writeln!(out)?;
            for source in message.sources.iter().flatten() {
                writeln!(out, "  [source] {}", source.file)?;
            }
            self.finished = true;
        }
        out.flush()
    }
}
