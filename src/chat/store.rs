//! Chat store boundary
//!
//! The store owns the reactive message list the UI renders. A worker
//! thread owns the transport and reports over an event channel; the UI
//! drains events once per frame. Sends are fire-and-forget: a failure
//! is reported and the caller's draft stays untouched.

use crate::chat::types::{Message, OutgoingMessage};
use crate::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::HashSet;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Current user identity and the presence set for the conversation
#[derive(Debug, Clone)]
pub struct AuthState {
    pub user_id: String,
    pub online_users: HashSet<String>,
}

impl AuthState {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            online_users: HashSet::new(),
        }
    }

    pub fn with_online(mut self, ids: &[&str]) -> Self {
        self.online_users = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online_users.contains(user_id)
    }
}

/// Message delivery boundary the worker drives.
///
/// Implementations live behind this trait so the UI never sees a wire
/// protocol; a network client and the in-process transport below are
/// interchangeable.
pub trait ChatTransport: Send {
    /// Conversation history with the given peer.
    fn fetch_messages(&mut self, peer_id: &str) -> Result<Vec<Message>>;

    /// Deliver one message; returns the message as accepted.
    fn send_message(&mut self, message: Message) -> Result<Message>;

    /// Messages pushed by the remote side since the last poll.
    fn poll_incoming(&mut self) -> Result<Vec<Message>>;
}

/// In-process transport: history lives in memory, incoming messages are
/// injected through a channel. Backs tests and offline use.
pub struct LocalTransport {
    history: Vec<Message>,
    incoming_rx: Receiver<Message>,
    echo_peer: Option<String>,
    pending_echo: Vec<Message>,
}

/// Handle for injecting incoming messages into a [`LocalTransport`].
#[derive(Clone)]
pub struct LocalInbox {
    tx: Sender<Message>,
}

impl LocalInbox {
    pub fn deliver(&self, message: Message) {
        let _ = self.tx.send(message);
    }
}

impl LocalTransport {
    pub fn new() -> (Self, LocalInbox) {
        let (tx, incoming_rx) = bounded(64);
        (
            Self {
                history: Vec::new(),
                incoming_rx,
                echo_peer: None,
                pending_echo: Vec::new(),
            },
            LocalInbox { tx },
        )
    }

    /// Have the given peer echo every text send back, so the client is
    /// usable without any remote side.
    pub fn with_echo_peer(mut self, peer_id: impl Into<String>) -> Self {
        self.echo_peer = Some(peer_id.into());
        self
    }
}

impl ChatTransport for LocalTransport {
    fn fetch_messages(&mut self, _peer_id: &str) -> Result<Vec<Message>> {
        Ok(self.history.clone())
    }

    fn send_message(&mut self, message: Message) -> Result<Message> {
        self.history.push(message.clone());

        if let (Some(peer), Some(text)) = (&self.echo_peer, &message.text) {
            // Delivered on the next incoming poll
            let reply = Message::text(peer.clone(), format!("You said: {}", text));
            self.pending_echo.push(reply);
        }

        Ok(message)
    }

    fn poll_incoming(&mut self) -> Result<Vec<Message>> {
        let mut incoming: Vec<Message> = self.incoming_rx.try_iter().collect();
        incoming.extend(self.pending_echo.drain(..));
        self.history.extend(incoming.iter().cloned());
        Ok(incoming)
    }
}

/// Command sent to the store worker
enum StoreCommand {
    Fetch { peer_id: String },
    Send { message: Message },
    Subscribe,
    Unsubscribe,
    Shutdown,
}

/// Event emitted by the store worker
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Initial history load finished
    Loaded(Vec<Message>),

    /// A send was accepted by the transport
    Sent(Message),

    /// A send was rejected; the draft must stay intact
    SendFailed { error: String },

    /// The peer sent a message
    Received(Message),

    /// The worker has shut down
    Shutdown,
}

/// UI-side handle over the transport worker.
pub struct ChatStore {
    messages: Vec<Message>,
    is_loading: bool,
    subscribed: bool,
    command_tx: Sender<StoreCommand>,
    event_rx: Receiver<StoreEvent>,
}

impl ChatStore {
    /// Spawn a worker owning `transport` and return the connected store.
    pub fn spawn(transport: Box<dyn ChatTransport>) -> Self {
        let (command_tx, command_rx) = bounded::<StoreCommand>(64);
        let (event_tx, event_rx) = bounded::<StoreEvent>(64);

        thread::spawn(move || run_worker(transport, command_rx, event_tx));

        Self {
            messages: Vec::new(),
            is_loading: false,
            subscribed: false,
            command_tx,
            event_rx,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Request the conversation history for a peer.
    pub fn get_messages(&mut self, peer_id: &str) {
        self.is_loading = true;
        if self
            .command_tx
            .try_send(StoreCommand::Fetch {
                peer_id: peer_id.to_string(),
            })
            .is_err()
        {
            error!("Chat store worker unavailable");
            self.is_loading = false;
        }
    }

    /// Hand a payload to the transport. Completion arrives later as a
    /// `Sent` or `SendFailed` event.
    pub fn send_message(&mut self, sender_id: &str, payload: OutgoingMessage) {
        let message = Message::outgoing(sender_id, payload);
        if self
            .command_tx
            .try_send(StoreCommand::Send { message })
            .is_err()
        {
            error!("Chat store worker unavailable, message not sent");
        }
    }

    /// Start polling for incoming messages.
    pub fn subscribe(&mut self) {
        if self.subscribed {
            return;
        }
        self.subscribed = true;
        let _ = self.command_tx.try_send(StoreCommand::Subscribe);
    }

    /// Stop polling for incoming messages.
    pub fn unsubscribe(&mut self) {
        if !self.subscribed {
            return;
        }
        self.subscribed = false;
        let _ = self.command_tx.try_send(StoreCommand::Unsubscribe);
    }

    pub fn shutdown(&mut self) {
        let _ = self.command_tx.try_send(StoreCommand::Shutdown);
    }

    /// Drain worker events, apply them to the message list, and return
    /// them so the caller can react (clear the draft, play a cue).
    pub fn poll(&mut self) -> Vec<StoreEvent> {
        let events: Vec<StoreEvent> = self.event_rx.try_iter().collect();

        for event in &events {
            match event {
                StoreEvent::Loaded(messages) => {
                    self.messages = messages.clone();
                    self.is_loading = false;
                }
                StoreEvent::Sent(message) => {
                    self.messages.push(message.clone());
                }
                StoreEvent::SendFailed { error } => {
                    error!("Failed to send message: {}", error);
                }
                StoreEvent::Received(message) => {
                    self.messages.push(message.clone());
                }
                StoreEvent::Shutdown => {
                    debug!("Chat store worker shut down");
                }
            }
        }

        events
    }
}

const INCOMING_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn run_worker(
    mut transport: Box<dyn ChatTransport>,
    command_rx: Receiver<StoreCommand>,
    event_tx: Sender<StoreEvent>,
) {
    info!("Chat store worker started");
    let mut subscribed = false;

    loop {
        let command = if subscribed {
            match command_rx.recv_timeout(INCOMING_POLL_INTERVAL) {
                Ok(command) => Some(command),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => None,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match command_rx.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        match command {
            Some(StoreCommand::Fetch { peer_id }) => match transport.fetch_messages(&peer_id) {
                Ok(messages) => {
                    let _ = event_tx.send(StoreEvent::Loaded(messages));
                }
                Err(e) => {
                    warn!("Failed to load messages: {}", e);
                    let _ = event_tx.send(StoreEvent::Loaded(Vec::new()));
                }
            },
            Some(StoreCommand::Send { message }) => match transport.send_message(message) {
                Ok(accepted) => {
                    let _ = event_tx.send(StoreEvent::Sent(accepted));
                }
                Err(e) => {
                    let _ = event_tx.send(StoreEvent::SendFailed {
                        error: e.to_string(),
                    });
                }
            },
            Some(StoreCommand::Subscribe) => {
                subscribed = true;
            }
            Some(StoreCommand::Unsubscribe) => {
                subscribed = false;
            }
            Some(StoreCommand::Shutdown) => {
                let _ = event_tx.send(StoreEvent::Shutdown);
                break;
            }
            None => {}
        }

        if subscribed {
            match transport.poll_incoming() {
                Ok(incoming) => {
                    for message in incoming {
                        let _ = event_tx.send(StoreEvent::Received(message));
                    }
                }
                Err(e) => {
                    warn!("Failed to poll incoming messages: {}", e);
                }
            }
        }
    }

    info!("Chat store worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParleyError;
    use std::time::Instant;

    fn drain_until<F: Fn(&ChatStore) -> bool>(store: &mut ChatStore, ready: F) -> Vec<StoreEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut all = Vec::new();
        while Instant::now() < deadline {
            all.extend(store.poll());
            if ready(store) {
                return all;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("Store did not reach expected state; events: {:?}", all);
    }

    #[test]
    fn test_fetch_clears_loading_flag() {
        let (transport, _inbox) = LocalTransport::new();

        let mut store = ChatStore::spawn(Box::new(transport));
        store.get_messages("peer");
        assert!(store.is_loading());

        drain_until(&mut store, |s| !s.is_loading());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_send_appends_on_ack() {
        let (transport, _inbox) = LocalTransport::new();
        let mut store = ChatStore::spawn(Box::new(transport));

        store.send_message(
            "me",
            OutgoingMessage {
                text: "hello".into(),
                image: None,
            },
        );

        drain_until(&mut store, |s| !s.messages().is_empty());
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].sender_id, "me");
        assert_eq!(store.messages()[0].text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_subscription_delivers_incoming() {
        let (transport, inbox) = LocalTransport::new();
        let mut store = ChatStore::spawn(Box::new(transport));

        store.subscribe();
        inbox.deliver(Message::text("peer", "ping"));

        drain_until(&mut store, |s| !s.messages().is_empty());
        assert_eq!(store.messages()[0].sender_id, "peer");
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (transport, inbox) = LocalTransport::new();
        let mut store = ChatStore::spawn(Box::new(transport));

        store.subscribe();
        store.unsubscribe();
        thread::sleep(Duration::from_millis(150));

        inbox.deliver(Message::text("peer", "late"));
        thread::sleep(Duration::from_millis(200));
        store.poll();
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_send_failure_reported_not_applied() {
        struct RejectingTransport;
        impl ChatTransport for RejectingTransport {
            fn fetch_messages(&mut self, _peer_id: &str) -> Result<Vec<Message>> {
                Ok(Vec::new())
            }
            fn send_message(&mut self, _message: Message) -> Result<Message> {
                Err(ParleyError::SendError("connection refused".into()))
            }
            fn poll_incoming(&mut self) -> Result<Vec<Message>> {
                Ok(Vec::new())
            }
        }

        let mut store = ChatStore::spawn(Box::new(RejectingTransport));
        store.send_message(
            "me",
            OutgoingMessage {
                text: "doomed".into(),
                image: None,
            },
        );

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut saw_failure = false;
        while Instant::now() < deadline && !saw_failure {
            for event in store.poll() {
                if matches!(event, StoreEvent::SendFailed { .. }) {
                    saw_failure = true;
                }
            }
            thread::sleep(Duration::from_millis(5));
        }

        assert!(saw_failure);
        assert!(store.messages().is_empty());
    }

    #[test]
    fn test_auth_presence() {
        let auth = AuthState::new("me").with_online(&["me", "peer"]);
        assert!(auth.is_online("peer"));
        assert!(!auth.is_online("stranger"));
    }
}
