use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::constants::{self, GREETING, SUGGESTIONS};
use crate::errors::SessionError;
use crate::resolver::{ResolvedResponse, ResponseResolver, ResponseSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Ready,
    Loading,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Local>,
    // Only set on assistant answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_emergency: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Local::now(),
            is_emergency: None,
            source: None,
        }
    }

    fn greeting() -> Self {
        Self {
            sender: Sender::Assistant,
            ..Self::user(GREETING)
        }
    }

    pub fn from_response(response: ResolvedResponse) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Assistant,
            text: response.text,
            timestamp: Local::now(),
            is_emergency: Some(response.is_emergency),
            source: Some(response.source),
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.is_emergency.unwrap_or(false)
    }

    pub fn source_label(&self) -> Option<&'static str> {
        self.source.map(|s| s.label())
    }

    pub fn display_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

/// State of one conversation, from greeting to page reload.
#[derive(Debug)]
pub struct ChatSession {
    input: String,
    messages: Vec<Message>,
    status: ConnectionStatus,
    in_flight: bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            input: String::new(),
            messages: vec![Message::greeting()],
            status: ConnectionStatus::Ready,
            in_flight: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }

    /// Copies a canned phrase into the input buffer. Nothing is sent.
    pub fn apply_suggestion(&mut self, index: usize) -> Result<&'static str, SessionError> {
        let phrase = SUGGESTIONS
            .get(index)
            .copied()
            .ok_or(SessionError::UnknownSuggestion(index))?;
        self.input = phrase.to_string();
        Ok(phrase)
    }

    /// Records the user's message and marks a request as outstanding.
    /// Whitespace only decides emptiness; the text is stored as typed.
    pub fn begin_submission(&mut self, text: &str) -> Result<Message, SessionError> {
        if self.in_flight {
            return Err(SessionError::Busy);
        }
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }

        let message = Message::user(text);
        self.messages.push(message.clone());
        self.input.clear();
        self.status = ConnectionStatus::Loading;
        self.in_flight = true;
        Ok(message)
    }

    pub fn complete_submission(&mut self, response: ResolvedResponse) -> Message {
        self.status = match response.source {
            ResponseSource::Remote => ConnectionStatus::Ready,
            ResponseSource::Local | ResponseSource::Error => ConnectionStatus::Error,
        };
        let message = Message::from_response(response);
        self.messages.push(message.clone());
        self.in_flight = false;
        message
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Pushed to every subscriber (WebSocket clients) as the conversation changes.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum SessionEvent {
    MessageAppended(Message),
    StatusChanged(ConnectionStatus),
}

/// One user message and the answer it produced.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub user: Message,
    pub assistant: Message,
}

/// Shared handle over a session and its resolver.
#[derive(Clone)]
pub struct ChatService {
    session: Arc<Mutex<ChatSession>>,
    resolver: Arc<ResponseResolver>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatService {
    pub fn new(resolver: ResponseResolver) -> Self {
        Self::with_shared_resolver(Arc::new(resolver))
    }

    /// Fresh conversation over a resolver shared with other sessions.
    pub fn with_shared_resolver(resolver: Arc<ResponseResolver>) -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            session: Arc::new(Mutex::new(ChatSession::new())),
            resolver,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn remote_configured(&self) -> bool {
        self.resolver.remote_configured()
    }

    pub fn loading_hint(&self) -> &'static str {
        if self.remote_configured() {
            constants::LOADING_HINT_REMOTE
        } else {
            constants::LOADING_HINT_LOCAL
        }
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.session.lock().await.messages().to_vec()
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.session.lock().await.status()
    }

    pub async fn set_input(&self, text: &str) {
        self.session.lock().await.set_input(text);
    }

    pub async fn take_input(&self) -> String {
        self.session.lock().await.take_input()
    }

    pub async fn apply_suggestion(&self, index: usize) -> Result<&'static str, SessionError> {
        self.session.lock().await.apply_suggestion(index)
    }

    /// Sends one message through the resolver. The session lock is not held while
    /// the answer is being produced.
    ///
    /// Resolution and completion run in their own task, so a caller that stops
    /// waiting (a dropped HTTP request, a timeout) never leaves the session busy.
    /// The answer is still recorded and published to subscribers.
    pub async fn submit(&self, text: &str) -> Result<Exchange, SessionError> {
        let user = self.session.lock().await.begin_submission(text)?;
        info!(chars = user.text.len(), "User message submitted");
        self.publish(SessionEvent::MessageAppended(user.clone()));
        self.publish(SessionEvent::StatusChanged(ConnectionStatus::Loading));

        let service = self.clone();
        let question = user.text.clone();
        let task = tokio::spawn(async move {
            let response = service.resolver.resolve_guarded(&question).await;
            service.complete(response).await
        });

        let assistant = match task.await {
            Ok(assistant) => assistant,
            Err(e) => {
                warn!("Submission task aborted: {}", e);
                self.complete(ResolvedResponse::degraded(&user.text)).await
            }
        };

        Ok(Exchange { user, assistant })
    }

    async fn complete(&self, response: ResolvedResponse) -> Message {
        let (assistant, status) = {
            let mut session = self.session.lock().await;
            let assistant = session.complete_submission(response);
            (assistant, session.status())
        };
        self.publish(SessionEvent::MessageAppended(assistant.clone()));
        self.publish(SessionEvent::StatusChanged(status));
        assistant
    }

    fn publish(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("No subscribers for session event");
        }
    }
}

/// Conversations opened by page loads, keyed by id. Every session shares one
/// resolver. The oldest sessions are dropped once `capacity` is exceeded.
#[derive(Clone)]
pub struct SessionRegistry {
    resolver: Arc<ResponseResolver>,
    sessions: Arc<Mutex<Sessions>>,
    capacity: usize,
}

#[derive(Default)]
struct Sessions {
    by_id: HashMap<Uuid, ChatService>,
    order: VecDeque<Uuid>,
}

impl SessionRegistry {
    pub fn new(resolver: ResponseResolver) -> Self {
        Self::with_capacity(resolver, constants::MAX_SESSIONS)
    }

    pub fn with_capacity(resolver: ResponseResolver, capacity: usize) -> Self {
        Self {
            resolver: Arc::new(resolver),
            sessions: Arc::new(Mutex::new(Sessions::default())),
            capacity: capacity.max(1),
        }
    }

    /// Starts a new conversation holding only the greeting.
    pub async fn open(&self) -> (Uuid, ChatService) {
        let id = Uuid::new_v4();
        let service = ChatService::with_shared_resolver(self.resolver.clone());

        let mut sessions = self.sessions.lock().await;
        sessions.by_id.insert(id, service.clone());
        sessions.order.push_back(id);
        while sessions.order.len() > self.capacity {
            if let Some(evicted) = sessions.order.pop_front() {
                sessions.by_id.remove(&evicted);
                debug!(%evicted, "Session evicted");
            }
        }
        info!(%id, open = sessions.by_id.len(), "Session opened");
        (id, service)
    }

    pub async fn get(&self, id: Uuid) -> Option<ChatService> {
        self.sessions.lock().await.by_id.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn remote_configured(&self) -> bool {
        self.resolver.remote_configured()
    }
}

/// Text of the simulated "call 18" action. No call is placed.
pub fn emergency_call_notice() -> &'static str {
    constants::EMERGENCY_CALL_NOTICE
}

pub fn suggestions() -> &'static [&'static str] {
    &SUGGESTIONS
}
