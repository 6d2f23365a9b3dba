pub mod chat;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod matcher;
pub mod resolver;
pub mod session;
pub mod web_server;

pub use classifier::{EmergencyClassifier, TriggerWordClassifier};
pub use config::Settings;
pub use errors::{InferenceError, SessionError};
pub use inference::{HuggingFaceClient, InferenceBackend};
pub use matcher::{EmergencyCategory, KeywordMatcher, LocalAdvice};
pub use resolver::{ResolvedResponse, ResponseResolver, ResponseSource};
pub use session::{ChatService, ChatSession, ConnectionStatus, Message, Sender, SessionEvent, SessionRegistry};
