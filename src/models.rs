use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GREETING: &str = "Welcome to MyAyur Health! I'm your professional Ayurvedic health assistant. How may I assist you today?";

/// Handle to a single message in a [`Conversation`].
///
/// Only the party that reserved an id can write to the message behind it,
/// which keeps each streaming message down to a single writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "MyAyur Health Assistant",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("no message with id {0:?}")]
    UnknownMessage(MessageId),
    #[error("message {0:?} is no longer streaming")]
    NotStreaming(MessageId),
    #[error("message {0:?} already exists")]
    DuplicateId(MessageId),
    #[error("message {0:?} is still streaming")]
    StreamInProgress(MessageId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    id: MessageId,
    sender: Sender,
    text: String,
    streaming: bool,
}

impl ChatMessage {
    #[allow(dead_code)]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    pub const fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn append(&mut self, token: &str) -> Result<(), MessageError> {
        if !self.streaming {
            return Err(MessageError::NotStreaming(self.id));
        }
        self.text.push_str(token);
        Ok(())
    }

    pub const fn finish(&mut self) {
        self.streaming = false;
    }
}

/// The visible message list.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    next_id: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_greeting() -> Self {
        let mut conversation = Self::new();
        conversation.push(Sender::Assistant, GREETING);
        conversation
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Hand out an id for a message that will be created later.
    pub const fn reserve_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a finished message.
    pub fn push(&mut self, sender: Sender, text: &str) -> MessageId {
        let id = self.reserve_id();
        self.messages.push(ChatMessage {
            id,
            sender,
            text: text.to_string(),
            streaming: false,
        });
        id
    }

    /// Create an empty message under a reserved id that accepts appends
    /// until [`Conversation::finish`] is called.
    pub fn start_streaming(&mut self, id: MessageId, sender: Sender) -> Result<(), MessageError> {
        if self.get(id).is_some() {
            return Err(MessageError::DuplicateId(id));
        }
        if let Some(open) = self.messages.iter().find(|m| m.streaming) {
            return Err(MessageError::StreamInProgress(open.id));
        }
        self.messages.push(ChatMessage {
            id,
            sender,
            text: String::new(),
            streaming: true,
        });
        Ok(())
    }

    pub fn append(&mut self, id: MessageId, token: &str) -> Result<(), MessageError> {
        self.find_mut(id)?.append(token)
    }

    pub fn finish(&mut self, id: MessageId) -> Result<(), MessageError> {
        self.find_mut(id)?.finish();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn find_mut(&mut self, id: MessageId) -> Result<&mut ChatMessage, MessageError> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(MessageError::UnknownMessage(id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_fade_out_ms")]
    pub fade_out_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub theme: ThemeConfig,
}

const fn default_timeout() -> u64 {
    600
}

const fn default_fade_out_ms() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: default_timeout(),
            fade_out_ms: default_fade_out_ms(),
            log_level: default_log_level(),
            theme: ThemeConfig::default(),
        }
    }
}

#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeConfig {
    pub user_message_color: String,
    pub assistant_message_color: String,
    pub border_color: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            user_message_color: "cyan".to_string(),
            assistant_message_color: "green".to_string(),
            border_color: "cyan".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_with_greeting() {
        let conversation = Conversation::with_greeting();
        assert_eq!(conversation.len(), 1);
        let greeting = &conversation.messages()[0];
        assert_eq!(greeting.sender(), Sender::Assistant);
        assert_eq!(greeting.text(), GREETING);
        assert!(!greeting.is_streaming());
    }

    #[test]
    fn test_streaming_message_accepts_appends() {
        let mut conversation = Conversation::new();
        let id = conversation.reserve_id();
        conversation.start_streaming(id, Sender::Assistant).unwrap();
        conversation.append(id, "Ashwagandha").unwrap();
        conversation.append(id, " is an herb.").unwrap();

        let msg = conversation.get(id).unwrap();
        assert_eq!(msg.text(), "Ashwagandha is an herb.");
        assert!(msg.is_streaming());
    }

    #[test]
    fn test_finished_message_is_immutable() {
        let mut conversation = Conversation::new();
        let id = conversation.reserve_id();
        conversation.start_streaming(id, Sender::Assistant).unwrap();
        conversation.append(id, "partial").unwrap();
        conversation.finish(id).unwrap();

        assert_eq!(
            conversation.append(id, " more"),
            Err(MessageError::NotStreaming(id))
        );
        assert_eq!(conversation.get(id).unwrap().text(), "partial");
    }

    #[test]
    fn test_pushed_message_is_not_streaming() {
        let mut conversation = Conversation::new();
        let id = conversation.push(Sender::User, "hello");
        assert_eq!(
            conversation.append(id, "!"),
            Err(MessageError::NotStreaming(id))
        );
    }

    #[test]
    fn test_only_one_streaming_message_at_a_time() {
        let mut conversation = Conversation::new();
        let first = conversation.reserve_id();
        let second = conversation.reserve_id();
        conversation.start_streaming(first, Sender::Assistant).unwrap();

        assert_eq!(
            conversation.start_streaming(second, Sender::Assistant),
            Err(MessageError::StreamInProgress(first))
        );

        conversation.finish(first).unwrap();
        assert!(conversation.start_streaming(second, Sender::Assistant).is_ok());
    }

    #[test]
    fn test_start_streaming_rejects_duplicate_id() {
        let mut conversation = Conversation::new();
        let id = conversation.push(Sender::User, "hi");
        assert_eq!(
            conversation.start_streaming(id, Sender::Assistant),
            Err(MessageError::DuplicateId(id))
        );
    }

    #[test]
    fn test_append_to_unknown_message() {
        let mut conversation = Conversation::new();
        let id = conversation.reserve_id();
        assert_eq!(
            conversation.append(id, "x"),
            Err(MessageError::UnknownMessage(id))
        );
    }

    #[test]
    fn test_sender_labels() {
        assert_eq!(Sender::User.label(), "You");
        assert_eq!(Sender::Assistant.label(), "MyAyur Health Assistant");
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout, 600);
        assert_eq!(config.fade_out_ms, 300);
        assert_eq!(config.log_level, "info");
    }
}
