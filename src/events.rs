// Event types for async communication

use crate::models::MessageId;
use crate::session::SessionOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The request for the pending question is being sent
    SessionStarted,
    /// The server accepted the question and the answer message exists
    AssistantMessageStarted(MessageId),
    /// A token to append to the answer message
    AssistantToken(MessageId, String),
    /// No more tokens will arrive for this message
    AssistantMessageFinished(MessageId),
    /// A finished assistant message, e.g. the apology after a failure
    AssistantNotice(String),
    SessionEnded(SessionOutcome),
    /// The loading indicator's fade-out delay elapsed
    IndicatorFadeElapsed(u64),
}
