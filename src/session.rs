// One question/answer exchange with the assistant backend

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ApiError, AskClient, StreamEvent};
use crate::events::AppEvent;
use crate::models::MessageId;

pub const APOLOGY_MESSAGE: &str = "I apologize, but I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Success,
    Failure,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("server reported an error: {0}")]
    Protocol(String),
}

/// Receives the signals of a running session.
///
/// The session never touches the conversation directly; everything the
/// user sees goes through these calls.
#[cfg_attr(test, mockall::automock)]
pub trait Presenter {
    fn on_session_started(&mut self);
    fn on_assistant_message_started(&mut self, id: MessageId);
    fn on_assistant_token_appended(&mut self, id: MessageId, token: &str);
    fn on_assistant_message_finished(&mut self, id: MessageId);
    fn on_assistant_notice(&mut self, text: &str);
    fn on_session_ended(&mut self, outcome: SessionOutcome);
}

/// Forwards session signals to the UI loop.
impl Presenter for mpsc::UnboundedSender<AppEvent> {
    fn on_session_started(&mut self) {
        let _ = self.send(AppEvent::SessionStarted);
    }

    fn on_assistant_message_started(&mut self, id: MessageId) {
        let _ = self.send(AppEvent::AssistantMessageStarted(id));
    }

    fn on_assistant_token_appended(&mut self, id: MessageId, token: &str) {
        let _ = self.send(AppEvent::AssistantToken(id, token.to_string()));
    }

    fn on_assistant_message_finished(&mut self, id: MessageId) {
        let _ = self.send(AppEvent::AssistantMessageFinished(id));
    }

    fn on_assistant_notice(&mut self, text: &str) {
        let _ = self.send(AppEvent::AssistantNotice(text.to_string()));
    }

    fn on_session_ended(&mut self, outcome: SessionOutcome) {
        let _ = self.send(AppEvent::SessionEnded(outcome));
    }
}

/// A question accepted by the input gate, with the id its answer will use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub question: String,
    pub reply_id: MessageId,
}

/// Reports the end of a session when dropped, whichever way the session
/// exits.
struct EndGuard<'a, P: Presenter + ?Sized> {
    presenter: &'a mut P,
    outcome: SessionOutcome,
}

impl<P: Presenter + ?Sized> Drop for EndGuard<'_, P> {
    fn drop(&mut self) {
        self.presenter.on_session_ended(self.outcome);
    }
}

#[derive(Debug)]
pub struct RequestSession {
    question: String,
    reply_id: MessageId,
    state: SessionState,
    reply_started: bool,
    tokens: usize,
}

impl RequestSession {
    pub fn new(submission: Submission) -> Self {
        Self {
            question: submission.question,
            reply_id: submission.reply_id,
            state: SessionState::Idle,
            reply_started: false,
            tokens: 0,
        }
    }

    #[allow(dead_code)]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the exchange to completion.
    ///
    /// `on_session_ended` is delivered exactly once, including when this
    /// future is dropped before it finishes.
    pub async fn run<P>(&mut self, client: &AskClient, presenter: &mut P) -> SessionOutcome
    where
        P: Presenter + ?Sized,
    {
        let mut guard = EndGuard {
            presenter,
            outcome: SessionOutcome::Failure,
        };

        self.advance(SessionState::Sending);
        guard.presenter.on_session_started();

        let result = self.exchange(client, &mut *guard.presenter).await;

        if self.reply_started {
            guard.presenter.on_assistant_message_finished(self.reply_id);
        }

        match result {
            Ok(()) => {
                self.advance(SessionState::Completed);
                tracing::info!(tokens = self.tokens, "answer completed");
                guard.outcome = SessionOutcome::Success;
            }
            Err(e) => {
                self.advance(SessionState::Failed);
                tracing::error!(error = %e, tokens = self.tokens, "answer failed");
                guard.presenter.on_assistant_notice(APOLOGY_MESSAGE);
            }
        }

        guard.outcome
    }

    async fn exchange<P>(&mut self, client: &AskClient, presenter: &mut P) -> Result<(), SessionError>
    where
        P: Presenter + ?Sized,
    {
        let mut events = client.ask_stream(&self.question).await?;

        self.advance(SessionState::Streaming);
        presenter.on_assistant_message_started(self.reply_id);
        self.reply_started = true;

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Token(token) => {
                    self.tokens += 1;
                    presenter.on_assistant_token_appended(self.reply_id, &token);
                }
                StreamEvent::Error(message) => return Err(SessionError::Protocol(message)),
            }
        }

        Ok(())
    }

    fn advance(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}

/// Run a session on the runtime, reporting to the UI loop through `events`.
pub fn spawn_session(
    client: AskClient,
    submission: Submission,
    mut events: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<SessionOutcome> {
    tokio::spawn(async move {
        let mut session = RequestSession::new(submission);
        session.run(&client, &mut events).await
    })
}
