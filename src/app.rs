use std::time::Duration;

use tokio::sync::mpsc;

use crate::cleanup::ScheduledCleanup;
use crate::events::AppEvent;
use crate::models::{AppConfig, Conversation, Sender};
use crate::session::{SessionOutcome, Submission};

pub const LOADING_TEXT: &str = "MyAyur Health Assistant is thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Hidden,
    Visible,
    FadingOut,
}

/// The "assistant is responding" indicator.
///
/// Hiding starts a fade-out; the indicator is only removed once the fade
/// delay elapses. Showing it again cancels a pending removal.
#[derive(Debug)]
pub struct LoadingIndicator {
    state: IndicatorState,
    generation: u64,
    removal: Option<ScheduledCleanup>,
}

impl LoadingIndicator {
    pub const fn new() -> Self {
        Self {
            state: IndicatorState::Hidden,
            generation: 0,
            removal: None,
        }
    }

    pub const fn state(&self) -> IndicatorState {
        self.state
    }

    pub fn show(&mut self) {
        if let Some(removal) = self.removal.take() {
            removal.cancel();
        }
        self.generation += 1;
        self.state = IndicatorState::Visible;
    }

    /// Begin fading out. `IndicatorFadeElapsed` is posted to `events` once
    /// `delay` has passed.
    pub fn hide(&mut self, delay: Duration, events: &mpsc::UnboundedSender<AppEvent>) {
        if self.state != IndicatorState::Visible {
            return;
        }
        self.state = IndicatorState::FadingOut;

        let generation = self.generation;
        let tx = events.clone();
        self.removal = Some(ScheduledCleanup::schedule(delay, move || {
            let _ = tx.send(AppEvent::IndicatorFadeElapsed(generation));
        }));
    }

    /// Remove the indicator if `generation` still names the current fade.
    pub fn fade_elapsed(&mut self, generation: u64) {
        if self.state == IndicatorState::FadingOut && generation == self.generation {
            self.state = IndicatorState::Hidden;
            self.removal = None;
        }
    }
}

impl Default for LoadingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct App {
    pub should_quit: bool,
    pub conversation: Conversation,
    pub input_buffer: String,
    pub input_enabled: bool,
    pub indicator: LoadingIndicator,
    pub scroll_offset: usize,
    pub show_help: bool,
    pub chat_visible: bool,
    pub exit_pending: bool,
    pub config: AppConfig,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: AppConfig, event_tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            conversation: Conversation::with_greeting(),
            input_buffer: String::new(),
            input_enabled: true,
            indicator: LoadingIndicator::new(),
            scroll_offset: 0,
            show_help: false,
            chat_visible: true,
            exit_pending: false,
            config,
            event_tx,
        }
    }

    pub const fn quit(&mut self) {
        self.should_quit = true;
    }

    pub const fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub const fn toggle_chat(&mut self) {
        self.chat_visible = !self.chat_visible;
    }

    pub const fn scroll_up(&mut self, amount: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(amount);
    }

    pub const fn scroll_down(&mut self, amount: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(amount);
    }

    pub const fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub const fn scroll_to_bottom(&mut self) {
        // Clamped to the real maximum when rendering
        self.scroll_offset = usize::MAX;
    }

    pub fn is_loading(&self) -> bool {
        self.indicator.state() != IndicatorState::Hidden
    }

    /// Accept the current input as a question.
    ///
    /// Returns `None` without touching any state when the input is blank
    /// or a session is already running.
    pub fn submit(&mut self) -> Option<Submission> {
        if !self.input_enabled {
            return None;
        }
        let question = self.input_buffer.trim();
        if question.is_empty() {
            return None;
        }
        let question = question.to_string();

        self.input_buffer.clear();
        self.input_enabled = false;
        self.conversation.push(Sender::User, &question);
        self.indicator.show();
        self.scroll_to_bottom();

        Some(Submission {
            question,
            reply_id: self.conversation.reserve_id(),
        })
    }

    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::SessionStarted => {
                self.input_enabled = false;
                self.indicator.show();
            }
            AppEvent::AssistantMessageStarted(id) => {
                if let Err(e) = self.conversation.start_streaming(id, Sender::Assistant) {
                    tracing::warn!(error = %e, "cannot start answer message");
                }
                self.scroll_to_bottom();
            }
            AppEvent::AssistantToken(id, token) => {
                if let Err(e) = self.conversation.append(id, &token) {
                    tracing::warn!(error = %e, "dropping token");
                    return;
                }
                self.scroll_to_bottom();
            }
            AppEvent::AssistantMessageFinished(id) => {
                if let Err(e) = self.conversation.finish(id) {
                    tracing::warn!(error = %e, "cannot finish answer message");
                }
            }
            AppEvent::AssistantNotice(text) => {
                self.conversation.push(Sender::Assistant, &text);
                self.scroll_to_bottom();
            }
            AppEvent::SessionEnded(outcome) => {
                if outcome == SessionOutcome::Failure {
                    tracing::debug!("session ended with failure");
                }
                self.input_enabled = true;
                let delay = Duration::from_millis(self.config.fade_out_ms);
                self.indicator.hide(delay, &self.event_tx);
                self.scroll_to_bottom();
            }
            AppEvent::IndicatorFadeElapsed(generation) => {
                self.indicator.fade_elapsed(generation);
            }
        }
    }
}
