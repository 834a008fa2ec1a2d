pub mod widgets;

use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    widgets::{Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, app: &mut App) {
    if !app.chat_visible {
        widgets::render_collapsed(frame, app, frame.area());
        return;
    }

    // Width available for text is total width - 2 (for borders)
    let available_width = frame.area().width.saturating_sub(2).max(1);

    let input_lines = Paragraph::new(widgets::input_text(app))
        .wrap(Wrap { trim: false })
        .line_count(available_width);

    // Clamp lines: Min 1, Max 50% of screen height (approx)
    let max_lines = (frame.area().height as usize / 2).saturating_sub(2).max(1);
    let actual_lines = input_lines.clamp(1, max_lines);

    #[allow(clippy::cast_possible_truncation)]
    let input_height = (actual_lines + 2) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),               // Chat history
            Constraint::Length(1),            // Loading indicator
            Constraint::Length(input_height), // Input field
            Constraint::Length(1),            // Bottom keymap bar
        ])
        .split(frame.area());

    widgets::render_chat_history(frame, app, chunks[0]);
    widgets::render_loading_indicator(frame, app, chunks[1]);
    widgets::render_input_field(frame, app, chunks[2]);
    widgets::render_bottom_bar(frame, app, chunks[3]);

    if app.show_help {
        widgets::render_help_window(frame, frame.area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AppEvent;
    use crate::models::{AppConfig, Sender};
    use ratatui::{backend::TestBackend, Terminal};
    use tokio::sync::mpsc;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    fn draw_sized(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        screen_text(&terminal)
    }

    fn draw(app: &mut App) -> String {
        draw_sized(app, 80, 20)
    }

    #[test]
    fn test_render_shows_greeting_and_user_message() {
        let (tx, _rx) = mpsc::unbounded_channel::<AppEvent>();
        let mut app = App::new(AppConfig::default(), tx);
        app.input_buffer = "What is ashwagandha?".to_string();
        app.submit();

        let screen = draw(&mut app);

        assert!(screen.contains("MyAyur Health Assistant: Welcome to MyAyur Health!"));
        assert!(screen.contains("You: What is ashwagandha?"));
        assert!(screen.contains(crate::app::LOADING_TEXT));
    }

    #[test]
    fn test_render_collapsed_chat() {
        let (tx, _rx) = mpsc::unbounded_channel::<AppEvent>();
        let mut app = App::new(AppConfig::default(), tx);
        app.toggle_chat();

        let screen = draw(&mut app);

        assert!(!screen.contains("Welcome to MyAyur Health!"));
        assert!(screen.contains("Ctrl+T"));
    }

    #[test]
    fn test_scroll_to_bottom_reaches_end_of_word_wrapped_answer() {
        let (tx, _rx) = mpsc::unbounded_channel::<AppEvent>();
        let mut app = App::new(AppConfig::default(), tx);
        let mut answer: Vec<String> = (0..60).map(|i| format!("word{i:02}xx")).collect();
        answer.push("FINALWORD".to_string());
        app.conversation.push(Sender::Assistant, &answer.join(" "));
        app.scroll_to_bottom();

        let screen = draw_sized(&mut app, 23, 14);

        assert!(screen.contains("FINALWORD"));
    }

    #[test]
    fn test_input_box_grows_to_fit_word_wrapped_text() {
        let (tx, _rx) = mpsc::unbounded_channel::<AppEvent>();
        let mut app = App::new(AppConfig::default(), tx);
        app.input_buffer = "aaaaaaaaaaa1 bbbbbbbbbbb2 ccccccccccc3 LASTWORDxxxx".to_string();

        let screen = draw_sized(&mut app, 23, 14);

        assert!(screen.contains("aaaaaaaaaaa1"));
        assert!(screen.contains("LASTWORDxxxx"));
    }
}
