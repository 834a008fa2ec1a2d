use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, IndicatorState, LOADING_TEXT};
use crate::models::Sender;

fn theme_color(name: &str, fallback: Color) -> Color {
    name.parse().unwrap_or(fallback)
}

pub fn render_help_window(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            "AyurChat - Keyboard Shortcuts",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("General:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Ctrl+H        - Show/hide this help"),
        Line::from("  Ctrl+T        - Show/hide the chat"),
        Line::from("  Ctrl+C        - Quit (press twice)"),
        Line::from(""),
        Line::from(Span::styled("Chat:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Enter         - Send message"),
        Line::from("  Shift+Enter   - New line"),
        Line::from(""),
        Line::from(Span::styled("Navigation:", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("  Up/Down       - Scroll history"),
        Line::from("  PgUp/PgDn     - Scroll history"),
        Line::from("  Home/End      - Jump to start/end"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Ctrl+H or Esc to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_paragraph = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Help ")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    let popup_width = 50;
    let popup_height = 21;
    let x = (area.width.saturating_sub(popup_width)) / 2;
    let y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: popup_width.min(area.width),
        height: popup_height.min(area.height),
    };

    frame.render_widget(Clear, popup_area);
    frame.render_widget(help_paragraph, popup_area);
}

pub fn render_collapsed(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.is_loading() {
        format!("Chat hidden ({LOADING_TEXT}) | Ctrl+T: Open chat | Ctrl+C: Quit")
    } else {
        "Chat hidden | Ctrl+T: Open chat | Ctrl+C: Quit".to_string()
    };

    let hint = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));

    let bottom = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: area.height.min(1),
    };
    frame.render_widget(hint, bottom);
}

pub fn render_bottom_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (text, style) = if app.exit_pending {
        (
            "Press Ctrl+C again to exit, Esc to cancel",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )
    } else {
        (
            "Ctrl+C: Quit | Ctrl+T: Hide chat | Ctrl+H: Help",
            Style::default().fg(Color::DarkGray),
        )
    };

    let bar = Paragraph::new(text).alignment(Alignment::Center).style(style);

    frame.render_widget(bar, area);
}

pub fn render_loading_indicator(frame: &mut Frame, app: &App, area: Rect) {
    let style = match app.indicator.state() {
        IndicatorState::Hidden => return,
        IndicatorState::Visible => Style::default()
            .fg(theme_color(&app.config.theme.assistant_message_color, Color::Green))
            .add_modifier(Modifier::ITALIC),
        IndicatorState::FadingOut => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM),
    };

    let indicator = Paragraph::new(format!("● ● ● {LOADING_TEXT}")).style(style);
    frame.render_widget(indicator, area);
}

pub fn render_chat_history(frame: &mut Frame, app: &mut App, area: Rect) {
    let user_color = theme_color(&app.config.theme.user_message_color, Color::Cyan);
    let assistant_color = theme_color(&app.config.theme.assistant_message_color, Color::Green);

    let mut lines = Vec::new();

    for message in app.conversation.messages() {
        let color = match message.sender() {
            Sender::User => user_color,
            Sender::Assistant => assistant_color,
        };

        lines.push(Line::from(""));

        let mut content = message.text().split('\n');
        let first = content.next().unwrap_or_default();
        let mut spans = vec![
            Span::styled(
                format!("{}: ", message.sender().label()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(first.to_string()),
        ];
        if message.is_streaming() {
            spans.push(Span::styled("▌", Style::default().fg(Color::DarkGray)));
        }
        lines.push(Line::from(spans));
        lines.extend(content.map(|line| Line::from(line.to_string())));
    }

    let chat_history = Paragraph::new(lines).wrap(Wrap { trim: false });

    // Rows after word wrapping, so the bottom of the conversation stays reachable
    let total_visual_lines = chat_history.line_count(area.width);

    let visible_height = area.height as usize;
    let max_scroll = total_visual_lines.saturating_sub(visible_height);
    let actual_scroll = app.scroll_offset.min(max_scroll);

    if app.scroll_offset != actual_scroll {
        app.scroll_offset = actual_scroll;
    }

    let chat_history =
        chat_history.scroll((u16::try_from(actual_scroll).unwrap_or(u16::MAX), 0));

    frame.render_widget(chat_history, area);
}

/// Text shown in the input box: the buffer or a placeholder.
pub fn input_text(app: &App) -> &str {
    if !app.input_enabled {
        "Waiting for the assistant..."
    } else if app.input_buffer.is_empty() {
        "Type your message..."
    } else {
        &app.input_buffer
    }
}

pub fn render_input_field(frame: &mut Frame, app: &App, area: Rect) {
    let border_color = theme_color(&app.config.theme.border_color, Color::Cyan);

    let (input_style, border_style) = if !app.input_enabled {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        )
    } else if app.input_buffer.is_empty() {
        (
            Style::default().fg(Color::Gray),
            Style::default().fg(border_color),
        )
    } else {
        (
            Style::default().fg(border_color).add_modifier(Modifier::BOLD),
            Style::default().fg(border_color),
        )
    };

    let input = Paragraph::new(input_text(app))
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(input, area);
}
