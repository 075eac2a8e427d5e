use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use crate::app::{App, FocusPane, InputMode, Popup};
use docchat_core::upload::ACCEPTED_EXTENSIONS;
use docchat_core::{classify_line, LineKind, Message, Notice, Role, Theme};

/// Colors for one theme
struct Palette {
    bg: Color,
    fg: Color,
    muted: Color,
    border: Color,
    border_focused: Color,
    user: Color,
    assistant: Color,
    error: Color,
    success: Color,
    highlight_bg: Color,
    highlight_fg: Color,
    bar_bg: Color,
}

fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            bg: Color::White,
            fg: Color::Black,
            muted: Color::Gray,
            border: Color::Gray,
            border_focused: Color::Blue,
            user: Color::Blue,
            assistant: Color::Magenta,
            error: Color::Red,
            success: Color::Green,
            highlight_bg: Color::Blue,
            highlight_fg: Color::White,
            bar_bg: Color::Gray,
        },
        Theme::Dark => Palette {
            bg: Color::Black,
            fg: Color::White,
            muted: Color::DarkGray,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            user: Color::Cyan,
            assistant: Color::Yellow,
            error: Color::LightRed,
            success: Color::LightGreen,
            highlight_bg: Color::Cyan,
            highlight_fg: Color::Black,
            bar_bg: Color::DarkGray,
        },
    }
}

/// Ensure the selected item in a list is visible by adjusting the ListState offset.
fn ensure_selected_visible(state: &mut ListState, visible_height: usize) {
    let visible_height = visible_height.max(1);

    if let Some(selected) = state.selected() {
        let min_offset = selected.saturating_sub(visible_height - 1);
        let max_offset = selected;

        let new_offset = state.offset().clamp(min_offset, max_offset);
        if new_offset != state.offset() {
            *state.offset_mut() = new_offset;
        }
    }
}

/// Lines for one message body. Error messages are a single flagged span;
/// everything else is classified line by line.
fn message_body(msg: &Message, colors: &Palette) -> Vec<Line<'static>> {
    if msg.is_error {
        return vec![Line::from(Span::styled(
            format!("⚠ {}", msg.text.replace('\n', " ")),
            Style::default().fg(colors.error),
        ))];
    }

    if msg.role == Role::User {
        return msg.text.lines().map(|line| Line::from(line.to_string())).collect();
    }

    msg.text
        .lines()
        .map(|line| match classify_line(line) {
            LineKind::Bold(text) => Line::from(Span::styled(
                text.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            LineKind::Bullet(text) => Line::from(vec![
                Span::styled("  • ", Style::default().fg(colors.assistant)),
                Span::raw(text.to_string()),
            ]),
            LineKind::Plain(text) => Line::from(text.to_string()),
        })
        .collect()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let colors = palette(app.theme);

    frame.render_widget(
        Block::default().style(Style::default().bg(colors.bg).fg(colors.fg)),
        area,
    );

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, &colors, frame, header_area);

    let [files_area, chat_column] = Layout::horizontal([
        Constraint::Length(32),
        Constraint::Min(0),
    ])
    .areas(body_area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    // Store areas for mouse hit-testing
    app.files_area = Some(files_area);
    app.chat_area = Some(chat_area);

    render_files(app, &colors, frame, files_area);
    render_chat(app, &colors, frame, chat_area);
    render_input(app, &colors, frame, input_area);
    render_footer(app, &colors, frame, footer_area);

    match &app.popup {
        Some(Popup::Notice(notice)) => render_notice(notice, &colors, frame, area),
        Some(Popup::ConfirmDelete(name)) => render_confirm_delete(name, &colors, frame, area),
        Some(Popup::UploadPath) => render_upload_prompt(app, &colors, frame, area),
        None => {}
    }
}

fn render_header(app: &App, colors: &Palette, frame: &mut Frame, area: Rect) {
    let theme_icon = if app.theme.is_dark() { "☾" } else { "☀" };

    let title = Line::from(vec![
        Span::styled(" DocChat ", Style::default().fg(colors.user).bold()),
        Span::styled(
            "Chat with your documents ",
            Style::default().fg(colors.muted),
        ),
        Span::styled(
            format!("[{} {}] ", theme_icon, app.theme.display_name()),
            Style::default().fg(colors.fg),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(colors.muted),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(colors.bar_bg));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, colors: &Palette, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(colors.bg).fg(colors.fg);

    let pairs: Vec<(&str, &str)> = match (&app.popup, app.input_mode) {
        (Some(Popup::Notice(_)), _) => vec![(" Enter ", " ok ")],
        (Some(Popup::ConfirmDelete(_)), _) => vec![(" y ", " delete "), (" n ", " cancel ")],
        (Some(Popup::UploadPath), _) => vec![(" Enter ", " upload "), (" Esc ", " cancel ")],
        (None, InputMode::Editing) => vec![(" Enter ", " send "), (" Esc ", " stop typing ")],
        (None, InputMode::Normal) => {
            let mut pairs = vec![(" Tab ", " focus ")];
            match app.focus {
                FocusPane::Files => pairs.extend([(" j/k ", " select "), (" d ", " delete ")]),
                FocusPane::Chat => pairs.extend([(" j/k ", " scroll "), (" g/G ", " top/bottom ")]),
                FocusPane::Input => pairs.push((" i ", " type ")),
            }
            pairs.extend([
                (" u ", " upload "),
                (" r ", " refresh "),
                (" t ", " theme "),
                (" C ", " clear chat "),
                (" q ", " quit "),
            ]);
            pairs
        }
    };

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(pairs.into_iter().flat_map(|(key, label)| {
                [Span::styled(key, key_style), Span::styled(label, label_style)]
            }))
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(colors.bg));
    frame.render_widget(footer, area);
}

fn render_files(app: &mut App, colors: &Palette, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Files;
    let border_color = if focused { colors.border_focused } else { colors.border };

    let [upload_area, list_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(0),
    ])
    .areas(area);

    // Upload box
    let dots = ".".repeat(app.animation_frame as usize + 1);
    let upload_lines = if app.upload.is_uploading() {
        vec![
            Line::from(Span::styled(
                format!("Uploading{}", dots),
                Style::default().fg(colors.assistant).add_modifier(Modifier::ITALIC),
            )),
            Line::from(Span::styled(
                "Processing your file...",
                Style::default().fg(colors.muted),
            )),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::styled(" u ", Style::default().bg(colors.highlight_bg).fg(colors.highlight_fg)),
                Span::raw(" choose file"),
            ]),
            Line::from(Span::styled(
                ACCEPTED_EXTENSIONS.join(" "),
                Style::default().fg(colors.muted),
            )),
        ]
    };
    let upload_box = Paragraph::new(upload_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border))
            .title(" Upload Documents "),
    );
    frame.render_widget(upload_box, upload_area);

    // File list
    let title = if app.files.is_loading() {
        format!(" Uploaded Files{} ", dots)
    } else {
        " Uploaded Files ".to_string()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let items: Vec<ListItem> = app
        .files
        .entries()
        .iter()
        .map(|entry| {
            let style = if entry.file_name().is_some() {
                Style::default().fg(colors.fg)
            } else {
                Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC)
            };
            ListItem::new(format!(" {} ", entry)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(colors.highlight_bg)
                .fg(colors.highlight_fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(if focused { "> " } else { "  " });

    let visible_height = list_area.height.saturating_sub(2) as usize;
    ensure_selected_visible(&mut app.file_state, visible_height);

    frame.render_stateful_widget(list, list_area, &mut app.file_state);
}

fn render_chat(app: &mut App, colors: &Palette, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { colors.border_focused } else { colors.border };

    // Inner size for scroll and wrap calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Chat: {} ", app.api().base_url()));

    let loading = app.chat.is_loading();
    let chat_text = if app.chat.messages().is_empty() && !loading {
        Text::from(Span::styled(
            "Upload a document, then ask a question about it...",
            Style::default().fg(colors.muted),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.chat.messages() {
            let (label, color) = match msg.role {
                Role::User => ("You", colors.user),
                Role::Assistant => ("AI", colors.assistant),
            };
            lines.push(Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(format!("  {}", msg.local_time()), Style::default().fg(colors.muted)),
            ]));
            lines.extend(message_body(msg, colors));
            lines.push(Line::default());
        }

        if loading {
            lines.push(Line::from(Span::styled(
                "AI",
                Style::default().fg(colors.assistant).add_modifier(Modifier::BOLD),
            )));
            // Animated dots: cycles through ".", "..", "..."
            let dots = "●".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                dots,
                Style::default().fg(colors.muted),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, colors: &Palette, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing {
        Color::Yellow
    } else if app.focus == FocusPane::Input {
        colors.border_focused
    } else {
        colors.border
    };

    let title = if app.chat.is_loading() {
        " Waiting for reply... "
    } else {
        " Type your message (Enter to send) "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .chat
        .draft()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(colors.user))
        .block(block);

    frame.render_widget(input, area);

    if editing && app.popup.is_none() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_notice(notice: &Notice, colors: &Palette, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 50, 6);
    frame.render_widget(Clear, popup_area);

    let (title, color) = match notice {
        Notice::Success(_) => (" Done ", colors.success),
        Notice::Failure(_) => (" Error ", colors.error),
    };

    let body = Paragraph::new(vec![
        Line::from(notice.text().to_string()),
        Line::default(),
        Line::from(Span::styled("Press Enter to continue", Style::default().fg(colors.muted))),
    ])
    .wrap(Wrap { trim: true })
    .style(Style::default().bg(colors.bg).fg(colors.fg))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(title),
    );

    frame.render_widget(body, popup_area);
}

fn render_confirm_delete(name: &str, colors: &Palette, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 50, 5);
    frame.render_widget(Clear, popup_area);

    let body = Paragraph::new(vec![
        Line::from(format!("Delete '{}'?", name)),
        Line::default(),
        Line::from(Span::styled("y to delete, n to cancel", Style::default().fg(colors.muted))),
    ])
    .wrap(Wrap { trim: true })
    .style(Style::default().bg(colors.bg).fg(colors.fg))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.error))
            .title(" Confirm "),
    );

    frame.render_widget(body, popup_area);
}

fn render_upload_prompt(app: &App, colors: &Palette, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Upload Document ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new(format!(
        "Path to a file ({}). Enter to upload, Esc to cancel.",
        ACCEPTED_EXTENSIONS.join(", ")
    ))
    .style(Style::default().fg(colors.muted))
    .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    let width = input_area.width as usize;
    let scroll_offset = app.upload_cursor.saturating_sub(width.saturating_sub(1));
    let visible: String = app
        .upload_input
        .chars()
        .skip(scroll_offset)
        .take(width)
        .collect();

    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(colors.user)),
        input_area,
    );

    let cursor_x = (app.upload_cursor - scroll_offset) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}
