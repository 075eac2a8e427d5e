use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputMode, Popup};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line editing shared by the chat input and the upload prompt
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(text.chars().count());
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = text.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::TaskDone(output) => app.apply_task(output),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.popup.is_some() {
        handle_popup(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_popup(app: &mut App, key: KeyEvent) {
    match app.popup {
        Some(Popup::Notice(_)) => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                app.popup = None;
            }
        }
        Some(Popup::ConfirmDelete(_)) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(true),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_delete(false),
            _ => {}
        },
        Some(Popup::UploadPath) => match key.code {
            KeyCode::Esc => app.popup = None,
            KeyCode::Enter => app.start_upload(),
            _ => edit_line(&mut app.upload_input, &mut app.upload_cursor, key),
        },
        None => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => app.focus = app.focus.next(),

        KeyCode::Char('i') | KeyCode::Enter if app.focus == FocusPane::Input => {
            app.input_mode = InputMode::Editing;
            app.query_cursor = app.chat.draft().chars().count();
        }
        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.query_cursor = app.chat.draft().chars().count();
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Files => app.files_nav_down(),
            _ => app.scroll_chat_down(),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Files => app.files_nav_up(),
            _ => app.scroll_chat_up(),
        },
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        KeyCode::Char('d') if app.focus == FocusPane::Files => app.request_delete(),
        KeyCode::Char('u') => app.open_upload_prompt(),
        KeyCode::Char('r') => app.start_refresh(),
        KeyCode::Char('t') => app.theme.toggle(),
        KeyCode::Char('C') => app.clear_history(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_query();
        }
        _ => {
            let (draft, cursor) = (app.chat.draft_mut(), &mut app.query_cursor);
            edit_line(draft, cursor, key);
        }
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.popup.is_some() {
        return;
    }

    let inside = |area: Option<Rect>| {
        area.is_some_and(|a| {
            mouse.column >= a.x
                && mouse.column < a.x + a.width
                && mouse.row >= a.y
                && mouse.row < a.y + a.height
        })
    };

    match mouse.kind {
        MouseEventKind::ScrollDown if inside(app.chat_area) => app.scroll_chat_down(),
        MouseEventKind::ScrollUp if inside(app.chat_area) => app.scroll_chat_up(),
        MouseEventKind::ScrollDown if inside(app.files_area) => app.files_nav_down(),
        MouseEventKind::ScrollUp if inside(app.files_area) => app.files_nav_up(),
        MouseEventKind::Down(_) if inside(app.files_area) => app.focus = FocusPane::Files,
        MouseEventKind::Down(_) if inside(app.chat_area) => app.focus = FocusPane::Chat,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use docchat_core::{BackendClient, FileEntry, HistoryStore, Notice, Role, Theme};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: crossterm::event::KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn test_app() -> (App, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        // Nothing listens here; requests fail fast
        let api = BackendClient::new("http://127.0.0.1:9");
        let app = App::new(api, HistoryStore::open(dir.path()), Theme::Light, tx);
        (app, dir)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 10), s.len());
    }

    #[test]
    fn test_edit_line_cursor_moves() {
        let mut text = String::new();
        let mut cursor = 0;
        for c in "abc".chars() {
            edit_line(&mut text, &mut cursor, key(KeyCode::Char(c)));
        }
        edit_line(&mut text, &mut cursor, key(KeyCode::Left));
        edit_line(&mut text, &mut cursor, key(KeyCode::Backspace));
        assert_eq!(text, "ac");
        assert_eq!(cursor, 1);
        edit_line(&mut text, &mut cursor, key(KeyCode::Home));
        edit_line(&mut text, &mut cursor, key(KeyCode::Delete));
        assert_eq!(text, "c");
    }

    #[tokio::test]
    async fn test_enter_submits_and_gates_on_loading() {
        let (mut app, _dir) = test_app();
        handle_key(&mut app, key(KeyCode::Char('i')));
        assert_eq!(app.input_mode, InputMode::Editing);

        type_text(&mut app, "What is in the report?");
        handle_key(&mut app, key(KeyCode::Enter));

        assert!(app.chat.is_loading());
        assert_eq!(app.chat.draft(), "");
        assert_eq!(app.chat.messages().len(), 1);
        assert_eq!(app.chat.messages()[0].role, Role::User);

        // A second submit while the first is in flight does nothing
        type_text(&mut app, "again");
        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.chat.messages().len(), 1);
        assert_eq!(app.chat.draft(), "again");
    }

    #[tokio::test]
    async fn test_blank_enter_is_ignored() {
        let (mut app, _dir) = test_app();
        handle_key(&mut app, key(KeyCode::Char('i')));
        type_text(&mut app, "   ");
        handle_key(&mut app, key(KeyCode::Enter));

        assert!(!app.chat.is_loading());
        assert!(app.chat.messages().is_empty());
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let (mut app, _dir) = test_app();
        app.files.apply(vec![FileEntry::File("a.pdf".into())]);
        app.file_state.select(Some(0));
        app.focus = FocusPane::Files;

        handle_key(&mut app, key(KeyCode::Char('d')));
        assert_eq!(app.popup, Some(Popup::ConfirmDelete("a.pdf".into())));

        handle_key(&mut app, key(KeyCode::Char('n')));
        assert_eq!(app.popup, None);
        assert!(!app.delete_pending);

        handle_key(&mut app, key(KeyCode::Char('d')));
        handle_key(&mut app, key(KeyCode::Char('y')));
        assert_eq!(app.popup, None);
        assert!(app.delete_pending);
    }

    #[tokio::test]
    async fn test_summary_rows_cannot_be_deleted() {
        let (mut app, _dir) = test_app();
        app.files.apply(vec![FileEntry::Summary(5)]);
        app.file_state.select(Some(0));
        app.focus = FocusPane::Files;

        handle_key(&mut app, key(KeyCode::Char('d')));
        assert_eq!(app.popup, None);
    }

    #[tokio::test]
    async fn test_empty_upload_path_is_noop() {
        let (mut app, _dir) = test_app();
        handle_key(&mut app, key(KeyCode::Char('u')));
        assert_eq!(app.popup, Some(Popup::UploadPath));

        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.popup, None);
        assert!(!app.upload.is_uploading());
    }

    #[tokio::test]
    async fn test_notice_blocks_other_keys_until_dismissed() {
        let (mut app, _dir) = test_app();
        app.popup = Some(Popup::Notice(Notice::Success("File uploaded successfully!".into())));

        handle_key(&mut app, key(KeyCode::Char('t')));
        assert_eq!(app.theme, Theme::Light);

        handle_key(&mut app, key(KeyCode::Enter));
        assert_eq!(app.popup, None);

        handle_key(&mut app, key(KeyCode::Char('t')));
        assert_eq!(app.theme, Theme::Dark);
    }
}
