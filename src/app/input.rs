use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::app::{App, Message, Model};
use crate::editor::{Direction, EditOp, Motion, Snippet, TableRenderable, TextEditable};
use crate::view::ViewMode;

use super::event_loop::{ClickTracker, ResizeDebouncer};

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
        clicks: &mut ClickTracker,
    ) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Mouse(mouse) => Self::handle_mouse(*mouse, model, now_ms, clicks),
            Event::Resize(w, h) => {
                crate::perf::log_event("event.resize.queue", format!("width={w} height={h}"));
                resize_debouncer.queue(*w, *h, now_ms);
                None
            }
            Event::FocusLost => Some(Message::Blur),
            Event::Paste(text) => Some(Message::Edit(EditOp::InsertText(text.clone()))),
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if model.help_visible {
            return Some(Message::HideHelp);
        }

        if model.prompt.is_some() {
            return match key.code {
                KeyCode::Enter => Some(Message::PromptSubmit),
                KeyCode::Esc => Some(Message::PromptCancel),
                KeyCode::Backspace => Some(Message::PromptBackspace),
                KeyCode::Char(c) if !ctrl => Some(Message::PromptInput(c)),
                _ => None,
            };
        }

        // Global bindings
        match key.code {
            KeyCode::Char('q') if ctrl => return Some(Message::Quit),
            KeyCode::Char('c') if ctrl => return Some(Message::Quit),
            KeyCode::Char('s') if ctrl => return Some(Message::Save),
            KeyCode::Char('w') if ctrl => return Some(Message::CloseTab),
            KeyCode::Char('f') if ctrl => return Some(Message::Format),
            KeyCode::Char('t') if ctrl => return Some(Message::ToggleView),
            KeyCode::Char('g') if ctrl => return Some(Message::ToggleGrouping),
            KeyCode::Char('e') if ctrl => return Some(Message::JumpToError),
            KeyCode::Char('r') if ctrl => return Some(Message::ToggleWatch),
            KeyCode::Char('l') if ctrl => return Some(Message::ReloadEntity),
            KeyCode::Up if ctrl => return Some(Message::ResizeEditor(-1)),
            KeyCode::Down if ctrl => return Some(Message::ResizeEditor(1)),
            KeyCode::PageDown if ctrl => return Some(Message::CycleTab(1)),
            KeyCode::PageUp if ctrl => return Some(Message::CycleTab(-1)),
            KeyCode::BackTab => return Some(Message::CycleTab(-1)),
            KeyCode::F(1) => return Some(Message::ToggleHelp),
            KeyCode::F(2) => return Some(Message::Format),
            KeyCode::F(3) => return Some(Message::Validate),
            KeyCode::F(4) => return Some(Message::ToggleView),
            KeyCode::F(5) => return Some(Message::ToggleGrouping),
            KeyCode::F(6) => return Some(Message::StartAttribute(Snippet::Property)),
            KeyCode::F(7) => return Some(Message::StartAttribute(Snippet::Relationship)),
            KeyCode::F(8) => return Some(Message::StartAttribute(Snippet::GeoProperty)),
            KeyCode::F(9) => return Some(Message::InsertSnippet(Snippet::Property)),
            _ => {}
        }

        let table = model
            .active_editor()
            .is_some_and(|e| e.view_mode() == ViewMode::Table);
        if table {
            return match key.code {
                KeyCode::Left => Some(Message::SelectColumn(-1)),
                KeyCode::Right => Some(Message::SelectColumn(1)),
                KeyCode::Char('<' | '-') => Some(Message::ResizeColumn(-2)),
                KeyCode::Char('>' | '+') => Some(Message::ResizeColumn(2)),
                KeyCode::Up | KeyCode::Char('k') => Some(Message::Scroll(-1)),
                KeyCode::Down | KeyCode::Char('j') => Some(Message::Scroll(1)),
                KeyCode::PageUp => Some(Message::Scroll(-(half_page(model)))),
                KeyCode::PageDown => Some(Message::Scroll(half_page(model))),
                KeyCode::Char('?') => Some(Message::ToggleHelp),
                KeyCode::Esc => Some(Message::ToggleView),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Left => Some(Message::Move(Motion::Step(Direction::Left))),
            KeyCode::Right => Some(Message::Move(Motion::Step(Direction::Right))),
            KeyCode::Up => Some(Message::Move(Motion::Step(Direction::Up))),
            KeyCode::Down => Some(Message::Move(Motion::Step(Direction::Down))),
            KeyCode::Home if ctrl => Some(Message::Move(Motion::DocumentStart)),
            KeyCode::End if ctrl => Some(Message::Move(Motion::DocumentEnd)),
            KeyCode::Home => Some(Message::Move(Motion::LineStart)),
            KeyCode::End => Some(Message::Move(Motion::LineEnd)),
            KeyCode::PageUp => Some(Message::Page(-1)),
            KeyCode::PageDown => Some(Message::Page(1)),
            KeyCode::Tab => Some(Message::Edit(EditOp::Indent)),
            KeyCode::Enter => Some(Message::Edit(EditOp::InsertChar('\n'))),
            KeyCode::Backspace => Some(Message::Edit(EditOp::Backspace)),
            KeyCode::Delete => Some(Message::Edit(EditOp::Delete)),
            KeyCode::Char(c) if !ctrl => Some(Message::Edit(EditOp::InsertChar(c))),
            _ => None,
        }
    }

    pub(super) fn handle_mouse(
        mouse: MouseEvent,
        model: &Model,
        now_ms: u64,
        clicks: &mut ClickTracker,
    ) -> Option<Message> {
        if model.help_visible {
            return None;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => Some(Message::Scroll(3)),
            MouseEventKind::ScrollUp => Some(Message::Scroll(-3)),
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(tab) = crate::ui::tab_at_column(model, mouse.row, mouse.column) {
                    let active = model.workspace.active_index()?;
                    let step = isize::try_from(tab).ok()? - isize::try_from(active).ok()?;
                    return (step != 0).then_some(Message::CycleTab(step));
                }
                let (line, column) = text_position(model, mouse.column, mouse.row)?;
                if clicks.register(mouse.column, mouse.row, now_ms) {
                    Some(Message::DoubleClickAt(line, column))
                } else {
                    Some(Message::ClickAt(line, column))
                }
            }
            _ => None,
        }
    }

    pub(super) fn view(model: &mut Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}

fn half_page(model: &Model) -> isize {
    isize::try_from(model.body_height() / 2).unwrap_or(1).max(1)
}

/// Map a screen cell inside the raw body to a 1-based line and column.
fn text_position(model: &Model, column: u16, row: u16) -> Option<(usize, usize)> {
    let tab = model.workspace.active()?;
    if tab.editor.view_mode() != ViewMode::Raw {
        return None;
    }
    let body = crate::ui::body_area(model, Rect::new(0, 0, model.terminal_size.0, model.terminal_size.1));
    if row < body.y || row >= body.y + body.height || column < body.x {
        return None;
    }
    let gutter = crate::ui::gutter_width(&tab.editor);
    let line = tab.scroll + usize::from(row - body.y) + 1;
    if line > tab.editor.buffer().line_count() {
        return None;
    }
    let text_col = usize::from(column.saturating_sub(body.x + gutter)) + 1;
    Some((line, text_col))
}
