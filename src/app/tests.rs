use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use tempfile::tempdir;

use crate::broker::{
    BrokerClient, BrokerError, BrokerLink, BrokerRequest, BrokerResponse, Method, Session,
    Transport,
};
use crate::editor::{EditOp, EditorOptions, Motion, Operation, Snippet, TableRenderable, TextEditable};
use crate::view::ViewMode;

use super::effects::save_active;
use super::event_loop::{ClickTracker, ResizeDebouncer};
use super::{App, Message, Model, TOAST_MS, ToastLevel, update};

fn create_test_model(text: &str) -> Model {
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    model.open_text("entity.json", None, text);
    model
}

fn create_table_model() -> Model {
    let mut model = Model::new(EditorOptions::default().with_table_capable(true), (80, 24));
    model.open_text(
        "entities.json",
        None,
        r#"[{"id":"urn:a","type":"Room","temperature":21},{"id":"urn:b","type":"Building"}]"#,
    );
    model
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn type_text(mut model: Model, text: &str) -> Model {
    for ch in text.chars() {
        model = update(model, Message::Edit(EditOp::InsertChar(ch)));
    }
    model
}

#[test]
fn test_edit_marks_dirty_and_defers_validation() {
    let model = create_test_model("{}");
    let mut model = update(model, Message::Move(Motion::DocumentEnd));
    model.now_ms = 1_000;
    model = update(model, Message::Edit(EditOp::Backspace));

    let editor = model.active_editor().unwrap();
    assert!(editor.is_dirty());
    assert!(editor.validation_pending());
    assert!(editor.report().is_none());

    assert!(!model.tick(1_200));
    assert!(model.tick(1_300));
    let editor = model.active_editor().unwrap();
    assert!(!editor.validation_pending());
    assert!(!editor.report().unwrap().is_valid);
    assert_eq!(model.active_toast().map(|(_, level)| level), Some(ToastLevel::Error));
}

#[test]
fn test_toast_expires_after_timeout() {
    let mut model = create_test_model("{}");
    model.now_ms = 100;
    model = update(model, Message::Validate);
    assert_eq!(model.active_toast(), Some(("JSON is valid", ToastLevel::Info)));
    assert!(!model.tick(100 + TOAST_MS - 1));
    assert!(model.tick(100 + TOAST_MS));
    assert!(model.active_toast().is_none());
}

#[test]
fn test_quit_needs_confirmation_when_dirty() {
    let model = type_text(create_test_model("{}"), " ");
    let model = update(model, Message::Quit);
    assert!(!model.should_quit);
    assert_eq!(model.active_toast().map(|(_, l)| l), Some(ToastLevel::Warning));
    let model = update(model, Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_other_message_resets_quit_confirmation() {
    let model = type_text(create_test_model("{}"), " ");
    let model = update(model, Message::Quit);
    let model = update(model, Message::Move(Motion::DocumentStart));
    let model = update(model, Message::Quit);
    assert!(!model.should_quit);
}

#[test]
fn test_clean_quit_is_immediate() {
    let model = update(create_test_model("{}"), Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_close_dirty_tab_needs_second_press() {
    let mut model = create_test_model("{}");
    model.open_text("second.json", None, "[]");
    let model = type_text(model, " ");
    let model = update(model, Message::CloseTab);
    assert_eq!(model.workspace.len(), 2);
    let model = update(model, Message::CloseTab);
    assert_eq!(model.workspace.len(), 1);
    assert_eq!(model.workspace.active().unwrap().title, "entity.json");
}

#[test]
fn test_attribute_prompt_inserts_member() {
    let mut model = create_test_model("{\n  \"id\": \"urn:ngsi-ld:Room:1\"\n}");
    model = update(model, Message::StartAttribute(Snippet::Relationship));
    assert!(model.prompt.is_some());
    for ch in "owner".chars() {
        model = update(model, Message::PromptInput(ch));
    }
    model = update(model, Message::PromptInput('x'));
    model = update(model, Message::PromptBackspace);
    model = update(model, Message::PromptSubmit);

    assert!(model.prompt.is_none());
    let value = model.active_editor().unwrap().parsed_value().unwrap();
    assert_eq!(value["owner"]["type"], "Relationship");
    assert_eq!(value["id"], "urn:ngsi-ld:Room:1");
}

#[test]
fn test_attribute_prompt_rejects_empty_name() {
    let model = create_test_model("{}");
    let model = update(model, Message::StartAttribute(Snippet::Property));
    let model = update(model, Message::PromptSubmit);
    assert_eq!(model.active_editor().unwrap().value(), "{}");
    assert_eq!(
        model.active_toast(),
        Some(("Attribute name is empty", ToastLevel::Warning))
    );
}

#[test]
fn test_prompt_cancel_leaves_document() {
    let model = create_test_model("{}");
    let model = update(model, Message::StartAttribute(Snippet::GeoProperty));
    let model = update(model, Message::PromptInput('a'));
    let model = update(model, Message::PromptCancel);
    assert!(model.prompt.is_none());
    assert!(!model.active_editor().unwrap().is_dirty());
}

#[test]
fn test_view_only_editor_rejects_edits() {
    let options = EditorOptions::default().with_operation(Operation::View);
    let mut model = Model::new(options, (80, 24));
    model.open_text("ro.json", None, "{}");
    let model = update(model, Message::Edit(EditOp::InsertChar('x')));
    assert_eq!(model.active_editor().unwrap().value(), "{}");
    assert_eq!(model.active_toast(), Some(("Opened read-only", ToastLevel::Info)));
    let model = update(model, Message::StartAttribute(Snippet::Property));
    assert!(model.prompt.is_none());
}

#[test]
fn test_table_column_selection_clamps() {
    let model = create_table_model();
    assert_eq!(model.active_editor().unwrap().view_mode(), ViewMode::Table);
    let model = update(model, Message::SelectColumn(10));
    assert_eq!(model.table_column, 2);
    let model = update(model, Message::SelectColumn(-10));
    assert_eq!(model.table_column, 0);
}

#[test]
fn test_table_column_resize() {
    let model = update(create_table_model(), Message::SelectColumn(1));
    let before = model.active_editor().unwrap().column_info(1).unwrap().1;
    let model = update(model, Message::ResizeColumn(4));
    let (name, after) = model.active_editor().unwrap().column_info(1).unwrap();
    assert_eq!(name, "type");
    assert_eq!(after, before + 4);
}

#[test]
fn test_toggle_view_on_object_warns() {
    let model = update(create_test_model("{}"), Message::ToggleView);
    assert_eq!(model.active_editor().unwrap().view_mode(), ViewMode::Raw);
    assert_eq!(model.active_toast().map(|(_, l)| l), Some(ToastLevel::Warning));
}

#[test]
fn test_toggle_view_round_trip() {
    let model = update(create_table_model(), Message::ToggleView);
    assert_eq!(model.active_editor().unwrap().view_mode(), ViewMode::Raw);
    let model = update(model, Message::ToggleView);
    assert_eq!(model.active_editor().unwrap().view_mode(), ViewMode::Table);
}

#[test]
fn test_scroll_clamps_to_last_line() {
    let model = create_test_model("{\n}\n");
    let model = update(model, Message::Scroll(50));
    assert_eq!(model.workspace.active().unwrap().scroll, 2);
    let model = update(model, Message::Scroll(-50));
    assert_eq!(model.workspace.active().unwrap().scroll, 0);
}

#[test]
fn test_cursor_stays_visible_when_moving_down() {
    let text = format!("[\n{}\n]", vec!["1"; 60].join(",\n"));
    let model = create_test_model(&text);
    let model = update(model, Message::Move(Motion::DocumentEnd));
    let tab = model.workspace.active().unwrap();
    let height = usize::from(model.body_height());
    assert_eq!(tab.scroll + height, tab.editor.buffer().line_count());
}

#[test]
fn test_cycle_tab_wraps() {
    let mut model = create_test_model("{}");
    model.open_text("b.json", None, "{}");
    let model = update(model, Message::CycleTab(1));
    assert_eq!(model.workspace.active_index(), Some(0));
}

#[test]
fn test_resize_editor_respects_resizable() {
    let options = EditorOptions {
        resizable: false,
        ..EditorOptions::default()
    };
    let mut model = Model::new(options, (80, 24));
    model.open_text("fixed.json", None, "{}");
    let model = update(model, Message::ResizeEditor(-5));
    assert_eq!(model.active_editor().unwrap().options().height, 300);
    assert_eq!(
        model.active_toast(),
        Some(("Editor is not resizable", ToastLevel::Info))
    );
}

#[test]
fn test_save_writes_valid_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("room.json");
    std::fs::write(&path, "{}").unwrap();
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    model.open_file(&path).unwrap();
    let mut model = update(model, Message::Move(Motion::DocumentEnd));
    model = update(model, Message::Move(Motion::Step(crate::editor::Direction::Left)));
    model = type_text(model, "\"id\":\"urn:a\"");

    save_active(&mut model);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"id\":\"urn:a\"}");
    assert!(!model.active_editor().unwrap().is_dirty());
    assert_eq!(model.active_toast(), Some(("Saved room.json", ToastLevel::Info)));
}

#[test]
fn test_save_refuses_invalid_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("room.json");
    std::fs::write(&path, "{}").unwrap();
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    model.open_file(&path).unwrap();
    let mut model = type_text(model, "x");

    save_active(&mut model);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    assert!(model.active_editor().unwrap().is_dirty());
    assert_eq!(model.active_toast().map(|(_, l)| l), Some(ToastLevel::Error));
}

#[test]
fn test_save_asks_before_overwriting_external_change() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("room.json");
    std::fs::write(&path, "{}").unwrap();
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    model.open_file(&path).unwrap();
    std::fs::write(&path, "[]").unwrap();

    save_active(&mut model);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    assert_eq!(model.active_toast().map(|(_, l)| l), Some(ToastLevel::Warning));

    save_active(&mut model);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[test]
fn test_untitled_save_only_validates() {
    let mut model = create_test_model("{}");
    save_active(&mut model);
    assert_eq!(
        model.active_toast(),
        Some(("Document is valid (no file to save to)", ToastLevel::Info))
    );
}

#[test]
fn test_file_change_reloads_clean_tab() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.json");
    std::fs::write(&path, "{}").unwrap();
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    model.open_file(&path).unwrap();
    std::fs::write(&path, "{\"id\":\"urn:x\"}").unwrap();

    let mut watcher = None;
    App::handle_message_side_effects(&mut model, &mut watcher, &Message::FileChanged(path));
    assert_eq!(model.active_editor().unwrap().value(), "{\"id\":\"urn:x\"}");
    assert!(!model.active_editor().unwrap().is_dirty());
}

#[test]
fn test_file_change_keeps_unsaved_edits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.json");
    std::fs::write(&path, "{}").unwrap();
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    model.open_file(&path).unwrap();
    let mut model = type_text(model, " ");
    std::fs::write(&path, "[]").unwrap();

    let mut watcher = None;
    App::handle_message_side_effects(&mut model, &mut watcher, &Message::FileChanged(path));
    assert_eq!(model.active_editor().unwrap().value(), " {}");
    assert_eq!(model.active_toast().map(|(_, l)| l), Some(ToastLevel::Warning));
}

#[test]
fn test_open_same_file_twice_focuses_existing_tab() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.json");
    std::fs::write(&path, "{}").unwrap();
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    let first = model.open_file(&path).unwrap();
    model.open_text("other", None, "{}");
    assert_eq!(model.open_file(&path).unwrap(), first);
    assert_eq!(model.workspace.len(), 2);
    assert_eq!(model.workspace.registry().active(), Some(first));
}

#[test]
fn test_build_model_without_files_opens_scratch_tab() {
    let mut app = App::new(Vec::new()).with_config_paths(Some(PathBuf::from("/etc/ld")), None);
    let model = app.build_model((80, 24)).unwrap();
    assert_eq!(model.workspace.len(), 1);
    assert_eq!(model.workspace.active().unwrap().title, "untitled");
    assert_eq!(model.config_global_path, Some(PathBuf::from("/etc/ld")));
}

#[test]
fn test_build_model_activates_first_file() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.json");
    let b = dir.path().join("b.json");
    std::fs::write(&a, "{}").unwrap();
    std::fs::write(&b, "[]").unwrap();
    let model = App::new(vec![a, b]).with_watch(true).build_model((80, 24)).unwrap();
    assert_eq!(model.workspace.len(), 2);
    assert_eq!(model.workspace.active_index(), Some(0));
    assert!(model.watch_enabled);
}

#[test]
fn test_build_model_reports_missing_file() {
    let dir = tempdir().unwrap();
    let mut app = App::new(vec![dir.path().join("missing.json")]);
    assert!(app.build_model((80, 24)).is_err());
}

#[test]
fn test_global_key_bindings() {
    let model = create_test_model("{}");
    assert_eq!(App::handle_key(ctrl('s'), &model), Some(Message::Save));
    assert_eq!(App::handle_key(ctrl('l'), &model), Some(Message::ReloadEntity));
    assert_eq!(App::handle_key(ctrl('q'), &model), Some(Message::Quit));
    assert_eq!(App::handle_key(ctrl('w'), &model), Some(Message::CloseTab));
    assert_eq!(
        App::handle_key(key(KeyCode::F(7)), &model),
        Some(Message::StartAttribute(Snippet::Relationship))
    );
    assert_eq!(App::handle_key(key(KeyCode::F(3)), &model), Some(Message::Validate));
}

#[test]
fn test_raw_keys_edit_text() {
    let model = create_test_model("{}");
    assert_eq!(
        App::handle_key(key(KeyCode::Char('a')), &model),
        Some(Message::Edit(EditOp::InsertChar('a')))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Tab), &model),
        Some(Message::Edit(EditOp::Indent))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Enter), &model),
        Some(Message::Edit(EditOp::InsertChar('\n')))
    );
}

#[test]
fn test_table_keys_navigate_columns() {
    let model = create_table_model();
    assert_eq!(
        App::handle_key(key(KeyCode::Right), &model),
        Some(Message::SelectColumn(1))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('>')), &model),
        Some(Message::ResizeColumn(2))
    );
    assert_eq!(App::handle_key(key(KeyCode::Esc), &model), Some(Message::ToggleView));
    assert_eq!(App::handle_key(key(KeyCode::Char('a')), &model), None);
}

#[test]
fn test_prompt_captures_keys() {
    let model = update(create_test_model("{}"), Message::StartAttribute(Snippet::Property));
    assert_eq!(
        App::handle_key(key(KeyCode::Char('s')), &model),
        Some(Message::PromptInput('s'))
    );
    assert_eq!(App::handle_key(key(KeyCode::Enter), &model), Some(Message::PromptSubmit));
    assert_eq!(App::handle_key(key(KeyCode::Esc), &model), Some(Message::PromptCancel));
}

#[test]
fn test_any_key_closes_help() {
    let model = update(create_test_model("{}"), Message::ToggleHelp);
    assert!(model.help_visible);
    assert_eq!(App::handle_key(key(KeyCode::Char('x')), &model), Some(Message::HideHelp));
}

#[test]
fn test_focus_lost_and_paste_events() {
    let model = create_test_model("{}");
    let mut resize = ResizeDebouncer::new(100);
    let mut clicks = ClickTracker::default();
    assert_eq!(
        App::handle_event(&Event::FocusLost, &model, 0, &mut resize, &mut clicks),
        Some(Message::Blur)
    );
    assert_eq!(
        App::handle_event(&Event::Paste("{}".into()), &model, 0, &mut resize, &mut clicks),
        Some(Message::Edit(EditOp::InsertText("{}".into())))
    );
}

#[test]
fn test_resize_event_is_debounced() {
    let model = create_test_model("{}");
    let mut resize = ResizeDebouncer::new(100);
    let mut clicks = ClickTracker::default();
    assert_eq!(
        App::handle_event(&Event::Resize(100, 40), &model, 0, &mut resize, &mut clicks),
        None
    );
    assert!(resize.is_pending());
    assert_eq!(resize.take_ready(50), None);
    assert_eq!(resize.take_ready(100), Some((100, 40)));
    assert!(!resize.is_pending());
}

#[test]
fn test_click_tracker_detects_double_click() {
    let mut clicks = ClickTracker::default();
    assert!(!clicks.register(5, 3, 0));
    assert!(clicks.register(5, 3, 200));
    assert!(!clicks.register(5, 3, 300));
    assert!(!clicks.register(5, 3, 1_000));
    assert!(!clicks.register(6, 3, 1_100));
}

#[test]
fn test_mouse_click_maps_to_text_position() {
    let model = create_test_model("{\n  \"id\": 1\n}");
    let mut clicks = ClickTracker::default();
    let click = |column, row| MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column,
        row,
        modifiers: KeyModifiers::NONE,
    };
    // Tab bar and toolbar sit above the body.
    assert_eq!(
        App::handle_mouse(click(3, 3), &model, 0, &mut clicks),
        Some(Message::ClickAt(2, 4))
    );
    assert_eq!(
        App::handle_mouse(click(3, 3), &model, 100, &mut clicks),
        Some(Message::DoubleClickAt(2, 4))
    );
    assert_eq!(App::handle_mouse(click(3, 20), &model, 200, &mut clicks), None);
}

#[test]
fn test_mouse_click_on_tab_switches() {
    let mut model = create_test_model("{}");
    model.open_text("b.json", None, "{}");
    let mut clicks = ClickTracker::default();
    let event = MouseEvent {
        kind: MouseEventKind::Down(MouseButton::Left),
        column: 1,
        row: 0,
        modifiers: KeyModifiers::NONE,
    };
    assert_eq!(
        App::handle_mouse(event, &model, 0, &mut clicks),
        Some(Message::CycleTab(-1))
    );
}

#[test]
fn test_double_click_selects_string() {
    let model = create_test_model("{\"id\": \"urn:a\"}");
    let model = update(model, Message::DoubleClickAt(1, 11));
    let buffer = model.active_editor().unwrap().buffer();
    let selection = buffer.selection();
    assert_eq!(&buffer.text()[selection.start..selection.end], "urn:a");
}

#[test]
fn test_message_is_edit() {
    assert!(Message::Edit(EditOp::Backspace).is_edit());
    assert!(Message::Format.is_edit());
    assert!(!Message::Validate.is_edit());
    assert!(!Message::Scroll(1).is_edit());
}

const ROOM: &str = r#"{"id":"urn:ngsi-ld:Room:1","type":"Room"}"#;

/// An in-memory broker holding one entity document.
struct FakeBroker {
    stored: Rc<RefCell<String>>,
    sent: Rc<RefCell<Vec<(Method, String)>>>,
}

impl Transport for FakeBroker {
    fn send(&self, request: &BrokerRequest) -> Result<BrokerResponse, BrokerError> {
        self.sent
            .borrow_mut()
            .push((request.method, request.url.path().to_string()));
        let (status, body) = match request.method {
            Method::Get => (200, self.stored.borrow().clone()),
            Method::Put | Method::Post => {
                if let Some(body) = &request.body {
                    self.stored.borrow_mut().clone_from(body);
                }
                (204, String::new())
            }
            Method::Patch | Method::Delete => (400, r#"{"title":"Unsupported"}"#.to_string()),
        };
        Ok(BrokerResponse { status, body })
    }
}

struct BrokerFixture {
    stored: Rc<RefCell<String>>,
    sent: Rc<RefCell<Vec<(Method, String)>>>,
}

fn fake_broker(entity: &str) -> (BrokerLink, BrokerFixture) {
    let stored = Rc::new(RefCell::new(entity.to_string()));
    let sent = Rc::new(RefCell::new(Vec::new()));
    let transport = FakeBroker {
        stored: Rc::clone(&stored),
        sent: Rc::clone(&sent),
    };
    let client = BrokerClient::new("http://broker:1026", Session::default()).unwrap();
    (BrokerLink::new(client, Box::new(transport)), BrokerFixture { stored, sent })
}

fn broker_model(options: EditorOptions) -> (Model, BrokerFixture) {
    let (link, fixture) = fake_broker(ROOM);
    let mut model = Model::new(options, (80, 24));
    model.broker = Some(link);
    (model, fixture)
}

#[test]
fn test_open_entity_loads_from_broker_once() {
    let (mut model, fixture) = broker_model(EditorOptions::default());
    let first = model.open_entity("urn:ngsi-ld:Room:1").unwrap();
    let tab = model.workspace.active().unwrap();
    assert_eq!(tab.title, "urn:ngsi-ld:Room:1");
    assert_eq!(tab.editor.entity_id(), Some("urn:ngsi-ld:Room:1"));
    assert_eq!(tab.editor.parsed_value().unwrap()["type"], "Room");
    assert!(!tab.editor.is_dirty());

    model.open_text("other", None, "{}");
    assert_eq!(model.open_entity("urn:ngsi-ld:Room:1").unwrap(), first);
    assert_eq!(model.workspace.active().map(|t| t.id), Some(first));
    assert_eq!(fixture.sent.borrow().len(), 1);
}

#[test]
fn test_open_entity_without_broker_fails() {
    let mut model = Model::new(EditorOptions::default(), (80, 24));
    assert!(model.open_entity("urn:x").is_err());
    assert!(model.workspace.is_empty());
}

#[test]
fn test_save_entity_tab_replaces_on_broker() {
    let (mut model, fixture) = broker_model(EditorOptions::default());
    model.open_entity("urn:ngsi-ld:Room:1").unwrap();
    let mut model = update(model, Message::Move(Motion::DocumentEnd));
    model = update(model, Message::Edit(EditOp::InsertChar('\n')));

    save_active(&mut model);
    let sent = fixture.sent.borrow();
    assert_eq!(
        sent.last(),
        Some(&(Method::Put, "/ngsi-ld/v1/entities/urn:ngsi-ld:Room:1".to_string()))
    );
    assert!(fixture.stored.borrow().ends_with("}\n"));
    assert!(!model.active_editor().unwrap().is_dirty());
    assert_eq!(
        model.active_toast(),
        Some(("Stored urn:ngsi-ld:Room:1", ToastLevel::Info))
    );
}

#[test]
fn test_save_new_entity_posts_then_updates() {
    let options = EditorOptions::default().with_operation(Operation::Create);
    let (mut model, fixture) = broker_model(options);
    model.open_text("untitled", None, r#"{"id":"urn:ngsi-ld:Room:2","type":"Room"}"#);

    save_active(&mut model);
    let tab = model.workspace.active().unwrap();
    assert_eq!(tab.title, "urn:ngsi-ld:Room:2");
    assert_eq!(tab.editor.entity_id(), Some("urn:ngsi-ld:Room:2"));
    assert_eq!(tab.editor.options().operation, Operation::Update);

    save_active(&mut model);
    let methods: Vec<Method> = fixture.sent.borrow().iter().map(|(m, _)| *m).collect();
    assert_eq!(methods, vec![Method::Post, Method::Put]);
}

#[test]
fn test_save_malformed_entity_is_not_stored() {
    let (mut model, fixture) = broker_model(EditorOptions::default());
    model.open_text("untitled", None, r#"{"type":"Room"}"#);
    save_active(&mut model);
    assert!(fixture.sent.borrow().is_empty());
    assert_eq!(model.active_toast().map(|(_, l)| l), Some(ToastLevel::Error));
}

#[test]
fn test_reload_entity_respects_unsaved_edits() {
    let (mut model, fixture) = broker_model(EditorOptions::default());
    model.open_entity("urn:ngsi-ld:Room:1").unwrap();
    *fixture.stored.borrow_mut() = r#"{"id":"urn:ngsi-ld:Room:1","type":"Hall"}"#.to_string();

    let mut model = type_text(model, " ");
    let mut watcher = None;
    App::handle_message_side_effects(&mut model, &mut watcher, &Message::ReloadEntity);
    assert_eq!(model.active_toast().map(|(_, l)| l), Some(ToastLevel::Warning));
    assert!(model.active_editor().unwrap().value().starts_with(' '));

    model = update(model, Message::Edit(EditOp::Backspace));
    model.active_editor_mut().unwrap().mark_saved();
    App::handle_message_side_effects(&mut model, &mut watcher, &Message::ReloadEntity);
    assert_eq!(
        model.active_editor().unwrap().parsed_value().unwrap()["type"],
        "Hall"
    );
}

#[test]
fn test_reload_on_file_tab_is_a_no_op() {
    let (mut model, fixture) = broker_model(EditorOptions::default());
    model.open_text("local.json", None, "{}");
    let mut watcher = None;
    App::handle_message_side_effects(&mut model, &mut watcher, &Message::ReloadEntity);
    assert_eq!(
        model.active_toast(),
        Some(("Not a broker entity", ToastLevel::Info))
    );
    assert!(fixture.sent.borrow().is_empty());
}

#[test]
fn test_build_model_opens_entities_after_files() {
    let (link, _fixture) = fake_broker(ROOM);
    let mut app = App::new(Vec::new())
        .with_broker(link)
        .with_entities(vec!["urn:ngsi-ld:Room:1".to_string()]);
    let model = app.build_model((80, 24)).unwrap();
    assert_eq!(model.workspace.len(), 1);
    assert_eq!(model.workspace.tabs()[0].title, "urn:ngsi-ld:Room:1");
    assert!(model.broker.is_some());
}
