use std::path::Path;

use anyhow::{Context, Result};

use crate::app::{App, Message, Model, ToastLevel};
use crate::broker::BrokerError;
use crate::watcher::FileWatcher;

use super::model::hash_bytes;

/// Quiet period after the last filesystem event before a reload.
pub(super) const WATCH_DEBOUNCE_MS: u64 = 200;

impl App {
    pub(super) fn handle_message_side_effects(
        model: &mut Model,
        file_watcher: &mut Option<FileWatcher>,
        msg: &Message,
    ) {
        match msg {
            Message::ToggleWatch => {
                if model.watch_enabled {
                    *file_watcher = Self::make_file_watcher(model);
                    if file_watcher.is_some() {
                        model.show_toast(ToastLevel::Info, "Watching file changes");
                    }
                } else {
                    *file_watcher = None;
                    model.show_toast(ToastLevel::Info, "Watch disabled");
                }
            }
            Message::FileChanged(path) => match model.reload_from_disk(path) {
                Ok(true) => {
                    model.toast_report();
                    crate::perf::log_event("reload", format!("path={}", path.display()));
                }
                Ok(false) => {}
                Err(err) => {
                    model.show_toast(ToastLevel::Error, format!("Reload failed: {err:#}"));
                    crate::perf::log_event(
                        "reload.error",
                        format!("failed path={} err={err}", path.display()),
                    );
                }
            },
            Message::Save => save_active(model),
            Message::ReloadEntity => match model.reload_active_entity() {
                Ok(true) => model.toast_report(),
                Ok(false) => {}
                Err(err) => {
                    model.show_toast(ToastLevel::Error, format!("Reload failed: {err:#}"));
                }
            },
            Message::CloseTab => {
                if let Some(watcher) = file_watcher.as_mut() {
                    for path in watcher.watched() {
                        let open = model
                            .workspace
                            .tabs()
                            .iter()
                            .filter_map(|t| t.path.as_deref())
                            .any(|p| same_file(p, &path));
                        if !open {
                            watcher.remove(&path);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Validate the active document and write it back to its file, or store
/// it on the broker when it has no file.
pub(super) fn save_active(model: &mut Model) {
    let now = model.now_ms;
    let Some(tab) = model.workspace.active() else {
        return;
    };
    let id = tab.id;
    let path = tab.path.clone();
    let title = tab.title.clone();
    let operation = tab.editor.options().operation;

    if let Some(path) = path.as_deref()
        && model.disk_changed(id, path)
        && !model.save_confirmed
    {
        model.save_confirmed = true;
        model.show_toast(
            ToastLevel::Warning,
            format!("{title} changed on disk. Ctrl+S again to overwrite"),
        );
        return;
    }
    model.save_confirmed = false;

    let Some(editor) = model.active_editor_mut() else {
        return;
    };
    let text = match editor.save() {
        Ok(text) => text,
        Err(err) => {
            editor.highlight_first_error(now);
            model.show_toast(ToastLevel::Error, format!("Not saved: {err}"));
            return;
        }
    };
    let Some(path) = path else {
        match model.broker.as_ref().map(|link| link.store_entity(&text, operation)) {
            Some(stored) => finish_store(model, stored),
            None => model.show_toast(ToastLevel::Info, "Document is valid (no file to save to)"),
        }
        return;
    };
    match write_document(&path, &text) {
        Ok(()) => {
            if let Some(editor) = model.active_editor_mut() {
                editor.mark_saved();
            }
            model.disk_hashes.insert(id, hash_bytes(text.as_bytes()));
            model.show_toast(ToastLevel::Info, format!("Saved {title}"));
        }
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "save failed");
            model.show_toast(ToastLevel::Error, format!("Save failed: {err:#}"));
        }
    }
}

fn finish_store(model: &mut Model, stored: Result<String, BrokerError>) {
    match stored {
        Ok(entity_id) => {
            if let Some(tab) = model.workspace.active_mut() {
                tab.editor.mark_saved();
                tab.editor.bind_entity(entity_id.clone());
                tab.title.clone_from(&entity_id);
            }
            model.show_toast(ToastLevel::Info, format!("Stored {entity_id}"));
        }
        Err(err) => {
            tracing::error!(error = %err, "broker save failed");
            model.show_toast(ToastLevel::Error, format!("Not stored: {err}"));
        }
    }
}

fn write_document(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
}

fn same_file(a: &Path, b: &Path) -> bool {
    let canonical = |p: &Path| p.canonicalize().unwrap_or_else(|_| p.to_path_buf());
    canonical(a) == canonical(b)
}
