//! Tabs of open editors, the active-editor registry and window listener
//! bookkeeping.

use std::path::{Path, PathBuf};

use crate::editor::JsonEditor;

pub type EditorId = u64;
pub type ListenerId = u64;

/// Host window notifications an editor can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Resize,
    Online,
    Offline,
}

impl WindowEvent {
    pub const ALL: [Self; 3] = [Self::Resize, Self::Online, Self::Offline];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Registration {
    id: ListenerId,
    editor: EditorId,
    event: WindowEvent,
}

/// Window-level listener registrations, at most one per editor and event.
#[derive(Debug, Default)]
pub struct WindowListeners {
    next_id: ListenerId,
    registrations: Vec<Registration>,
}

impl WindowListeners {
    /// Register `editor` for `event`. Registering again returns the
    /// existing id.
    pub fn register(&mut self, editor: EditorId, event: WindowEvent) -> ListenerId {
        if let Some(existing) = self
            .registrations
            .iter()
            .find(|r| r.editor == editor && r.event == event)
        {
            return existing.id;
        }
        self.next_id += 1;
        self.registrations.push(Registration {
            id: self.next_id,
            editor,
            event,
        });
        self.next_id
    }

    /// Drop every registration held by `editor`; returns how many.
    pub fn release(&mut self, editor: EditorId) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.editor != editor);
        before - self.registrations.len()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn count_for(&self, editor: EditorId) -> usize {
        self.registrations.iter().filter(|r| r.editor == editor).count()
    }

    /// Editors subscribed to `event`, in registration order.
    pub fn subscribers(&self, event: WindowEvent) -> Vec<EditorId> {
        self.registrations
            .iter()
            .filter(|r| r.event == event)
            .map(|r| r.editor)
            .collect()
    }
}

/// Which editor currently has focus. Collaborators that act on "the
/// current editor" take this instead of reaching for shared state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ActiveEditorRegistry {
    active: Option<EditorId>,
}

impl ActiveEditorRegistry {
    pub const fn active(&self) -> Option<EditorId> {
        self.active
    }

    pub const fn set(&mut self, editor: Option<EditorId>) {
        self.active = editor;
    }

    pub fn is_active(&self, editor: EditorId) -> bool {
        self.active == Some(editor)
    }
}

#[derive(Debug)]
pub struct Tab {
    pub id: EditorId,
    pub title: String,
    pub path: Option<PathBuf>,
    pub editor: JsonEditor,
    /// First visible line of the raw view.
    pub scroll: usize,
}

#[derive(Debug, Default)]
pub struct Workspace {
    tabs: Vec<Tab>,
    registry: ActiveEditorRegistry,
    listeners: WindowListeners,
    next_id: EditorId,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tab, register its window listeners and make it active.
    pub fn open(&mut self, title: impl Into<String>, path: Option<PathBuf>, editor: JsonEditor) -> EditorId {
        self.next_id += 1;
        let id = self.next_id;
        for event in WindowEvent::ALL {
            self.listeners.register(id, event);
        }
        self.tabs.push(Tab {
            id,
            title: title.into(),
            path,
            editor,
            scroll: 0,
        });
        self.registry.set(Some(id));
        tracing::debug!(id, tabs = self.tabs.len(), "tab opened");
        id
    }

    /// Close a tab and release its listeners. Focus moves to the tab that
    /// took its place, or the new last tab.
    pub fn close(&mut self, id: EditorId) -> Option<Tab> {
        let idx = self.tabs.iter().position(|t| t.id == id)?;
        let tab = self.tabs.remove(idx);
        let released = self.listeners.release(id);
        if self.registry.is_active(id) {
            let next = self
                .tabs
                .get(idx)
                .or_else(|| self.tabs.last())
                .map(|t| t.id);
            self.registry.set(next);
        }
        tracing::debug!(id, released, "tab closed");
        Some(tab)
    }

    pub fn activate(&mut self, id: EditorId) -> bool {
        if self.tabs.iter().any(|t| t.id == id) {
            self.registry.set(Some(id));
            true
        } else {
            false
        }
    }

    /// Cycle focus by `step` tabs, wrapping around.
    pub fn cycle(&mut self, step: isize) {
        let Some(current) = self.active_index() else {
            return;
        };
        let len = self.tabs.len();
        let offset = usize::try_from(step.rem_euclid(isize::try_from(len).unwrap_or(isize::MAX)))
            .unwrap_or(0);
        let id = self.tabs[(current + offset) % len].id;
        self.registry.set(Some(id));
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub const fn len(&self) -> usize {
        self.tabs.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub const fn registry(&self) -> &ActiveEditorRegistry {
        &self.registry
    }

    pub const fn listeners(&self) -> &WindowListeners {
        &self.listeners
    }

    pub fn active_index(&self) -> Option<usize> {
        let id = self.registry.active()?;
        self.tabs.iter().position(|t| t.id == id)
    }

    pub fn active(&self) -> Option<&Tab> {
        self.active_index().map(|idx| &self.tabs[idx])
    }

    pub fn active_mut(&mut self) -> Option<&mut Tab> {
        self.active_index().map(|idx| &mut self.tabs[idx])
    }

    pub fn get_mut(&mut self, id: EditorId) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<EditorId> {
        self.tabs
            .iter()
            .find(|t| t.path.as_deref() == Some(path))
            .map(|t| t.id)
    }

    /// Tabs subscribed to `event`.
    pub fn subscribers_mut(&mut self, event: WindowEvent) -> impl Iterator<Item = &mut Tab> {
        let ids = self.listeners.subscribers(event);
        self.tabs.iter_mut().filter(move |t| ids.contains(&t.id))
    }

    /// Advance every editor's timers; returns the ids whose debounced
    /// validation fired.
    pub fn tick(&mut self, now_ms: u64) -> Vec<EditorId> {
        self.tabs
            .iter_mut()
            .filter_map(|t| t.editor.tick(now_ms).map(|_| t.id))
            .collect()
    }
}
