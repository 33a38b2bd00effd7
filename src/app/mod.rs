//! The terminal host and its event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: the workspace of open editors plus host state
//! - [`Message`]: all possible events and actions
//! - [`update`]: state transitions
//! - [`App::run`]: main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{AttributePrompt, Model, TOAST_MS, ToastLevel};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::broker::BrokerLink;
use crate::editor::EditorOptions;

/// Owns the startup configuration and runs the event loop.
#[derive(Debug, Default)]
pub struct App {
    files: Vec<PathBuf>,
    entities: Vec<String>,
    broker: Option<BrokerLink>,
    editor_options: EditorOptions,
    watch_enabled: bool,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create an application that opens `files`, one tab each.
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    /// Options every tab's editor starts from.
    pub fn with_editor_options(mut self, options: EditorOptions) -> Self {
        self.editor_options = options;
        self
    }

    /// Load and save entity tabs through `broker`.
    pub fn with_broker(mut self, broker: BrokerLink) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Entity ids to open from the broker, one tab each, after the files.
    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }

    /// Enable or disable file watching.
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// Set config paths to show in help.
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}

#[cfg(test)]
mod tests;
