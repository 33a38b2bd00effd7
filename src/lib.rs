// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. editor::EditorOptions)
    clippy::module_name_repetitions
)]

//! # ldconsole
//!
//! A terminal console for inspecting and editing NGSI-LD entity documents.
//!
//! Each open document gets a [`editor::JsonEditor`] with:
//! - A rope-backed text buffer and a syntax-highlighted projection
//! - Debounced syntax and JSON Schema validation with located errors
//! - A table view for arrays of entities, optionally grouped by `type`
//! - Templates for Property, Relationship and GeoProperty attributes
//! - File watching that reloads unmodified tabs
//!
//! ## Architecture
//!
//! The terminal host uses The Elm Architecture (TEA) pattern:
//! - **Model**: the workspace of editors plus host state
//! - **Message**: events and actions
//! - **Update**: pure state transitions
//! - **View**: render to terminal
//!
//! ## Modules
//!
//! - [`editor`]: the editing core and its capability traits
//! - [`validate`]: syntax and schema validation
//! - [`view`]: raw/table view state
//! - [`highlight`]: the highlighted projection of a document
//! - [`workspace`]: open tabs, the active editor and window listeners
//! - [`broker`]: NGSI-LD request building
//! - [`app`]: main application loop and state
//! - [`ui`]: terminal UI components
//! - [`watcher`]: file watching
//! - [`config`]: persisted command-line defaults

pub mod app;
pub mod broker;
pub mod config;
pub mod editor;
pub mod error;
pub mod highlight;
pub mod perf;
pub mod ui;
pub mod validate;
pub mod view;
pub mod watcher;
pub mod workspace;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::editor::{
        EditOp, EditorEvent, EditorOptions, FormRenderable, JsonEditor, Snippet, TableRenderable,
        TextEditable,
    };
    pub use crate::error::EditorError;
    pub use crate::validate::{ValidationReport, Validator};
    pub use crate::view::ViewMode;
}
