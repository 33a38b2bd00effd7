use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, ToastLevel, update};
use crate::watcher::FileWatcher;

/// Window in which a second click on the same cell is a double click.
const DOUBLE_CLICK_MS: u64 = 400;

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Turns two quick clicks on one cell into a double click.
#[derive(Debug, Default)]
pub(super) struct ClickTracker {
    last: Option<(u16, u16, u64)>,
}

impl ClickTracker {
    /// Record a click; returns `true` when it completes a double click.
    pub(super) fn register(&mut self, column: u16, row: u16, now_ms: u64) -> bool {
        let double = self.last.is_some_and(|(c, r, at)| {
            c == column && r == row && now_ms.saturating_sub(at) <= DOUBLE_CLICK_MS
        });
        self.last = if double { None } else { Some((column, row, now_ms)) };
        double
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or the terminal fails.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; ldconsole requires an interactive terminal")?;
        let size = terminal.size()?;
        drop(init_scope);

        let model = self.build_model((size.width, size.height));
        let mut model = match model {
            Ok(model) => model,
            Err(err) => {
                ratatui::restore();
                return Err(err);
            }
        };

        let _ = execute!(stdout(), EnableMouseCapture, EnableFocusChange);
        let result = Self::event_loop(&mut terminal, &mut model);

        // Restore terminal
        let _ = execute!(stdout(), DisableMouseCapture, DisableFocusChange);
        ratatui::restore();

        result
    }

    /// Open every file and broker entity (or one scratch tab) into a fresh
    /// model. The broker link moves into the model.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read or an entity cannot be
    /// fetched.
    pub fn build_model(&mut self, terminal_size: (u16, u16)) -> Result<Model> {
        let read_scope = crate::perf::scope("app.read_files");
        let mut model = Model::new(self.editor_options.clone(), terminal_size);
        model.watch_enabled = self.watch_enabled;
        model.config_global_path.clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);
        model.broker = self.broker.take();
        for path in &self.files {
            model.open_file(path)?;
        }
        for entity_id in &self.entities {
            model.open_entity(entity_id)?;
        }
        if model.workspace.is_empty() {
            model.open_text("untitled", None, "{}");
        }
        if let Some(first) = model.workspace.tabs().first().map(|t| t.id) {
            model.workspace.activate(first);
        }
        drop(read_scope);
        crate::perf::log_event("init.tabs", format!("count={}", model.workspace.len()));
        Ok(model)
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let start = Instant::now();
        let elapsed_ms = || u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut clicks = ClickTracker::default();
        let mut file_watcher = if model.watch_enabled {
            Self::make_file_watcher(model)
        } else {
            None
        };
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            let now_ms = elapsed_ms();
            if model.tick(now_ms) {
                needs_render = true;
            }

            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                crate::perf::log_event(
                    "event.resize.apply",
                    format!("frame={frame_idx} width={width} height={height}"),
                );
                *model = update(std::mem::take(model), Message::Resize(width, height));
                needs_render = true;
            }

            if model.watch_enabled
                && let Some(watcher) = file_watcher.as_mut()
            {
                for path in watcher.poll(now_ms) {
                    let msg = Message::FileChanged(path);
                    *model = update(std::mem::take(model), msg.clone());
                    Self::handle_message_side_effects(model, &mut file_watcher, &msg);
                    needs_render = true;
                }
            }

            let validation_pending = model
                .workspace
                .tabs()
                .iter()
                .any(|t| t.editor.validation_pending());
            let poll_ms = if needs_render {
                0
            } else if resize_debouncer.is_pending() || validation_pending {
                10
            } else if file_watcher.as_ref().is_some_and(FileWatcher::has_pending) {
                25
            } else {
                250
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so debouncers use accurate times.
                let mut drained = 0_u32;
                loop {
                    let event_ms = elapsed_ms();
                    model.now_ms = event_ms;
                    let msg = Self::handle_event(
                        &event::read()?,
                        model,
                        event_ms,
                        &mut resize_debouncer,
                        &mut clicks,
                    );
                    if let Some(msg) = msg {
                        drained += 1;
                        crate::perf::log_event(
                            "event.message",
                            format!("frame={frame_idx} edit={} msg={msg:?}", msg.is_edit()),
                        );
                        let side_msg = msg.clone();
                        *model = update(std::mem::take(model), msg);
                        Self::handle_message_side_effects(model, &mut file_watcher, &side_msg);
                        needs_render = true;
                    }
                    // Coalesce key repeat bursts into a single render.
                    if !event::poll(Duration::from_millis(0))? {
                        break;
                    }
                }
                if drained > 1 {
                    crate::perf::log_event(
                        "event.drain",
                        format!("frame={frame_idx} drained={drained}"),
                    );
                }
            }

            if needs_render {
                frame_idx += 1;
                let draw_start = Instant::now();
                terminal.draw(|frame| Self::view(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0
                    ),
                );
                needs_render = false;
            }

            if model.should_quit || model.workspace.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Watch every open file; failures turn watching off with a banner.
    pub(super) fn make_file_watcher(model: &mut Model) -> Option<FileWatcher> {
        let paths: Vec<_> = model
            .workspace
            .tabs()
            .iter()
            .filter_map(|t| t.path.clone())
            .collect();
        let watcher = FileWatcher::new(super::effects::WATCH_DEBOUNCE_MS).and_then(|mut w| {
            for path in &paths {
                w.add(path)?;
            }
            Ok(w)
        });
        match watcher {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                model.watch_enabled = false;
                model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
                crate::perf::log_event("watcher.error", format!("err={err}"));
                None
            }
        }
    }
}
