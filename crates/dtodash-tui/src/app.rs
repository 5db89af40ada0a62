use std::path::PathBuf;

use dtodash_core::{
    CatalogRecord, CatalogState, ChatTranscript, DtoDetails, Notification, PipelineStatus,
};

use crate::action::{Action, Command};
use crate::backend::expand_path;
use crate::input::InputMode;
use crate::model::dashboard::DashboardState;
use crate::model::toast::ToastQueue;
use crate::theme::Theme;
use crate::tui_event::BackendEvent;

/// Which screen is currently displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    Details(String), // record id
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    pub dashboard: DashboardState,
    pub pipeline: PipelineStatus,
    /// File the pipeline panel is tracking.
    pub pipeline_file: Option<String>,
    /// Upload in flight (between submit and the backend's answer).
    pub uploading: Option<String>,
    pub cursor: usize,
    pub input_mode: InputMode,
    pub input: String,
    pub chat: ChatTranscript,
    /// Record the chat transcript belongs to.
    pub chat_record: Option<String>,
    pub toasts: ToastQueue,
    pub tick: usize,
    pub theme: Theme,
    pub should_quit: bool,
    pub show_help: bool,
    pub detail_scroll: u16,
    /// Height of the visible table area (set on resize, used for page up/down).
    pub visible_rows: usize,
    commands: Vec<Command>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            screen: Screen::Dashboard,
            dashboard: DashboardState::default(),
            pipeline: PipelineStatus::IDLE,
            pipeline_file: None,
            uploading: None,
            cursor: 0,
            input_mode: InputMode::Normal,
            input: String::new(),
            chat: ChatTranscript::new(),
            chat_record: None,
            toasts: ToastQueue::default(),
            tick: 0,
            theme: Theme::dashboard(),
            should_quit: false,
            show_help: false,
            detail_scroll: 0,
            visible_rows: 20,
            commands: Vec::new(),
        }
    }

    /// Commands queued by the last updates, oldest first.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Replace the catalog-derived state with a new store snapshot.
    pub fn apply_catalog(&mut self, state: &CatalogState) {
        let selected = self.selected_row_id();
        self.dashboard = DashboardState::from_state(state);

        // Keep the cursor on the same record when rows shift.
        self.cursor = selected
            .and_then(|id| self.dashboard.rows.iter().position(|r| r.id == id))
            .unwrap_or(self.cursor)
            .min(self.dashboard.rows.len().saturating_sub(1));
    }

    pub fn set_pipeline(&mut self, status: PipelineStatus, file_name: Option<String>) {
        self.pipeline = status;
        self.pipeline_file = file_name;
    }

    pub fn notify(&mut self, notification: Notification) {
        self.toasts.push(notification, self.tick);
    }

    fn selected_row_id(&self) -> Option<String> {
        self.dashboard.rows.get(self.cursor).map(|r| r.id.clone())
    }

    /// Record shown on the details screen, if it is still in the catalog.
    pub fn current_record(&self) -> Option<&CatalogRecord> {
        match &self.screen {
            Screen::Details(id) => self.dashboard.catalog.get(id),
            Screen::Dashboard => None,
        }
    }

    pub fn current_details(&self) -> Option<DtoDetails> {
        self.current_record().map(DtoDetails::from_record)
    }

    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        if self.input_mode.is_editing() {
            return self.update_input(action);
        }

        // When help overlay is shown, only allow a few actions through
        if self.show_help {
            match action {
                Action::Quit => {
                    self.should_quit = true;
                    return true;
                }
                Action::ToggleHelp | Action::NavigateBack => {
                    self.show_help = false;
                }
                Action::Tick => self.on_tick(),
                Action::Resize(_w, h) => {
                    self.visible_rows = (h as usize).saturating_sub(16);
                }
                _ => {} // swallow everything else
            }
            return false;
        }

        let row_count = self.dashboard.rows.len();
        match action {
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            Action::ToggleHelp => {
                self.show_help = true;
            }
            Action::NavigateBack => {
                if let Screen::Details(_) = self.screen {
                    self.screen = Screen::Dashboard;
                }
            }
            Action::DrillIn => {
                if self.screen == Screen::Dashboard {
                    if let Some(id) = self.selected_row_id() {
                        self.open_details(id);
                    }
                }
            }
            Action::MoveDown => match self.screen {
                Screen::Dashboard => {
                    if self.cursor + 1 < row_count {
                        self.cursor += 1;
                    }
                }
                Screen::Details(_) => {
                    self.detail_scroll = self.detail_scroll.saturating_add(1);
                }
            },
            Action::MoveUp => match self.screen {
                Screen::Dashboard => {
                    self.cursor = self.cursor.saturating_sub(1);
                }
                Screen::Details(_) => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
            },
            Action::PageDown => {
                let page = self.visible_rows.max(1);
                match self.screen {
                    Screen::Dashboard => {
                        self.cursor = (self.cursor + page).min(row_count.saturating_sub(1));
                    }
                    Screen::Details(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_add(page as u16);
                    }
                }
            }
            Action::PageUp => {
                let page = self.visible_rows.max(1);
                match self.screen {
                    Screen::Dashboard => {
                        self.cursor = self.cursor.saturating_sub(page);
                    }
                    Screen::Details(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_sub(page as u16);
                    }
                }
            }
            Action::GoTop => match self.screen {
                Screen::Dashboard => self.cursor = 0,
                Screen::Details(_) => self.detail_scroll = 0,
            },
            Action::GoBottom => match self.screen {
                Screen::Dashboard => self.cursor = row_count.saturating_sub(1),
                Screen::Details(_) => self.detail_scroll = u16::MAX, // clamped when rendered
            },
            Action::Refresh => {
                self.commands.push(Command::Refresh);
            }
            Action::StartUpload => {
                if self.screen == Screen::Dashboard {
                    if self.uploading.is_some() {
                        self.notify(Notification::info(
                            "Upload in progress",
                            "Wait for the current upload to finish.",
                        ));
                    } else {
                        self.input.clear();
                        self.input_mode = InputMode::UploadPath;
                    }
                }
            }
            Action::ClearUpload => {
                if self.screen == Screen::Dashboard {
                    self.commands.push(Command::Clear);
                }
            }
            Action::StartChat => {
                if self.current_record().is_some() {
                    self.input.clear();
                    self.input_mode = InputMode::Chat;
                }
            }
            Action::Tick => self.on_tick(),
            Action::Resize(_w, h) => {
                // Rough estimate: total height minus stat cards, pipeline panel and borders
                self.visible_rows = (h as usize).saturating_sub(16);
            }
            Action::Input(_) | Action::Backspace | Action::Submit | Action::None => {}
        }
        false
    }

    fn update_input(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            Action::Input(c) => self.input.push(c),
            Action::Backspace => {
                self.input.pop();
            }
            Action::NavigateBack => {
                self.input.clear();
                self.input_mode = InputMode::Normal;
            }
            Action::Submit => {
                let text = std::mem::take(&mut self.input);
                let mode = self.input_mode;
                self.input_mode = InputMode::Normal;
                match mode {
                    InputMode::UploadPath => self.submit_upload(&text),
                    InputMode::Chat => self.submit_question(&text),
                    InputMode::Normal => {}
                }
            }
            Action::Tick => self.on_tick(),
            Action::Resize(_w, h) => {
                self.visible_rows = (h as usize).saturating_sub(16);
            }
            _ => {}
        }
        false
    }

    fn submit_upload(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let path: PathBuf = expand_path(text);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| text.trim().to_string());
        self.notify(Notification::info(
            "Uploading file...",
            "Transferring file to blob storage",
        ));
        self.uploading = Some(name);
        self.commands.push(Command::Upload(path));
    }

    fn submit_question(&mut self, text: &str) {
        let Some(record) = self.current_record().cloned() else {
            return;
        };
        if let Some(query) = self.chat.submit(text) {
            self.commands.push(Command::Ask { record, query });
        }
    }

    fn open_details(&mut self, id: String) {
        if self.chat_record.as_deref() != Some(id.as_str()) {
            self.chat.clear();
            self.chat_record = Some(id.clone());
        }
        self.detail_scroll = 0;
        self.screen = Screen::Details(id);
    }

    fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.toasts.expire(self.tick);
    }

    /// Process a backend event and update model state.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::UploadFinished { file_name, result } => {
                self.uploading = None;
                match result {
                    Ok(()) => self.notify(Notification::success(
                        "Upload successful!",
                        format!(
                            "{file_name} uploaded. DTO extraction and analysis will be available in the table shortly."
                        ),
                    )),
                    Err(err) => self.notify(Notification::error("Upload failed", err.to_string())),
                }
            }
            BackendEvent::AnswerReady { record_id, result } => {
                if self.chat_record.as_deref() == Some(record_id.as_str()) && self.chat.is_pending()
                {
                    self.chat.resolve(result);
                } else {
                    log::debug!("dropping assistant answer for {record_id}: chat moved on");
                }
            }
        }
    }

    /// Render the current screen.
    pub fn view(&self, f: &mut ratatui::Frame) {
        match &self.screen {
            Screen::Dashboard => crate::view::dashboard::render(f, self),
            Screen::Details(_) => crate::view::details::render(f, self),
        }

        if self.input_mode == InputMode::UploadPath {
            crate::view::overlay::render_upload_prompt(f, self);
        }
        crate::view::overlay::render_toasts(f, self);

        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
    }
}
