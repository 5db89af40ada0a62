use std::path::PathBuf;

use dtodash_core::CatalogRecord;

/// Actions that the TUI can process, mapped from keyboard input or internal events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    NavigateBack,
    DrillIn,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    GoTop,
    GoBottom,
    ToggleHelp,
    Refresh,
    StartUpload,
    ClearUpload,
    StartChat,
    /// A character typed into the active input line.
    Input(char),
    Backspace,
    Submit,
    Tick,
    Resize(u16, u16),
    None,
}

/// Work the app asks the main loop to run outside the render path.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh,
    Upload(PathBuf),
    Clear,
    Ask { record: CatalogRecord, query: String },
}
