use dtodash_core::CoreError;

/// Events flowing from spawned backend tasks to the TUI.
#[derive(Debug)]
pub enum BackendEvent {
    /// An upload finished, successfully or not.
    UploadFinished {
        file_name: String,
        result: Result<(), CoreError>,
    },
    /// The assistant answered (or failed to answer) a question about a record.
    AnswerReady {
        record_id: String,
        result: Result<String, CoreError>,
    },
}
