use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use dtodash_core::{
    AssistantClient, BlobStorageClient, CatalogClient, CatalogRecord, CatalogStore, CoreError,
    PipelineSimulator, UploadFile, UploadTrigger,
};

use crate::action::Command;
use crate::tui_event::BackendEvent;

pub type Store = CatalogStore<CatalogClient>;
pub type Simulator = PipelineSimulator<CatalogClient>;

/// Long-lived clients shared by the backend tasks.
///
/// Every network call runs on its own task and reports back over `tx`; the
/// render loop never awaits one.
pub struct Services {
    pub store: Arc<Store>,
    pub simulator: Arc<Simulator>,
    pub uploader: Arc<UploadTrigger<BlobStorageClient, Simulator>>,
    pub assistant: AssistantClient,
    pub tx: mpsc::UnboundedSender<BackendEvent>,
}

impl Services {
    pub fn dispatch(&self, command: Command) {
        match command {
            Command::Refresh => self.spawn_refresh(),
            Command::Upload(path) => self.spawn_upload(path),
            Command::Clear => self.simulator.on_clear(),
            Command::Ask { record, query } => self.spawn_ask(record, query),
        }
    }

    pub fn spawn_refresh(&self) {
        let store = self.store.clone();
        tokio::spawn(async move {
            store.refetch().await;
        });
    }

    fn spawn_upload(&self, path: PathBuf) {
        let uploader = self.uploader.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let file_name = display_name(&path);
            let result = upload_path(&uploader, &path).await;
            let _ = tx.send(BackendEvent::UploadFinished { file_name, result });
        });
    }

    fn spawn_ask(&self, record: CatalogRecord, query: String) {
        let tx = self.tx.clone();
        let assistant = self.assistant.clone();
        let record_id = record.id.clone();
        tokio::spawn(async move {
            let result = assistant.ask(&query, &record).await;
            let _ = tx.send(BackendEvent::AnswerReady { record_id, result });
        });
    }
}

/// Read, validate and upload one document.
///
/// A file that fails validation never reaches the pipeline.
async fn upload_path(
    uploader: &UploadTrigger<BlobStorageClient, Simulator>,
    path: &Path,
) -> Result<(), CoreError> {
    let file = UploadFile::from_path(path).await?;
    uploader.upload(&file).await
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand a leading `~/` in a typed path.
pub fn expand_path(input: &str) -> PathBuf {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}
