//! Document upload to blob storage.
//!
//! An upload is a single `PUT` of the whole file. The [`UploadTrigger`] wraps
//! the transfer with [`UploadObserver`] callbacks so the pipeline estimate can
//! follow it.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::CoreError;
use crate::catalog::CatalogSource;
use crate::config::StorageConfig;
use crate::pipeline::PipelineSimulator;

/// Largest document accepted for upload.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Extensions the ingestion backend can process.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// A document read into memory, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read and validate a document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::InvalidFile(format!("{} has no file name", path.display())))?
            .to_string();

        check_extension(&name)?;
        let len = tokio::fs::metadata(path).await?.len();
        check_size(&name, len)?;

        let bytes = tokio::fs::read(path).await?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        let file = Self {
            name,
            content_type,
            bytes,
        };
        file.validate()?;
        Ok(file)
    }

    /// Check the extension and size limits.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_extension(&self.name)?;
        check_size(&self.name, self.bytes.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn check_extension(name: &str) -> Result<(), CoreError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(CoreError::InvalidFile(format!(
            "{name}: unsupported file type (expected PDF, DOC or DOCX)"
        )))
    }
}

fn check_size(name: &str, len: u64) -> Result<(), CoreError> {
    if len > MAX_UPLOAD_BYTES {
        return Err(CoreError::InvalidFile(format!(
            "{name} is {:.1} MB; the limit is 10 MB",
            len as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}

/// Destination for uploaded documents.
pub trait ObjectStorage: Send + Sync {
    fn upload_file(&self, file: &UploadFile) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Block-blob uploads authorized by a SAS token.
#[derive(Clone)]
pub struct BlobStorageClient {
    client: reqwest::Client,
    endpoint: String,
    container: String,
    sas_token: String,
}

impl BlobStorageClient {
    pub fn new(client: reqwest::Client, config: &StorageConfig) -> Self {
        Self {
            client,
            endpoint: format!("https://{}.blob.core.windows.net", config.account),
            container: config.container.clone(),
            sas_token: config.sas_token.clone(),
        }
    }

    /// Point the client at another blob service (an emulator or a test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Full URL for a blob, SAS token included.
    pub fn blob_url(&self, name: &str) -> String {
        let sas = if self.sas_token.starts_with('?') {
            self.sas_token.clone()
        } else {
            format!("?{}", self.sas_token)
        };
        format!(
            "{}/{}/{}{}",
            self.endpoint,
            self.container,
            urlencoding::encode(name),
            sas
        )
    }
}

impl ObjectStorage for BlobStorageClient {
    async fn upload_file(&self, file: &UploadFile) -> Result<(), CoreError> {
        let content_type = if file.content_type.is_empty() {
            "application/octet-stream"
        } else {
            file.content_type.as_str()
        };

        log::info!("uploading {} ({} bytes)", file.name, file.len());
        let resp = self
            .client
            .put(self.blob_url(&file.name))
            .header("x-ms-blob-type", "BlockBlob")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|e| CoreError::upload(None, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body.trim().to_string()
            };
            return Err(CoreError::upload(Some(status.as_u16()), message));
        }
        Ok(())
    }
}

/// Callbacks fired around an upload.
pub trait UploadObserver: Send + Sync {
    fn on_upload_start(&self);
    fn on_upload_success(&self, file_name: &str);
    fn on_upload_failed(&self, err: &CoreError);
}

impl<C: CatalogSource + 'static> UploadObserver for PipelineSimulator<C> {
    fn on_upload_start(&self) {
        PipelineSimulator::on_upload_start(self);
    }

    fn on_upload_success(&self, file_name: &str) {
        PipelineSimulator::on_upload_success(self, file_name);
    }

    fn on_upload_failed(&self, err: &CoreError) {
        log::warn!("upload failed, resetting pipeline: {err}");
        PipelineSimulator::on_upload_failed(self);
    }
}

/// Uploads a document and reports progress to an observer.
pub struct UploadTrigger<S, O> {
    storage: S,
    observer: Arc<O>,
}

impl<S: ObjectStorage, O: UploadObserver> UploadTrigger<S, O> {
    pub fn new(storage: S, observer: Arc<O>) -> Self {
        Self { storage, observer }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Upload `file`. Failures reset the observer and come back as [`CoreError::Upload`].
    pub async fn upload(&self, file: &UploadFile) -> Result<(), CoreError> {
        self.observer.on_upload_start();
        match self.storage.upload_file(file).await {
            Ok(()) => {
                log::info!("{} uploaded", file.name);
                self.observer.on_upload_success(&file.name);
                Ok(())
            }
            Err(err) => {
                self.observer.on_upload_failed(&err);
                Err(match err {
                    CoreError::Upload { .. } => err,
                    other => CoreError::upload(None, other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn storage_config(sas: &str) -> StorageConfig {
        StorageConfig {
            account: "acct".into(),
            container: "docs".into(),
            sas_token: sas.into(),
        }
    }

    #[test]
    fn blob_url_encodes_name_and_adds_question_mark() {
        let client = BlobStorageClient::new(reqwest::Client::new(), &storage_config("sv=1&sig=x"));
        assert_eq!(
            client.blob_url("rated sheet #2.pdf"),
            "https://acct.blob.core.windows.net/docs/rated%20sheet%20%232.pdf?sv=1&sig=x"
        );
    }

    #[test]
    fn blob_url_keeps_existing_question_mark() {
        let client = BlobStorageClient::new(reqwest::Client::new(), &storage_config("?sv=1"))
            .with_endpoint("http://127.0.0.1:10000/");
        assert_eq!(client.blob_url("a.pdf"), "http://127.0.0.1:10000/docs/a.pdf?sv=1");
    }

    #[test]
    fn validation_checks_extension_and_size() {
        assert!(UploadFile::new("a.PDF", "application/pdf", vec![1]).validate().is_ok());
        assert!(UploadFile::new("a.docx", "", vec![]).validate().is_ok());

        let err = UploadFile::new("a.png", "image/png", vec![1])
            .validate()
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidFile(_)));

        let big = UploadFile::new("big.pdf", "", vec![0; MAX_UPLOAD_BYTES as usize + 1]);
        assert!(matches!(big.validate(), Err(CoreError::InvalidFile(_))));
    }

    #[tokio::test]
    async fn from_path_reads_and_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("breaker.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "breaker.pdf");
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn from_path_rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            UploadFile::from_path(&path).await,
            Err(CoreError::InvalidFile(_))
        ));
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl UploadObserver for Recorder {
        fn on_upload_start(&self) {
            self.0.lock().unwrap().push("start".into());
        }
        fn on_upload_success(&self, file_name: &str) {
            self.0.lock().unwrap().push(format!("success {file_name}"));
        }
        fn on_upload_failed(&self, _err: &CoreError) {
            self.0.lock().unwrap().push("failed".into());
        }
    }

    struct Storage(Option<fn() -> CoreError>);

    impl ObjectStorage for Storage {
        async fn upload_file(&self, _file: &UploadFile) -> Result<(), CoreError> {
            match self.0 {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }

    fn disk_gone() -> CoreError {
        CoreError::Io(std::io::Error::other("disk gone"))
    }

    fn forbidden() -> CoreError {
        CoreError::upload(Some(403), "AuthenticationFailed")
    }

    #[tokio::test]
    async fn trigger_reports_success() {
        let observer = Arc::new(Recorder::default());
        let trigger = UploadTrigger::new(Storage(None), observer.clone());
        trigger
            .upload(&UploadFile::new("doc.pdf", "application/pdf", vec![1]))
            .await
            .unwrap();
        assert_eq!(*observer.0.lock().unwrap(), vec!["start", "success doc.pdf"]);
    }

    #[tokio::test]
    async fn trigger_wraps_failures_as_upload_errors() {
        let observer = Arc::new(Recorder::default());
        let trigger = UploadTrigger::new(
            Storage(Some(disk_gone)),
            observer.clone(),
        );
        let err = trigger
            .upload(&UploadFile::new("doc.pdf", "", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Upload { status: None, .. }));
        assert!(err.to_string().contains("disk gone"));
        assert_eq!(*observer.0.lock().unwrap(), vec!["start", "failed"]);
    }

    #[tokio::test]
    async fn trigger_keeps_http_status() {
        let observer = Arc::new(Recorder::default());
        let trigger = UploadTrigger::new(
            Storage(Some(forbidden)),
            observer,
        );
        let err = trigger
            .upload(&UploadFile::new("doc.pdf", "", vec![1]))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "file upload failed: HTTP 403 - AuthenticationFailed"
        );
    }
}
