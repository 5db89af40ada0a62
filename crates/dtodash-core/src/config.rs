//! Settings resolution for the dashboard's collaborators.
//!
//! Settings are gathered from an optional TOML file, the environment and
//! command-line overrides, merged (later sources win) and then resolved into a
//! validated [`Config`] once at startup. Each collaborator receives only its own
//! slice of the resolved config.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::CoreError;

pub const ENV_STORAGE_ACCOUNT: &str = "AZURE_BLOB_STORAGE_ACCOUNT";
pub const ENV_STORAGE_CONTAINER: &str = "AZURE_BLOB_CONTAINER";
pub const ENV_STORAGE_SAS_TOKEN: &str = "AZURE_BLOB_SAS_TOKEN";
pub const ENV_CATALOG_ENDPOINT: &str = "COSMOS_API_ENDPOINT";
pub const ENV_ASSISTANT_BASE: &str = "AZURE_OPENAI_BASE";
pub const ENV_ASSISTANT_KEY: &str = "AZURE_OPENAI_KEY";
pub const ENV_ASSISTANT_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_ASSISTANT_API_VERSION: &str = "AZURE_OPENAI_VERSION";
pub const ENV_EXTRACTION_START_MS: &str = "PIPELINE_EXTRACTION_START_MS";
pub const ENV_EXTRACTION_MS: &str = "PIPELINE_EXTRACTION_MS";
pub const ENV_RETRY_MS: &str = "PIPELINE_RETRY_MS";

/// Object storage settings used by the upload client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub account: String,
    pub container: String,
    pub sas_token: String,
}

/// Chat completion settings used by the assistant client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantConfig {
    pub base: String,
    pub key: String,
    pub deployment: String,
    pub api_version: String,
}

/// Delays driving the pipeline status estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTimings {
    /// Wait after a successful upload before extraction is shown as running.
    pub extraction_start_delay: Duration,
    /// Time extraction is assumed to take before the persistence check.
    pub extraction_duration: Duration,
    /// Wait before the single persistence re-check.
    pub retry_delay: Duration,
}

impl Default for PipelineTimings {
    fn default() -> Self {
        Self {
            extraction_start_delay: Duration::from_millis(1500),
            extraction_duration: Duration::from_secs(10),
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl PipelineTimings {
    /// Longest time from a successful upload until persistence is guaranteed ready.
    pub fn worst_case(&self) -> Duration {
        self.extraction_start_delay + self.extraction_duration + self.retry_delay
    }
}

/// Fully validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub storage: StorageConfig,
    pub catalog_endpoint: String,
    pub assistant: AssistantConfig,
    pub timings: PipelineTimings,
}

/// Raw, possibly incomplete settings from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub storage_account: Option<String>,
    pub storage_container: Option<String>,
    pub storage_sas_token: Option<String>,
    pub catalog_endpoint: Option<String>,
    pub assistant_base: Option<String>,
    pub assistant_key: Option<String>,
    pub assistant_deployment: Option<String>,
    pub assistant_api_version: Option<String>,
    pub extraction_start_ms: Option<u64>,
    pub extraction_ms: Option<u64>,
    pub retry_ms: Option<u64>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let millis = |name: &str| {
            let raw = lookup(name)?;
            match raw.trim().parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    log::warn!("ignoring {name}={raw:?}: not a millisecond count");
                    None
                }
            }
        };

        Self {
            storage_account: lookup(ENV_STORAGE_ACCOUNT),
            storage_container: lookup(ENV_STORAGE_CONTAINER),
            storage_sas_token: lookup(ENV_STORAGE_SAS_TOKEN),
            catalog_endpoint: lookup(ENV_CATALOG_ENDPOINT),
            assistant_base: lookup(ENV_ASSISTANT_BASE),
            assistant_key: lookup(ENV_ASSISTANT_KEY),
            assistant_deployment: lookup(ENV_ASSISTANT_DEPLOYMENT),
            assistant_api_version: lookup(ENV_ASSISTANT_API_VERSION),
            extraction_start_ms: millis(ENV_EXTRACTION_START_MS),
            extraction_ms: millis(ENV_EXTRACTION_MS),
            retry_ms: millis(ENV_RETRY_MS),
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, CoreError> {
        toml::from_str(text).map_err(|e| CoreError::ConfigFile(e.to_string()))
    }

    /// Load settings from a TOML file.
    pub fn load_file(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::ConfigFile(format!("{}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| CoreError::ConfigFile(format!("{}: {e}", path.display())))
    }

    /// Overlay `other` on top of `self`; values present in `other` win.
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            storage_account: other.storage_account.or(self.storage_account),
            storage_container: other.storage_container.or(self.storage_container),
            storage_sas_token: other.storage_sas_token.or(self.storage_sas_token),
            catalog_endpoint: other.catalog_endpoint.or(self.catalog_endpoint),
            assistant_base: other.assistant_base.or(self.assistant_base),
            assistant_key: other.assistant_key.or(self.assistant_key),
            assistant_deployment: other.assistant_deployment.or(self.assistant_deployment),
            assistant_api_version: other.assistant_api_version.or(self.assistant_api_version),
            extraction_start_ms: other.extraction_start_ms.or(self.extraction_start_ms),
            extraction_ms: other.extraction_ms.or(self.extraction_ms),
            retry_ms: other.retry_ms.or(self.retry_ms),
        }
    }

    /// Validate completeness and build the runtime [`Config`].
    ///
    /// Every missing or blank setting is named in the error, not just the first.
    pub fn resolve(self) -> Result<Config, CoreError> {
        let mut missing: Vec<&'static str> = Vec::new();
        let mut take = |value: Option<String>, name: &'static str| -> String {
            match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let storage = StorageConfig {
            account: take(self.storage_account, ENV_STORAGE_ACCOUNT),
            container: take(self.storage_container, ENV_STORAGE_CONTAINER),
            sas_token: take(self.storage_sas_token, ENV_STORAGE_SAS_TOKEN),
        };
        let catalog_endpoint = take(self.catalog_endpoint, ENV_CATALOG_ENDPOINT);
        let assistant = AssistantConfig {
            base: take(self.assistant_base, ENV_ASSISTANT_BASE),
            key: take(self.assistant_key, ENV_ASSISTANT_KEY),
            deployment: take(self.assistant_deployment, ENV_ASSISTANT_DEPLOYMENT),
            api_version: take(self.assistant_api_version, ENV_ASSISTANT_API_VERSION),
        };

        if !missing.is_empty() {
            return Err(CoreError::Configuration(missing.join(", ")));
        }

        let defaults = PipelineTimings::default();
        let timings = PipelineTimings {
            extraction_start_delay: self
                .extraction_start_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.extraction_start_delay),
            extraction_duration: self
                .extraction_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.extraction_duration),
            retry_delay: self
                .retry_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        };

        Ok(Config {
            storage,
            catalog_endpoint,
            assistant,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn complete() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_STORAGE_ACCOUNT, "acct"),
            (ENV_STORAGE_CONTAINER, "uploads"),
            (ENV_STORAGE_SAS_TOKEN, "sv=2024&sig=abc"),
            (ENV_CATALOG_ENDPOINT, "https://catalog.example/items"),
            (ENV_ASSISTANT_BASE, "https://ai.example"),
            (ENV_ASSISTANT_KEY, "secret"),
            (ENV_ASSISTANT_DEPLOYMENT, "gpt"),
            (ENV_ASSISTANT_API_VERSION, "2024-02-01"),
        ])
    }

    fn settings_from(vars: &HashMap<&'static str, &'static str>) -> Settings {
        Settings::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn resolves_complete_settings() {
        let config = settings_from(&complete()).resolve().unwrap();
        assert_eq!(config.storage.account, "acct");
        assert_eq!(config.catalog_endpoint, "https://catalog.example/items");
        assert_eq!(config.assistant.api_version, "2024-02-01");
        assert_eq!(config.timings, PipelineTimings::default());
    }

    #[test]
    fn missing_settings_are_all_named() {
        let mut vars = complete();
        vars.remove(ENV_CATALOG_ENDPOINT);
        vars.insert(ENV_ASSISTANT_KEY, "   ");
        let err = settings_from(&vars).resolve().unwrap_err();
        match err {
            CoreError::Configuration(names) => {
                assert!(names.contains(ENV_CATALOG_ENDPOINT));
                assert!(names.contains(ENV_ASSISTANT_KEY));
                assert!(!names.contains(ENV_STORAGE_ACCOUNT));
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn timing_overrides_apply() {
        let mut vars = complete();
        vars.insert(ENV_EXTRACTION_MS, "250");
        vars.insert(ENV_RETRY_MS, "not-a-number");
        let config = settings_from(&vars).resolve().unwrap();
        assert_eq!(config.timings.extraction_duration, Duration::from_millis(250));
        assert_eq!(config.timings.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn later_source_wins_on_merge() {
        let file = Settings::from_toml(
            r#"
            catalog_endpoint = "https://from-file"
            storage_account = "file-acct"
            "#,
        )
        .unwrap();
        let env = Settings {
            catalog_endpoint: Some("https://from-env".into()),
            ..Settings::default()
        };
        let merged = file.merge(env);
        assert_eq!(merged.catalog_endpoint.as_deref(), Some("https://from-env"));
        assert_eq!(merged.storage_account.as_deref(), Some("file-acct"));
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let err = Settings::from_toml("catalog_url = \"x\"").unwrap_err();
        assert!(matches!(err, CoreError::ConfigFile(_)));
    }

    #[test]
    fn load_file_reads_toml_and_names_path_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "catalog_endpoint = \"https://api.example.com/dtos\"\n").unwrap();
        let settings = Settings::load_file(&path).unwrap();
        assert_eq!(
            settings.catalog_endpoint.as_deref(),
            Some("https://api.example.com/dtos")
        );

        std::fs::write(&path, "retry_ms = \"soon\"\n").unwrap();
        let message = Settings::load_file(&path).unwrap_err().to_string();
        assert_eq!(message.matches("config file error").count(), 1, "{message}");
        assert_eq!(message.matches("config.toml").count(), 1, "{message}");
    }

    #[test]
    fn worst_case_is_sum_of_delays() {
        assert_eq!(
            PipelineTimings::default().worst_case(),
            Duration::from_millis(13_500)
        );
    }
}
