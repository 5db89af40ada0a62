//! Remote catalog of processed documents.
//!
//! The catalog endpoint returns a JSON array of records. Records are normalized
//! on ingestion (parameter values become a uniform [`Parameter`]) and keyed by
//! their `id` in a [`Catalog`] that keeps the endpoint's ordering.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::CoreError;

/// One extracted region of a source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chunk {
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    pub page: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub note: String,
}

/// A processed-document record as stored in the remote catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_blob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingested_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub chunks: Vec<Chunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_motivation: Option<String>,
    #[serde(
        default,
        deserialize_with = "ordered_parameters::deserialize",
        serialize_with = "ordered_parameters::serialize",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub parameters: Vec<(String, Parameter)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_samples: Option<String>,
}

impl CatalogRecord {
    /// Type of the first chunk, used as the document's display type.
    pub fn first_chunk_type(&self) -> Option<&str> {
        self.chunks
            .first()
            .map(|c| c.kind.as_str())
            .filter(|k| !k.is_empty())
    }

    /// Whether the analysis step produced a description for this record.
    pub fn has_description(&self) -> bool {
        self.llm_description.as_deref().is_some_and(|d| !d.is_empty())
    }

    pub fn parameter(&self, key: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, p)| p)
    }
}

/// An extracted parameter value, normalized from either a bare scalar or a
/// `{value, confidence}` object.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub value: Value,
    pub confidence: Option<f64>,
}

impl Parameter {
    pub fn from_json(raw: Value) -> Self {
        match raw {
            Value::Object(mut obj) if obj.contains_key("value") => {
                let confidence = obj.get("confidence").and_then(Value::as_f64);
                let value = obj.remove("value").unwrap_or(Value::Null);
                Self { value, confidence }
            }
            other => Self {
                value: other,
                confidence: None,
            },
        }
    }

    /// Text shown for the value: strings as-is, anything else as compact JSON.
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// The value as a number, accepting numeric strings.
    pub fn numeric_value(&self) -> Option<f64> {
        match &self.value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self.confidence {
            Some(confidence) => serde_json::json!({
                "value": self.value,
                "confidence": confidence,
            }),
            None => self.value.clone(),
        }
    }
}

/// Explicit `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parameter maps keep the order in which the catalog wrote their keys.
mod ordered_parameters {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, Parameter)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ParametersVisitor)
    }

    pub fn serialize<S>(params: &[(String, Parameter)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(params.len()))?;
        for (key, param) in params {
            map.serialize_entry(key, &param.to_json())?;
        }
        map.end()
    }

    struct ParametersVisitor;

    impl<'de> Visitor<'de> for ParametersVisitor {
        type Value = Vec<(String, Parameter)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of parameter names to values")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut params = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((key, raw)) = access.next_entry::<String, Value>()? {
                params.push((key, Parameter::from_json(raw)));
            }
            Ok(params)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }
}

/// Records keyed by `id`, iterated in the order the catalog returned them.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn get(&self, id: &str) -> Option<&CatalogRecord> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// First record whose `file_name` matches exactly.
    pub fn find_by_file_name(&self, file_name: &str) -> Option<&CatalogRecord> {
        self.records.iter().find(|r| r.file_name == file_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&mut self, record: CatalogRecord) {
        match self.index.get(&record.id) {
            // A repeated id keeps its first position but takes the newer record.
            Some(&i) => self.records[i] = record,
            None => {
                self.index.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }
}

impl FromIterator<CatalogRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogRecord>>(iter: I) -> Self {
        let mut catalog = Catalog::default();
        for record in iter {
            catalog.insert(record);
        }
        catalog
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogRecord;
    type IntoIter = std::slice::Iter<'a, CatalogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Key fetched records by id, preserving input order.
pub fn format_catalog(items: Vec<CatalogRecord>) -> Catalog {
    items.into_iter().collect()
}

/// Anything that can list the catalog's records.
pub trait CatalogSource: Send + Sync {
    fn fetch_items(&self) -> impl Future<Output = Result<Vec<CatalogRecord>, CoreError>> + Send;
}

/// HTTP client for the catalog endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CatalogClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Result<Self, CoreError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(CoreError::Configuration(
                crate::config::ENV_CATALOG_ENDPOINT.to_string(),
            ));
        }
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self) -> Result<Vec<CatalogRecord>, CoreError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| CoreError::remote(None, format!("catalog request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::remote(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        resp.json::<Vec<CatalogRecord>>()
            .await
            .map_err(|e| CoreError::remote(None, format!("malformed catalog response: {e}")))
    }
}

impl CatalogSource for CatalogClient {
    async fn fetch_items(&self) -> Result<Vec<CatalogRecord>, CoreError> {
        let result = self.request().await;
        match &result {
            Ok(items) => log::debug!("catalog returned {} records", items.len()),
            Err(e) => log::error!("error fetching catalog items: {e}"),
        }
        result
    }
}
