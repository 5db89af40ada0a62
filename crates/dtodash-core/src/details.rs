//! Detail view of a single catalog record.

use crate::catalog::CatalogRecord;
use crate::rows::format_ingested_at;

/// OCR lines shown before the "more" marker.
pub const OCR_PREVIEW_LEN: usize = 6;

/// Broad category of a parameter, used to pick its marker in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Current,
    Poles,
    Type,
    Confidence,
    Other,
}

impl ParamKind {
    pub fn classify(key: &str) -> Self {
        let key = key.to_lowercase();
        match key.as_str() {
            "rated_current" | "current" => return Self::Current,
            "no_of_poles" | "poles" => return Self::Poles,
            "detected_type" | "type" => return Self::Type,
            "detection_confidence" | "confidence" => return Self::Confidence,
            _ => {}
        }
        if key.contains("current") {
            Self::Current
        } else if key.contains("pole") {
            Self::Poles
        } else if key.contains("type") || key.contains("detected") {
            Self::Type
        } else if key.contains("confidence") || key.contains("percentage") {
            Self::Confidence
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamField {
    pub key: String,
    pub label: String,
    pub value: String,
    pub confidence: Option<f64>,
    pub kind: ParamKind,
}

/// Everything the details screen renders for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct DtoDetails {
    pub id: String,
    pub file_name: String,
    pub source_blob: Option<String>,
    pub file_type: String,
    pub ingested_at: String,
    pub parameters: Vec<ParamField>,
    pub ocr_fields: Vec<String>,
    /// Mean parameter confidence as a whole percentage.
    pub extraction_percentage: Option<u8>,
    /// `detection_confidence` as a whole percentage.
    pub ocr_percentage: Option<u8>,
    pub description: String,
    pub motivation: String,
}

impl DtoDetails {
    pub fn from_record(record: &CatalogRecord) -> Self {
        let parameters: Vec<ParamField> = record
            .parameters
            .iter()
            .map(|(key, param)| ParamField {
                key: key.clone(),
                label: label_for(key),
                value: param.display_value(),
                confidence: param.confidence,
                kind: ParamKind::classify(key),
            })
            .collect();

        let confidences: Vec<f64> = parameters.iter().filter_map(|p| p.confidence).collect();
        let extraction_percentage = if confidences.is_empty() {
            None
        } else {
            let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
            Some(to_percent(mean * 100.0))
        };

        let ocr_percentage = record
            .parameter("detection_confidence")
            .and_then(|p| p.numeric_value())
            .map(|c| if c <= 1.0 { to_percent(c * 100.0) } else { to_percent(c) });

        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            source_blob: record.source_blob.clone(),
            file_type: record.first_chunk_type().unwrap_or("Unknown").to_string(),
            ingested_at: record
                .ingested_at
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(format_ingested_at)
                .unwrap_or_else(|| "Not available".to_string()),
            parameters,
            ocr_fields: ocr_fields(record.ocr_samples.as_deref().unwrap_or_default()),
            extraction_percentage,
            ocr_percentage,
            description: non_blank(record.llm_description.as_deref())
                .unwrap_or("No description available.")
                .to_string(),
            motivation: non_blank(record.llm_motivation.as_deref())
                .unwrap_or("No motivation available.")
                .to_string(),
        }
    }

    pub fn ocr_preview(&self) -> &[String] {
        &self.ocr_fields[..self.ocr_fields.len().min(OCR_PREVIEW_LEN)]
    }

    pub fn has_more_ocr_fields(&self) -> bool {
        self.ocr_fields.len() > OCR_PREVIEW_LEN
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

fn to_percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Display label for a parameter key.
pub fn label_for(key: &str) -> String {
    match key {
        "detected_type" => "Detected Type".to_string(),
        "detection_confidence" => "Detection Confidence".to_string(),
        "rated_current" => "Rated Current".to_string(),
        "no_of_poles" => "No Of Poles".to_string(),
        _ => title_case(&key.replace('_', " ")),
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Meaningful OCR lines: trimmed, without blanks or bare numbers.
pub fn ocr_fields(samples: &str) -> Vec<String> {
    samples
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.chars().all(|c| c.is_ascii_digit()))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record() -> CatalogRecord {
        serde_json::from_value(json!({
            "id": "dto-7",
            "file_name": "breaker.pdf",
            "chunks": [{"type": "pdf", "page": 1}],
            "llm_description": "Three-pole breaker",
            "parameters": {
                "detected_type": {"value": "MCCB", "confidence": 0.9},
                "rated_current": {"value": "63 A", "confidence": 0.7},
                "no_of_poles": 3,
                "detection_confidence": {"value": "0.87"},
                "trip_curve_class": "C"
            },
            "ocr_samples": "ACME 3000\r\n\n  12  \nIn = 63A\n 2024 \nUe 415V\nIcu 25kA\nIEC 60947-2\nType C\nMade in EU"
        }))
        .unwrap()
    }

    #[test]
    fn parameters_keep_order_and_labels() {
        let d = DtoDetails::from_record(&record());
        let labels: Vec<&str> = d.parameters.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Detected Type",
                "Rated Current",
                "No Of Poles",
                "Detection Confidence",
                "Trip Curve Class"
            ]
        );
        assert_eq!(d.parameters[2].value, "3");
        assert_eq!(d.parameters[2].confidence, None);
        assert_eq!(d.parameters[4].kind, ParamKind::Other);
    }

    #[test]
    fn percentages() {
        let d = DtoDetails::from_record(&record());
        // (0.9 + 0.7) / 2
        assert_eq!(d.extraction_percentage, Some(80));
        assert_eq!(d.ocr_percentage, Some(87));
    }

    #[test]
    fn detection_confidence_above_one_is_already_a_percentage() {
        let mut rec = record();
        rec.parameters.retain(|(k, _)| k == "detection_confidence");
        rec.parameters[0].1 = crate::Parameter::from_json(json!(92.4));
        let d = DtoDetails::from_record(&rec);
        assert_eq!(d.ocr_percentage, Some(92));
        assert_eq!(d.extraction_percentage, None);
    }

    #[test]
    fn ocr_fields_drop_blank_and_numeric_lines() {
        let d = DtoDetails::from_record(&record());
        assert_eq!(d.ocr_fields.len(), 7);
        assert_eq!(d.ocr_fields[0], "ACME 3000");
        assert_eq!(d.ocr_fields[1], "In = 63A");
        assert_eq!(d.ocr_preview().len(), OCR_PREVIEW_LEN);
        assert!(d.has_more_ocr_fields());
    }

    #[test]
    fn fallbacks_for_sparse_record() {
        let rec = CatalogRecord {
            id: "x".into(),
            llm_motivation: Some("  ".into()),
            ..CatalogRecord::default()
        };
        let d = DtoDetails::from_record(&rec);
        assert_eq!(d.file_type, "Unknown");
        assert_eq!(d.ingested_at, "Not available");
        assert_eq!(d.description, "No description available.");
        assert_eq!(d.motivation, "No motivation available.");
        assert!(d.ocr_fields.is_empty());
        assert!(!d.has_more_ocr_fields());
        assert_eq!(d.ocr_percentage, None);
    }

    #[test]
    fn kinds_match_exact_then_partial() {
        assert_eq!(ParamKind::classify("rated_current"), ParamKind::Current);
        assert_eq!(ParamKind::classify("Breaking_Current_kA"), ParamKind::Current);
        assert_eq!(ParamKind::classify("pole_count"), ParamKind::Poles);
        assert_eq!(ParamKind::classify("device_type"), ParamKind::Type);
        assert_eq!(ParamKind::classify("match_percentage"), ParamKind::Confidence);
        assert_eq!(ParamKind::classify("voltage"), ParamKind::Other);
    }

    #[test]
    fn labels_title_case_unknown_keys() {
        assert_eq!(label_for("rated_voltage_ue"), "Rated Voltage Ue");
        assert_eq!(label_for("icu"), "Icu");
    }
}
