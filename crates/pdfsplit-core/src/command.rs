use crate::error::SplitError;
use crate::params::SplitParameters;
use crate::splitter::{split, SplitOptions};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Instant;

/// A source PDF submitted for splitting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    pub name: String,
    /// Base64-encoded PDF data on the wire
    #[serde(rename = "data", with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// One split result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDocument {
    pub filename: String,
    /// Base64-encoded PDF data on the wire
    #[serde(rename = "data", serialize_with = "base64_bytes::serialize")]
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Chapter title for chapter splits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitCommand {
    pub parameters: SplitParameters,
    pub files: Vec<InputFile>,
}

impl SplitCommand {
    /// Run the command with default options, folding any error into the result
    pub fn execute(&self) -> SplitResult {
        self.execute_with(&SplitOptions::default())
    }

    pub fn execute_with(&self, options: &SplitOptions) -> SplitResult {
        let start = Instant::now();
        let input_size_bytes = self.files.iter().map(|f| f.bytes.len()).sum();

        match split(&self.parameters, &self.files, options) {
            Ok(documents) => {
                let metrics = ProcessMetrics {
                    input_size_bytes,
                    output_size_bytes: documents.iter().map(|d| d.bytes.len()).sum(),
                    document_count: documents.len(),
                    page_count: documents.iter().map(|d| d.page_count).sum(),
                    processing_time_ms: start.elapsed().as_millis() as u64,
                };
                SplitResult {
                    success: true,
                    documents,
                    error: None,
                    metrics: Some(metrics),
                }
            }
            Err(e) => SplitResult::failure(&e),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitResult {
    pub success: bool,
    pub documents: Vec<OutputDocument>,
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

impl SplitResult {
    fn failure(error: &SplitError) -> Self {
        Self {
            success: false,
            documents: Vec::new(),
            error: Some(error.to_string()),
            metrics: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub document_count: usize,
    pub page_count: usize,
    pub processing_time_ms: u64,
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::create_test_pdf;
    use pretty_assertions::assert_eq;

    fn command_json(parameters: &str, pdf: &[u8]) -> String {
        format!(
            r#"{{"parameters":{},"files":[{{"name":"report.pdf","data":"{}"}}]}}"#,
            parameters,
            STANDARD.encode(pdf)
        )
    }

    #[test]
    fn test_command_deserializes_loose_parameters() {
        let json = command_json(
            r#"{"mode":"BySections","horizontalDivisions":"1","verticalDivisions":2,"merge":"true"}"#,
            b"%PDF",
        );
        let cmd: SplitCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd.parameters.mode, "BySections");
        assert_eq!(cmd.files[0].name, "report.pdf");
        assert_eq!(cmd.files[0].bytes, b"%PDF".to_vec());
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let json = r#"{"parameters":{},"files":[{"name":"a.pdf","data":"not base64!"}]}"#;
        assert!(serde_json::from_str::<SplitCommand>(json).is_err());
    }

    #[test]
    fn test_execute_success() {
        let json = command_json(r#"{"mode":"byPages","pageNumbers":"1,3"}"#, &create_test_pdf(3));
        let cmd: SplitCommand = serde_json::from_str(&json).unwrap();
        let result = cmd.execute();

        assert!(result.success, "{:?}", result.error);
        let names: Vec<&str> = result.documents.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["report_1.pdf", "report_2.pdf"]);

        let metrics = result.metrics.unwrap();
        assert_eq!(metrics.document_count, 2);
        assert_eq!(metrics.page_count, 2);
    }

    #[test]
    fn test_execute_reports_validation_error() {
        let json = command_json(r#"{"mode":"byPages","pageNumbers":"1,,2"}"#, &create_test_pdf(3));
        let cmd: SplitCommand = serde_json::from_str(&json).unwrap();
        let result = cmd.execute();

        assert!(!result.success);
        assert!(result.documents.is_empty());
        assert!(result.error.unwrap().contains("1,,2"));
    }

    #[test]
    fn test_result_serializes_documents_as_base64() {
        let document = OutputDocument {
            filename: "a_1.pdf".into(),
            bytes: b"%PDF".to_vec(),
            page_count: 1,
            title: None,
        };
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["data"], "JVBERg==");
        assert_eq!(json["pageCount"], 1);
        assert!(json.get("title").is_none());
    }
}
