//! Evidence attached to report steps as base64 payloads.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::cucumber::Step;

/// MIME type of embedded evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimeType {
    /// Plain text.
    #[serde(rename = "text/plain")]
    Text,
    /// JSON document.
    #[serde(rename = "application/json")]
    Json,
}

/// One embedded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedding {
    /// Base64 of the UTF-8 payload.
    pub data: String,
    /// Payload type.
    pub mime_type: MimeType,
}

impl Embedding {
    /// Encodes text.
    #[must_use]
    pub fn new(data: &str, mime_type: MimeType) -> Self {
        Self {
            data: STANDARD.encode(data),
            mime_type,
        }
    }

    /// Decodes the payload back to text.
    pub fn decode(&self) -> anyhow::Result<String> {
        let bytes = STANDARD.decode(&self.data)?;
        Ok(String::from_utf8(bytes)?)
    }
}

/// Appends evidence to a step, creating the list on first use.
pub fn embed(step: &mut Step, data: &str, mime_type: MimeType) {
    step.embeddings
        .get_or_insert_with(Vec::new)
        .push(Embedding::new(data, mime_type));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cucumber::StepResult;
    use indexmap::IndexMap;

    fn step() -> Step {
        Step {
            keyword: "Given ".into(),
            name: String::new(),
            line: 4,
            result: StepResult {
                status: "passed".into(),
                duration: 0,
                error_message: None,
            },
            doc_string: None,
            embeddings: None,
            extra: IndexMap::new(),
        }
    }

    #[test]
    fn embed_creates_list_and_appends_in_order() {
        let mut step = step();
        embed(&mut step, "RUN\tperf.A", MimeType::Text);
        embed(&mut step, "{\"a\": 1}", MimeType::Json);
        let embeddings = step.embeddings.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].data, "UlVOCXBlcmYuQQ==");
        assert_eq!(embeddings[0].decode().unwrap(), "RUN\tperf.A");
        assert_eq!(embeddings[1].mime_type, MimeType::Json);
    }

    #[test]
    fn mime_type_serializes_as_media_type() {
        let json = serde_json::to_string(&Embedding::new("x", MimeType::Text)).unwrap();
        assert_eq!(json, r#"{"data":"eA==","mime_type":"text/plain"}"#);
    }
}
