//! Ingest and egest payloads, and the sink that receives saved content

use compose_markup::serialize_document;
use compose_model::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conditions::Record;

/// Stored content handed to the editor on load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingest {
    #[serde(default)]
    pub block_map: Option<Document>,
}

impl Ingest {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The stored document, or the canonical empty one
    pub fn into_document(self) -> Document {
        self.block_map.unwrap_or_default()
    }
}

/// Content emitted on save and preview: the tree plus one HTML fragment per
/// top-level block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Egest {
    pub block_map: Document,
    pub html: Vec<String>,
}

impl Egest {
    pub fn from_document(document: &Document) -> Self {
        Self {
            html: serialize_document(document),
            block_map: document.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("Content was rejected: {0}")]
    Rejected(String),

    #[error("Request failed: {0}")]
    Transport(String),
}

/// Persistence and preview collaborator
pub trait ContentSink {
    /// Store the content
    fn save(&mut self, content: &Egest) -> Result<(), SinkError>;

    /// Populate the content for each record, returning one HTML string per
    /// record in input order
    fn preview(&mut self, content: &Egest, records: &[Record]) -> Result<Vec<String>, SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_model::Block;
    use serde_json::json;

    #[test]
    fn test_missing_block_map_yields_empty_document() {
        let ingest = Ingest::from_json_str("{}").unwrap();
        assert_eq!(ingest.into_document(), Document::empty());

        let ingest = Ingest::from_json_str(r#"{ "blockMap": null }"#).unwrap();
        assert_eq!(ingest.into_document(), Document::empty());
    }

    #[test]
    fn test_egest_shape() {
        let doc = Document::from_blocks(vec![Block::paragraph("a"), Block::paragraph("b")]);
        let egest = Egest::from_document(&doc);
        let json = serde_json::to_value(&egest).unwrap();

        assert_eq!(json["html"], json!(["<p>a</p>", "<p>b</p>"]));
        assert_eq!(json["blockMap"]["object"], "value");
        assert_eq!(json["blockMap"]["document"]["nodes"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_ingest_reads_stored_egest() {
        let doc = Document::from_blocks(vec![Block::paragraph("stored")]);
        let json = serde_json::to_string(&Egest::from_document(&doc)).unwrap();

        let ingest = Ingest::from_json_str(&json).unwrap();
        assert_eq!(ingest.into_document(), doc);
    }
}
