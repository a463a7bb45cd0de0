pub mod import;
pub mod palette;
pub mod render;
pub mod validate;

pub use import::{import, ImportArgs};
pub use palette::{palette, PaletteArgs};
pub use render::{render, RenderArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::{Context, Result};
use compose_editor::Ingest;
use compose_model::Document;
use std::path::Path;

/// Read a stored document: an ingest payload (`{ "blockMap": ... }`) or a
/// bare document value
pub(crate) fn read_document(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let is_ingest = match value.as_object() {
        Some(object) => object.is_empty() || object.contains_key("blockMap"),
        None => false,
    };
    let document = if is_ingest {
        serde_json::from_value::<Ingest>(value)?.into_document()
    } else {
        Document::from_json(value)?
    };
    Ok(document)
}

/// Write `content` to `out`, or stdout when no path is given
pub(crate) fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Cannot write {}", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_model::Block;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("compose-cli-{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_ingest_and_bare_documents() {
        let doc = Document::from_blocks(vec![Block::paragraph("stored")]);
        let bare = temp_file("bare.json", &doc.to_json_string().unwrap());
        let ingest = temp_file(
            "ingest.json",
            &format!(r#"{{ "blockMap": {} }}"#, doc.to_json_string().unwrap()),
        );
        let empty = temp_file("empty.json", "{}");

        assert_eq!(read_document(&bare).unwrap(), doc);
        assert_eq!(read_document(&ingest).unwrap(), doc);
        assert_eq!(read_document(&empty).unwrap(), Document::empty());

        for path in [bare, ingest, empty] {
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let path = temp_file("broken.json", "{ nope");
        let err = read_document(&path).unwrap_err();
        assert!(err.to_string().contains("is not valid JSON"));
        let _ = std::fs::remove_file(path);
    }
}
