//! Merge-field placeholders
//!
//! Field names come from the caller and are opaque to the editor. Inserting
//! one places a void `attribute` inline at the cursor.

use crate::commands::{Change, Command};
use crate::conditions::BinderError;
use compose_model::{Document, Inline, InlineType, Selection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeField {
    pub field: String,
}

impl MergeField {
    pub fn new(field: impl Into<String>) -> Self {
        Self { field: field.into() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeFieldBinder {
    fields: Vec<MergeField>,
}

impl MergeFieldBinder {
    pub fn new(fields: Vec<MergeField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[MergeField] {
        &self.fields
    }

    pub fn set_fields(&mut self, fields: Vec<MergeField>) {
        self.fields = fields;
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }

    /// Insert a placeholder for `field` at the selection
    pub fn insert(&self, doc: &Document, selection: &Selection, field: &str) -> Result<Change, BinderError> {
        if !self.contains(field) {
            return Err(BinderError::UnknownField(field.to_string()));
        }
        let command = Command::InsertInline {
            inline: Inline::attribute(field),
        };
        Ok(command.apply(doc, selection)?)
    }
}

/// Field names referenced by `attribute` inlines, in document order
pub fn referenced_fields(doc: &Document) -> Vec<String> {
    doc.descendants()
        .into_iter()
        .filter_map(|(_, node)| node.as_inline())
        .filter(|inline| inline.kind == InlineType::Attribute)
        .filter_map(|inline| inline.data_str("field"))
        .map(str::to_string)
        .collect()
}
