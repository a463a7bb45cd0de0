//! Boundary validation of content against the caller's condition groups and
//! merge fields. The tree itself does not enforce these references.

use crate::conditions::ConditionGroup;
use crate::merge_fields::{referenced_fields, MergeField};
use compose_model::{BlockType, Document, Node};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Condition '{0}' does not exist in any condition group")]
    UnknownCondition(String),

    #[error("Condition block '{name}' references missing group {group:?}")]
    InvalidGroup { name: String, group: Option<usize> },

    #[error("Condition '{name}' is not part of group {group}")]
    ConditionNotInGroup { name: String, group: usize },

    #[error("Merge field '{0}' is not available")]
    UnknownField(String),

    #[error("Condition group names must be unique: '{0}' is repeated")]
    DuplicateGroup(String),

    #[error("Condition names must be unique: '{0}' is repeated")]
    DuplicateCondition(String),
}

/// Group names and condition names must each be unique
pub fn validate_condition_groups(groups: &[ConditionGroup]) -> Result<(), ValidationError> {
    let mut group_names = HashSet::new();
    let mut condition_names = HashSet::new();

    for group in groups {
        if !group_names.insert(group.name.as_str()) {
            return Err(ValidationError::DuplicateGroup(group.name.clone()));
        }
        for condition in &group.conditions {
            if !condition_names.insert(condition.name.as_str()) {
                return Err(ValidationError::DuplicateCondition(condition.name.clone()));
            }
        }
    }
    Ok(())
}

/// Every problem with the references held by `doc`, in document order
pub fn content_issues(
    doc: &Document,
    groups: &[ConditionGroup],
    fields: &[MergeField],
) -> Vec<ValidationError> {
    let mut issues = Vec::new();

    for (_, node) in doc.descendants() {
        let Node::Block(block) = node else {
            continue;
        };
        if block.kind != BlockType::Condition {
            continue;
        }
        let name = block.data_str("name").unwrap_or_default().to_string();

        if !groups.iter().any(|g| g.conditions.iter().any(|c| c.name == name)) {
            issues.push(ValidationError::UnknownCondition(name));
            continue;
        }
        match block.group().and_then(|g| groups.get(g).map(|group| (g, group))) {
            None => issues.push(ValidationError::InvalidGroup {
                name,
                group: block.group(),
            }),
            Some((g, group)) if !group.conditions.iter().any(|c| c.name == name) => {
                issues.push(ValidationError::ConditionNotInGroup { name, group: g })
            }
            Some(_) => {}
        }
    }

    for field in referenced_fields(doc) {
        if !fields.iter().any(|f| f.field == field) {
            issues.push(ValidationError::UnknownField(field));
        }
    }
    issues
}

/// Check content before it is saved or populated
pub fn validate_content(
    doc: &Document,
    groups: &[ConditionGroup],
    fields: &[MergeField],
) -> Result<(), ValidationError> {
    validate_condition_groups(groups)?;
    match content_issues(doc, groups, fields).into_iter().next() {
        Some(issue) => Err(issue),
        None => Ok(()),
    }
}
