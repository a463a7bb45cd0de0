//! # Conditional Blocks
//!
//! Condition groups are supplied by the caller as an ordered list. A group is
//! identified by its position: the colour it is drawn with and the `group`
//! index stored on inserted `condition` blocks both come from it.
//!
//! ## Palette
//!
//! Colour `i` of `size` comes from three sine waves over `2πi/size`, phase
//! shifted by 0°, 240° and 120° for red, green and blue. Each wave is scaled
//! from [-1, 1] to a byte and written as two hex digits.
//!
//! ## Drops
//!
//! Dropping a group inserts one `condition` block per condition. Blocks are
//! inserted at one fixed position in reverse order, so the document ends up
//! with the conditions in their listed order.

use crate::commands::{Change, Command, CommandError};
use crate::transforms::{insert_block_at, prepare_block_insertion};
use compose_model::{Block, BlockType, Document, Node, Selection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BinderError {
    #[error("No condition group at index {0}")]
    UnknownGroup(usize),

    #[error("Unknown merge field: {0}")]
    UnknownField(String),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// A named set of conditions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A named condition. Formulas are only needed to evaluate the condition
/// against records; the editor itself only uses the name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,

    #[serde(rename = "type", default)]
    pub combinator: Combinator,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub formulas: Vec<Formula>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// A comparison of one record field against a fixed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub field: String,
    pub operator: Operator,
    pub comparator: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

/// A data record: field name to value
pub type Record = serde_json::Map<String, Value>;

impl Condition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_formulas(mut self, combinator: Combinator, formulas: Vec<Formula>) -> Self {
        self.combinator = combinator;
        self.formulas = formulas;
        self
    }

    /// Evaluate against a record. `and` needs every formula to pass (so an
    /// empty list passes), `or` needs at least one.
    pub fn passes(&self, record: &Record) -> bool {
        match self.combinator {
            Combinator::And => self.formulas.iter().all(|f| f.passes(record)),
            Combinator::Or => self.formulas.iter().any(|f| f.passes(record)),
        }
    }
}

impl ConditionGroup {
    pub fn new(name: impl Into<String>, conditions: &[&str]) -> Self {
        Self {
            name: name.into(),
            conditions: conditions.iter().map(|c| Condition::new(*c)).collect(),
        }
    }
}

impl Formula {
    /// A record without the field never passes
    pub fn passes(&self, record: &Record) -> bool {
        let Some(value) = record.get(&self.field) else {
            return false;
        };
        match self.operator {
            Operator::Eq => values_equal(value, &self.comparator),
            Operator::Ne => !values_equal(value, &self.comparator),
            op => match compare(value, &self.comparator) {
                Some(ordering) => match op {
                    Operator::Lt => ordering.is_lt(),
                    Operator::Le => ordering.is_le(),
                    Operator::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
                None => false,
            },
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Find a condition by name across all groups
pub fn find_condition<'a>(groups: &'a [ConditionGroup], name: &str) -> Option<&'a Condition> {
    groups
        .iter()
        .flat_map(|g| g.conditions.iter())
        .find(|c| c.name == name)
}

/// Colour of group `index` out of `size` groups, as `#rrggbb`
pub fn colour(index: usize, size: usize) -> String {
    let channel = |phase: f64| {
        let angle = (PI / size as f64) * 2.0 * index as f64 + phase;
        let byte = (angle.sin() * 127.0).floor() as i64 + 128;
        format!("{:02x}", byte.clamp(0, 255))
    };
    let red = channel(0.0);
    let blue = channel(2.0 * PI / 3.0);
    let green = channel(4.0 * PI / 3.0);
    format!("#{red}{green}{blue}")
}

/// Palette for `size` groups
pub fn generate_colours(size: usize) -> Vec<String> {
    (0..size).map(|i| colour(i, size)).collect()
}

/// Maps condition groups to colours and inserts condition blocks
#[derive(Debug, Clone, Default)]
pub struct ConditionBinder {
    groups: Vec<ConditionGroup>,
    palette: Vec<String>,
}

impl ConditionBinder {
    pub fn new(groups: Vec<ConditionGroup>) -> Self {
        Self {
            palette: generate_colours(groups.len()),
            groups,
        }
    }

    pub fn groups(&self) -> &[ConditionGroup] {
        &self.groups
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Replace the group list. The palette is rebuilt when the count changes.
    pub fn set_groups(&mut self, groups: Vec<ConditionGroup>) {
        if groups.len() != self.groups.len() {
            debug!(from = self.groups.len(), to = groups.len(), "rebuilding palette");
            self.palette = generate_colours(groups.len());
        }
        self.groups = groups;
    }

    pub fn colour_of(&self, group: usize) -> Option<&str> {
        self.palette.get(group).map(String::as_str)
    }

    /// Insert the conditions of group `index` at the selection, in order
    pub fn drop_group(
        &self,
        doc: &Document,
        selection: &Selection,
        index: usize,
    ) -> Result<Change, BinderError> {
        let group = self.groups.get(index).ok_or(BinderError::UnknownGroup(index))?;
        if group.conditions.is_empty() {
            Command::DeleteRange.validate(doc, selection)?;
            return Ok(Change {
                document: doc.clone(),
                selection: selection.clone(),
            });
        }

        let Change {
            mut document,
            selection,
        } = Command::DeleteRange.apply(doc, selection)?;
        let (parent, at) = prepare_block_insertion(&mut document, &selection.anchor)?;

        for condition in group.conditions.iter().rev() {
            insert_block_at(&mut document, &parent, at, Block::condition(&condition.name, index))?;
        }

        let mut last = parent;
        last.push(at + group.conditions.len() - 1);
        let caret = document
            .end_of(&last)
            .ok_or_else(|| CommandError::BlockNotFound(last.clone()))?;

        info!(
            group = %group.name,
            index,
            conditions = group.conditions.len(),
            "inserted condition blocks"
        );
        Ok(Change {
            document,
            selection: Selection::collapsed(caret),
        })
    }
}

/// Shift the `group` index of condition blocks after group `removed` is
/// deleted. Blocks of the removed group lose their index.
pub fn renumber_groups_after_removal(doc: &Document, removed: usize) -> Document {
    let mut out = doc.clone();
    let paths: Vec<_> = doc
        .descendants()
        .into_iter()
        .filter(|(_, node)| matches!(node, Node::Block(b) if b.kind == BlockType::Condition))
        .map(|(path, _)| path)
        .collect();

    for path in paths {
        let Some(block) = out.block_mut(&path) else {
            continue;
        };
        match block.group() {
            Some(group) if group > removed => {
                block.data.insert("group".into(), Value::from(group - 1));
            }
            Some(group) if group == removed => {
                block.data.remove("group");
            }
            _ => {}
        }
    }
    out
}
