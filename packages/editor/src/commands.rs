//! # Editing Commands
//!
//! Operations over a document and selection. Each command validates the
//! selection first, works on a copy of the tree and returns the new tree with
//! the resulting selection; the input document is left as it was.
//!
//! ## Semantics
//!
//! ### ToggleMark
//! - Expanded selection: if any selected character carries a mark of the
//!   type, the type is removed from the whole selection, otherwise the mark
//!   is added to it. Removal compares the type only, never the data.
//! - Collapsed selection: the selection's pending marks are toggled and the
//!   tree is left unchanged.
//!
//! ### SetBlock
//! - If every selected block already has the type it is reset to
//!   `paragraph`, otherwise every selected block takes the type.
//! - A selection inside a list exits both list types.
//! - `list-item`, `condition` and void types are rejected; lists go
//!   through ToggleList.
//!
//! ### ToggleList
//! - Inside a list of the same type: items become paragraphs and leave the list.
//! - Inside a list of the other type: the list flavour is switched. Other
//!   selected blocks become items of the switched list.
//! - Outside any list: blocks become items wrapped in a new list.
//!
//! ### Inserts
//! - An expanded selection is deleted before anything is inserted.
//! - Blocks go before, after or between the halves of the block at the cursor.

use crate::transforms::{
    block_of, char_count, delete_range, first_text_after, insert_block_at, last_text_before,
    point_in_block, prepare_block_insertion, selected_blocks, set_blocks, split_block_at, splice,
    split_nodes, unwrap_blocks, wrap_blocks, SelectionMarker,
};
use compose_model::{
    normalize_inline_children, normalize_nodes, Block, BlockType, Document, Inline, Mark, Node,
    Path, Point, Selection,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Editing commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Command {
    /// Add or remove a mark over the selection
    ToggleMark { mark: Mark },

    /// Set the type of the selected blocks
    SetBlock { kind: BlockType },

    /// Wrap or unwrap the selected blocks in a list
    ToggleList { kind: BlockType },

    /// Type text at the cursor
    InsertText { text: String },

    /// Insert an inline (link, merge field, image) at the cursor
    InsertInline { inline: Inline },

    /// Insert a block at the cursor
    InsertBlock { block: Block },

    /// Splice parsed content at the cursor
    InsertFragment { nodes: Vec<Node> },

    /// Split the block at the cursor in two
    SplitBlock,

    /// Delete the selected content
    DeleteRange,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Invalid selection point: {0}")]
    InvalidPoint(String),

    #[error("Fragment has no content")]
    EmptyFragment,

    #[error("Block not found at {0:?}")]
    BlockNotFound(Path),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

/// Result of a command: the new tree and where the selection ended up
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub document: Document,
    pub selection: Selection,
}

impl Command {
    /// Apply the command to `doc` with validation
    pub fn apply(&self, doc: &Document, selection: &Selection) -> Result<Change, CommandError> {
        self.validate(doc, selection)?;

        let mut document = doc.clone();
        let selection = match self {
            Command::ToggleMark { mark } => Self::apply_toggle_mark(&mut document, selection, mark),
            Command::SetBlock { kind } => Self::apply_set_block(&mut document, selection, kind),
            Command::ToggleList { kind } => Self::apply_toggle_list(&mut document, selection, kind),
            Command::InsertText { text } => Self::apply_insert_text(&mut document, selection, text),
            Command::InsertInline { inline } => {
                Self::apply_insert_inline(&mut document, selection, inline)
            }
            Command::InsertBlock { block } => Self::apply_insert_block(&mut document, selection, block),
            Command::InsertFragment { nodes } => {
                Self::apply_insert_fragment(&mut document, selection, nodes)
            }
            Command::SplitBlock => Self::apply_split_block(&mut document, selection),
            Command::DeleteRange => delete_range(&mut document, selection),
        }?;

        Ok(Change { document, selection })
    }

    /// Check that the command can run against `doc`
    pub fn validate(&self, doc: &Document, selection: &Selection) -> Result<(), CommandError> {
        for point in [&selection.anchor, &selection.focus] {
            doc.check_point(point)
                .map_err(|e| CommandError::InvalidPoint(e.to_string()))?;
        }

        match self {
            Command::ToggleList { kind } if !kind.is_list() => Err(CommandError::InvalidStructure(
                format!("{kind} is not a list type"),
            )),
            // List items only live inside a list; void and condition blocks
            // need data that a retype cannot supply
            Command::SetBlock { kind }
                if *kind == BlockType::ListItem
                    || *kind == BlockType::Condition
                    || kind.is_void() =>
            {
                Err(CommandError::InvalidStructure(format!(
                    "{kind} cannot be set on a text block"
                )))
            }
            Command::InsertFragment { nodes } if nodes.is_empty() => Err(CommandError::EmptyFragment),
            _ => Ok(()),
        }
    }

    /// Short label used for undo entries and logs
    pub fn description(&self) -> String {
        match self {
            Command::ToggleMark { mark } => format!("Toggle {}", mark.kind),
            Command::SetBlock { kind } => format!("Set block {kind}"),
            Command::ToggleList { kind } => format!("Toggle {kind}"),
            Command::InsertText { .. } => "Typing".to_string(),
            Command::InsertInline { inline } => format!("Insert {}", inline.kind),
            Command::InsertBlock { block } => format!("Insert {}", block.kind),
            Command::InsertFragment { .. } => "Paste".to_string(),
            Command::SplitBlock => "Split block".to_string(),
            Command::DeleteRange => "Delete".to_string(),
        }
    }

    fn apply_toggle_mark(
        doc: &mut Document,
        selection: &Selection,
        mark: &Mark,
    ) -> Result<Selection, CommandError> {
        let (start, end) = (selection.start().clone(), selection.end().clone());

        if selection.is_collapsed() {
            let mut pending = selection.marks.clone().unwrap_or_else(|| {
                doc.text(&start.path)
                    .map(|t| t.marks_at(start.offset))
                    .unwrap_or_default()
            });
            if pending.iter().any(|m| m.kind == mark.kind) {
                pending.retain(|m| m.kind != mark.kind);
            } else {
                pending.push(mark.clone());
            }
            return Ok(selection.clone().with_marks(Some(pending)));
        }

        let ranges: Vec<(Path, usize, usize)> = doc
            .text_paths()
            .into_iter()
            .filter(|p| *p >= start.path && *p <= end.path)
            .filter_map(|p| {
                let len = doc.text(&p)?.len();
                let from = if p == start.path { start.offset } else { 0 };
                let to = if p == end.path { end.offset } else { len };
                Some((p, from, to))
            })
            .collect();

        let present = ranges.iter().any(|(p, from, to)| {
            doc.text(p)
                .map(|t| t.has_mark_in(*from, *to, &mark.kind))
                .unwrap_or(false)
        });

        for (path, from, to) in &ranges {
            if let Some(text) = doc.text_mut(path) {
                *text = text.update_marks(*from, *to, |marks| {
                    if present {
                        marks.retain(|m| m.kind != mark.kind);
                    } else if !marks.iter().any(|m| m.kind == mark.kind) {
                        marks.push(mark.clone());
                    }
                });
            }
        }

        Ok(selection.clone().with_marks(None))
    }

    fn apply_set_block(
        doc: &mut Document,
        selection: &Selection,
        kind: &BlockType,
    ) -> Result<Selection, CommandError> {
        if kind.is_list() {
            return Self::apply_toggle_list(doc, selection, kind);
        }

        let selected = selected_blocks(doc, selection);
        let editable: Vec<&Block> = selected
            .iter()
            .filter_map(|p| doc.block(p))
            .filter(|b| !b.is_void())
            .collect();
        let is_active = !editable.is_empty() && editable.iter().all(|b| b.kind == *kind);
        let in_list = editable.iter().any(|b| b.kind == BlockType::ListItem);

        let target = if is_active { BlockType::DEFAULT } else { kind.clone() };
        set_blocks(doc, &selected, &target);

        if !in_list {
            return Ok(selection.clone());
        }
        Ok(Self::exit_lists(doc, selection))
    }

    fn apply_toggle_list(
        doc: &mut Document,
        selection: &Selection,
        kind: &BlockType,
    ) -> Result<Selection, CommandError> {
        let other = match kind {
            BlockType::BulletedList => BlockType::NumberedList,
            BlockType::NumberedList => BlockType::BulletedList,
            _ => {
                return Err(CommandError::InvalidStructure(format!(
                    "{kind} is not a list type"
                )))
            }
        };

        let selected = selected_blocks(doc, selection);
        let in_list = selected
            .iter()
            .filter_map(|p| doc.block(p))
            .any(|b| b.kind == BlockType::ListItem);
        let in_type = selected.iter().any(|p| {
            doc.closest(p, |n| matches!(n, Node::Block(b) if b.kind == *kind))
                .is_some()
        });

        let marker = SelectionMarker::capture(doc, selection);
        if in_list && in_type {
            set_blocks(doc, &selected, &BlockType::DEFAULT);
            return Ok(Self::exit_lists(doc, selection));
        }

        if in_list {
            unwrap_blocks(doc, selection, &other);
        }
        // A mixed selection (a paragraph next to items of the other flavour)
        // becomes items too, so the new list only holds list-items
        let restored = marker.restore(doc);
        let lifted = selected_blocks(doc, &restored);
        set_blocks(doc, &lifted, &BlockType::ListItem);
        wrap_blocks(doc, &restored, kind);
        Ok(marker.restore(doc))
    }

    /// Lift the selection out of bulleted and numbered lists
    fn exit_lists(doc: &mut Document, selection: &Selection) -> Selection {
        let marker = SelectionMarker::capture(doc, selection);
        unwrap_blocks(doc, selection, &BlockType::BulletedList);
        unwrap_blocks(doc, &marker.restore(doc), &BlockType::NumberedList);
        marker.restore(doc)
    }

    fn apply_insert_text(
        doc: &mut Document,
        selection: &Selection,
        text: &str,
    ) -> Result<Selection, CommandError> {
        let pending = selection.marks.clone();
        let collapsed = delete_range(doc, selection)?;
        let point = collapsed.anchor;

        let current = doc
            .text(&point.path)
            .ok_or_else(|| CommandError::InvalidPoint(format!("{:?} is not a text", point.path)))?;
        let marks = pending.unwrap_or_else(|| current.marks_at(point.offset));
        let updated = current.insert(point.offset, text, marks);

        if let Some(slot) = doc.text_mut(&point.path) {
            *slot = updated;
        }
        Ok(Selection::collapsed(Point::new(
            point.path,
            point.offset + text.chars().count(),
        )))
    }

    fn apply_insert_inline(
        doc: &mut Document,
        selection: &Selection,
        inline: &Inline,
    ) -> Result<Selection, CommandError> {
        let point = delete_range(doc, selection)?.anchor;
        let block_path = block_of(doc, &point)?;
        let block = doc
            .block(&block_path)
            .ok_or_else(|| CommandError::BlockNotFound(block_path.clone()))?;

        let (left, right) = split_nodes(&block.nodes, &point.path[block_path.len()..], point.offset);
        let left = normalize_inline_children(left);
        let before = char_count(&left);
        let index = left.len();

        let mut nodes = left;
        nodes.push(Node::Inline(inline.clone()));
        nodes.extend(normalize_inline_children(right));
        let nodes = normalize_inline_children(nodes);
        let after_inline = matches!(nodes.get(index), Some(Node::Inline(_)))
            && matches!(nodes.get(index + 1), Some(Node::Text(_)));

        if let Some(block) = doc.block_mut(&block_path) {
            block.nodes = nodes;
        }

        // The caret lands just after the inserted inline
        let point = if after_inline {
            let mut path = block_path.clone();
            path.push(index + 1);
            Point::new(path, 0)
        } else {
            point_in_block(doc, &block_path, before)
                .ok_or_else(|| CommandError::BlockNotFound(block_path.clone()))?
        };
        Ok(Selection::collapsed(point))
    }

    fn apply_insert_block(
        doc: &mut Document,
        selection: &Selection,
        block: &Block,
    ) -> Result<Selection, CommandError> {
        let point = delete_range(doc, selection)?.anchor;
        let (parent, index) = prepare_block_insertion(doc, &point)?;
        let path = insert_block_at(doc, &parent, index, block.clone())?;
        Ok(Selection::collapsed(Self::caret_in_or_after(doc, &path)?))
    }

    fn apply_insert_fragment(
        doc: &mut Document,
        selection: &Selection,
        nodes: &[Node],
    ) -> Result<Selection, CommandError> {
        let fragment = normalize_nodes(nodes.to_vec());
        let point = delete_range(doc, selection)?.anchor;
        let block_path = block_of(doc, &point)?;
        let current = doc
            .block(&block_path)
            .cloned()
            .ok_or_else(|| CommandError::BlockNotFound(block_path.clone()))?;
        let (left, right) = split_nodes(&current.nodes, &point.path[block_path.len()..], point.offset);

        // A single run of inline content merges into the current block
        if let [Node::Block(single)] = fragment.as_slice() {
            if !single.is_void() && !single.has_block_children() {
                let offset = char_count(&left) + char_count(&single.nodes);
                let mut merged = left;
                merged.extend(single.nodes.iter().cloned());
                merged.extend(right);
                if let Some(block) = doc.block_mut(&block_path) {
                    block.nodes = normalize_inline_children(merged);
                }
                let point = point_in_block(doc, &block_path, offset)
                    .ok_or_else(|| CommandError::BlockNotFound(block_path.clone()))?;
                return Ok(Selection::collapsed(point));
            }
        }

        let head = Block {
            nodes: normalize_inline_children(left),
            ..current.clone()
        };
        let tail = Block {
            nodes: normalize_inline_children(right),
            ..current
        };
        let keep_head = !head.is_empty();
        let count = fragment.len();

        let mut replacement = Vec::with_capacity(count + 2);
        if keep_head {
            replacement.push(Node::Block(head));
        }
        replacement.extend(fragment);
        if !tail.is_empty() {
            replacement.push(Node::Block(tail));
        }
        splice(doc, &block_path, replacement);

        let mut last = block_path;
        if let Some(index) = last.last_mut() {
            *index += count - 1 + usize::from(keep_head);
        }
        Ok(Selection::collapsed(Self::caret_in_or_after(doc, &last)?))
    }

    fn apply_split_block(doc: &mut Document, selection: &Selection) -> Result<Selection, CommandError> {
        let point = delete_range(doc, selection)?.anchor;
        let block_path = block_of(doc, &point)?;
        split_block_at(doc, &block_path, &point)?;

        let mut next = block_path;
        if let Some(index) = next.last_mut() {
            *index += 1;
        }
        let point = doc
            .start_of(&next)
            .ok_or_else(|| CommandError::BlockNotFound(next.clone()))?;
        Ok(Selection::collapsed(point))
    }

    /// End of the block at `path`, or the nearest text around it when the
    /// block holds no text
    fn caret_in_or_after(doc: &Document, path: &[usize]) -> Result<Point, CommandError> {
        doc.end_of(path)
            .or_else(|| first_text_after(doc, path))
            .or_else(|| last_text_before(doc, path))
            .ok_or_else(|| CommandError::BlockNotFound(path.to_vec()))
    }
}
