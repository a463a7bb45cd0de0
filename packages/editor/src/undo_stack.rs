//! # Undo/Redo Stack
//!
//! Tracks edit history for one session and enables undo/redo.
//!
//! ## Design
//!
//! - Each edit records the document and selection before and after it
//! - Undo restores the "before" snapshot and moves the edit to the redo stack
//! - Redo restores the "after" snapshot
//! - New edits clear the redo stack
//! - Supports batched edits (several commands undone as one step)
//!
//! History lives only as long as the session; it is never persisted.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let current = Snapshot::new(doc, selection);
//!
//! let next = stack.apply(&Command::SplitBlock, &current)?;
//! let previous = stack.undo().unwrap();
//! assert_eq!(previous, current);
//! ```

use crate::commands::{Command, CommandError};
use compose_model::{Document, Selection};

/// Document and selection at one point in history
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: Document,
    pub selection: Selection,
}

impl Snapshot {
    pub fn new(document: Document, selection: Selection) -> Self {
        Self {
            document,
            selection,
        }
    }
}

/// One undo step: the state before the first edit and after the last
#[derive(Debug, Clone)]
pub struct EditBatch {
    pub before: Snapshot,
    pub after: Snapshot,

    /// Optional description of this step
    pub description: Option<String>,
}

/// Undo/redo stack for document editing
#[derive(Debug)]
pub struct UndoStack {
    /// Applied edits (most recent last)
    undo_stack: Vec<EditBatch>,

    /// Undone edits (most recent last)
    redo_stack: Vec<EditBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Whether a batch is open, and the batch built so far
    batching: bool,
    current_batch: Option<EditBatch>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            batching: false,
            current_batch: None,
        }
    }

    /// Apply a command to `current` and record it for undo
    pub fn apply(&mut self, command: &Command, current: &Snapshot) -> Result<Snapshot, CommandError> {
        let change = command.apply(&current.document, &current.selection)?;
        let next = Snapshot::new(change.document, change.selection);
        self.record(current.clone(), next.clone(), Some(command.description()));
        Ok(next)
    }

    /// Record an edit that was applied elsewhere
    pub fn record(&mut self, before: Snapshot, after: Snapshot, description: Option<String>) {
        if self.batching {
            match &mut self.current_batch {
                Some(batch) => batch.after = after,
                None => {
                    self.current_batch = Some(EditBatch {
                        before,
                        after,
                        description,
                    })
                }
            }
            return;
        }
        self.push_batch(EditBatch {
            before,
            after,
            description,
        });
    }

    /// Start a batch of edits (will be undone/redone together)
    pub fn begin_batch(&mut self) {
        self.batching = true;
        self.current_batch = None;
    }

    /// End the current batch and push it to the undo stack
    pub fn end_batch(&mut self) {
        self.batching = false;
        if let Some(batch) = self.current_batch.take() {
            self.push_batch(batch);
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batching
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_batch(&mut self, batch: EditBatch) {
        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // A new edit invalidates the undone future
        self.redo_stack.clear();
    }

    /// Undo the most recent edit, returning the state to restore
    pub fn undo(&mut self) -> Option<Snapshot> {
        let batch = self.undo_stack.pop()?;
        let restored = batch.before.clone();
        self.redo_stack.push(batch);
        Some(restored)
    }

    /// Redo the most recently undone edit, returning the state to restore
    pub fn redo(&mut self) -> Option<Snapshot> {
        let batch = self.redo_stack.pop()?;
        let restored = batch.after.clone();
        self.undo_stack.push(batch);
        Some(restored)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Description of the next undo step
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().and_then(|b| b.description.as_deref())
    }

    /// Description of the next redo step
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().and_then(|b| b.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_model::{Block, Point};

    fn initial() -> Snapshot {
        let document = Document::from_blocks(vec![Block::paragraph("hello")]);
        let selection = Selection::collapsed(Point::new(vec![0, 0], 5));
        Snapshot::new(document, selection)
    }

    fn typing(text: &str) -> Command {
        Command::InsertText { text: text.into() }
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(stack.undo_levels(), 0);
    }

    #[test]
    fn test_apply_and_undo_redo() {
        let mut stack = UndoStack::new();
        let start = initial();

        let edited = stack.apply(&typing(" world"), &start).unwrap();
        assert_eq!(edited.document.plain_text(), "hello world");
        assert_eq!(stack.undo_description(), Some("Typing"));

        assert_eq!(stack.undo(), Some(start.clone()));
        assert!(stack.can_redo());

        assert_eq!(stack.redo(), Some(edited));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_batch_undoes_as_one_step() {
        let mut stack = UndoStack::new();
        let start = initial();

        stack.begin_batch();
        let first = stack.apply(&typing(","), &start).unwrap();
        let second = stack.apply(&typing(" you"), &first).unwrap();
        stack.set_batch_description("Reply");
        stack.end_batch();

        assert_eq!(second.document.plain_text(), "hello, you");
        assert_eq!(stack.undo_levels(), 1);
        assert_eq!(stack.undo_description(), Some("Reply"));
        assert_eq!(stack.undo(), Some(start));
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut stack = UndoStack::new();
        let start = initial();

        stack.apply(&typing("!"), &start).unwrap();
        stack.undo();
        assert!(stack.can_redo());

        stack.apply(&typing("?"), &start).unwrap();
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_max_levels() {
        let mut stack = UndoStack::with_max_levels(3);
        let mut current = initial();

        for _ in 0..5 {
            current = stack.apply(&typing("."), &current).unwrap();
        }

        assert_eq!(stack.undo_levels(), 3);
    }

    #[test]
    fn test_failed_command_is_not_recorded() {
        let mut stack = UndoStack::new();
        let mut start = initial();
        start.selection = Selection::collapsed(Point::new(vec![4, 0], 0));

        assert!(stack.apply(&typing("x"), &start).is_err());
        assert!(!stack.can_undo());
    }
}
