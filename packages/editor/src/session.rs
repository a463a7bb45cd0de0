//! # Edit Session Management
//!
//! An EditSession owns one document while it is edited: the tree, the
//! selection, undo history, drag state and the caller-supplied condition
//! groups and merge fields. Each session exclusively owns its document.
//!
//! Save and preview hand the serialized content to a [`ContentSink`]. A
//! failure is kept as one user-visible message until the next successful
//! request; nothing is retried.

use crate::commands::{Change, Command};
use crate::conditions::{ConditionBinder, ConditionGroup, Record};
use crate::drag::DragState;
use crate::keys::{on_key_down, KeyAction, KeyPress};
use crate::merge_fields::{MergeField, MergeFieldBinder};
use crate::payload::{ContentSink, Egest, Ingest};
use crate::undo_stack::{Snapshot, UndoStack};
use crate::validate::validate_content;
use crate::EditorError;
use compose_markup::{deserialize_paste, render_view};
use compose_model::{Document, Selection};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Maximum undo levels (0 = unlimited)
    pub undo_levels: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { undo_levels: 100 }
    }
}

/// Single edit session
pub struct EditSession {
    /// Unique session identifier
    pub id: String,

    document: Document,
    selection: Selection,
    undo_stack: UndoStack,
    drag: DragState,
    conditions: ConditionBinder,
    merge_fields: MergeFieldBinder,

    /// Message from the last failed save or preview
    last_error: Option<String>,
}

impl EditSession {
    /// Create new edit session with the caret at the start of `document`
    pub fn new(id: impl Into<String>, document: Document) -> Self {
        Self::with_options(id, document, SessionOptions::default())
    }

    pub fn with_options(id: impl Into<String>, document: Document, options: SessionOptions) -> Self {
        Self {
            id: id.into(),
            selection: document.start_selection(),
            document,
            undo_stack: UndoStack::with_max_levels(options.undo_levels),
            drag: DragState::default(),
            conditions: ConditionBinder::default(),
            merge_fields: MergeFieldBinder::default(),
            last_error: None,
        }
    }

    /// Open a session on stored content
    pub fn from_ingest(id: impl Into<String>, ingest: Ingest, options: SessionOptions) -> Self {
        Self::with_options(id, ingest.into_document(), options)
    }

    pub fn with_condition_groups(mut self, groups: Vec<ConditionGroup>) -> Self {
        self.conditions.set_groups(groups);
        self
    }

    pub fn with_merge_fields(mut self, fields: Vec<MergeField>) -> Self {
        self.merge_fields.set_fields(fields);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Move the selection. Both points must address text in the document.
    pub fn set_selection(&mut self, selection: Selection) -> Result<(), EditorError> {
        self.document.check_point(&selection.anchor)?;
        self.document.check_point(&selection.focus)?;
        self.selection = selection;
        Ok(())
    }

    pub fn condition_groups(&self) -> &[ConditionGroup] {
        self.conditions.groups()
    }

    /// Replace the condition groups; colours are rebuilt when the count changes
    pub fn set_condition_groups(&mut self, groups: Vec<ConditionGroup>) {
        self.conditions.set_groups(groups);
    }

    pub fn colours(&self) -> &[String] {
        self.conditions.palette()
    }

    pub fn merge_fields(&self) -> &[MergeField] {
        self.merge_fields.fields()
    }

    pub fn set_merge_fields(&mut self, fields: Vec<MergeField>) {
        self.merge_fields.set_fields(fields);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.document.clone(), self.selection.clone())
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.document = snapshot.document;
        self.selection = snapshot.selection;
    }

    /// Apply a command and record it for undo
    pub fn apply(&mut self, command: &Command) -> Result<(), EditorError> {
        let current = self.snapshot();
        let next = self.undo_stack.apply(command, &current)?;
        debug!(session = %self.id, command = %command.description(), "applied command");
        self.restore(next);
        Ok(())
    }

    /// Commit a change produced outside the command enum
    fn commit(&mut self, change: Change, description: &str) {
        let before = self.snapshot();
        self.document = change.document;
        self.selection = change.selection;
        let after = self.snapshot();
        self.undo_stack.record(before, after, Some(description.to_string()));
    }

    /// Handle a key press. Returns true if the key was consumed.
    ///
    /// Intercepted keys run their command; otherwise Enter splits the block
    /// and a printable character is typed.
    pub fn key_down(&mut self, press: &KeyPress) -> Result<bool, EditorError> {
        if let KeyAction::Apply(command) = on_key_down(&self.document, &self.selection, press) {
            self.apply(&command)?;
            return Ok(true);
        }

        if press.key == "Enter" {
            self.apply(&Command::SplitBlock)?;
            return Ok(true);
        }
        let printable = press.key.chars().count() == 1 && !press.ctrl && !press.meta;
        if printable {
            self.apply(&Command::InsertText {
                text: press.key.clone(),
            })?;
        }
        Ok(printable)
    }

    /// Type text at the cursor
    pub fn type_text(&mut self, text: &str) -> Result<(), EditorError> {
        self.apply(&Command::InsertText {
            text: text.to_string(),
        })
    }

    /// Paste external HTML through the sanitizer. Returns false if nothing
    /// survived sanitization.
    ///
    /// Deleting an expanded selection and inserting the fragment undo as one
    /// step.
    pub fn paste(&mut self, html: &str) -> Result<bool, EditorError> {
        let nodes = deserialize_paste(html);
        let has_content = nodes.iter().any(|n| !n.plain_text().is_empty() || n.is_void());
        if !has_content {
            debug!(session = %self.id, "nothing to paste");
            return Ok(false);
        }
        self.batch("Paste", |session| {
            session.delete_selection()?;
            session.apply(&Command::InsertFragment { nodes })?;
            Ok(true)
        })
    }

    /// Run `edits` as a single undo step labelled `description`. Nested
    /// batches join the outer one.
    pub fn batch<T>(
        &mut self,
        description: &str,
        edits: impl FnOnce(&mut Self) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        if self.undo_stack.in_batch() {
            return edits(self);
        }
        self.undo_stack.begin_batch();
        let result = edits(self);
        self.undo_stack.set_batch_description(description);
        self.undo_stack.end_batch();
        result
    }

    fn delete_selection(&mut self) -> Result<(), EditorError> {
        if self.selection.is_collapsed() {
            return Ok(());
        }
        self.apply(&Command::DeleteRange)
    }

    /// Insert a placeholder for a known merge field
    pub fn insert_merge_field(&mut self, field: &str) -> Result<(), EditorError> {
        let change = self.merge_fields.insert(&self.document, &self.selection, field)?;
        self.commit(change, "Insert merge field");
        Ok(())
    }

    pub fn drag_start(&mut self) {
        self.drag.start();
    }

    pub fn drag_move(&mut self, inside: bool) {
        self.drag.pointer_move(inside);
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// Finish dragging group `group`. Condition blocks are inserted only when
    /// the pointer was released over the document; the drag state is reset
    /// either way. Returns true if blocks were inserted.
    pub fn drag_end(&mut self, group: usize) -> Result<bool, EditorError> {
        if !self.drag.pointer_up() {
            return Ok(false);
        }
        self.batch("Insert conditions", |session| {
            session.delete_selection()?;
            let change = session
                .conditions
                .drop_group(&session.document, &session.selection, group)?;
            session.commit(change, "Insert conditions");
            Ok(true)
        })
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.undo_stack.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo_stack.can_redo()
    }

    /// Label of the step `undo` would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.undo_description()
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.undo_stack.redo_description()
    }

    /// Number of undo and redo steps held
    pub fn history_levels(&self) -> (usize, usize) {
        (self.undo_stack.undo_levels(), self.undo_stack.redo_levels())
    }

    /// Markup of the editing surface
    pub fn render(&self) -> String {
        render_view(&self.document, self.conditions.palette())
    }

    pub fn egest(&self) -> Egest {
        Egest::from_document(&self.document)
    }

    /// Check condition and merge-field references against the session's
    /// groups and fields
    pub fn validate(&self) -> Result<(), EditorError> {
        validate_content(&self.document, self.conditions.groups(), self.merge_fields.fields())?;
        Ok(())
    }

    /// Message from the last failed save or preview
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Save the document through `sink`
    #[instrument(skip(self, sink), fields(session = %self.id))]
    pub fn save(&mut self, sink: &mut dyn ContentSink) -> Result<(), EditorError> {
        let content = self.egest();
        let result = sink.save(&content);
        self.settle(result)
    }

    /// Populate the document for each record through `sink`
    #[instrument(skip(self, sink, records), fields(session = %self.id, records = records.len()))]
    pub fn preview(&mut self, sink: &mut dyn ContentSink, records: &[Record]) -> Result<Vec<String>, EditorError> {
        let content = self.egest();
        let result = sink.preview(&content, records);
        self.settle(result)
    }

    fn settle<T>(&mut self, result: Result<T, crate::payload::SinkError>) -> Result<T, EditorError> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Ok(value)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "sink request failed");
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::SinkError;
    use compose_model::{Block, BlockType, MarkType, Point};

    struct FailingSink;

    impl ContentSink for FailingSink {
        fn save(&mut self, _: &Egest) -> Result<(), SinkError> {
            Err(SinkError::Transport("connection reset".into()))
        }

        fn preview(&mut self, _: &Egest, _: &[Record]) -> Result<Vec<String>, SinkError> {
            Err(SinkError::Rejected("no records".into()))
        }
    }

    fn session(texts: &[&str]) -> EditSession {
        EditSession::new("s1", Document::from_blocks(texts.iter().map(|t| Block::paragraph(*t))))
    }

    #[test]
    fn test_new_session_starts_at_document_start() {
        let session = session(&["hello"]);
        assert_eq!(session.selection(), &Selection::collapsed(Point::new(vec![0, 0], 0)));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_typing_and_undo() {
        let mut session = session(&[""]);
        for key in ["h", "i"] {
            assert!(session.key_down(&KeyPress::new(key)).unwrap());
        }
        assert_eq!(session.document().plain_text(), "hi");

        assert!(session.undo());
        assert_eq!(session.document().plain_text(), "h");
        assert!(session.redo());
        assert_eq!(session.document().plain_text(), "hi");
    }

    #[test]
    fn test_hotkey_sets_pending_mark() {
        let mut session = session(&[""]);
        assert!(session.key_down(&KeyPress::new("b").ctrl()).unwrap());
        session.type_text("bold").unwrap();

        let text = session.document().text(&[0, 0]).unwrap();
        assert!(text.has_mark_in(0, 4, &MarkType::Bold));
    }

    #[test]
    fn test_unhandled_modifier_chord_is_not_consumed() {
        let mut session = session(&["a"]);
        assert!(!session.key_down(&KeyPress::new("k").ctrl()).unwrap());
        assert_eq!(session.document().plain_text(), "a");
    }

    #[test]
    fn test_set_selection_rejects_invalid_points() {
        let mut session = session(&["abc"]);
        let err = session
            .set_selection(Selection::collapsed(Point::new(vec![0, 0], 10)))
            .unwrap_err();
        assert!(matches!(err, EditorError::Model(_)));
    }

    #[test]
    fn test_drag_outside_document_inserts_nothing() {
        let mut session =
            session(&["P"]).with_condition_groups(vec![ConditionGroup::new("G", &["A"])]);
        session.drag_start();
        session.drag_move(true);
        session.drag_move(false);

        assert!(!session.drag_end(0).unwrap());
        assert_eq!(session.drag_state(), DragState::Idle);
        assert_eq!(session.document().nodes.len(), 1);
    }

    #[test]
    fn test_drop_is_one_undo_step() {
        let mut session =
            session(&["P"]).with_condition_groups(vec![ConditionGroup::new("G", &["A", "B"])]);
        session.set_selection(Selection::collapsed(Point::new(vec![0, 0], 1))).unwrap();
        session.drag_start();
        session.drag_move(true);

        assert!(session.drag_end(0).unwrap());
        assert_eq!(session.document().nodes.len(), 3);
        assert_eq!(
            session.document().block(&[1]).map(|b| b.kind.clone()),
            Some(BlockType::Condition)
        );

        assert_eq!(session.undo_description(), Some("Insert conditions"));
        assert!(session.undo());
        assert_eq!(session.document().nodes.len(), 1);
    }

    #[test]
    fn test_paste_over_selection_is_one_undo_step() {
        let mut session = session(&["keep drop keep"]);
        let before = session.document().clone();
        session
            .set_selection(Selection::new(Point::new(vec![0, 0], 5), Point::new(vec![0, 0], 9)))
            .unwrap();

        assert!(session.paste("<b>new</b>").unwrap());
        assert_eq!(session.document().plain_text(), "keep new keep");
        assert_eq!(session.history_levels(), (1, 0));
        assert_eq!(session.undo_description(), Some("Paste"));

        assert!(session.undo());
        assert_eq!(session.document(), &before);
        assert_eq!(session.redo_description(), Some("Paste"));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_nested_batches_join_outer_step() {
        let mut session = session(&[""]);
        session
            .batch("Greeting", |s| {
                s.type_text("Hello")?;
                s.batch("Inner", |s| s.type_text(" there"))?;
                s.apply(&Command::SetBlock { kind: BlockType::HeadingOne })
            })
            .unwrap();

        assert_eq!(session.history_levels(), (1, 0));
        assert_eq!(session.undo_description(), Some("Greeting"));
        assert!(session.undo());
        assert_eq!(session.document().plain_text(), "");
    }

    #[test]
    fn test_failed_batch_keeps_completed_edits_undoable() {
        let mut session = session(&["a"]);
        let err = session
            .batch("Broken", |s| {
                s.type_text("b")?;
                s.apply(&Command::InsertFragment { nodes: vec![] })
            })
            .unwrap_err();

        assert!(matches!(err, EditorError::Command(_)));
        assert_eq!(session.document().plain_text(), "ba");
        assert!(session.undo());
        assert_eq!(session.document().plain_text(), "a");
    }

    #[test]
    fn test_sink_failure_is_reported_once() {
        let mut session = session(&["a"]);
        let mut sink = FailingSink;

        assert!(session.save(&mut sink).is_err());
        assert_eq!(session.last_error(), Some("Request failed: connection reset"));

        assert!(session.preview(&mut sink, &[]).is_err());
        assert_eq!(session.last_error(), Some("Content was rejected: no records"));

        let mut local = crate::populate::LocalSink::default();
        session.save(&mut local).unwrap();
        assert_eq!(session.last_error(), None);
        assert_eq!(local.saved().len(), 1);
    }
}
