//! # Compose Editor
//!
//! Editing engine for Compose documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: document tree, selection, JSON       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: commands over (tree, selection)     │
//! │  - Marks, block types, lists, inserts       │
//! │  - Key handling and undo history            │
//! │  - Condition groups and merge fields        │
//! │  - Save/preview through a content sink      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ markup: tree → HTML per top-level block     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Commands are pure**: each returns a new tree and selection
//! 2. **Groups are positional**: colour and stored `group` index follow list order
//! 3. **References are checked at the boundary**: condition names and merge
//!    fields are validated on save, never by the tree
//!
//! ## Usage
//!
//! ```rust,ignore
//! use compose_editor::{Command, EditSession, KeyPress, LocalSink};
//! use compose_model::BlockType;
//!
//! let mut session = EditSession::new("draft", document)
//!     .with_condition_groups(groups)
//!     .with_merge_fields(fields);
//!
//! session.apply(&Command::SetBlock { kind: BlockType::HeadingOne })?;
//! session.key_down(&KeyPress::new("b").ctrl())?;
//! session.insert_merge_field("first_name")?;
//!
//! session.drag_start();
//! session.drag_move(true);
//! session.drag_end(0)?;
//!
//! session.save(&mut LocalSink::default())?;
//! ```

mod commands;
mod conditions;
mod drag;
mod errors;
mod keys;
mod merge_fields;
mod payload;
mod populate;
mod session;
mod transforms;
mod undo_stack;
mod validate;

pub use commands::{Change, Command, CommandError};
pub use conditions::{
    colour, find_condition, generate_colours, renumber_groups_after_removal, BinderError,
    Combinator, Condition, ConditionBinder, ConditionGroup, Formula, Operator, Record,
};
pub use drag::DragState;
pub use errors::EditorError;
pub use keys::{on_key_down, Hotkey, KeyAction, KeyPress, MARK_HOTKEYS};
pub use merge_fields::{referenced_fields, MergeField, MergeFieldBinder};
pub use payload::{ContentSink, Egest, Ingest, SinkError};
pub use populate::{populate_content, populate_line, LocalSink};
pub use session::{EditSession, SessionOptions};
pub use transforms::{selected_blocks, SelectionMarker};
pub use undo_stack::{EditBatch, Snapshot, UndoStack};
pub use validate::{content_issues, validate_condition_groups, validate_content, ValidationError};
