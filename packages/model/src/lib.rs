//! Content tree shared by the editor, the HTML codec and the CLI.

pub mod document;
pub mod error;
pub mod node;
pub mod normalize;
pub mod selection;

pub use document::Document;
pub use error::{ModelError, ModelResult};
pub use node::{Block, BlockType, Data, Inline, InlineType, Leaf, Mark, MarkType, Node, Path, Text};
pub use normalize::{normalize_block, normalize_inline_children, normalize_nodes};
pub use selection::{Point, Selection};
