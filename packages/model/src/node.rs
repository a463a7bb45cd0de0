//! # Node Model
//!
//! Tagged tree of blocks, inlines and text. Marks live on text leaves.
//!
//! ```text
//! Document
//!  └─ Block (paragraph, heading-one, bulleted-list, condition, image, ...)
//!      ├─ Block (list-item, ...)
//!      ├─ Inline (link, attribute, image)
//!      │   └─ Text
//!      └─ Text
//!          └─ Leaf { text, marks: [Mark] }
//! ```
//!
//! Type names are open: a node type that this crate does not know about is
//! kept as `Other(name)` so that stored documents survive a load/save cycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Arbitrary node data (`href`, `src`, `field`, `name`, `group`, `style`, ...)
pub type Data = serde_json::Map<String, Value>;

/// Address of a node: child indices from the document root
pub type Path = Vec<usize>;

macro_rules! node_kind {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)*
            /// A type name this crate has no variant for
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $text,)*
                    Self::Other(name) => name,
                }
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                match name.as_str() {
                    $($text => Self::$variant,)*
                    _ => Self::Other(name),
                }
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self::from(name.to_string())
            }
        }

        impl From<$name> for String {
            fn from(kind: $name) -> String {
                match kind {
                    $name::Other(name) => name,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

node_kind! {
    /// Block node types
    BlockType {
        Paragraph => "paragraph",
        HeadingOne => "heading-one",
        HeadingTwo => "heading-two",
        HeadingThree => "heading-three",
        HeadingFour => "heading-four",
        HeadingFive => "heading-five",
        HeadingSix => "heading-six",
        NumberedList => "numbered-list",
        BulletedList => "bulleted-list",
        ListItem => "list-item",
        Quote => "quote",
        Code => "code",
        Condition => "condition",
        Image => "image",
    }
}

node_kind! {
    /// Inline node types
    InlineType {
        Link => "link",
        Attribute => "attribute",
        Image => "image",
    }
}

node_kind! {
    /// Mark types
    MarkType {
        Bold => "bold",
        Italic => "italic",
        Underlined => "underlined",
        Strikethrough => "strikethrough",
        Code => "code",
        Span => "span",
    }
}

impl BlockType {
    /// The block type used when a block is reset
    pub const DEFAULT: BlockType = BlockType::Paragraph;

    pub fn is_void(&self) -> bool {
        matches!(self, BlockType::Image)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, BlockType::NumberedList | BlockType::BulletedList)
    }
}

impl InlineType {
    pub fn is_void(&self) -> bool {
        matches!(self, InlineType::Attribute | InlineType::Image)
    }
}

/// A node of the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
pub enum Node {
    Block(Block),
    Inline(Inline),
    Text(Text),
}

/// Structural container occupying its own line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockType,

    #[serde(rename = "isVoid", default)]
    pub is_void: bool,

    #[serde(default)]
    pub data: Data,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Span embedded in block content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    #[serde(rename = "type")]
    pub kind: InlineType,

    #[serde(rename = "isVoid", default)]
    pub is_void: bool,

    #[serde(default)]
    pub data: Data,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// Leaf content: a run of leaves, each with its own mark set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub leaves: Vec<Leaf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub text: String,

    #[serde(default)]
    pub marks: Vec<Mark>,
}

/// Formatting applied to a text run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkType,

    #[serde(default)]
    pub data: Data,
}

impl Block {
    /// Create an empty block of `kind`; non-void blocks get one empty text
    pub fn new(kind: impl Into<BlockType>) -> Self {
        let kind = kind.into();
        let is_void = kind.is_void();
        Self {
            nodes: if is_void { vec![] } else { vec![Node::Text(Text::empty())] },
            kind,
            is_void,
            data: Data::new(),
        }
    }

    pub fn with_nodes(kind: impl Into<BlockType>, nodes: Vec<Node>) -> Self {
        let kind = kind.into();
        Self {
            is_void: kind.is_void(),
            kind,
            data: Data::new(),
            nodes,
        }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::with_nodes(BlockType::Paragraph, vec![Node::Text(Text::new(text))])
    }

    /// A condition block bound to `name` in the group at index `group`
    pub fn condition(name: impl Into<String>, group: usize) -> Self {
        let mut data = Data::new();
        data.insert("name".into(), Value::String(name.into()));
        data.insert("group".into(), Value::from(group));
        Self::new(BlockType::Condition).with_data(data)
    }

    pub fn image(src: impl Into<String>, alt: Option<String>) -> Self {
        Self::new(BlockType::Image).with_data(image_data(src.into(), alt))
    }

    pub fn is_void(&self) -> bool {
        self.is_void || self.kind.is_void()
    }

    /// True if any direct child is a block
    pub fn has_block_children(&self) -> bool {
        self.nodes.iter().any(|n| matches!(n, Node::Block(_)))
    }

    /// True if the block holds no characters and no void inline
    pub fn is_empty(&self) -> bool {
        !self.is_void() && nodes_are_empty(&self.nodes)
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Condition group index, if this block carries one
    pub fn group(&self) -> Option<usize> {
        self.data
            .get("group")
            .and_then(Value::as_u64)
            .map(|g| g as usize)
    }
}

impl Inline {
    pub fn new(kind: impl Into<InlineType>, data: Data) -> Self {
        let kind = kind.into();
        let is_void = kind.is_void();
        Self {
            nodes: if is_void { vec![] } else { vec![Node::Text(Text::empty())] },
            kind,
            is_void,
            data,
        }
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    /// A link whose label is `label`
    pub fn link(href: impl Into<String>, label: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert("href".into(), Value::String(href.into()));
        Self::new(InlineType::Link, data).with_nodes(vec![Node::Text(Text::new(label))])
    }

    /// A merge-field placeholder referencing `field`
    pub fn attribute(field: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert("field".into(), Value::String(field.into()));
        Self::new(InlineType::Attribute, data)
    }

    pub fn image(src: impl Into<String>, alt: Option<String>) -> Self {
        Self::new(InlineType::Image, image_data(src.into(), alt))
    }

    pub fn is_void(&self) -> bool {
        self.is_void || self.kind.is_void()
    }

    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

fn image_data(src: String, alt: Option<String>) -> Data {
    let mut data = Data::new();
    data.insert("src".into(), Value::String(src));
    if let Some(alt) = alt {
        data.insert("alt".into(), Value::String(alt));
    }
    data
}

fn nodes_are_empty(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::Text(text) => text.is_empty(),
        Node::Inline(inline) => !inline.is_void() && nodes_are_empty(&inline.nodes),
        Node::Block(block) => block.is_empty(),
    })
}

impl Mark {
    pub fn new(kind: impl Into<MarkType>) -> Self {
        Self {
            kind: kind.into(),
            data: Data::new(),
        }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }
}

impl From<MarkType> for Mark {
    fn from(kind: MarkType) -> Self {
        Mark::new(kind)
    }
}

impl Leaf {
    pub fn new(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn has_mark(&self, kind: &MarkType) -> bool {
        self.marks.iter().any(|m| &m.kind == kind)
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            leaves: vec![Leaf::new(text, vec![])],
        }
    }

    pub fn empty() -> Self {
        Self::new("")
    }

    pub fn with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            leaves: vec![Leaf::new(text, marks)],
        }
    }

    pub fn text(&self) -> String {
        self.leaves.iter().map(|l| l.text.as_str()).collect()
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.leaves.iter().map(Leaf::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.iter().all(|l| l.text.is_empty())
    }

    /// Marks in effect for text typed at `offset` (the character before it wins)
    pub fn marks_at(&self, offset: usize) -> Vec<Mark> {
        let mut start = 0;
        for leaf in &self.leaves {
            let end = start + leaf.char_len();
            if offset > start && offset <= end {
                return leaf.marks.clone();
            }
            start = end;
        }
        self.leaves.first().map(|l| l.marks.clone()).unwrap_or_default()
    }

    /// True if any character in `start..end` carries a mark of `kind`
    pub fn has_mark_in(&self, start: usize, end: usize, kind: &MarkType) -> bool {
        let mut pos = 0;
        for leaf in &self.leaves {
            let leaf_end = pos + leaf.char_len();
            if leaf_end > start && pos < end && leaf.has_mark(kind) {
                return true;
            }
            pos = leaf_end;
        }
        false
    }

    /// Split into the text before and after `offset`
    pub fn split_at(&self, offset: usize) -> (Text, Text) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut pos = 0;
        for leaf in &self.leaves {
            let len = leaf.char_len();
            if pos + len <= offset {
                left.push(leaf.clone());
            } else if pos >= offset {
                right.push(leaf.clone());
            } else {
                let cut = byte_index(&leaf.text, offset - pos);
                left.push(Leaf::new(&leaf.text[..cut], leaf.marks.clone()));
                right.push(Leaf::new(&leaf.text[cut..], leaf.marks.clone()));
            }
            pos += len;
        }
        (Text::from_leaves(left), Text::from_leaves(right))
    }

    /// Append the leaves of `other`
    pub fn concat(mut self, other: Text) -> Text {
        self.leaves.extend(other.leaves);
        self.normalized()
    }

    /// Insert `text` carrying `marks` at `offset`
    pub fn insert(&self, offset: usize, text: &str, marks: Vec<Mark>) -> Text {
        let (left, right) = self.split_at(offset);
        left.concat(Text::with_marks(text, marks)).concat(right)
    }

    /// Remove the characters in `start..end`
    pub fn remove(&self, start: usize, end: usize) -> Text {
        let (left, _) = self.split_at(start);
        let (_, right) = self.split_at(end);
        left.concat(right)
    }

    /// Rewrite the mark set of every character in `start..end`
    pub fn update_marks(&self, start: usize, end: usize, f: impl Fn(&mut Vec<Mark>)) -> Text {
        let (left, rest) = self.split_at(start);
        let (mut middle, right) = rest.split_at(end.saturating_sub(start));
        for leaf in &mut middle.leaves {
            f(&mut leaf.marks);
        }
        left.concat(middle).concat(right)
    }

    /// Apply `mark` to every leaf as its outermost mark
    pub fn wrap_mark(&mut self, mark: &Mark) {
        for leaf in &mut self.leaves {
            leaf.marks.push(mark.clone());
        }
    }

    fn from_leaves(leaves: Vec<Leaf>) -> Text {
        Text { leaves }.normalized()
    }

    /// Merge adjacent leaves with equal marks and drop empty leaves,
    /// keeping at least one leaf
    pub fn normalized(self) -> Text {
        let mut leaves: Vec<Leaf> = Vec::with_capacity(self.leaves.len());
        for leaf in self.leaves {
            if leaf.text.is_empty() {
                continue;
            }
            match leaves.last_mut() {
                Some(last) if last.marks == leaf.marks => last.text.push_str(&leaf.text),
                _ => leaves.push(leaf),
            }
        }
        if leaves.is_empty() {
            leaves.push(Leaf::new("", vec![]));
        }
        Text { leaves }
    }
}

/// Byte index of the `chars`-th character of `s`
pub(crate) fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

impl Node {
    pub fn block(block: Block) -> Self {
        Node::Block(block)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    /// Name of the node type, `"text"` for text nodes
    pub fn kind_name(&self) -> &str {
        match self {
            Node::Block(b) => b.kind.as_str(),
            Node::Inline(i) => i.kind.as_str(),
            Node::Text(_) => "text",
        }
    }

    pub fn nodes(&self) -> Option<&[Node]> {
        match self {
            Node::Block(b) => Some(&b.nodes),
            Node::Inline(i) => Some(&i.nodes),
            Node::Text(_) => None,
        }
    }

    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Block(b) => Some(&mut b.nodes),
            Node::Inline(i) => Some(&mut i.nodes),
            Node::Text(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut Block> {
        match self {
            Node::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_inline(&self) -> Option<&Inline> {
        match self {
            Node::Inline(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Node::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        match self {
            Node::Block(b) => b.is_void(),
            Node::Inline(i) => i.is_void(),
            Node::Text(_) => false,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Block(_))
    }

    /// Concatenated text of the subtree
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text(t) => t.text(),
            other => other
                .nodes()
                .unwrap_or_default()
                .iter()
                .map(Node::plain_text)
                .collect(),
        }
    }
}
