//! # Document
//!
//! Root of a content tree. Its JSON form is the `blockMap` payload:
//!
//! ```json
//! { "object": "value",
//!   "document": { "object": "document", "data": {}, "nodes": [ ... ] } }
//! ```
//!
//! A document is never empty: loading a document without blocks yields the
//! canonical empty document (one paragraph holding one empty text).

use crate::error::{ModelError, ModelResult};
use crate::node::{Block, BlockType, Data, Node, Path, Text};
use crate::selection::{Point, Selection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ValueJson", into = "ValueJson")]
pub struct Document {
    pub data: Data,
    pub nodes: Vec<Node>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
enum ValueJson {
    Value { document: DocumentJson },
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
enum DocumentJson {
    Document {
        #[serde(default)]
        data: Data,
        #[serde(default)]
        nodes: Vec<Node>,
    },
}

impl From<ValueJson> for Document {
    fn from(value: ValueJson) -> Self {
        let ValueJson::Value {
            document: DocumentJson::Document { data, nodes },
        } = value;
        let mut doc = Document::new(nodes);
        doc.data = data;
        doc
    }
}

impl From<Document> for ValueJson {
    fn from(doc: Document) -> Self {
        ValueJson::Value {
            document: DocumentJson::Document {
                data: doc.data,
                nodes: doc.nodes,
            },
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// The canonical empty document
    pub fn empty() -> Self {
        Self {
            data: Data::new(),
            nodes: vec![Node::Block(Block::new(BlockType::Paragraph))],
        }
    }

    /// Create a document from top-level nodes, falling back to the empty
    /// document when there are none
    pub fn new(nodes: Vec<Node>) -> Self {
        if nodes.is_empty() {
            return Self::empty();
        }
        Self {
            data: Data::new(),
            nodes,
        }
    }

    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Self {
        Self::new(blocks.into_iter().map(Node::Block).collect())
    }

    pub fn from_json(value: serde_json::Value) -> ModelResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> ModelResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_string(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(*first)?;
        for &index in rest {
            node = node.nodes()?.get(index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get_mut(*first)?;
        for &index in rest {
            node = node.nodes_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    /// Children of the node at `path`; the empty path addresses the root
    pub fn children(&self, path: &[usize]) -> Option<&[Node]> {
        if path.is_empty() {
            return Some(&self.nodes);
        }
        self.node(path)?.nodes()
    }

    pub fn children_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        if path.is_empty() {
            return Some(&mut self.nodes);
        }
        self.node_mut(path)?.nodes_mut()
    }

    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        self.node(path)?.as_block()
    }

    pub fn block_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        self.node_mut(path)?.as_block_mut()
    }

    pub fn text(&self, path: &[usize]) -> Option<&Text> {
        self.node(path)?.as_text()
    }

    pub fn text_mut(&mut self, path: &[usize]) -> Option<&mut Text> {
        self.node_mut(path)?.as_text_mut()
    }

    /// All nodes with their paths, in document order
    pub fn descendants(&self) -> Vec<(Path, &Node)> {
        fn walk<'a>(nodes: &'a [Node], prefix: &mut Path, out: &mut Vec<(Path, &'a Node)>) {
            for (index, node) in nodes.iter().enumerate() {
                prefix.push(index);
                out.push((prefix.clone(), node));
                if let Some(children) = node.nodes() {
                    walk(children, prefix, out);
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        walk(&self.nodes, &mut Vec::new(), &mut out);
        out
    }

    /// Paths of all text nodes, in document order
    pub fn text_paths(&self) -> Vec<Path> {
        self.descendants()
            .into_iter()
            .filter(|(_, node)| matches!(node, Node::Text(_)))
            .map(|(path, _)| path)
            .collect()
    }

    /// Paths of blocks that hold no blocks (content blocks and void blocks)
    pub fn leaf_block_paths(&self) -> Vec<Path> {
        self.descendants()
            .into_iter()
            .filter(|(_, node)| matches!(node, Node::Block(b) if !b.has_block_children()))
            .map(|(path, _)| path)
            .collect()
    }

    /// Nearest block at or above `path`
    pub fn closest_block(&self, path: &[usize]) -> Option<Path> {
        (1..=path.len())
            .rev()
            .map(|len| &path[..len])
            .find(|p| matches!(self.node(p), Some(Node::Block(_))))
            .map(<[usize]>::to_vec)
    }

    /// Nearest proper ancestor of `path` matching `pred`
    pub fn closest(&self, path: &[usize], pred: impl Fn(&Node) -> bool) -> Option<Path> {
        (1..path.len())
            .rev()
            .map(|len| &path[..len])
            .find(|p| self.node(p).map(&pred).unwrap_or(false))
            .map(<[usize]>::to_vec)
    }

    /// Point at the start of the first text inside the node at `path`
    pub fn start_of(&self, path: &[usize]) -> Option<Point> {
        self.text_paths()
            .into_iter()
            .find(|p| p.starts_with(path))
            .map(|p| Point::new(p, 0))
    }

    /// Point at the end of the last text inside the node at `path`
    pub fn end_of(&self, path: &[usize]) -> Option<Point> {
        let last = self.text_paths().into_iter().rev().find(|p| p.starts_with(path))?;
        let len = self.text(&last)?.len();
        Some(Point::new(last, len))
    }

    /// Collapsed selection at the start of the document
    pub fn start_selection(&self) -> Selection {
        let point = self
            .start_of(&[])
            .unwrap_or_else(|| Point::new(vec![0, 0], 0));
        Selection::collapsed(point)
    }

    /// Collapsed selection at the end of the document
    pub fn end_selection(&self) -> Selection {
        let point = self.end_of(&[]).unwrap_or_else(|| Point::new(vec![0, 0], 0));
        Selection::collapsed(point)
    }

    /// Check that `point` addresses a text node and an offset inside it
    pub fn check_point(&self, point: &Point) -> ModelResult<()> {
        let node = self
            .node(&point.path)
            .ok_or_else(|| ModelError::InvalidPath(point.path.clone()))?;
        let text = node
            .as_text()
            .ok_or_else(|| ModelError::NotText(point.path.clone()))?;
        let len = text.len();
        if point.offset > len {
            return Err(ModelError::OffsetOutOfRange {
                path: point.path.clone(),
                offset: point.offset,
                len,
            });
        }
        Ok(())
    }

    /// Insert `node` as child `index` of the node at `parent`
    pub fn insert(&mut self, parent: &[usize], index: usize, node: Node) -> ModelResult<()> {
        let children = self
            .children_mut(parent)
            .ok_or_else(|| ModelError::InvalidPath(parent.to_vec()))?;
        let index = index.min(children.len());
        children.insert(index, node);
        Ok(())
    }

    /// Remove and return the node at `path`
    pub fn remove(&mut self, path: &[usize]) -> Option<Node> {
        let (last, parent) = path.split_last()?;
        let children = self.children_mut(parent)?;
        if *last < children.len() {
            Some(children.remove(*last))
        } else {
            None
        }
    }

    /// Replace the node at `path`, returning the previous node
    pub fn replace(&mut self, path: &[usize], node: Node) -> Option<Node> {
        let slot = self.node_mut(path)?;
        Some(std::mem::replace(slot, node))
    }

    /// Plain text of the document, one line per top-level block
    pub fn plain_text(&self) -> String {
        self.nodes
            .iter()
            .map(Node::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
