//! # Normalization
//!
//! Canonical shape rules applied to parsed fragments and to blocks touched by
//! editing commands:
//!
//! - the document holds at least one block
//! - top-level text/inline runs are wrapped in a `paragraph`
//! - bare top-level `list-item` runs are wrapped in a `bulleted-list`
//! - a block holds either blocks or inline content, never both
//! - inline content starts and ends with a text node, with a text node between
//!   any two inlines, and no two adjacent text nodes
//! - void nodes have no children

use crate::node::{Block, BlockType, Inline, InlineType, Node, Text};

/// Normalize the top-level nodes of a document
pub fn normalize_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut inline_run = Vec::new();
    let mut item_run = Vec::new();

    for node in nodes {
        match node {
            Node::Block(block) if block.kind == BlockType::ListItem => {
                flush_inline_run(&mut inline_run, &mut out);
                item_run.push(Node::Block(normalize_block(block)));
            }
            Node::Block(block) => {
                flush_inline_run(&mut inline_run, &mut out);
                flush_item_run(&mut item_run, &mut out);
                out.push(Node::Block(normalize_block(block)));
            }
            other => {
                flush_item_run(&mut item_run, &mut out);
                inline_run.push(other);
            }
        }
    }
    flush_inline_run(&mut inline_run, &mut out);
    flush_item_run(&mut item_run, &mut out);

    if out.is_empty() {
        out.push(Node::Block(Block::new(BlockType::Paragraph)));
    }
    out
}

fn flush_inline_run(run: &mut Vec<Node>, out: &mut Vec<Node>) {
    if run.is_empty() {
        return;
    }
    let nodes = std::mem::take(run);
    if nodes.iter().all(|n| matches!(n, Node::Text(t) if t.is_empty())) {
        return;
    }
    out.push(Node::Block(Block::with_nodes(
        BlockType::Paragraph,
        normalize_inline_children(nodes),
    )));
}

fn flush_item_run(run: &mut Vec<Node>, out: &mut Vec<Node>) {
    if run.is_empty() {
        return;
    }
    out.push(Node::Block(Block::with_nodes(
        BlockType::BulletedList,
        std::mem::take(run),
    )));
}

/// Normalize a block and its subtree
pub fn normalize_block(mut block: Block) -> Block {
    if block.is_void() {
        block.nodes.clear();
        return block;
    }

    let nodes = std::mem::take(&mut block.nodes);
    block.nodes = if nodes.iter().any(|n| matches!(n, Node::Block(b) if !b.is_void())) {
        normalize_block_children(nodes)
    } else {
        normalize_inline_children(nodes)
    };
    block
}

fn normalize_block_children(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::new();
    let mut run = Vec::new();
    for node in nodes {
        match node {
            Node::Block(block) => {
                flush_inline_run(&mut run, &mut out);
                out.push(Node::Block(normalize_block(block)));
            }
            other => run.push(other),
        }
    }
    flush_inline_run(&mut run, &mut out);
    out
}

/// Normalize the inline content of a leaf block or non-void inline
pub fn normalize_inline_children(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len() + 2);
    push_inline_content(nodes, &mut out);
    if !matches!(out.last(), Some(Node::Text(_))) {
        out.push(Node::Text(Text::empty()));
    }
    out
}

fn push_inline_content(nodes: Vec<Node>, out: &mut Vec<Node>) {
    for node in nodes {
        match node {
            Node::Text(text) => match out.last_mut() {
                Some(Node::Text(prev)) => {
                    let merged = std::mem::replace(prev, Text::empty()).concat(text);
                    *prev = merged;
                }
                _ => out.push(Node::Text(text.normalized())),
            },
            // A non-void inline with no characters left disappears
            Node::Inline(inline)
                if !inline.is_void()
                    && inline
                        .nodes
                        .iter()
                        .all(|n| matches!(n, Node::Text(t) if t.is_empty())) => {}
            Node::Inline(inline) => {
                if !matches!(out.last(), Some(Node::Text(_))) {
                    out.push(Node::Text(Text::empty()));
                }
                out.push(Node::Inline(normalize_inline(inline)));
            }
            // An image block among inline content becomes an inline image
            Node::Block(block) if block.kind == BlockType::Image => {
                push_inline_content(
                    vec![Node::Inline(Inline::new(InlineType::Image, block.data))],
                    out,
                );
            }
            // Any other block nested in inline content contributes its content
            Node::Block(block) => push_inline_content(block.nodes, out),
        }
    }
}

fn normalize_inline(mut inline: Inline) -> Inline {
    if inline.is_void() {
        inline.nodes.clear();
    } else {
        let nodes = std::mem::take(&mut inline.nodes);
        inline.nodes = normalize_inline_children(nodes);
    }
    inline
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_link_is_dropped() {
        let nodes = normalize_inline_children(vec![
            Node::text("a"),
            Node::Inline(Inline::link("x.io", "")),
            Node::text("b"),
        ]);
        assert_eq!(nodes, vec![Node::text("ab")]);
    }

    #[test]
    fn test_empty_input_yields_empty_paragraph() {
        let nodes = normalize_nodes(vec![]);
        assert_eq!(nodes, vec![Node::Block(Block::new(BlockType::Paragraph))]);
    }

    #[test]
    fn test_top_level_text_is_wrapped_in_paragraph() {
        let nodes = normalize_nodes(vec![Node::text("hello"), Node::text(" world")]);

        assert_eq!(nodes.len(), 1);
        let block = nodes[0].as_block().unwrap();
        assert_eq!(block.kind, BlockType::Paragraph);
        assert_eq!(block.nodes, vec![Node::text("hello world")]);
    }

    #[test]
    fn test_bare_list_items_are_wrapped() {
        let nodes = normalize_nodes(vec![
            Node::Block(Block::with_nodes(BlockType::ListItem, vec![Node::text("a")])),
            Node::Block(Block::with_nodes(BlockType::ListItem, vec![Node::text("b")])),
            Node::Block(Block::paragraph("c")),
        ]);

        assert_eq!(nodes.len(), 2);
        let list = nodes[0].as_block().unwrap();
        assert_eq!(list.kind, BlockType::BulletedList);
        assert_eq!(list.nodes.len(), 2);
    }

    #[test]
    fn test_inlines_are_surrounded_by_text() {
        let block = normalize_block(Block::with_nodes(
            BlockType::Paragraph,
            vec![
                Node::Inline(Inline::attribute("a")),
                Node::Inline(Inline::attribute("b")),
            ],
        ));

        let kinds: Vec<_> = block.nodes.iter().map(Node::kind_name).collect();
        assert_eq!(kinds, vec!["text", "attribute", "text", "attribute", "text"]);
    }

    #[test]
    fn test_image_block_in_inline_content_becomes_inline() {
        let block = normalize_block(Block::with_nodes(
            BlockType::Paragraph,
            vec![Node::text("see "), Node::Block(Block::image("a.png", None))],
        ));

        let kinds: Vec<_> = block.nodes.iter().map(Node::kind_name).collect();
        assert_eq!(kinds, vec!["text", "image", "text"]);
        assert!(matches!(&block.nodes[1], Node::Inline(i) if i.data_str("src") == Some("a.png")));
    }

    #[test]
    fn test_mixed_content_wraps_inline_runs() {
        let block = normalize_block(Block::with_nodes(
            BlockType::ListItem,
            vec![Node::text("lead"), Node::Block(Block::paragraph("inner"))],
        ));

        assert_eq!(block.nodes.len(), 2);
        assert!(block.nodes.iter().all(Node::is_block));
    }
}
