//! Tree surgery shared by the editing commands.
//!
//! Everything here mutates a document the caller already owns; commands
//! clone the input tree first, so the document they were given is never
//! touched.

use crate::commands::CommandError;
use compose_model::{
    normalize_block, normalize_inline_children, Block, BlockType, Document, Inline, Node, Path,
    Point, Selection, Text,
};

/// Leaf blocks covered by the selection, in document order
pub fn selected_blocks(doc: &Document, selection: &Selection) -> Vec<Path> {
    let (Some(first), Some(last)) = (
        doc.closest_block(&selection.start().path),
        doc.closest_block(&selection.end().path),
    ) else {
        return Vec::new();
    };
    doc.leaf_block_paths()
        .into_iter()
        .filter(|path| *path >= first && *path <= last)
        .collect()
}

/// Path of the leaf block holding `point`
pub fn block_of(doc: &Document, point: &Point) -> Result<Path, CommandError> {
    doc.closest_block(&point.path)
        .ok_or_else(|| CommandError::InvalidPoint(format!("{:?} is not inside a block", point.path)))
}

/// Selection expressed as text ordinals, stable across changes that only
/// move text nodes between containers
#[derive(Debug, Clone)]
pub struct SelectionMarker {
    anchor: (usize, usize),
    focus: (usize, usize),
    selection: Selection,
}

impl SelectionMarker {
    pub fn capture(doc: &Document, selection: &Selection) -> Self {
        let texts = doc.text_paths();
        let ordinal = |point: &Point| {
            let index = texts.iter().position(|p| *p == point.path).unwrap_or(0);
            (index, point.offset)
        };
        Self {
            anchor: ordinal(&selection.anchor),
            focus: ordinal(&selection.focus),
            selection: selection.clone(),
        }
    }

    pub fn restore(&self, doc: &Document) -> Selection {
        let texts = doc.text_paths();
        let point = |(index, offset): (usize, usize)| match texts.get(index).or(texts.last()) {
            Some(path) => Point::new(path.clone(), offset),
            None => Point::new(vec![0, 0], 0),
        };
        Selection {
            anchor: point(self.anchor),
            focus: point(self.focus),
            marks: self.selection.marks.clone(),
        }
    }
}

/// Set the type of each non-void block in `paths`
pub fn set_blocks(doc: &mut Document, paths: &[Path], kind: &BlockType) {
    for path in paths {
        if let Some(block) = doc.block_mut(path) {
            if block.is_void() {
                continue;
            }
            block.kind = kind.clone();
            block.is_void = kind.is_void();
        }
    }
}

/// Wrap the selected blocks in a new block of `kind`.
///
/// The wrapper is inserted under the deepest common ancestor of the
/// selected blocks and takes the contiguous run of that ancestor's children
/// that contain them.
pub fn wrap_blocks(doc: &mut Document, selection: &Selection, kind: &BlockType) {
    let selected = selected_blocks(doc, selection);
    let (Some(first), Some(last)) = (selected.first(), selected.last()) else {
        return;
    };

    let common: Path = if selected.len() == 1 {
        first[..first.len() - 1].to_vec()
    } else {
        first
            .iter()
            .zip(last.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect()
    };
    let depth = common.len();
    let (start, end) = (first[depth], last[depth]);

    let Some(children) = doc.children_mut(&common) else {
        return;
    };
    let wrapped: Vec<Node> = children.drain(start..=end).collect();
    children.insert(start, Node::Block(Block::with_nodes(kind.clone(), wrapped)));
}

/// Lift the selected blocks out of their nearest ancestors of `kind`,
/// splitting each ancestor around the lifted children.
pub fn unwrap_blocks(doc: &mut Document, selection: &Selection, kind: &BlockType) {
    let marker = SelectionMarker::capture(doc, selection);

    let mut ancestors: Vec<Path> = selected_blocks(doc, selection)
        .iter()
        .filter_map(|path| doc.closest(path, |node| matches!(node, Node::Block(b) if b.kind == *kind)))
        .collect();
    ancestors.sort();
    ancestors.dedup();

    // Deepest and last first, so the remaining ancestor paths stay valid
    for ancestor in ancestors.into_iter().rev() {
        let current = marker.restore(doc);
        let selected = selected_blocks(doc, &current);
        unwrap_ancestor(doc, &ancestor, &selected);
    }
}

fn unwrap_ancestor(doc: &mut Document, ancestor: &[usize], selected: &[Path]) {
    let depth = ancestor.len();
    let indices: Vec<usize> = selected
        .iter()
        .filter(|path| path.len() > depth && path.starts_with(ancestor))
        .map(|path| path[depth])
        .collect();
    let (Some(&first), Some(&last)) = (indices.iter().min(), indices.iter().max()) else {
        return;
    };
    let Some(Node::Block(block)) = doc.node(ancestor).cloned() else {
        return;
    };

    let mut before = block.nodes.clone();
    let after = before.split_off(last + 1);
    let lifted = before.split_off(first);

    let mut replacement = Vec::with_capacity(lifted.len() + 2);
    if !before.is_empty() {
        replacement.push(Node::Block(Block {
            nodes: before,
            ..block.clone()
        }));
    }
    replacement.extend(lifted);
    if !after.is_empty() {
        replacement.push(Node::Block(Block {
            nodes: after,
            ..block
        }));
    }
    splice(doc, ancestor, replacement);
}

/// Replace the node at `path` with `replacement`
pub fn splice(doc: &mut Document, path: &[usize], replacement: Vec<Node>) {
    let Some((&index, parent)) = path.split_last() else {
        return;
    };
    if let Some(children) = doc.children_mut(parent) {
        if index < children.len() {
            children.splice(index..=index, replacement);
        }
    }
}

/// Split inline content at the text addressed by `rel` (relative to
/// `nodes`), splitting any inline on the way
pub fn split_nodes(nodes: &[Node], rel: &[usize], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let Some((&index, rest)) = rel.split_first() else {
        return (nodes.to_vec(), Vec::new());
    };
    let index = index.min(nodes.len());

    let mut left: Vec<Node> = nodes[..index].to_vec();
    let mut right: Vec<Node> = Vec::new();
    match nodes.get(index) {
        Some(Node::Text(text)) => {
            let (l, r) = text.split_at(offset);
            left.push(Node::Text(l));
            right.push(Node::Text(r));
        }
        Some(Node::Inline(inline)) => {
            let (l, r) = split_nodes(&inline.nodes, rest, offset);
            left.push(Node::Inline(Inline {
                nodes: l,
                ..inline.clone()
            }));
            right.push(Node::Inline(Inline {
                nodes: r,
                ..inline.clone()
            }));
        }
        Some(Node::Block(block)) => {
            let (l, r) = split_nodes(&block.nodes, rest, offset);
            left.push(Node::Block(Block {
                nodes: l,
                ..block.clone()
            }));
            right.push(Node::Block(Block {
                nodes: r,
                ..block.clone()
            }));
        }
        None => {}
    }
    right.extend(nodes.iter().skip(index + 1).cloned());
    (left, right)
}

/// Split the leaf block at `block_path` at `point` into two blocks of the
/// same type and data
pub fn split_block_at(doc: &mut Document, block_path: &[usize], point: &Point) -> Result<(), CommandError> {
    let block = doc
        .block(block_path)
        .cloned()
        .ok_or_else(|| CommandError::BlockNotFound(block_path.to_vec()))?;

    let rel = &point.path[block_path.len()..];
    let (left, right) = split_nodes(&block.nodes, rel, point.offset);
    let first = Block {
        nodes: normalize_inline_children(left),
        ..block.clone()
    };
    let second = Block {
        nodes: normalize_inline_children(right),
        ..block
    };
    splice(doc, block_path, vec![Node::Block(first), Node::Block(second)]);
    Ok(())
}

/// Work out where a block inserted at `point` goes, splitting the current
/// block when the point is in the middle of its text.
///
/// Returns the parent path and child index for the new block.
pub fn prepare_block_insertion(doc: &mut Document, point: &Point) -> Result<(Path, usize), CommandError> {
    let block_path = block_of(doc, point)?;
    let Some((&index, parent)) = block_path.split_last() else {
        return Err(CommandError::BlockNotFound(block_path));
    };
    let parent = parent.to_vec();

    let block = doc
        .block(&block_path)
        .ok_or_else(|| CommandError::BlockNotFound(block_path.clone()))?;

    if block.is_empty() {
        return Ok((parent, index + 1));
    }
    if doc.start_of(&block_path).as_ref() == Some(point) {
        return Ok((parent, index));
    }
    if doc.end_of(&block_path).as_ref() == Some(point) {
        return Ok((parent, index + 1));
    }

    split_block_at(doc, &block_path, point)?;
    Ok((parent, index + 1))
}

/// Insert `block` as child `index` of `parent` and return its path
pub fn insert_block_at(doc: &mut Document, parent: &[usize], index: usize, block: Block) -> Result<Path, CommandError> {
    doc.insert(parent, index, Node::Block(normalize_block(block)))
        .map_err(|e| CommandError::InvalidPoint(e.to_string()))?;
    let mut path = parent.to_vec();
    path.push(index);
    Ok(path)
}

/// Start of the first text after the subtree at `path`
pub fn first_text_after(doc: &Document, path: &[usize]) -> Option<Point> {
    doc.text_paths()
        .into_iter()
        .find(|p| p.as_slice() > path && !p.starts_with(path))
        .map(|p| Point::new(p, 0))
}

/// End of the last text before the subtree at `path`
pub fn last_text_before(doc: &Document, path: &[usize]) -> Option<Point> {
    let last = doc
        .text_paths()
        .into_iter()
        .rev()
        .find(|p| p.as_slice() < path)?;
    let len = doc.text(&last)?.len();
    Some(Point::new(last, len))
}

/// Point `offset` characters into the block at `block_path`, preferring the
/// earlier text where two texts meet
pub fn point_in_block(doc: &Document, block_path: &[usize], offset: usize) -> Option<Point> {
    let mut remaining = offset;
    for path in doc.text_paths().into_iter().filter(|p| p.starts_with(block_path)) {
        let len = doc.text(&path).map(Text::len).unwrap_or(0);
        if remaining <= len {
            return Some(Point::new(path, remaining));
        }
        remaining -= len;
    }
    doc.end_of(block_path)
}

/// Characters in a node list
pub fn char_count(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Text(text) => text.len(),
            other => other.nodes().map(char_count).unwrap_or(0),
        })
        .sum()
}

/// Delete the selected content and return the collapsed selection where it
/// was. A collapsed selection is returned unchanged.
pub fn delete_range(doc: &mut Document, selection: &Selection) -> Result<Selection, CommandError> {
    if selection.is_collapsed() {
        return Ok(selection.clone());
    }
    let (start, end) = (selection.start().clone(), selection.end().clone());
    let start_block = block_of(doc, &start)?;
    let end_block = block_of(doc, &end)?;

    let first = doc
        .block(&start_block)
        .cloned()
        .ok_or_else(|| CommandError::BlockNotFound(start_block.clone()))?;
    let (left, _) = split_nodes(&first.nodes, &start.path[start_block.len()..], start.offset);

    let right = if start_block == end_block {
        split_nodes(&first.nodes, &end.path[end_block.len()..], end.offset).1
    } else {
        let last = doc
            .block(&end_block)
            .cloned()
            .ok_or_else(|| CommandError::BlockNotFound(end_block.clone()))?;
        let (_, right) = split_nodes(&last.nodes, &end.path[end_block.len()..], end.offset);

        let doomed: Vec<Path> = doc
            .leaf_block_paths()
            .into_iter()
            .filter(|p| *p > start_block && *p <= end_block)
            .collect();
        for path in doomed.iter().rev() {
            remove_and_prune(doc, path);
        }
        right
    };

    let offset = char_count(&left);
    if let Some(block) = doc.block_mut(&start_block) {
        let mut nodes = left;
        nodes.extend(right);
        block.nodes = normalize_inline_children(nodes);
    }

    let point = point_in_block(doc, &start_block, offset)
        .ok_or_else(|| CommandError::BlockNotFound(start_block.clone()))?;
    Ok(Selection::collapsed(point))
}

/// Remove the node at `path`, then any container left without children
fn remove_and_prune(doc: &mut Document, path: &[usize]) {
    doc.remove(path);
    let mut parent = path[..path.len() - 1].to_vec();
    while !parent.is_empty() {
        let emptied = doc
            .children(&parent)
            .map(|children| children.is_empty())
            .unwrap_or(false);
        if !emptied {
            break;
        }
        doc.remove(&parent);
        parent.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_model::{Mark, MarkType};

    fn doc(blocks: Vec<Block>) -> Document {
        Document::from_blocks(blocks)
    }

    fn list(kind: BlockType, items: &[&str]) -> Block {
        Block::with_nodes(
            kind,
            items
                .iter()
                .map(|t| Node::Block(Block::with_nodes(BlockType::ListItem, vec![Node::text(*t)])))
                .collect(),
        )
    }

    fn range(a: Path, a_off: usize, b: Path, b_off: usize) -> Selection {
        Selection::new(Point::new(a, a_off), Point::new(b, b_off))
    }

    #[test]
    fn test_selected_blocks_spans_containers() {
        let d = doc(vec![
            Block::paragraph("a"),
            list(BlockType::BulletedList, &["b", "c"]),
            Block::paragraph("d"),
        ]);
        let sel = range(vec![0, 0], 0, vec![1, 1, 0], 1);

        assert_eq!(selected_blocks(&d, &sel), vec![vec![0], vec![1, 0], vec![1, 1]]);
    }

    #[test]
    fn test_wrap_single_block() {
        let mut d = doc(vec![Block::paragraph("a"), Block::paragraph("b")]);
        wrap_blocks(&mut d, &Selection::collapsed(Point::new(vec![1, 0], 0)), &BlockType::Quote);

        assert_eq!(d.nodes.len(), 2);
        let quote = d.block(&[1]).unwrap();
        assert_eq!(quote.kind, BlockType::Quote);
        assert_eq!(quote.nodes.len(), 1);
    }

    #[test]
    fn test_unwrap_middle_item_splits_list() {
        let mut d = doc(vec![list(BlockType::BulletedList, &["a", "b", "c"])]);
        let sel = Selection::collapsed(Point::new(vec![0, 1, 0], 0));
        unwrap_blocks(&mut d, &sel, &BlockType::BulletedList);

        let kinds: Vec<_> = d.nodes.iter().map(Node::kind_name).collect();
        assert_eq!(kinds, vec!["bulleted-list", "list-item", "bulleted-list"]);
        assert_eq!(d.plain_text(), "a\nb\nc");
    }

    #[test]
    fn test_selection_marker_survives_wrap() {
        let mut d = doc(vec![Block::paragraph("hello"), Block::paragraph("world")]);
        let sel = range(vec![0, 0], 2, vec![1, 0], 3);
        let marker = SelectionMarker::capture(&d, &sel);

        wrap_blocks(&mut d, &sel, &BlockType::BulletedList);
        let restored = marker.restore(&d);

        assert_eq!(restored.anchor, Point::new(vec![0, 0, 0], 2));
        assert_eq!(restored.focus, Point::new(vec![0, 1, 0], 3));
    }

    #[test]
    fn test_split_nodes_through_inline() {
        let nodes = vec![
            Node::text("a"),
            Node::Inline(Inline::link("x.io", "link")),
            Node::text("b"),
        ];
        let (left, right) = split_nodes(&nodes, &[1, 0], 2);

        assert_eq!(char_count(&left), 3);
        assert_eq!(char_count(&right), 3);
        assert_eq!(left[1].plain_text(), "li");
        assert_eq!(right[0].plain_text(), "nk");
    }

    #[test]
    fn test_prepare_block_insertion_positions() {
        let mut d = doc(vec![Block::paragraph("hello")]);

        assert_eq!(prepare_block_insertion(&mut d, &Point::new(vec![0, 0], 0)).unwrap(), (vec![], 0));
        assert_eq!(prepare_block_insertion(&mut d, &Point::new(vec![0, 0], 5)).unwrap(), (vec![], 1));

        assert_eq!(prepare_block_insertion(&mut d, &Point::new(vec![0, 0], 2)).unwrap(), (vec![], 1));
        assert_eq!(d.plain_text(), "he\nllo");
    }

    #[test]
    fn test_delete_within_block_keeps_marks() {
        let mut d = doc(vec![Block::with_nodes(
            BlockType::Paragraph,
            vec![Node::Text(Text::with_marks("bold text", vec![Mark::new(MarkType::Bold)]))],
        )]);
        let sel = delete_range(&mut d, &range(vec![0, 0], 2, vec![0, 0], 7)).unwrap();

        assert_eq!(d.plain_text(), "boxt");
        assert_eq!(sel, Selection::collapsed(Point::new(vec![0, 0], 2)));
        assert!(d.text(&[0, 0]).unwrap().has_mark_in(0, 4, &MarkType::Bold));
    }

    #[test]
    fn test_delete_across_blocks_prunes_containers() {
        let mut d = doc(vec![
            Block::paragraph("first"),
            list(BlockType::BulletedList, &["one", "two"]),
            Block::paragraph("last"),
        ]);
        let sel = delete_range(&mut d, &range(vec![0, 0], 3, vec![2, 0], 2)).unwrap();

        assert_eq!(d.nodes.len(), 1);
        assert_eq!(d.plain_text(), "first");
        assert_eq!(sel.anchor, Point::new(vec![0, 0], 3));
    }

    #[test]
    fn test_delete_across_blocks_into_list() {
        let mut d = doc(vec![
            Block::paragraph("intro"),
            list(BlockType::BulletedList, &["one", "two"]),
        ]);
        delete_range(&mut d, &range(vec![0, 0], 2, vec![1, 0, 0], 1)).unwrap();

        assert_eq!(d.plain_text(), "inne\ntwo");
        let kinds: Vec<_> = d.nodes.iter().map(Node::kind_name).collect();
        assert_eq!(kinds, vec!["paragraph", "bulleted-list"]);
    }
}
