//! Key press interception
//!
//! Enter outside a list item forces a new paragraph, shift+Enter is a soft
//! break, and a fixed set of mod-chords toggle marks. Everything else is
//! left to the default handling of the session.

use crate::commands::Command;
use compose_model::{Block, BlockType, Document, Mark, MarkType, Node, Selection};
use serde::{Deserialize, Serialize};

/// A key press with its modifier state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: String,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// Key chord such as `mod+b`, where `mod` is ctrl or meta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    key: String,
    modifier: bool,
    shift: bool,
    alt: bool,
}

impl Hotkey {
    pub fn parse(chord: &str) -> Self {
        let mut hotkey = Hotkey {
            key: String::new(),
            modifier: false,
            shift: false,
            alt: false,
        };
        for part in chord.split('+') {
            match part.to_ascii_lowercase().as_str() {
                "mod" | "ctrl" | "cmd" | "meta" => hotkey.modifier = true,
                "shift" => hotkey.shift = true,
                "alt" | "option" => hotkey.alt = true,
                _ => hotkey.key = part.to_ascii_lowercase(),
            }
        }
        hotkey
    }

    pub fn matches(&self, press: &KeyPress) -> bool {
        press.key.to_ascii_lowercase() == self.key
            && (press.ctrl || press.meta) == self.modifier
            && press.shift == self.shift
            && press.alt == self.alt
    }
}

/// Mark toggled by each hotkey
pub const MARK_HOTKEYS: &[(&str, MarkType)] = &[
    ("mod+b", MarkType::Bold),
    ("mod+i", MarkType::Italic),
    ("mod+u", MarkType::Underlined),
    ("mod+`", MarkType::Code),
];

/// What the session should do with a key press
#[derive(Debug, Clone, PartialEq)]
pub enum KeyAction {
    /// Consume the key and run the command
    Apply(Command),

    /// Let the default handling run
    Passthrough,
}

/// Decide how a key press is handled at the current selection
pub fn on_key_down(doc: &Document, selection: &Selection, press: &KeyPress) -> KeyAction {
    if press.key == "Enter" {
        if press.shift {
            return KeyAction::Apply(Command::InsertText { text: "\n".into() });
        }
        if in_list_item(doc, selection) {
            return KeyAction::Passthrough;
        }
        return KeyAction::Apply(Command::InsertBlock {
            block: Block::new(BlockType::Paragraph),
        });
    }

    MARK_HOTKEYS
        .iter()
        .find(|(chord, _)| Hotkey::parse(chord).matches(press))
        .map(|(_, kind)| {
            KeyAction::Apply(Command::ToggleMark {
                mark: Mark::new(kind.clone()),
            })
        })
        .unwrap_or(KeyAction::Passthrough)
}

fn in_list_item(doc: &Document, selection: &Selection) -> bool {
    doc.closest_block(&selection.start().path)
        .and_then(|path| doc.node(&path))
        .map(|node| matches!(node, Node::Block(b) if b.kind == BlockType::ListItem))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_model::Point;

    fn caret(path: Vec<usize>) -> Selection {
        Selection::collapsed(Point::new(path, 0))
    }

    #[test]
    fn test_enter_in_paragraph_inserts_paragraph() {
        let doc = Document::from_blocks(vec![Block::paragraph("a")]);
        let action = on_key_down(&doc, &caret(vec![0, 0]), &KeyPress::new("Enter"));

        assert_eq!(
            action,
            KeyAction::Apply(Command::InsertBlock {
                block: Block::new(BlockType::Paragraph)
            })
        );
    }

    #[test]
    fn test_enter_in_list_item_passes_through() {
        let doc = Document::from_blocks(vec![Block::with_nodes(
            BlockType::BulletedList,
            vec![Node::Block(Block::with_nodes(BlockType::ListItem, vec![Node::text("x")]))],
        )]);
        let action = on_key_down(&doc, &caret(vec![0, 0, 0]), &KeyPress::new("Enter"));

        assert_eq!(action, KeyAction::Passthrough);
    }

    #[test]
    fn test_shift_enter_is_soft_break() {
        let doc = Document::from_blocks(vec![Block::paragraph("a")]);
        let action = on_key_down(&doc, &caret(vec![0, 0]), &KeyPress::new("Enter").shift());

        assert_eq!(action, KeyAction::Apply(Command::InsertText { text: "\n".into() }));
    }

    #[test]
    fn test_mod_chords_toggle_marks() {
        let doc = Document::empty();
        let sel = caret(vec![0, 0]);

        for (key, kind) in [("b", MarkType::Bold), ("i", MarkType::Italic), ("u", MarkType::Underlined), ("`", MarkType::Code)] {
            let expected = KeyAction::Apply(Command::ToggleMark { mark: Mark::new(kind) });
            assert_eq!(on_key_down(&doc, &sel, &KeyPress::new(key).ctrl()), expected);
            assert_eq!(on_key_down(&doc, &sel, &KeyPress::new(key).meta()), expected);
        }
    }

    #[test]
    fn test_plain_and_extra_modifier_keys_pass_through() {
        let doc = Document::empty();
        let sel = caret(vec![0, 0]);

        assert_eq!(on_key_down(&doc, &sel, &KeyPress::new("b")), KeyAction::Passthrough);
        assert_eq!(on_key_down(&doc, &sel, &KeyPress::new("b").ctrl().shift()), KeyAction::Passthrough);
        assert_eq!(on_key_down(&doc, &sel, &KeyPress::new("k").ctrl()), KeyAction::Passthrough);
    }

    #[test]
    fn test_hotkey_parse() {
        let hotkey = Hotkey::parse("mod+shift+X");
        assert!(hotkey.matches(&KeyPress::new("x").meta().shift()));
        assert!(!hotkey.matches(&KeyPress::new("x").meta()));
    }
}
