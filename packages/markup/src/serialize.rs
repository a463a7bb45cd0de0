//! # Serializer
//!
//! Tree → HTML. Nodes and marks are rendered through ordered rule tables;
//! the first rule whose predicate matches renders the node. A node that no
//! rule matches renders nothing, together with everything inside it.

use crate::styles::style_attribute;
use compose_model::{Block, BlockType, Document, InlineType, Leaf, Mark, MarkType, Node, Text};
use tracing::{debug, instrument, trace};

/// Renders a block or inline given its already-serialized children
pub struct NodeRule {
    pub name: &'static str,
    pub matches: fn(&Node) -> bool,
    pub render: fn(&Node, &str) -> String,
}

/// Wraps already-serialized leaf content in a mark
pub struct MarkRule {
    pub name: &'static str,
    pub matches: fn(&Mark) -> bool,
    pub render: fn(&Mark, &str) -> String,
}

fn is_block(node: &Node, kind: BlockType) -> bool {
    matches!(node, Node::Block(b) if b.kind == kind)
}

fn is_inline(node: &Node, kind: InlineType) -> bool {
    matches!(node, Node::Inline(i) if i.kind == kind)
}

fn data_value<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    match node {
        Node::Block(b) => b.data_str(key),
        Node::Inline(i) => i.data_str(key),
        Node::Text(_) => None,
    }
}

fn data_str<'a>(node: &'a Node, key: &str) -> &'a str {
    data_value(node, key).unwrap_or_default()
}

pub(crate) fn wrap(tag: &str, children: &str) -> String {
    format!("<{tag}>{children}</{tag}>")
}

pub(crate) fn attr(value: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}

fn render_image(node: &Node, _: &str) -> String {
    let src = attr(data_str(node, "src"));
    match data_value(node, "alt") {
        Some(alt) => format!(r#"<img src="{src}" alt="{}" style="max-width:100%">"#, attr(alt)),
        None => format!(r#"<img src="{src}" style="max-width:100%">"#),
    }
}

/// Block and inline rules, in evaluation order
pub const NODE_RULES: &[NodeRule] = &[
    NodeRule {
        name: "heading-one",
        matches: |n| is_block(n, BlockType::HeadingOne),
        render: |_, c| wrap("h1", c),
    },
    NodeRule {
        name: "heading-two",
        matches: |n| is_block(n, BlockType::HeadingTwo),
        render: |_, c| wrap("h2", c),
    },
    NodeRule {
        name: "paragraph",
        matches: |n| is_block(n, BlockType::Paragraph),
        render: |_, c| wrap("p", c),
    },
    NodeRule {
        name: "numbered-list",
        matches: |n| is_block(n, BlockType::NumberedList),
        render: |_, c| wrap("ol", c),
    },
    NodeRule {
        name: "bulleted-list",
        matches: |n| is_block(n, BlockType::BulletedList),
        render: |_, c| wrap("ul", c),
    },
    NodeRule {
        name: "list-item",
        matches: |n| is_block(n, BlockType::ListItem),
        render: |_, c| wrap("li", c),
    },
    NodeRule {
        name: "link",
        matches: |n| is_inline(n, InlineType::Link),
        render: |n, c| {
            format!(
                r#"<a href="{}" target="_blank">{c}</a>"#,
                attr(data_str(n, "href"))
            )
        },
    },
    NodeRule {
        name: "image",
        matches: |n| is_block(n, BlockType::Image) || is_inline(n, InlineType::Image),
        render: render_image,
    },
    NodeRule {
        name: "attribute",
        matches: |n| is_inline(n, InlineType::Attribute),
        render: |n, _| {
            format!(
                "<attribute>{}</attribute>",
                html_escape::encode_text(data_str(n, "field"))
            )
        },
    },
    NodeRule {
        name: "condition",
        matches: |n| is_block(n, BlockType::Condition),
        render: |_, c| wrap("div", c),
    },
];

/// Mark rules, in evaluation order
pub const MARK_RULES: &[MarkRule] = &[
    MarkRule {
        name: "span",
        matches: |m| m.kind == MarkType::Span,
        render: |m, c| match m.data.get("style").and_then(style_attribute) {
            Some(style) => format!(r#"<span style="{}">{c}</span>"#, attr(&style)),
            None => wrap("span", c),
        },
    },
    MarkRule {
        name: "bold",
        matches: |m| m.kind == MarkType::Bold,
        render: |_, c| wrap("strong", c),
    },
    MarkRule {
        name: "italic",
        matches: |m| m.kind == MarkType::Italic,
        render: |_, c| wrap("em", c),
    },
    MarkRule {
        name: "underlined",
        matches: |m| m.kind == MarkType::Underlined,
        render: |_, c| wrap("u", c),
    },
    MarkRule {
        name: "code",
        matches: |m| m.kind == MarkType::Code,
        render: |_, c| format!("<pre><code>{c}</code></pre>"),
    },
];

/// Serialize a document, one fragment per top-level block
#[instrument(skip(doc), fields(blocks = doc.nodes.len()))]
pub fn serialize_document(doc: &Document) -> Vec<String> {
    doc.nodes.iter().map(serialize_node).collect()
}

/// Serialize a document into a single HTML string
pub fn serialize_html(doc: &Document) -> String {
    serialize_document(doc).concat()
}

/// Serialize a single block as a standalone fragment
pub fn serialize_block(block: &Block) -> String {
    serialize_node(&Node::Block(block.clone()))
}

pub fn serialize_node(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    if let Node::Text(text) = node {
        write_text(text, out);
        return;
    }

    let Some(rule) = NODE_RULES.iter().find(|rule| (rule.matches)(node)) else {
        debug!(node_type = node.kind_name(), "no serializer rule, dropping node");
        return;
    };
    trace!(rule = rule.name, "serializing node");

    let mut children = String::new();
    if !node.is_void() {
        for child in node.nodes().unwrap_or_default() {
            write_node(child, &mut children);
        }
    }
    out.push_str(&(rule.render)(node, &children));
}

fn write_text(text: &Text, out: &mut String) {
    for leaf in &text.leaves {
        if let Some(html) = serialize_leaf(leaf) {
            out.push_str(&html);
        }
    }
}

/// Serialize a leaf; the first mark ends up innermost.
fn serialize_leaf(leaf: &Leaf) -> Option<String> {
    let mut html = leaf
        .text
        .split('\n')
        .map(|line| html_escape::encode_text(line).into_owned())
        .collect::<Vec<_>>()
        .join("<br>");

    for mark in &leaf.marks {
        let Some(rule) = MARK_RULES.iter().find(|rule| (rule.matches)(mark)) else {
            debug!(mark_type = mark.kind.as_str(), "no serializer rule, dropping text");
            return None;
        };
        trace!(rule = rule.name, "applying mark");
        html = (rule.render)(mark, &html);
    }
    Some(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_model::Inline;
    use serde_json::json;

    fn para(nodes: Vec<Node>) -> Node {
        Node::Block(Block::with_nodes(BlockType::Paragraph, nodes))
    }

    fn marked(text: &str, marks: Vec<Mark>) -> Node {
        Node::Text(Text::with_marks(text, marks))
    }

    #[test]
    fn test_serialize_blocks() {
        let doc = Document::from_blocks(vec![
            Block::with_nodes(BlockType::HeadingOne, vec![Node::text("Title")]),
            Block::paragraph("Body"),
            Block::with_nodes(
                BlockType::NumberedList,
                vec![Node::Block(Block::with_nodes(BlockType::ListItem, vec![Node::text("one")]))],
            ),
        ]);

        assert_eq!(
            serialize_document(&doc),
            vec!["<h1>Title</h1>", "<p>Body</p>", "<ol><li>one</li></ol>"]
        );
    }

    #[test]
    fn test_serialize_inlines() {
        let node = para(vec![
            Node::text("Hi "),
            Node::Inline(Inline::attribute("first_name")),
            Node::text(", see "),
            Node::Inline(Inline::link("http://x.io?a=1&b=2", "here")),
            Node::text(""),
        ]);

        assert_eq!(
            serialize_node(&node),
            r#"<p>Hi <attribute>first_name</attribute>, see <a href="http://x.io?a=1&amp;b=2" target="_blank">here</a></p>"#
        );
    }

    #[test]
    fn test_serialize_image() {
        let with_alt = serialize_block(&Block::image("a.png", Some("logo".into())));
        assert_eq!(with_alt, r#"<img src="a.png" alt="logo" style="max-width:100%">"#);

        let without_alt = serialize_block(&Block::image("a.png", None));
        assert_eq!(without_alt, r#"<img src="a.png" style="max-width:100%">"#);
    }

    #[test]
    fn test_condition_drops_metadata() {
        let mut block = Block::condition("Passed", 1);
        block.nodes = vec![Node::text("Well done")];

        assert_eq!(serialize_block(&block), "<div>Well done</div>");
    }

    #[test]
    fn test_first_mark_is_innermost() {
        let node = para(vec![marked(
            "x",
            vec![Mark::new(MarkType::Bold), Mark::new(MarkType::Italic)],
        )]);
        assert_eq!(serialize_node(&node), "<p><em><strong>x</strong></em></p>");
    }

    #[test]
    fn test_span_style_is_kebab_cased() {
        let mut data = compose_model::Data::new();
        data.insert("style".into(), json!({ "color": "red", "fontSize": "20px" }));
        let node = para(vec![marked("x", vec![Mark::new(MarkType::Span).with_data(data)])]);

        assert_eq!(
            serialize_node(&node),
            r#"<p><span style="color:red;font-size:20px">x</span></p>"#
        );
    }

    #[test]
    fn test_span_style_string_is_parsed() {
        let cases = [
            ("color: red; bogus; font-size:", r#"<span style="color:red">x</span>"#),
            ("background-color:#fff", r#"<span style="background-color:#fff">x</span>"#),
            ("bogus", "<span>x</span>"),
        ];

        for (style, expected) in cases {
            let mut data = compose_model::Data::new();
            data.insert("style".into(), json!(style));
            let node = para(vec![marked("x", vec![Mark::new(MarkType::Span).with_data(data)])]);
            assert_eq!(serialize_node(&node), format!("<p>{expected}</p>"), "{style}");
        }
    }

    #[test]
    fn test_code_mark_and_line_breaks() {
        let node = para(vec![
            Node::text("a\nb "),
            marked("let x;", vec![Mark::new(MarkType::Code)]),
        ]);
        assert_eq!(
            serialize_node(&node),
            "<p>a<br>b <pre><code>let x;</code></pre></p>"
        );
    }

    #[test]
    fn test_unmapped_types_are_dropped() {
        let doc = Document::from_blocks(vec![
            Block::paragraph("before"),
            Block::with_nodes("table", vec![Node::text("cell")]),
            Block::with_nodes(BlockType::HeadingThree, vec![Node::text("small")]),
            Block::with_nodes(
                BlockType::Paragraph,
                vec![
                    Node::text("kept "),
                    marked("struck", vec![Mark::new(MarkType::Strikethrough)]),
                ],
            ),
        ]);

        assert_eq!(
            serialize_document(&doc),
            vec!["<p>before</p>", "", "", "<p>kept </p>"]
        );
        assert_eq!(serialize_html(&doc), "<p>before</p><p>kept </p>");
    }

    #[test]
    fn test_text_is_escaped() {
        let node = para(vec![Node::text("1 < 2 & 3")]);
        assert_eq!(serialize_node(&node), "<p>1 &lt; 2 &amp; 3</p>");
    }
}
