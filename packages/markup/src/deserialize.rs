//! # Deserializer
//!
//! HTML → tree. Each element is offered to [`ELEMENT_RULES`] in order and the
//! first rule that produces nodes wins. Elements no rule accepts are dropped
//! together with their subtree, and whitespace-only text is dropped. The
//! result is normalized, so it is always a valid document body.

use crate::dom::{parse_fragment, DomNode, Element};
use crate::styles::parse_style;
use compose_model::{
    normalize_nodes, Block, BlockType, Data, Document, Inline, InlineType, Mark, MarkType, Node,
};
use serde_json::Value;
use tracing::{debug, instrument, trace};

/// Turns an element into nodes, or declines it with `None`
pub struct ElementRule {
    pub name: &'static str,
    pub deserialize: fn(&Element) -> Option<Vec<Node>>,
}

/// Element rules, in evaluation order
pub const ELEMENT_RULES: &[ElementRule] = &[
    ElementRule {
        name: "pre",
        deserialize: deserialize_pre,
    },
    ElementRule {
        name: "img",
        deserialize: deserialize_img,
    },
    ElementRule {
        name: "a",
        deserialize: deserialize_link,
    },
    ElementRule {
        name: "attribute",
        deserialize: deserialize_attribute,
    },
    ElementRule {
        name: "br",
        deserialize: |el| (el.name == "br").then(|| vec![Node::text("\n")]),
    },
    ElementRule {
        name: "block",
        deserialize: deserialize_block,
    },
    ElementRule {
        name: "mark",
        deserialize: deserialize_mark,
    },
];

pub fn block_for_tag(tag: &str) -> Option<BlockType> {
    Some(match tag {
        "p" => BlockType::Paragraph,
        "li" => BlockType::ListItem,
        "ul" => BlockType::BulletedList,
        "ol" => BlockType::NumberedList,
        "blockquote" => BlockType::Quote,
        "pre" => BlockType::Code,
        "h1" => BlockType::HeadingOne,
        "h2" => BlockType::HeadingTwo,
        "h3" => BlockType::HeadingThree,
        "h4" => BlockType::HeadingFour,
        "h5" => BlockType::HeadingFive,
        "h6" => BlockType::HeadingSix,
        _ => return None,
    })
}

pub fn mark_for_tag(tag: &str) -> Option<MarkType> {
    Some(match tag {
        "strong" => MarkType::Bold,
        "em" => MarkType::Italic,
        "u" => MarkType::Underlined,
        "s" => MarkType::Strikethrough,
        "code" => MarkType::Code,
        "span" => MarkType::Span,
        _ => return None,
    })
}

/// `<pre><code>…</code></pre>` becomes one code block holding the code's content
fn deserialize_pre(el: &Element) -> Option<Vec<Node>> {
    if el.name != "pre" {
        return None;
    }
    let children = match el.children.first() {
        Some(DomNode::Element(code)) if code.name == "code" => &code.children,
        _ => &el.children,
    };
    Some(vec![Node::Block(Block::with_nodes(
        BlockType::Code,
        deserialize_nodes(children),
    ))])
}

fn deserialize_img(el: &Element) -> Option<Vec<Node>> {
    if el.name != "img" {
        return None;
    }
    let src = el.attr("src").unwrap_or_default();
    let alt = el.attr("alt").map(str::to_string);
    Some(vec![Node::Block(Block::image(src, alt))])
}

fn deserialize_link(el: &Element) -> Option<Vec<Node>> {
    if el.name != "a" {
        return None;
    }
    let mut data = Data::new();
    data.insert(
        "href".into(),
        Value::String(el.attr("href").unwrap_or_default().to_string()),
    );
    let link = Inline::new(InlineType::Link, data).with_nodes(deserialize_nodes(&el.children));
    Some(vec![Node::Inline(link)])
}

/// `<attribute>field</attribute>` as written by the serializer
fn deserialize_attribute(el: &Element) -> Option<Vec<Node>> {
    if el.name != "attribute" {
        return None;
    }
    let field = el.text_content();
    Some(vec![Node::Inline(Inline::attribute(field.trim()))])
}

fn deserialize_block(el: &Element) -> Option<Vec<Node>> {
    let kind = block_for_tag(&el.name)?;
    Some(vec![Node::Block(Block::with_nodes(
        kind,
        deserialize_nodes(&el.children),
    ))])
}

fn deserialize_mark(el: &Element) -> Option<Vec<Node>> {
    let kind = mark_for_tag(&el.name)?;
    let mut mark = Mark::new(kind);
    if mark.kind == MarkType::Span {
        if let Some(style) = el.attr("style") {
            mark.data
                .insert("style".into(), Value::Object(parse_style(style)));
        }
    }

    let mut nodes = deserialize_nodes(&el.children);
    apply_mark(&mut nodes, &mark);
    Some(nodes)
}

/// Add `mark` to every text in `nodes` as the outermost mark
fn apply_mark(nodes: &mut [Node], mark: &Mark) {
    for node in nodes {
        match node {
            Node::Text(text) => text.wrap_mark(mark),
            other => {
                if let Some(children) = other.nodes_mut() {
                    apply_mark(children, mark);
                }
            }
        }
    }
}

fn deserialize_nodes(nodes: &[DomNode]) -> Vec<Node> {
    nodes.iter().flat_map(deserialize_dom_node).collect()
}

fn deserialize_dom_node(node: &DomNode) -> Vec<Node> {
    match node {
        DomNode::Text(text) if text.trim().is_empty() => Vec::new(),
        DomNode::Text(text) => vec![Node::text(text.as_str())],
        DomNode::Element(el) => {
            let matched = ELEMENT_RULES
                .iter()
                .find_map(|rule| (rule.deserialize)(el).map(|nodes| (rule.name, nodes)));
            match matched {
                Some((rule, nodes)) => {
                    trace!(rule, tag = el.name.as_str(), "deserialized element");
                    nodes
                }
                None => {
                    debug!(tag = el.name.as_str(), "no deserializer rule, dropping element");
                    Vec::new()
                }
            }
        }
    }
}

/// Deserialize an HTML fragment into normalized top-level nodes
pub fn deserialize_fragment(html: &str) -> Vec<Node> {
    normalize_nodes(deserialize_nodes(&parse_fragment(html)))
}

/// Deserialize an HTML fragment into a document
#[instrument(skip(html), fields(len = html.len()))]
pub fn deserialize(html: &str) -> Document {
    Document::new(deserialize_fragment(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_block(doc: &Document) -> &Block {
        assert_eq!(doc.nodes.len(), 1, "expected one block: {:?}", doc.nodes);
        doc.nodes[0].as_block().unwrap()
    }

    #[test]
    fn test_block_tags() {
        let doc = deserialize("<h2>Title</h2><blockquote>quoted</blockquote><h5>small</h5>");

        let kinds: Vec<_> = doc.nodes.iter().map(Node::kind_name).collect();
        assert_eq!(kinds, vec!["heading-two", "quote", "heading-five"]);
    }

    #[test]
    fn test_pre_descends_into_code() {
        let doc = deserialize("<pre><code>let x = 1;</code></pre>");

        let block = only_block(&doc);
        assert_eq!(block.kind, BlockType::Code);
        assert_eq!(block.nodes, vec![Node::text("let x = 1;")]);
    }

    #[test]
    fn test_pre_without_code_child() {
        let doc = deserialize("<pre>raw <code>inline</code></pre>");

        let block = only_block(&doc);
        assert_eq!(block.kind, BlockType::Code);
        let text = block.nodes[0].as_text().unwrap();
        assert_eq!(text.text(), "raw inline");
        assert!(text.has_mark_in(4, 10, &MarkType::Code));
    }

    #[test]
    fn test_img_captures_src_and_alt() {
        let doc = deserialize(r#"<img src="a.png" alt="logo">"#);

        let block = only_block(&doc);
        assert_eq!(block.kind, BlockType::Image);
        assert!(block.is_void());
        assert_eq!(block.data_str("src"), Some("a.png"));
        assert_eq!(block.data_str("alt"), Some("logo"));
    }

    #[test]
    fn test_link_and_br() {
        let doc = deserialize(r#"<p>see <a href="x.io">here</a><br>next</p>"#);

        let block = only_block(&doc);
        let kinds: Vec<_> = block.nodes.iter().map(Node::kind_name).collect();
        assert_eq!(kinds, vec!["text", "link", "text"]);
        assert_eq!(block.nodes[1].as_inline().unwrap().data_str("href"), Some("x.io"));
        assert_eq!(block.nodes[2], Node::text("\nnext"));
    }

    #[test]
    fn test_attribute_tag_restores_merge_field() {
        let doc = deserialize("<p>Dear <attribute>first_name</attribute></p>");

        let block = only_block(&doc);
        let field = block.nodes[1].as_inline().unwrap();
        assert_eq!(field.kind, InlineType::Attribute);
        assert_eq!(field.data_str("field"), Some("first_name"));
    }

    #[test]
    fn test_nested_marks_outer_last() {
        let doc = deserialize("<p><em><strong>x</strong></em></p>");

        let block = only_block(&doc);
        let leaf = &block.nodes[0].as_text().unwrap().leaves[0];
        let kinds: Vec<_> = leaf.marks.iter().map(|m| m.kind.clone()).collect();
        assert_eq!(kinds, vec![MarkType::Bold, MarkType::Italic]);
    }

    #[test]
    fn test_span_style_parsed_to_camel_case() {
        let doc = deserialize(r#"<p><span style="font-size: 20px; color:red">x</span></p>"#);

        let block = only_block(&doc);
        let mark = &block.nodes[0].as_text().unwrap().leaves[0].marks[0];
        assert_eq!(mark.kind, MarkType::Span);
        assert_eq!(
            mark.data["style"],
            serde_json::json!({ "fontSize": "20px", "color": "red" })
        );
    }

    #[test]
    fn test_unknown_elements_dropped_with_subtree() {
        let doc = deserialize("<p>kept</p><div><p>lost</p></div><custom>gone</custom>");

        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.plain_text(), "kept");
    }

    #[test]
    fn test_whitespace_text_dropped() {
        let doc = deserialize("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>");

        let list = only_block(&doc);
        assert_eq!(list.nodes.len(), 2);
        assert!(list.nodes.iter().all(Node::is_block));
    }

    #[test]
    fn test_empty_input_is_empty_document() {
        assert_eq!(deserialize(""), Document::empty());
        assert_eq!(deserialize("   "), Document::empty());
        assert_eq!(deserialize("<div>dropped</div>"), Document::empty());
    }
}
