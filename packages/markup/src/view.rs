//! Editing-surface renderer
//!
//! Unlike the serializer, which produces the exported markup, this renders
//! what the author sees while editing: condition blocks are framed in their
//! group colour, merge fields show as placeholder chips, and nothing is
//! dropped (unknown blocks render as `div`, unknown inlines as `span`).

use crate::serialize::{attr, wrap};
use crate::styles::style_attribute;
use compose_model::{Block, BlockType, Document, Inline, InlineType, Leaf, MarkType, Node};

const FIELD_CHIP_STYLE: &str = "display:inline-block;padding:0 5px;line-height:1.25em;background:#eee";

/// Force a scheme-relative prefix onto hrefs lacking `http://` or `https://`
pub fn display_href(href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("//{href}")
    }
}

/// Render the editing surface; `colours[i]` is the colour of condition group `i`
pub fn render_view(doc: &Document, colours: &[String]) -> String {
    let mut out = String::new();
    for node in &doc.nodes {
        render_node(node, colours, &mut out);
    }
    out
}

fn render_children(nodes: &[Node], colours: &[String]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, colours, &mut out);
    }
    out
}

fn render_node(node: &Node, colours: &[String], out: &mut String) {
    match node {
        Node::Block(block) => out.push_str(&render_block(block, colours)),
        Node::Inline(inline) => out.push_str(&render_inline(inline, colours)),
        Node::Text(text) => {
            for leaf in &text.leaves {
                out.push_str(&render_leaf(leaf));
            }
        }
    }
}

fn render_block(block: &Block, colours: &[String]) -> String {
    let children = render_children(&block.nodes, colours);
    match &block.kind {
        BlockType::Paragraph => wrap("p", &children),
        BlockType::BulletedList => wrap("ul", &children),
        BlockType::NumberedList => wrap("ol", &children),
        BlockType::ListItem => wrap("li", &children),
        BlockType::HeadingOne => wrap("h1", &children),
        BlockType::HeadingTwo => wrap("h2", &children),
        BlockType::Image => render_image(block.data_str("src"), block.data_str("alt")),
        BlockType::Condition => {
            let name = html_escape::encode_text(block.data_str("name").unwrap_or_default());
            let colour = block
                .group()
                .and_then(|g| colours.get(g))
                .map(String::as_str)
                .unwrap_or("inherit");
            format!(
                r#"<div class="condition_block" style="border-color:{colour}"><div class="condition_name" style="color:{colour}">If <strong>{name}</strong>:</div>{children}</div>"#
            )
        }
        _ => wrap("div", &children),
    }
}

fn render_inline(inline: &Inline, colours: &[String]) -> String {
    match &inline.kind {
        InlineType::Link => format!(
            r#"<a href="{}">{}</a>"#,
            attr(&display_href(inline.data_str("href").unwrap_or_default())),
            render_children(&inline.nodes, colours)
        ),
        InlineType::Attribute => format!(
            r#"<span style="{FIELD_CHIP_STYLE}">{}</span>"#,
            html_escape::encode_text(inline.data_str("field").unwrap_or_default())
        ),
        InlineType::Image => render_image(inline.data_str("src"), inline.data_str("alt")),
        InlineType::Other(_) => wrap("span", &render_children(&inline.nodes, colours)),
    }
}

fn render_image(src: Option<&str>, alt: Option<&str>) -> String {
    format!(
        r#"<img src="{}" alt="{}" style="max-width:100%">"#,
        attr(src.unwrap_or_default()),
        attr(alt.unwrap_or_default())
    )
}

fn render_leaf(leaf: &Leaf) -> String {
    let mut html = leaf
        .text
        .split('\n')
        .map(|line| html_escape::encode_text(line).into_owned())
        .collect::<Vec<_>>()
        .join("<br>");

    for mark in &leaf.marks {
        html = match &mark.kind {
            MarkType::Bold => wrap("strong", &html),
            MarkType::Italic => wrap("em", &html),
            MarkType::Underlined => wrap("u", &html),
            MarkType::Strikethrough => wrap("s", &html),
            MarkType::Code => wrap("code", &html),
            MarkType::Span => match mark.data.get("style").and_then(style_attribute) {
                Some(style) => format!(r#"<span style="{}">{html}</span>"#, attr(&style)),
                None => html,
            },
            MarkType::Other(_) => html,
        };
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use compose_model::Text;

    #[test]
    fn test_condition_uses_group_colour() {
        let mut block = Block::condition("Passed", 1);
        block.nodes = vec![Node::text("Well done")];
        let doc = Document::from_blocks(vec![block]);
        let colours = vec!["#800000".to_string(), "#00ff00".to_string()];

        assert_eq!(
            render_view(&doc, &colours),
            r##"<div class="condition_block" style="border-color:#00ff00"><div class="condition_name" style="color:#00ff00">If <strong>Passed</strong>:</div>Well done</div>"##
        );
    }

    #[test]
    fn test_dangling_group_falls_back() {
        let doc = Document::from_blocks(vec![Block::condition("Gone", 5)]);
        assert!(render_view(&doc, &[]).contains("border-color:inherit"));
    }

    #[test]
    fn test_field_chip() {
        let doc = Document::from_blocks(vec![Block::with_nodes(
            BlockType::Paragraph,
            vec![
                Node::text("Hi "),
                Node::Inline(Inline::attribute("first_name")),
                Node::text(""),
            ],
        )]);

        assert_eq!(
            render_view(&doc, &[]),
            format!(r#"<p>Hi <span style="{FIELD_CHIP_STYLE}">first_name</span></p>"#)
        );
    }

    #[test]
    fn test_link_href_forced_at_render_time() {
        let link = Inline::link("example.com", "site");
        let doc = Document::from_blocks(vec![Block::with_nodes(
            BlockType::Paragraph,
            vec![Node::text(""), Node::Inline(link), Node::text("")],
        )]);

        assert_eq!(render_view(&doc, &[]), r#"<p><a href="//example.com">site</a></p>"#);
        assert_eq!(
            doc.nodes[0].as_block().unwrap().nodes[1].as_inline().unwrap().data_str("href"),
            Some("example.com")
        );
        assert_eq!(display_href("https://x.io"), "https://x.io");
    }

    #[test]
    fn test_unknown_blocks_keep_text() {
        let doc = Document::from_blocks(vec![Block::with_nodes(
            BlockType::Quote,
            vec![Node::Text(Text::with_marks(
                "q",
                vec![compose_model::Mark::new(MarkType::Strikethrough)],
            ))],
        )]);
        assert_eq!(render_view(&doc, &[]), "<div><s>q</s></div>");
    }
}
