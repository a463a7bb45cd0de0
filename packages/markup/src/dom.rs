//! Tolerant DOM builder
//!
//! Builds an element tree from lexed tokens. Void elements never take
//! children, close tags without a matching open element are ignored, and
//! anything still open at the end of input is closed implicitly.
//!
//! The implied end tags of HTML5 tree construction that matter for
//! content are applied: a block-level start tag closes an open `p`, a new
//! `li` closes the open item of its list, and a heading closes an open
//! heading.

use crate::lexer::{lex, HtmlToken};

/// Elements that never have content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Start tags that close an open `p` element
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "menu", "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Elements an implied end tag never looks past
const SCOPE_BOUNDARIES: &[&str] = &["table", "td", "th", "caption", "button", "object", "template"];

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<DomNode>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn is_void(&self) -> bool {
        is_void_element(&self.name)
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                DomNode::Text(text) => out.push_str(text),
                DomNode::Element(el) => out.push_str(&el.text_content()),
            }
        }
        out
    }
}

impl DomNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            DomNode::Element(el) => Some(el),
            DomNode::Text(_) => None,
        }
    }
}

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Parse an HTML fragment into a list of top-level nodes
pub fn parse_fragment(source: &str) -> Vec<DomNode> {
    let mut builder = Builder::default();
    for token in lex(source) {
        match token {
            HtmlToken::StartTag {
                name,
                attrs,
                self_closing,
            } => builder.open(name, attrs, self_closing),
            HtmlToken::EndTag(name) => builder.close(&name),
            HtmlToken::Text(text) => builder.text(&text),
        }
    }
    builder.finish()
}

#[derive(Default)]
struct Builder {
    roots: Vec<DomNode>,
    stack: Vec<Element>,
}

impl Builder {
    fn open(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        if CLOSES_PARAGRAPH.contains(&name.as_str()) {
            self.close_in_scope("p", SCOPE_BOUNDARIES);
        }
        match name.as_str() {
            "li" => self.close_in_scope("li", &["ul", "ol", "table", "td", "th"]),
            n if HEADINGS.contains(&n) => {
                if self.stack.last().map(|el| HEADINGS.contains(&el.name.as_str())).unwrap_or(false) {
                    self.pop();
                }
            }
            _ => {}
        }

        let element = Element {
            name,
            attrs,
            children: Vec::new(),
        };
        if self_closing || element.is_void() {
            self.append(DomNode::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    /// Close the innermost open `name`, unless a boundary element is
    /// reached first
    fn close_in_scope(&mut self, name: &str, boundaries: &[&str]) {
        let found = self
            .stack
            .iter()
            .rev()
            .take_while(|el| !boundaries.contains(&el.name.as_str()))
            .position(|el| el.name == name);
        let Some(from_top) = found else {
            return;
        };
        tracing::trace!(tag = name, "implied end tag");
        for _ in 0..=from_top {
            self.pop();
        }
    }

    fn close(&mut self, name: &str) {
        let Some(depth) = self.stack.iter().rposition(|el| el.name == name) else {
            tracing::trace!(tag = name, "ignoring unmatched close tag");
            return;
        };
        while self.stack.len() > depth {
            self.pop();
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        match siblings.last_mut() {
            Some(DomNode::Text(prev)) => prev.push_str(text),
            _ => siblings.push(DomNode::Text(text.to_string())),
        }
    }

    fn pop(&mut self) {
        if let Some(element) = self.stack.pop() {
            self.append(DomNode::Element(element));
        }
    }

    fn append(&mut self, node: DomNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn finish(mut self) -> Vec<DomNode> {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.roots
    }
}

/// Serialize DOM nodes back to HTML
pub fn to_html(nodes: &[DomNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &DomNode, out: &mut String) {
    match node {
        DomNode::Text(text) => out.push_str(&html_escape::encode_text(text)),
        DomNode::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &DomNode) -> &Element {
        node.as_element().unwrap()
    }

    #[test]
    fn test_parse_nested_elements() {
        let nodes = parse_fragment("<ul><li>one</li><li>two</li></ul>");

        assert_eq!(nodes.len(), 1);
        let list = element(&nodes[0]);
        assert_eq!(list.name, "ul");
        assert_eq!(list.children.len(), 2);
        assert_eq!(element(&list.children[1]).children, vec![DomNode::Text("two".into())]);
    }

    #[test]
    fn test_void_elements_take_no_children() {
        let nodes = parse_fragment("<p>a<br>b<img src=\"x.png\">c</p>");

        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 5);
        assert_eq!(element(&p.children[3]).attr("src"), Some("x.png"));
    }

    #[test]
    fn test_unmatched_close_tags_are_ignored() {
        let nodes = parse_fragment("<p>a</span>b</p></div>");

        assert_eq!(nodes.len(), 1);
        assert_eq!(element(&nodes[0]).children, vec![DomNode::Text("ab".into())]);
    }

    #[test]
    fn test_unclosed_elements_close_at_end() {
        let nodes = parse_fragment("<p>one<p>two");

        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&nodes[1]).children, vec![DomNode::Text("two".into())]);
    }

    #[test]
    fn test_implied_end_tags() {
        let cases = [
            ("<p>one<ul><li>x</li></ul>", vec!["p", "ul"]),
            ("<p>one<div>two</div>", vec!["p", "div"]),
            ("<p>a<h1>b</h1>", vec!["p", "h1"]),
            ("<p>a<span>b<p>c", vec!["p", "p"]),
            ("<h1>a<h2>b", vec!["h1", "h2"]),
            ("<p>a<b>bold</b>c</p>", vec!["p"]),
            ("<table><tr><td><p>a<div>b</div></td></tr></table>", vec!["table"]),
        ];

        for (html, expected) in cases {
            let nodes = parse_fragment(html);
            let names: Vec<&str> = nodes
                .iter()
                .filter_map(DomNode::as_element)
                .map(|el| el.name.as_str())
                .collect();
            assert_eq!(names, expected, "{html}");
        }
    }

    #[test]
    fn test_new_item_closes_open_item() {
        let nodes = parse_fragment("<ul><li>one<li>two<ul><li>nested</ul></ul>");

        let list = element(&nodes[0]);
        assert_eq!(list.children.len(), 2);
        let second = element(&list.children[1]);
        assert_eq!(second.children.len(), 2);
        assert_eq!(element(&second.children[1]).name, "ul");
    }

    #[test]
    fn test_to_html_escapes() {
        let mut a = Element::new("a");
        a.set_attr("href", "http://x.io?a=1&b=\"2\"");
        a.children.push(DomNode::Text("1 < 2".into()));

        assert_eq!(
            to_html(&[DomNode::Element(a)]),
            "<a href=\"http://x.io?a=1&amp;b=&quot;2&quot;\">1 &lt; 2</a>"
        );
    }
}
