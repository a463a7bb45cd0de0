//! # Paste sanitizer
//!
//! Whitelist filter applied to externally pasted HTML before it is
//! deserialized:
//!
//! 1. `b` and `i` are renamed to `strong` and `em`
//! 2. `script`, `style`, `textarea`, `option` and `noscript` are removed with
//!    their content
//! 3. other tags outside the allowlist are removed, their children kept
//! 4. attributes are filtered per tag; `style` keeps `color` only; `href` and
//!    `src` must be relative or use an allowed scheme
//! 5. allowed tags the codec has no rule for (`div`, `table`, ...) become a
//!    `span` when a style survives, otherwise they are unwrapped

use crate::deserialize::{block_for_tag, deserialize_fragment, mark_for_tag};
use crate::dom::{parse_fragment, to_html, DomNode, Element};
use compose_model::Node;
use tracing::{debug, instrument};

/// Default safe tag set plus `h1`, `h2`, `span`, `img` and `u`
pub const ALLOWED_TAGS: &[&str] = &[
    "h3", "h4", "h5", "h6", "blockquote", "p", "a", "ul", "ol", "nl", "li", "b", "i", "strong",
    "em", "strike", "code", "hr", "br", "div", "table", "thead", "caption", "tbody", "tr", "th",
    "td", "pre", "h1", "h2", "span", "img", "u",
];

/// Tags removed together with everything inside them
pub const DISCARDED_WITH_CONTENT: &[&str] = &["script", "style", "textarea", "option", "noscript"];

pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto"];

pub const ALLOWED_STYLES: &[&str] = &["color"];

fn allowed_attribute(tag: &str, attr: &str) -> bool {
    match attr {
        "style" => true,
        "href" | "name" | "target" => tag == "a",
        "src" => tag == "img",
        _ => false,
    }
}

fn rename_tag(tag: &str) -> Option<&'static str> {
    match tag {
        "b" => Some("strong"),
        "i" => Some("em"),
        _ => None,
    }
}

/// True if the deserializer has a rule for `tag`
fn has_codec_rule(tag: &str) -> bool {
    matches!(tag, "pre" | "img" | "a" | "br")
        || block_for_tag(tag).is_some()
        || mark_for_tag(tag).is_some()
}

/// Sanitize pasted HTML, returning the cleaned markup
#[instrument(skip(html), fields(len = html.len()))]
pub fn sanitize(html: &str) -> String {
    to_html(&sanitize_nodes(parse_fragment(html)))
}

/// Sanitize and deserialize pasted HTML
pub fn deserialize_paste(html: &str) -> Vec<Node> {
    deserialize_fragment(&sanitize(html))
}

pub fn sanitize_nodes(nodes: Vec<DomNode>) -> Vec<DomNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            DomNode::Text(text) => out.push(DomNode::Text(text)),
            DomNode::Element(el) => out.extend(sanitize_element(el)),
        }
    }
    out
}

fn sanitize_element(mut el: Element) -> Vec<DomNode> {
    if let Some(name) = rename_tag(&el.name) {
        el.name = name.to_string();
    }

    if DISCARDED_WITH_CONTENT.contains(&el.name.as_str()) {
        debug!(tag = el.name.as_str(), "discarding element with content");
        return Vec::new();
    }

    let children = sanitize_nodes(std::mem::take(&mut el.children));

    if !ALLOWED_TAGS.contains(&el.name.as_str()) {
        debug!(tag = el.name.as_str(), "unwrapping disallowed element");
        return children;
    }

    el.attrs = filter_attributes(&el.name, std::mem::take(&mut el.attrs));
    el.children = children;

    if has_codec_rule(&el.name) {
        return vec![DomNode::Element(el)];
    }

    match el.attr("style").map(str::to_string) {
        Some(style) => {
            let mut span = Element::new("span");
            span.set_attr("style", style);
            span.children = el.children;
            vec![DomNode::Element(span)]
        }
        None => el.children,
    }
}

fn filter_attributes(tag: &str, attrs: Vec<(String, String)>) -> Vec<(String, String)> {
    attrs
        .into_iter()
        .filter(|(name, _)| allowed_attribute(tag, name))
        .filter_map(|(name, value)| match name.as_str() {
            "style" => filter_style(&value).map(|style| (name, style)),
            "href" | "src" if !allowed_url(&value) => {
                debug!(attr = name.as_str(), url = value.as_str(), "dropping disallowed url");
                None
            }
            _ => Some((name, value)),
        })
        .collect()
}

/// Keep only allowed style declarations; `None` when nothing survives
pub fn filter_style(style: &str) -> Option<String> {
    let kept: Vec<String> = style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            (ALLOWED_STYLES.contains(&property.as_str()) && !value.is_empty())
                .then(|| format!("{property}:{value}"))
        })
        .collect();
    (!kept.is_empty()).then(|| kept.join(";"))
}

/// Relative and protocol-relative urls pass; absolute urls need an allowed scheme
pub fn allowed_url(url: &str) -> bool {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let Some(colon) = cleaned.find(':') else {
        return true;
    };
    let scheme = &cleaned[..colon];
    let looks_like_scheme = scheme
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic())
        .unwrap_or(false)
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));

    // A colon after a path or query separator is not a scheme
    if !looks_like_scheme {
        return true;
    }
    ALLOWED_SCHEMES.contains(&scheme)
}
