//! HTML lexer using logos
//!
//! Two token sets share one source: [`ContentToken`] between tags and
//! [`TagToken`] inside a start tag. The lexer switches between them with
//! `morph`, so attribute syntax never leaks into text content.

use logos::{Lexer, Logos};
use std::borrow::Cow;

/// Tokens between tags
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum ContentToken<'src> {
    /// `<name`; attributes follow in tag mode
    #[regex(r"<[a-zA-Z][a-zA-Z0-9:_-]*", |lex| &lex.slice()[1..])]
    TagOpen(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:_-]*[^>]*>", close_tag_name)]
    TagClose(&'src str),

    #[token("<!--", skip_comment)]
    Comment,

    #[regex(r"<![a-zA-Z][^>]*>")]
    Doctype,

    #[regex(r"<\?[^>]*>")]
    ProcessingInstruction,

    /// A `<` that does not start any markup
    #[token("<")]
    StrayLt,

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Tokens inside a start tag
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\x0C]+")]
pub enum TagToken<'src> {
    #[regex(r#"[^ \t\r\n\x0C"'>=]+"#, |lex| lex.slice())]
    Word(&'src str),

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    SingleQuoted(&'src str),

    #[token(">")]
    End,

    #[token("/>")]
    SelfClosingEnd,
}

fn close_tag_name<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> &'src str {
    let inner = &lex.slice()[2..];
    let len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-')))
        .unwrap_or(inner.len());
    &inner[..len]
}

/// Consume a comment body up to and including `-->`, or to the end of input
fn skip_comment<'src>(lex: &mut Lexer<'src, ContentToken<'src>>) -> bool {
    let remainder = lex.remainder();
    let len = remainder.find("-->").map(|i| i + 3).unwrap_or(remainder.len());
    lex.bump(len);
    true
}

/// Elements whose content is raw text rather than markup
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// A lexed HTML token with attribute values and text already decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlToken<'src> {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Text(Cow<'src, str>),
}

/// Lex `source` into HTML tokens. Never fails: anything that does not lex as
/// markup becomes text.
pub fn lex(source: &str) -> Vec<HtmlToken<'_>> {
    let mut tokens = Vec::new();
    let mut lex = ContentToken::lexer(source);

    while let Some(result) = lex.next() {
        match result {
            Ok(ContentToken::TagOpen(name)) => {
                let name = name.to_ascii_lowercase();
                let mut tag_lex = lex.morph::<TagToken>();
                let (attrs, self_closing) = lex_attributes(&mut tag_lex);
                lex = tag_lex.morph();

                let raw = !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str());
                tokens.push(HtmlToken::StartTag {
                    name: name.clone(),
                    attrs,
                    self_closing,
                });
                if raw {
                    let body = take_raw_text(&mut lex, &name);
                    if !body.is_empty() {
                        tokens.push(HtmlToken::Text(Cow::Borrowed(body)));
                    }
                }
            }
            Ok(ContentToken::TagClose(name)) => {
                tokens.push(HtmlToken::EndTag(name.to_ascii_lowercase()));
            }
            Ok(ContentToken::Comment | ContentToken::Doctype | ContentToken::ProcessingInstruction) => {}
            Ok(ContentToken::StrayLt) => tokens.push(HtmlToken::Text(Cow::Borrowed("<"))),
            Ok(ContentToken::Text(text)) => {
                tokens.push(HtmlToken::Text(html_escape::decode_html_entities(text)));
            }
            Err(()) => tokens.push(HtmlToken::Text(Cow::Borrowed(lex.slice()))),
        }
    }

    tokens
}

/// Read attributes up to the end of the start tag
fn lex_attributes<'src>(lex: &mut Lexer<'src, TagToken<'src>>) -> (Vec<(String, String)>, bool) {
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut pending: Option<String> = None;
    let mut expecting_value = false;

    let finish = |pending: &mut Option<String>, value: &str, attrs: &mut Vec<(String, String)>| {
        if let Some(name) = pending.take() {
            if name != "/" && !attrs.iter().any(|(n, _)| *n == name) {
                attrs.push((name, html_escape::decode_html_entities(value).into_owned()));
            }
        }
    };

    while let Some(result) = lex.next() {
        match result {
            Ok(TagToken::Word(word)) if expecting_value => {
                finish(&mut pending, word, &mut attrs);
                expecting_value = false;
            }
            Ok(TagToken::Word(word)) => {
                finish(&mut pending, "", &mut attrs);
                pending = Some(word.to_ascii_lowercase());
            }
            Ok(TagToken::Eq) => expecting_value = pending.is_some(),
            Ok(TagToken::DoubleQuoted(value) | TagToken::SingleQuoted(value)) => {
                if expecting_value {
                    finish(&mut pending, value, &mut attrs);
                    expecting_value = false;
                }
            }
            Ok(TagToken::End) => {
                finish(&mut pending, "", &mut attrs);
                return (attrs, false);
            }
            Ok(TagToken::SelfClosingEnd) => {
                finish(&mut pending, "", &mut attrs);
                return (attrs, true);
            }
            // Unbalanced quotes and the like
            Err(()) => expecting_value = false,
        }
    }

    finish(&mut pending, "", &mut attrs);
    (attrs, false)
}

/// Consume raw element content up to (not including) its close tag
fn take_raw_text<'src>(lex: &mut Lexer<'src, ContentToken<'src>>, name: &str) -> &'src str {
    let remainder = lex.remainder();
    let close = format!("</{name}");
    let len = remainder
        .to_ascii_lowercase()
        .find(&close)
        .unwrap_or(remainder.len());
    lex.bump(len);
    &remainder[..len]
}
