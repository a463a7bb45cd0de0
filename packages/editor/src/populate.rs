//! Local merge population
//!
//! Produces the per-record HTML a preview shows: top-level fragments are
//! kept unless they are condition blocks whose condition fails for the
//! record, and `<attribute>field</attribute>` tokens are replaced with the
//! record's value.

use crate::conditions::{find_condition, ConditionGroup, Record};
use crate::payload::{ContentSink, Egest, SinkError};
use compose_model::{BlockType, Node};
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn field_token() -> &'static Regex {
    static FIELD_TOKEN: OnceLock<Regex> = OnceLock::new();
    FIELD_TOKEN.get_or_init(|| {
        Regex::new(r"<attribute>(.*?)</attribute>").expect("field token pattern is valid")
    })
}

/// Replace merge-field tokens in `line` with values from `record`. Missing
/// fields become empty.
pub fn populate_line(line: &str, record: &Record) -> String {
    field_token()
        .replace_all(line, |caps: &Captures| {
            let field = html_escape::decode_html_entities(&caps[1]);
            match record.get(field.as_ref()) {
                Some(Value::String(s)) => html_escape::encode_text(s).into_owned(),
                Some(Value::Null) | None => String::new(),
                Some(other) => html_escape::encode_text(&other.to_string()).into_owned(),
            }
        })
        .into_owned()
}

/// HTML for each record, in input order
pub fn populate_content(content: &Egest, groups: &[ConditionGroup], records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            content
                .block_map
                .nodes
                .iter()
                .zip(&content.html)
                .filter(|(node, _)| included_for(node, groups, record))
                .map(|(_, html)| populate_line(html, record))
                .collect::<String>()
        })
        .collect()
}

fn included_for(node: &Node, groups: &[ConditionGroup], record: &Record) -> bool {
    let Node::Block(block) = node else {
        return true;
    };
    if block.kind != BlockType::Condition {
        return true;
    }
    let name = block.data_str("name").unwrap_or_default();
    match find_condition(groups, name) {
        Some(condition) => condition.passes(record),
        None => {
            warn!(condition = name, "dropping block for unknown condition");
            false
        }
    }
}

/// In-process sink: keeps saved content and previews by local population
#[derive(Debug, Default)]
pub struct LocalSink {
    groups: Vec<ConditionGroup>,
    saved: Vec<Egest>,
}

impl LocalSink {
    pub fn new(groups: Vec<ConditionGroup>) -> Self {
        Self {
            groups,
            saved: Vec::new(),
        }
    }

    /// Content saved so far, oldest first
    pub fn saved(&self) -> &[Egest] {
        &self.saved
    }
}

impl ContentSink for LocalSink {
    fn save(&mut self, content: &Egest) -> Result<(), SinkError> {
        self.saved.push(content.clone());
        Ok(())
    }

    fn preview(&mut self, content: &Egest, records: &[Record]) -> Result<Vec<String>, SinkError> {
        debug!(records = records.len(), "populating preview");
        Ok(populate_content(content, &self.groups, records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Combinator, Condition, Formula, Operator};
    use compose_model::{Block, Document, Inline};
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_populate_line() {
        let line = "<p>Dear <attribute>first_name</attribute>, you scored <attribute>mark</attribute><attribute>x</attribute>.</p>";
        let populated = populate_line(line, &record(json!({ "first_name": "Ada", "mark": 91 })));

        assert_eq!(populated, "<p>Dear Ada, you scored 91.</p>");
    }

    #[test]
    fn test_values_are_escaped() {
        let populated = populate_line(
            "<attribute>name</attribute>",
            &record(json!({ "name": "<b>Bob</b>" })),
        );
        assert_eq!(populated, "&lt;b&gt;Bob&lt;/b&gt;");
    }

    #[test]
    fn test_condition_blocks_filter_per_record() {
        let groups = vec![ConditionGroup {
            name: "Grades".into(),
            conditions: vec![
                Condition::new("Pass").with_formulas(
                    Combinator::And,
                    vec![Formula {
                        field: "mark".into(),
                        operator: Operator::Ge,
                        comparator: json!(50),
                    }],
                ),
                Condition::new("Fail").with_formulas(
                    Combinator::And,
                    vec![Formula {
                        field: "mark".into(),
                        operator: Operator::Lt,
                        comparator: json!(50),
                    }],
                ),
            ],
        }];

        let mut pass = Block::condition("Pass", 0);
        pass.nodes = vec![Node::text("Well done")];
        let mut fail = Block::condition("Fail", 0);
        fail.nodes = vec![Node::text("See me")];
        let doc = Document::from_blocks(vec![
            Block::with_nodes(
                BlockType::Paragraph,
                vec![Node::text("Hi "), Node::Inline(Inline::attribute("name")), Node::text("")],
            ),
            pass,
            fail,
        ]);

        let records = vec![
            record(json!({ "name": "Ada", "mark": 80 })),
            record(json!({ "name": "Bob", "mark": 20 })),
            record(json!({ "name": "Cy" })),
        ];
        let populated = populate_content(&Egest::from_document(&doc), &groups, &records);

        assert_eq!(
            populated,
            vec![
                "<p>Hi Ada</p><div>Well done</div>",
                "<p>Hi Bob</p><div>See me</div>",
                "<p>Hi Cy</p>",
            ]
        );
    }

    #[test]
    fn test_local_sink_keeps_saves() {
        let mut sink = LocalSink::default();
        let egest = Egest::from_document(&Document::empty());

        sink.save(&egest).unwrap();
        assert_eq!(sink.saved(), &[egest]);
    }
}
