//! Inline `style` attribute handling
//!
//! Span marks store their style as a camelCase property map
//! (`{"fontSize": "20px"}`); markup uses kebab-case declarations
//! (`font-size:20px`).

use compose_model::Data;
use serde_json::Value;

/// Parse a `style` attribute into a camelCase property map.
///
/// Declarations without a property or a value are discarded.
pub fn parse_style(style: &str) -> Data {
    let mut map = Data::new();
    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let (property, value) = (property.trim(), value.trim());
        if property.is_empty() || value.is_empty() {
            continue;
        }
        map.insert(kebab_to_camel(property), Value::String(value.to_string()));
    }
    map
}

/// Render a style value as a `style` attribute.
///
/// Accepts the property map form, or a raw declaration string which is
/// parsed with [`parse_style`] first.
pub fn style_attribute(style: &Value) -> Option<String> {
    match style {
        Value::String(raw) => declarations(&parse_style(raw)),
        Value::Object(map) => declarations(map),
        _ => None,
    }
}

fn declarations(map: &Data) -> Option<String> {
    let rendered = map
        .iter()
        .filter_map(|(property, value)| {
            let value = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            if value.is_empty() {
                return None;
            }
            Some(format!("{}:{}", camel_to_kebab(property), value))
        })
        .collect::<Vec<_>>()
        .join(";");
    Some(rendered).filter(|s| !s.is_empty())
}

/// `font-size` → `fontSize`
pub fn kebab_to_camel(property: &str) -> String {
    let mut out = String::with_capacity(property.len());
    let mut upper = false;
    for c in property.chars() {
        if c == '-' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// `fontSize` → `font-size`
pub fn camel_to_kebab(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_uppercase() {
            out.push('-');
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
