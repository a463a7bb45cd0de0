//! HTML codec for Compose documents: serializer, deserializer, paste
//! sanitizer and editing-surface renderer.

pub mod deserialize;
pub mod dom;
pub mod lexer;
pub mod sanitize;
pub mod serialize;
pub mod styles;
pub mod view;


pub use deserialize::{deserialize, deserialize_fragment};
pub use dom::{parse_fragment, DomNode, Element};
pub use sanitize::{deserialize_paste, sanitize};
pub use serialize::{serialize_block, serialize_document, serialize_html, serialize_node};
pub use styles::{parse_style, style_attribute};
pub use view::{display_href, render_view};
