//! Layout templates: a type's `layout` string with `{{…}}` placeholders
//! interpolated from a node.
//!
//! Supported placeholders: `{{label}}`, `{{uid}}`, `{{type}}` and
//! `{{properties.NAME}}`. Values are HTML-escaped. An unknown placeholder
//! renders empty; an unterminated `{{` is kept as text.

use crate::node::Node;
use winnow::combinator::{alt, delimited, repeat};
use winnow::prelude::*;
use winnow::token::{take_till, take_until};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Label,
    Uid,
    Type,
    Property(String),
    Unknown(String),
}

impl Field {
    fn from_name(name: &str) -> Self {
        let name = name.trim();
        match name {
            "label" => Self::Label,
            "uid" => Self::Uid,
            "type" => Self::Type,
            _ => match name.strip_prefix("properties.") {
                Some(prop) if !prop.is_empty() => Self::Property(prop.to_string()),
                _ => Self::Unknown(name.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Field(Field),
}

/// A parsed layout template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(src: &str) -> Self {
        let segments = segments.parse(src).unwrap_or_else(|_| {
            // Every input is accepted by the grammar; keep the text if not.
            vec![Segment::Text(src.to_string())]
        });
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(f) => Some(f),
            Segment::Text(_) => None,
        })
    }

    /// Interpolate `node` into the template.
    pub fn render(&self, node: &Node) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(Field::Label) => out.push_str(&escape_html(node.label())),
                Segment::Field(Field::Uid) => out.push_str(&node.uid().to_string()),
                Segment::Field(Field::Type) => out.push_str(&escape_html(node.type_name())),
                Segment::Field(Field::Property(name)) => {
                    if let Some(prop) = node.data().property(name) {
                        out.push_str(&escape_html(&prop.value_text()));
                    }
                }
                Segment::Field(Field::Unknown(name)) => {
                    log::warn!("layout placeholder `{{{{{name}}}}}` is not recognised");
                }
            }
        }
        out
    }
}

/// Parse and render in one step.
pub fn render_layout(layout: &str, node: &Node) -> String {
    Template::parse(layout).render(node)
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ─── Grammar ─────────────────────────────────────────────────────────────

fn segments(input: &mut &str) -> ModalResult<Vec<Segment>> {
    repeat(0.., segment)
        .fold(Vec::new, |mut acc: Vec<Segment>, seg| {
            // Merge adjacent text runs.
            match seg {
                Segment::Text(next) => match acc.last_mut() {
                    Some(Segment::Text(prev)) => prev.push_str(&next),
                    _ => acc.push(Segment::Text(next)),
                },
                field => acc.push(field),
            }
            acc
        })
        .parse_next(input)
}

fn segment(input: &mut &str) -> ModalResult<Segment> {
    alt((
        placeholder.map(|name| Segment::Field(Field::from_name(name))),
        take_till(1.., '{').map(|s: &str| Segment::Text(s.to_string())),
        '{'.map(|_| Segment::Text("{".to_string())),
    ))
    .parse_next(input)
}

fn placeholder<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    delimited("{{", take_until(0.., "}}"), "}}").parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PropertyType;
    use crate::geometry::Point;
    use crate::id::{TypeId, Uid};
    use crate::node::NodeMode;
    use crate::palette::Palette;
    use crate::schema::NodeType;
    use serde_json::json;

    fn node() -> Node {
        let mut palette = Palette::new("default");
        palette
            .add_item(NodeType::new(TypeId::intern("person"), "People"))
            .unwrap();
        let mut n = Node::new(Uid(7), "person", &palette, NodeMode::Full, Point::default(), 0, "u");
        n.set_label("Ada <Lovelace>");
        n.set_property_named("born", json!("1815"), PropertyType::Date);
        n
    }

    #[test]
    fn parses_fields_and_text() {
        let t = Template::parse("<b>{{label}}</b> #{{ uid }} {{properties.born}}");
        let fields: Vec<&Field> = t.fields().collect();
        assert_eq!(
            fields,
            vec![&Field::Label, &Field::Uid, &Field::Property("born".into())]
        );
        assert_eq!(t.segments().len(), 6);
    }

    #[test]
    fn renders_escaped_values() {
        let out = render_layout("<b>{{label}}</b> ({{type}}, {{uid}}) {{properties.born}}", &node());
        assert_eq!(out, "<b>Ada &lt;Lovelace&gt;</b> (person, 7) 1815");
    }

    #[test]
    fn unknown_and_missing_render_empty() {
        let out = render_layout("[{{nope}}][{{properties.missing}}]", &node());
        assert_eq!(out, "[][]");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        let t = Template::parse("a {b} {{label");
        assert_eq!(t.segments(), &[Segment::Text("a {b} {{label".into())]);
        assert_eq!(t.render(&node()), "a {b} {{label");
    }
}
