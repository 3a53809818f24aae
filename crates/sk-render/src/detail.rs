//! Detail content shown under an expanded node: a property table, the
//! type's custom layout, or images.

use serde_json::Value;
use sk_core::template::{escape_html, render_layout};
use sk_core::{Data, Expansion, Node, NodeType, Property, PropertyType};

/// Whether `text` looks like something a browser can open.
pub fn is_url_like(text: &str) -> bool {
    let t = text.trim();
    !t.contains(char::is_whitespace)
        && (t.starts_with("http://") || t.starts_with("https://") || t.starts_with("www."))
}

fn href(url: &str) -> String {
    if url.starts_with("www.") {
        format!("https://{url}")
    } else {
        url.to_string()
    }
}

/// The HTML for one property value.
pub fn value_html(prop: &Property) -> String {
    match (&prop.kind, &prop.value) {
        (_, Value::Object(_) | Value::Array(_)) => {
            let pretty = serde_json::to_string_pretty(&prop.value).unwrap_or_default();
            format!("<pre>{}</pre>", escape_html(&pretty))
        }
        (PropertyType::Image, Value::String(src)) if !src.is_empty() => {
            format!("<img src=\"{}\" alt=\"\"/>", escape_html(src))
        }
        (_, Value::String(s)) if is_url_like(s) => {
            format!(
                "<a href=\"{}\" target=\"_blank\">{}</a>",
                escape_html(&href(s.trim())),
                escape_html(s)
            )
        }
        (kind, _) if kind.is_multiline() => {
            let text = escape_html(&prop.value_text());
            text.replace('\n', "<br/>")
        }
        _ => escape_html(&prop.value_text()),
    }
}

/// A generic name/value table. `None` when there is nothing to show.
pub fn property_table(data: &Data) -> Option<String> {
    if data.property_count() == 0 {
        return None;
    }
    let mut html = String::from("<table class=\"sk-properties\">");
    for (name, prop) in data.properties() {
        html.push_str(&format!(
            "<tr><th>{}</th><td class=\"sk-{}\">{}</td></tr>",
            escape_html(name),
            prop.kind,
            value_html(prop)
        ));
    }
    html.push_str("</table>");
    Some(html)
}

/// The type's layout interpolated with `node`, if the type has one.
pub fn custom_detail(node: &Node, node_type: &NodeType) -> Option<String> {
    let layout = node_type.layout.as_deref().filter(|_| node_type.has_layout())?;
    let html = render_layout(layout, node);
    (!html.trim().is_empty()).then_some(html)
}

/// Detail content for `node` in the requested expansion.
///
/// Custom expansion prefers the layout and falls back to the table. `None`
/// means there is nothing renderable and the node should collapse.
pub fn detail_for(node: &Node, node_type: &NodeType, expansion: Expansion) -> Option<String> {
    match expansion {
        Expansion::Collapsed => None,
        Expansion::Table => property_table(node.data()),
        Expansion::Custom => custom_detail(node, node_type).or_else(|| property_table(node.data())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(value: Value, kind: PropertyType) -> Property {
        Property::new(value, kind)
    }

    #[test]
    fn urls_become_links() {
        assert!(is_url_like("https://example.org/a?b=1"));
        assert!(is_url_like(" www.example.org "));
        assert!(!is_url_like("see https://example.org"));
        assert_eq!(
            value_html(&prop(json!("www.example.org"), PropertyType::Normal)),
            "<a href=\"https://www.example.org\" target=\"_blank\">www.example.org</a>"
        );
    }

    #[test]
    fn json_is_pretty_printed() {
        let html = value_html(&prop(json!({"a": 1}), PropertyType::Json));
        assert_eq!(html, "<pre>{\n  &quot;a&quot;: 1\n}</pre>");
    }

    #[test]
    fn images_and_text() {
        assert_eq!(
            value_html(&prop(json!("cat.png"), PropertyType::Image)),
            "<img src=\"cat.png\" alt=\"\"/>"
        );
        assert_eq!(
            value_html(&prop(json!("a<b\nc"), PropertyType::Text)),
            "a&lt;b<br/>c"
        );
        assert_eq!(value_html(&prop(json!("x\ny"), PropertyType::LongText)), "x<br/>y");
    }

    #[test]
    fn empty_data_has_no_table() {
        assert!(property_table(&Data::new("x")).is_none());
    }
}
