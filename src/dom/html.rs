//! HTML serialization of an in-memory host subtree, with consistent escaping
use super::memory::{HostKind, MemoryDom, NodeId};
use crate::errors::DomError;
use phf::phf_set;

// Elements that never have a closing tag
static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "source", "track", "wbr",
};

/// Text content escaping
fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Consistent HTML attribute escaping
fn escape_attr(s: &str) -> String {
    escape_text(s)
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render `node` and its descendants as markup.
pub fn to_html(dom: &MemoryDom, node: NodeId) -> Result<String, DomError> {
    let mut out = String::new();
    write_node(dom, node, &mut out)?;
    Ok(out)
}

fn write_node(dom: &MemoryDom, node: NodeId, out: &mut String) -> Result<(), DomError> {
    let host = dom.get(node)?;
    match &host.kind {
        HostKind::Text(text) => out.push_str(&escape_text(text)),
        HostKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        HostKind::Element {
            tag,
            namespace,
            attributes,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push_str(&format!(r#" {}="{}""#, name, escape_attr(value)));
            }
            out.push('>');

            let is_void = namespace.is_none() && VOID_ELEMENTS.contains(tag.to_lowercase().as_str());
            if is_void && host.children.is_empty() {
                return Ok(());
            }
            for child in &host.children {
                write_node(dom, *child, out)?;
            }
            out.push_str(&format!("</{tag}>"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomApi;

    #[test]
    fn renders_nested_markup_with_escaping() {
        let mut dom = MemoryDom::new();
        let div = dom.create_element("div").unwrap();
        dom.set_attribute(&div, "title", "a \"quoted\" <title>").unwrap();
        let text = dom.create_text_node("1 < 2 & 3");
        let comment = dom.create_comment("note");
        let br = dom.create_element("br").unwrap();
        for child in [text, comment, br] {
            dom.append_child(&div, &child).unwrap();
        }

        assert_eq!(
            to_html(&dom, div).unwrap(),
            r#"<div title="a &quot;quoted&quot; &lt;title&gt;">1 &lt; 2 &amp; 3<!--note--><br></div>"#
        );
    }

    #[test]
    fn namespaced_elements_are_never_void() {
        let mut dom = MemoryDom::new();
        let svg = dom.create_element_ns("http://www.w3.org/2000/svg", "svg").unwrap();
        let path = dom.create_element_ns("http://www.w3.org/2000/svg", "source").unwrap();
        dom.append_child(&svg, &path).unwrap();
        assert_eq!(to_html(&dom, svg).unwrap(), "<svg><source></source></svg>");
    }
}
