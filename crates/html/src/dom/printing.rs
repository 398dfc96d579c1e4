use core::fmt;

use super::{DOM, DOMNode, NodeKey, NodeKind};

/// Elements that never have an end tag.
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text children are emitted verbatim.
const RAW_TEXT_ELEMENTS: [&str; 5] = ["script", "style", "xmp", "noscript", "plaintext"];

/// Knobs for [`DOM::serialize`].
#[derive(Clone, Debug, Default)]
pub struct SerializeOptions {
    /// Markup inserted as the first child of `<head>`.
    pub head_prefix: Option<String>,
    /// Elements (by lowercase tag) left out of the output together with their subtree.
    pub skip_tags: Vec<String>,
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
}

fn serialize_node(dom: &DOM, key: NodeKey, options: &SerializeOptions, out: &mut String) {
    let Some(node) = dom.node(key) else {
        return;
    };
    match &node.kind {
        NodeKind::Document => {
            for child in dom.children(key) {
                serialize_node(dom, child, options, out);
            }
        }
        NodeKind::Element { tag } => {
            if options.skip_tags.iter().any(|skip| skip == tag) {
                return;
            }
            out.push('<');
            out.push_str(tag);
            for (name, value) in &node.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(value, out);
                out.push('"');
            }
            out.push('>');
            if tag == "head" {
                if let Some(prefix) = &options.head_prefix {
                    out.push_str(prefix);
                }
            }
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
            for child in dom.children(key) {
                match dom.node(child).map(|child_node| &child_node.kind) {
                    Some(NodeKind::Text { text }) if raw => out.push_str(text),
                    _ => serialize_node(dom, child, options, out),
                }
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        NodeKind::Text { text } => escape_text(text, out),
        NodeKind::Comment { text } => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

impl DOM {
    /// Serialize a node and its subtree as HTML (`outerHTML`).
    pub fn outer_html(&self, key: NodeKey) -> String {
        self.serialize(key, &SerializeOptions::default())
    }

    /// Serialize a node and its subtree as HTML with the given options.
    pub fn serialize(&self, key: NodeKey, options: &SerializeOptions) -> String {
        let mut out = String::new();
        serialize_node(self, key, options, &mut out);
        out
    }
}

impl fmt::Debug for DOM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header
        writeln!(f, "DOM")?;

        fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            Ok(())
        }

        fn escape_debug(text: &str) -> String {
            let mut out = String::with_capacity(text.len());
            for ch in text.chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(ch),
                }
            }
            out
        }

        fn fmt_node(
            dom: &DOM,
            key: NodeKey,
            f: &mut fmt::Formatter<'_>,
            depth: usize,
        ) -> fmt::Result {
            let Some(DOMNode { kind, attrs, .. }) = dom.node(key) else {
                return Ok(());
            };
            match kind {
                NodeKind::Document => {
                    write_indent(f, depth)?;
                    writeln!(f, "#document")?;
                }
                NodeKind::Element { tag } => {
                    write_indent(f, depth)?;
                    write!(f, "<{tag}")?;
                    let mut pairs: Vec<&(String, String)> = attrs.iter().collect();
                    pairs.sort_by(|left, right| left.0.cmp(&right.0));
                    for (name, value) in pairs {
                        write!(f, " {name}=\"{}\"", escape_debug(value))?;
                    }
                    writeln!(f, "> {key}")?;
                }
                NodeKind::Text { text } => {
                    // Skip pure-whitespace text nodes in the printer for cleaner output
                    if text.chars().all(char::is_whitespace) {
                        return Ok(());
                    }
                    write_indent(f, depth)?;
                    writeln!(f, "\"{}\"", escape_debug(text))?;
                    return Ok(());
                }
                NodeKind::Comment { text } => {
                    write_indent(f, depth)?;
                    writeln!(f, "<!--{}-->", escape_debug(text))?;
                    return Ok(());
                }
            }
            for child in dom.children(key) {
                fmt_node(dom, child, f, depth + 1)?;
            }
            Ok(())
        }

        fmt_node(self, self.root(), f, 0)
    }
}
