//! HTML5 parsing using html5ever.
//!
//! The document is parsed into an [`RcDom`] and then copied into the arena
//! [`DOM`]. Mutation recording is off while the tree is built, so a freshly
//! parsed page starts with no pending records.

use anyhow::{Error, anyhow};
use html5ever::tendril::TendrilSink as _;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::dom::{DOM, NodeKey};

/// Parse a complete HTML document.
///
/// # Errors
/// Returns an error if the converted tree has no document element.
pub fn parse_html(html: &str) -> Result<DOM, Error> {
    let parsed: RcDom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
    let mut dom = DOM::new();
    convert_node(&mut dom, &parsed.document, NodeKey::ROOT)?;
    if dom.document_element().is_none() {
        return Err(anyhow!("parsed document has no document element"));
    }
    log::trace!("parsed document into {} nodes", dom.descendants(NodeKey::ROOT).len());
    Ok(dom)
}

fn convert_node(dom: &mut DOM, rc_node: &Handle, parent: NodeKey) -> Result<(), Error> {
    match &rc_node.data {
        RcNodeData::Document => {
            for child in rc_node.children.borrow().iter() {
                convert_node(dom, child, parent)?;
            }
        }
        // Doctype and processing instructions carry nothing the overlay reads.
        RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {}
        RcNodeData::Text { contents } => {
            let node = dom.create_text(&contents.borrow());
            dom.append_child(parent, node)?;
        }
        RcNodeData::Comment { contents } => {
            let node = dom.create_comment(contents);
            dom.append_child(parent, node)?;
        }
        RcNodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let node = dom.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                dom.set_attribute(node, &attr.name.local, &attr.value)?;
            }
            dom.append_child(parent, node)?;
            for child in rc_node.children.borrow().iter() {
                convert_node(dom, child, node)?;
            }
            // `<template>` content is parsed into its own fragment.
            if let Some(fragment) = template_contents.borrow().as_ref() {
                convert_node(dom, fragment, node)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_html_head_and_body() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dom = parse_html("<p id=intro>Hello <b>world</b></p>").unwrap();
        let html = dom.document_element().unwrap();
        assert_eq!(dom.tag_name(html), Some("html"));
        assert!(dom.head().is_some());
        let body = dom.body().unwrap();
        let intro = dom.get_element_by_id("intro").unwrap();
        assert_eq!(dom.parent(intro), Some(body));
        assert_eq!(dom.outer_html(intro), "<p id=\"intro\">Hello <b>world</b></p>");
    }

    #[test]
    fn template_content_is_kept() {
        let dom = parse_html(
            r#"<body><template id="row"><li class="item">Entry</li></template></body>"#,
        )
        .unwrap();
        let template = dom.get_element_by_id("row").unwrap();
        assert_eq!(
            dom.outer_html(template),
            r#"<template id="row"><li class="item">Entry</li></template>"#
        );
        assert!(!dom.is_rendered(template));
    }

    #[test]
    fn parsing_leaves_no_pending_records() {
        let mut dom = parse_html("<!DOCTYPE html><div><!-- note --><span>x</span></div>").unwrap();
        assert!(!dom.is_observed());
        assert!(dom.take_records().is_empty());
        let body = dom.body().unwrap();
        assert_eq!(
            dom.outer_html(body),
            "<body><div><!-- note --><span>x</span></div></body>"
        );
    }
}
