//! DOM snapshots for the host.
//!
//! The host renders the markup away from the original page, so a `<base>`
//! tag is injected as the first child of `<head>` to keep relative asset
//! references pointing at the original location. Overlay pins are left out.

use html::Page;
use html::dom::SerializeOptions;
use url::Url;

use crate::pins::PIN_TAG;

/// The `href` for the injected base tag: the page origin followed by `/` for
/// tuple origins, the document's directory for opaque ones (`file:`).
pub fn base_href(url: &Url) -> String {
    let origin = url.origin();
    if origin.is_tuple() {
        return format!("{}/", origin.ascii_serialization());
    }
    url.join(".")
        .map_or_else(|_| url.as_str().to_owned(), |directory| directory.to_string())
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Serialize the document element with the base tag injected.
pub fn dom_snapshot(page: &Page) -> String {
    let Some(root) = page.dom.document_element() else {
        return String::new();
    };
    let options = SerializeOptions {
        head_prefix: Some(format!(
            "<base href=\"{}\">",
            escape_attribute(&base_href(page.url()))
        )),
        skip_tags: vec![PIN_TAG.to_owned()],
    };
    page.dom.serialize(root, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_href_for_tuple_and_opaque_origins() {
        let http = Url::parse("http://localhost:3000/projects/alpha?tab=2#top").unwrap();
        assert_eq!(base_href(&http), "http://localhost:3000/");

        let file = Url::parse("file:///home/sam/site/index.html").unwrap();
        assert_eq!(base_href(&file), "file:///home/sam/site/");
    }

    #[test]
    fn snapshot_starts_head_with_base_tag() {
        let page = Page::from_html(
            "<html><head><title>Portfolio</title></head><body><h1>Hi</h1></body></html>",
            Url::parse("https://portfolio.test/about").unwrap(),
        )
        .unwrap();
        let html = dom_snapshot(&page);
        assert_eq!(
            html,
            "<html><head><base href=\"https://portfolio.test/\"><title>Portfolio</title></head>\
             <body><h1>Hi</h1></body></html>"
        );
    }
}
