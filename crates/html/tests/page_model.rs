use html::{DOMUpdate, LayoutRect, NavigationSource as _, Page, PageEvent, Viewport};
use std::cell::RefCell;
use std::rc::Rc;
use url::Url;

const GALLERY: &str = r#"<html><body>
  <nav style="position: fixed; height: 50px">Menu</nav>
  <main style="top: 60px; height: 900px">
    <img id="shot" style="left: 20px; top: 40px; width: 320px; height: 180px">
    <p id="hidden" style="display: none">Draft</p>
    <p id="ghost" style="visibility: hidden; height: 20px">Ghost</p>
  </main>
</body></html>"#;

fn gallery() -> Page {
    let mut page = Page::from_html(GALLERY, Url::parse("https://gallery.test/").unwrap())
        .unwrap()
        .with_viewport(Viewport::new(800.0, 600.0));
    page.layout_from_inline_styles();
    page
}

#[test]
fn inline_geometry_lays_out_boxes() {
    let page = gallery();
    let shot = page.dom.get_element_by_id("shot").unwrap();
    assert_eq!(page.dom.layout(shot), Some(LayoutRect::new(20.0, 100.0, 320.0, 180.0)));
    assert_eq!(page.dom.offset_parent(shot), page.dom.body());

    let hidden = page.dom.get_element_by_id("hidden").unwrap();
    assert!(!page.dom.is_rendered(hidden));
    assert_eq!(page.dom.offset_width(hidden), 0.0);
    assert_eq!(page.dom.offset_parent(hidden), None);

    let ghost = page.dom.get_element_by_id("ghost").unwrap();
    assert!(page.dom.is_rendered(ghost));
    assert_eq!(page.dom.offset_height(ghost), 20.0);
}

#[test]
fn scrolling_moves_flow_content_but_not_fixed_content() {
    let mut page = gallery();
    page.scroll_to(0.0, 80.0);
    let shot = page.dom.get_element_by_id("shot").unwrap();
    assert_eq!(
        page.dom.bounding_client_rect(shot, page.viewport()),
        LayoutRect::new(20.0, 20.0, 320.0, 180.0)
    );
    let nav = page
        .dom
        .descendants(page.dom.root())
        .into_iter()
        .find(|key| page.dom.tag_name(*key) == Some("nav"))
        .unwrap();
    assert_eq!(page.dom.bounding_client_rect(nav, page.viewport()).y, 0.0);
    assert_eq!(page.dom.offset_parent(nav), None);
    assert_eq!(page.click_at(30.0, 30.0), Some(shot));
}

#[test]
fn observed_mutations_are_recorded_until_paused() {
    let mut page = gallery();
    let shot = page.dom.get_element_by_id("shot").unwrap();
    page.dom.set_attribute(shot, "alt", "before").unwrap();
    assert!(page.dom.take_records().is_empty());

    page.dom.observe();
    page.dom.set_attribute(shot, "alt", "screenshot").unwrap();
    {
        let mut paused = page.dom.pause_observer();
        let marker = paused.create_element("div");
        let body = paused.body().unwrap();
        paused.append_child(body, marker).unwrap();
    }
    page.dom.remove_attribute(shot, "alt").unwrap();

    let records = page.dom.take_records();
    assert_eq!(
        records,
        [DOMUpdate::RemoveAttr {
            node: shot,
            name: "alt".to_owned()
        }]
    );
    assert!(page.dom.suppressed_mutations() >= 1);
}

#[test]
fn history_listeners_see_spa_navigation() {
    let mut page = gallery();
    let mut receiver = page.take_task_receiver().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    page.history_mut()
        .on_navigate(Box::new(move |url: &Url| sink.borrow_mut().push(url.path().to_owned())));

    page.history_mut()
        .push_state(Url::parse("https://gallery.test/albums/2").unwrap());
    page.history_mut()
        .replace_state(Url::parse("https://gallery.test/albums/3").unwrap());
    assert!(page.history_mut().back());
    assert!(!page.history_mut().back());

    assert_eq!(*seen.borrow(), ["/albums/2", "/albums/3", "/"]);
    assert_eq!(page.url().as_str(), "https://gallery.test/");
    page.finish_load();
    assert_eq!(receiver.try_recv().unwrap(), PageEvent::Load);
}
