use core::mem;
use core::ops::{Deref, DerefMut};

use crate::dom::{DOM, NodeKey};

/// A mutation record produced by a structural or attribute change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DOMUpdate {
    InsertElement {
        parent: NodeKey,
        node: NodeKey,
        tag: String,
        pos: usize,
    },
    InsertText {
        parent: NodeKey,
        node: NodeKey,
        text: String,
        pos: usize,
    },
    SetAttr {
        node: NodeKey,
        name: String,
        value: String,
    },
    RemoveAttr {
        node: NodeKey,
        name: String,
    },
    RemoveNode {
        node: NodeKey,
    },
}

impl DOMUpdate {
    /// The node the record is about.
    pub const fn target(&self) -> NodeKey {
        match self {
            Self::InsertElement { node, .. }
            | Self::InsertText { node, .. }
            | Self::SetAttr { node, .. }
            | Self::RemoveAttr { node, .. }
            | Self::RemoveNode { node } => *node,
        }
    }
}

/// Document-wide mutation recording, modelled after a subtree MutationObserver
/// on the document element.
#[derive(Debug, Default)]
pub struct MutationObserver {
    connected: bool,
    records: Vec<DOMUpdate>,
    suppressed: u64,
}

impl MutationObserver {
    pub(crate) fn connect(&mut self) {
        self.connected = true;
    }

    pub(crate) fn disconnect(&mut self) {
        self.connected = false;
        self.records.clear();
    }

    pub(crate) const fn wants_records(&self) -> bool {
        self.connected
    }

    pub(crate) fn record(&mut self, update: DOMUpdate) {
        self.records.push(update);
    }

    pub(crate) fn suppress(&mut self) {
        self.suppressed = self.suppressed.saturating_add(1);
    }

    pub(crate) fn record_or_suppress(&mut self, update: DOMUpdate) {
        if self.connected {
            self.record(update);
        } else {
            self.suppress();
        }
    }

    pub(crate) fn take_records(&mut self) -> Vec<DOMUpdate> {
        mem::take(&mut self.records)
    }

    pub(crate) const fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

/// Guard returned by [`DOM::pause_observer`]. Dereferences to the DOM so all
/// writes inside the critical section go through it; recording resumes on drop.
pub struct ObserverPause<'dom> {
    dom: &'dom mut DOM,
    resume: bool,
}

impl<'dom> ObserverPause<'dom> {
    pub(crate) fn new(dom: &'dom mut DOM, resume: bool) -> Self {
        Self { dom, resume }
    }
}

impl Deref for ObserverPause<'_> {
    type Target = DOM;

    fn deref(&self) -> &DOM {
        self.dom
    }
}

impl DerefMut for ObserverPause<'_> {
    fn deref_mut(&mut self) -> &mut DOM {
        self.dom
    }
}

impl Drop for ObserverPause<'_> {
    fn drop(&mut self) {
        if self.resume {
            self.dom.observer_mut().connect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> (DOM, NodeKey) {
        let mut dom = DOM::new();
        let html = dom.create_element("html");
        let body = dom.create_element("body");
        dom.append_child(NodeKey::ROOT, html).unwrap();
        dom.append_child(html, body).unwrap();
        (dom, body)
    }

    #[test]
    fn records_only_while_observing() {
        let (mut dom, body) = document();
        let div = dom.create_element("div");
        dom.append_child(body, div).unwrap();
        assert!(dom.take_records().is_empty());

        dom.observe();
        dom.set_attribute(div, "class", "card").unwrap();
        let records = dom.take_records();
        assert_eq!(
            records,
            vec![DOMUpdate::SetAttr {
                node: div,
                name: "class".to_owned(),
                value: "card".to_owned(),
            }]
        );
    }

    #[test]
    fn pause_suppresses_and_resumes() {
        let (mut dom, body) = document();
        dom.observe();
        {
            let mut paused = dom.pause_observer();
            let pin = paused.create_element("annotation-pin");
            paused.append_child(body, pin).unwrap();
            paused.remove_node(pin).unwrap();
        }
        assert!(dom.take_records().is_empty());
        assert_eq!(dom.suppressed_mutations(), 2);
        assert!(dom.is_observed());

        let div = dom.create_element("div");
        dom.append_child(body, div).unwrap();
        assert_eq!(dom.take_records().len(), 1);
    }

    #[test]
    fn nested_pause_keeps_recording_off() {
        let (mut dom, body) = document();
        dom.observe();
        let mut outer = dom.pause_observer();
        {
            let mut inner = outer.pause_observer();
            let div = inner.create_element("div");
            inner.append_child(body, div).unwrap();
        }
        assert!(!outer.is_observed());
        drop(outer);
        assert!(dom.is_observed());
    }

    #[test]
    fn insert_position_counts_preceding_siblings() {
        let (mut dom, body) = document();
        let first = dom.create_element("p");
        dom.append_child(body, first).unwrap();
        dom.observe();
        let second = dom.create_element("p");
        dom.append_child(body, second).unwrap();
        match dom.take_records().as_slice() {
            [DOMUpdate::InsertElement { parent, node, pos, .. }] => {
                assert_eq!(*parent, body);
                assert_eq!(*node, second);
                assert_eq!(*pos, 1);
            }
            other => panic!("unexpected records: {other:?}"),
        }
    }
}
