//! Debounced scheduling of reconciliation passes.
//!
//! Every layout-affecting event re-arms a single deadline; the pass runs once
//! the page has been quiet for the debounce delay. Callers pass `now`
//! explicitly so the state machine stays deterministic under test.

use core::fmt;
use core::mem;
use core::time::Duration;

use html::DOMUpdate;
use log::trace;
use overlay_protocol::VisibilityDelta;
use tokio::time::Instant;

use crate::anchor::Anchor;

/// What caused a pass to be scheduled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Mutation,
    Resize,
    Scroll,
    Navigation,
    Load,
    CommentsLoaded,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mutation => "mutation",
            Self::Resize => "resize",
            Self::Scroll => "scroll",
            Self::Navigation => "navigation",
            Self::Load => "load",
            Self::CommentsLoaded => "comments loaded",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    ScheduledPending { deadline: Instant },
    Reconciling,
}

#[derive(Debug)]
pub struct ChangeWatcher {
    delay: Duration,
    state: WatchState,
    /// Triggers folded into the pending pass.
    coalesced: u64,
    passes: u64,
}

impl ChangeWatcher {
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: WatchState::Idle,
            coalesced: 0,
            passes: 0,
        }
    }

    pub const fn state(&self) -> WatchState {
        self.state
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Completed passes since creation.
    pub const fn passes(&self) -> u64 {
        self.passes
    }

    pub const fn deadline(&self) -> Option<Instant> {
        match self.state {
            WatchState::ScheduledPending { deadline } => Some(deadline),
            WatchState::Idle | WatchState::Reconciling => None,
        }
    }

    /// (Re)arm the deadline at `now + delay`.
    pub fn schedule(&mut self, trigger: Trigger, now: Instant) {
        if self.state == WatchState::Reconciling {
            trace!("ignoring {trigger} raised by the running pass");
            return;
        }
        if matches!(self.state, WatchState::ScheduledPending { .. }) {
            self.coalesced = self.coalesced.saturating_add(1);
        }
        trace!("{trigger}: pass re-armed");
        self.state = WatchState::ScheduledPending {
            deadline: now + self.delay,
        };
    }

    /// Feed delivered mutation records. Returns whether a pass was scheduled.
    pub fn on_mutations(&mut self, records: &[DOMUpdate], now: Instant) -> bool {
        if records.is_empty() {
            return false;
        }
        trace!("{} mutation records delivered", records.len());
        self.schedule(Trigger::Mutation, now);
        true
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Enter the reconciling state. Returns the number of triggers coalesced into this pass.
    pub fn begin_pass(&mut self) -> u64 {
        self.state = WatchState::Reconciling;
        mem::take(&mut self.coalesced)
    }

    pub fn finish_pass(&mut self) {
        self.state = WatchState::Idle;
        self.passes = self.passes.saturating_add(1);
    }
}

/// Record a fresh classification on an anchor, adding it to the delta if its
/// category changed. Anchors never classified before always count as changed.
pub fn record_visibility(anchor: &mut Anchor, visible: bool, delta: &mut VisibilityDelta) {
    if anchor.last_known_visible == Some(visible) {
        return;
    }
    anchor.last_known_visible = Some(visible);
    if visible {
        delta.became_visible.push(anchor.id.clone());
    } else {
        delta.became_hidden.push(anchor.id.clone());
    }
}
