//! Ephemeral highlight of a looked-up state or transition.
//!
//! A highlight flashes for [`HIGHLIGHT_WINDOW`] and then clears itself. It is
//! never persisted. Time is passed in by the caller so the expiry can be
//! driven by a real clock or a simulated one.

use std::time::{Duration, Instant};

use crate::types::{StateId, TransitionId};

/// How long a highlight stays visible.
pub const HIGHLIGHT_WINDOW: Duration = Duration::from_millis(3000);

/// The highlight targets in effect for one projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    pub state: Option<StateId>,
    pub transition: Option<TransitionId>,
}

impl Highlight {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn state(id: impl Into<StateId>) -> Self {
        Self {
            state: Some(id.into()),
            transition: None,
        }
    }

    pub fn transition(id: impl Into<TransitionId>) -> Self {
        Self {
            state: None,
            transition: Some(id.into()),
        }
    }

    pub fn is_state(&self, id: &str) -> bool {
        self.state.as_deref() == Some(id)
    }

    pub fn is_transition(&self, id: &str) -> bool {
        self.transition.as_deref() == Some(id)
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.transition.is_none()
    }
}

/// Tracks when each highlight was set so it can expire.
///
/// State and transition highlights expire independently.
#[derive(Debug, Clone)]
pub struct HighlightTracker {
    state: Option<(StateId, Instant)>,
    transition: Option<(TransitionId, Instant)>,
    window: Duration,
}

impl Default for HighlightTracker {
    fn default() -> Self {
        Self::with_window(HIGHLIGHT_WINDOW)
    }
}

impl HighlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            state: None,
            transition: None,
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Highlight a state, replacing any earlier state highlight.
    pub fn highlight_state(&mut self, id: impl Into<StateId>, now: Instant) {
        self.state = Some((id.into(), now));
    }

    /// Highlight a transition, replacing any earlier transition highlight.
    pub fn highlight_transition(&mut self, id: impl Into<TransitionId>, now: Instant) {
        self.transition = Some((id.into(), now));
    }

    /// Highlights still inside their window at `now`.
    pub fn current(&self, now: Instant) -> Highlight {
        Highlight {
            state: self.active(&self.state, now),
            transition: self.active(&self.transition, now),
        }
    }

    /// Drop expired highlights. Returns `true` if anything was dropped.
    pub fn clear_expired(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self.state.is_some() && self.active(&self.state, now).is_none() {
            self.state = None;
            changed = true;
        }
        if self.transition.is_some() && self.active(&self.transition, now).is_none() {
            self.transition = None;
            changed = true;
        }
        changed
    }

    pub fn clear(&mut self) {
        self.state = None;
        self.transition = None;
    }

    fn active(&self, slot: &Option<(String, Instant)>, now: Instant) -> Option<String> {
        slot.as_ref()
            .filter(|(_, set_at)| now.saturating_duration_since(*set_at) < self.window)
            .map(|(id, _)| id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_visible_inside_window() {
        let start = Instant::now();
        let mut tracker = HighlightTracker::new();
        tracker.highlight_state("review", start);

        let current = tracker.current(start + Duration::from_millis(2999));
        assert!(current.is_state("review"));
    }

    #[test]
    fn highlight_gone_after_window() {
        let start = Instant::now();
        let mut tracker = HighlightTracker::new();
        tracker.highlight_state("review", start);

        let later = start + HIGHLIGHT_WINDOW;
        assert!(tracker.current(later).is_empty());
        assert!(tracker.clear_expired(later));
        assert!(!tracker.clear_expired(later));
    }

    #[test]
    fn state_and_transition_expire_independently() {
        let start = Instant::now();
        let mut tracker = HighlightTracker::new();
        tracker.highlight_state("review", start);
        tracker.highlight_transition("publish", start + Duration::from_millis(2000));

        let at = start + Duration::from_millis(3500);
        let current = tracker.current(at);
        assert!(current.state.is_none());
        assert!(current.is_transition("publish"));
    }

    #[test]
    fn rehighlight_restarts_the_window() {
        let start = Instant::now();
        let mut tracker = HighlightTracker::new();
        tracker.highlight_state("a", start);
        tracker.highlight_state("b", start + Duration::from_millis(2500));

        let current = tracker.current(start + Duration::from_millis(4000));
        assert!(current.is_state("b"));
    }

    #[test]
    fn clear_removes_everything() {
        let now = Instant::now();
        let mut tracker = HighlightTracker::new();
        tracker.highlight_state("a", now);
        tracker.highlight_transition("t", now);
        tracker.clear();
        assert!(tracker.current(now).is_empty());
    }
}
