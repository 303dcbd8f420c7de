//! Scroll position bookkeeping for the timeline and the conversation list.
//!
//! The controller never touches a view. It is fed viewport measurements and
//! answers with [`ScrollCommand`]s for the presentation layer plus "load more"
//! decisions for the runtime.

use std::time::Duration;

use crate::config::ScrollThresholds;
use crate::constants::FORCE_SCROLL_RETRY_MS;

/// One measurement of a scrollable container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl Viewport {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    pub fn distance_from_bottom(&self) -> f64 {
        (self.scroll_height - self.scroll_top - self.client_height).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScrollCommand {
    ScrollToBottom,
    /// Scroll to bottom now and again after each delay, while layout settles
    ScrollToBottomWithRetries(Vec<Duration>),
    SetScrollTop(f64),
}

/// Content height captured when an older page was requested.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PrependAnchor {
    scroll_height: f64,
}

#[derive(Debug, Clone)]
pub struct ScrollController {
    thresholds: ScrollThresholds,
    at_bottom: bool,
    last_timeline: Option<Viewport>,
    anchor: Option<PrependAnchor>,
}

impl ScrollController {
    pub fn new(thresholds: ScrollThresholds) -> Self {
        Self {
            thresholds,
            at_bottom: true,
            last_timeline: None,
            anchor: None,
        }
    }

    pub fn is_at_bottom(&self) -> bool {
        self.at_bottom
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Record a timeline scroll. Returns true when the viewport is near the top
    /// and an older page should be requested.
    pub fn on_timeline_scroll(&mut self, viewport: Viewport, can_load_older: bool) -> bool {
        self.at_bottom = viewport.distance_from_bottom() <= self.thresholds.bottom_px;
        self.last_timeline = Some(viewport);
        can_load_older && self.anchor.is_none() && viewport.scroll_top <= self.thresholds.top_px
    }

    /// Remember the current content height so the prepend can be compensated.
    pub fn begin_prepend(&mut self) {
        self.anchor = self.last_timeline.map(|v| PrependAnchor {
            scroll_height: v.scroll_height,
        });
    }

    /// Older content was rendered above the viewport. Shift the reader's latest
    /// offset by exactly the height that was added, so scrolling done while the
    /// page was in flight is kept.
    pub fn on_prepend_rendered(&mut self, new_scroll_height: f64) -> Option<ScrollCommand> {
        let anchor = self.anchor.take()?;
        let current_top = self.last_timeline.map(|v| v.scroll_top)?;
        let delta = new_scroll_height - anchor.scroll_height;
        let scroll_top = current_top + delta;
        if let Some(last) = self.last_timeline.as_mut() {
            last.scroll_top = scroll_top;
            last.scroll_height = new_scroll_height;
        }
        Some(ScrollCommand::SetScrollTop(scroll_top))
    }

    /// The older-page request finished without anything to render.
    pub fn cancel_prepend(&mut self) {
        self.anchor = None;
    }

    /// New conversation or first load: pin to the bottom with retries.
    pub fn on_conversation_switch(&mut self) -> ScrollCommand {
        self.at_bottom = true;
        self.last_timeline = None;
        self.anchor = None;
        ScrollCommand::ScrollToBottomWithRetries(
            FORCE_SCROLL_RETRY_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        )
    }

    /// A message was appended at the tail. Follow it only if the reader was
    /// already at the bottom.
    pub fn on_append(&mut self) -> Option<ScrollCommand> {
        self.at_bottom.then_some(ScrollCommand::ScrollToBottom)
    }

    /// Record a conversation list scroll. Returns true when the next registry
    /// page should be requested.
    pub fn on_list_scroll(&self, viewport: Viewport, has_more: bool, loading: bool) -> bool {
        has_more && !loading && viewport.distance_from_bottom() <= self.thresholds.list_bottom_px
    }
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(ScrollThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_bottom_tracking() {
        let mut scroll = ScrollController::default();
        scroll.on_timeline_scroll(Viewport::new(1500.0, 2000.0, 450.0), false);
        assert!(scroll.is_at_bottom());
        assert_eq!(scroll.on_append(), Some(ScrollCommand::ScrollToBottom));

        scroll.on_timeline_scroll(Viewport::new(800.0, 2000.0, 450.0), false);
        assert!(!scroll.is_at_bottom());
        assert_eq!(scroll.on_append(), None);
    }

    #[test]
    fn test_near_top_requests_older_once() {
        let mut scroll = ScrollController::default();
        assert!(scroll.on_timeline_scroll(Viewport::new(20.0, 3000.0, 500.0), true));
        scroll.begin_prepend();
        assert!(
            !scroll.on_timeline_scroll(Viewport::new(10.0, 3000.0, 500.0), true),
            "a prepend is already pending"
        );
        assert!(!scroll.on_timeline_scroll(Viewport::new(400.0, 3000.0, 500.0), true));
    }

    #[test]
    fn test_no_older_request_when_exhausted() {
        let mut scroll = ScrollController::default();
        assert!(!scroll.on_timeline_scroll(Viewport::new(0.0, 3000.0, 500.0), false));
    }

    #[test]
    fn test_prepend_shifts_by_exact_height() {
        let mut scroll = ScrollController::default();
        scroll.on_timeline_scroll(Viewport::new(12.0, 2000.0, 500.0), true);
        scroll.begin_prepend();

        let added = 737.5;
        assert_eq!(
            scroll.on_prepend_rendered(2000.0 + added),
            Some(ScrollCommand::SetScrollTop(12.0 + added))
        );
        assert_eq!(scroll.on_prepend_rendered(5000.0), None);
    }

    #[test]
    fn test_prepend_keeps_scrolling_done_while_loading() {
        let mut scroll = ScrollController::default();
        assert!(scroll.on_timeline_scroll(Viewport::new(10.0, 900.0, 400.0), true));
        scroll.begin_prepend();
        scroll.on_timeline_scroll(Viewport::new(300.0, 900.0, 400.0), true);

        assert_eq!(
            scroll.on_prepend_rendered(1140.0),
            Some(ScrollCommand::SetScrollTop(540.0))
        );
    }

    #[test]
    fn test_switch_forces_bottom_with_retries() {
        let mut scroll = ScrollController::default();
        scroll.on_timeline_scroll(Viewport::new(0.0, 2000.0, 500.0), true);
        scroll.begin_prepend();

        let command = scroll.on_conversation_switch();
        assert_eq!(
            command,
            ScrollCommand::ScrollToBottomWithRetries(vec![
                Duration::from_millis(0),
                Duration::from_millis(50),
                Duration::from_millis(150),
                Duration::from_millis(300),
            ])
        );
        assert!(scroll.is_at_bottom());
        assert!(!scroll.is_anchored());
    }

    #[test]
    fn test_list_scroll_guard() {
        let scroll = ScrollController::default();
        let near_bottom = Viewport::new(1650.0, 2400.0, 600.0);
        assert!(scroll.on_list_scroll(near_bottom, true, false));
        assert!(!scroll.on_list_scroll(near_bottom, true, true));
        assert!(!scroll.on_list_scroll(near_bottom, false, false));
        assert!(!scroll.on_list_scroll(Viewport::new(0.0, 2400.0, 600.0), true, false));
    }
}
