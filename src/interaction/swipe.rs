//! Swipe-to-reply gesture tracking
//!
//! idle -> dragging(offset) -> committed | cancelled. Own bubbles drag left,
//! others drag right; movement the other way is ignored. The offset is
//! clamped to `max_offset` and a release beyond `threshold` commits.

use crate::settings::ChatSettings;

/// Allowed drag direction of a bubble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Own messages
    Left,
    /// Messages from others
    Right,
}

impl SwipeDirection {
    /// Direction for a bubble authored by the local user or not
    pub fn for_bubble(own: bool) -> Self {
        if own {
            SwipeDirection::Left
        } else {
            SwipeDirection::Right
        }
    }
}

/// How a drag ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwipeRelease {
    /// Past the threshold: reply to `message_id`
    Committed {
        /// Swiped message
        message_id: String,
    },
    /// Below the threshold: snap back
    Cancelled,
}

#[derive(Debug, Clone)]
struct ActiveSwipe {
    message_id: String,
    direction: SwipeDirection,
    offset: f32,
}

/// Tracks the one bubble currently being dragged
#[derive(Debug, Clone)]
pub struct SwipeTracker {
    max_offset: f32,
    threshold: f32,
    active: Option<ActiveSwipe>,
}

impl SwipeTracker {
    /// Create a tracker with the configured limits
    pub fn new(settings: &ChatSettings) -> Self {
        Self {
            max_offset: settings.swipe_max_offset,
            threshold: settings.swipe_commit_threshold,
            active: None,
        }
    }

    /// Touch down on a bubble
    ///
    /// Returns `false` without starting when `suppressed` (multi-select mode).
    pub fn begin(&mut self, message_id: &str, own: bool, suppressed: bool) -> bool {
        if suppressed {
            self.active = None;
            return false;
        }
        self.active = Some(ActiveSwipe {
            message_id: message_id.to_string(),
            direction: SwipeDirection::for_bubble(own),
            offset: 0.0,
        });
        true
    }

    /// Horizontal displacement since touch down (positive = right)
    ///
    /// Returns the clamped offset magnitude, or `None` when idle.
    pub fn drag(&mut self, dx: f32) -> Option<f32> {
        let max_offset = self.max_offset;
        let active = self.active.as_mut()?;
        let toward = match active.direction {
            SwipeDirection::Left => -dx,
            SwipeDirection::Right => dx,
        };
        active.offset = toward.clamp(0.0, max_offset);
        Some(active.offset)
    }

    /// Touch up; returns `None` when no drag was in progress
    pub fn release(&mut self) -> Option<SwipeRelease> {
        let active = self.active.take()?;
        if active.offset > self.threshold {
            Some(SwipeRelease::Committed {
                message_id: active.message_id,
            })
        } else {
            Some(SwipeRelease::Cancelled)
        }
    }

    /// Abandon the drag without committing
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Signed render offset of `message_id` (negative = left)
    pub fn offset_for(&self, message_id: &str) -> f32 {
        match &self.active {
            Some(a) if a.message_id == message_id => match a.direction {
                SwipeDirection::Left => -a.offset,
                SwipeDirection::Right => a.offset,
            },
            _ => 0.0,
        }
    }
}
