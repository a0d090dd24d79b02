//! Interaction layer
//!
//! UI-facing state machines of the chat screen:
//! - `swipe` - swipe-to-reply drag tracking
//! - `selection` - long-press multi-select and bulk-delete validation
//! - `reply` - reply draft and reply-click highlight
//! - `attachment` - image staging and validation

pub mod attachment;
pub mod reply;
pub mod selection;
pub mod swipe;

pub use attachment::{AttachmentState, StagedImage};
pub use reply::{ReplyState, ScrollTarget};
pub use selection::SelectionState;
pub use swipe::{SwipeDirection, SwipeRelease, SwipeTracker};
