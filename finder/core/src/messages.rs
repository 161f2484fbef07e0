//! Finder Messages
//!
//! Messages published by the finder core on the event bus. Every visual
//! component of a finder page (progress bars, step animations, loaders,
//! sticky navigation, analytics hooks) is a pure consumer of these messages.
//!
//! # Design Philosophy
//!
//! The navigator decides; surfaces render. Messages form a closed set so a
//! listener can never subscribe to a lifecycle event whose payload shape it
//! does not know about.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::screens::ScreenId;

/// Payload shared by the three transition lifecycle messages
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInfo {
    /// Screen becoming active
    pub active: ScreenId,
    /// Screen that was active before (none on the first transition)
    pub previous: Option<ScreenId>,
    /// Whether navigation goes backward in the screen sequence
    pub reverse: bool,
}

/// Name of the screen change notification dispatched for page-level
/// listeners (analytics tags, embedding pages)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenChangeEvent {
    /// Legacy name kept for listeners written against the shoe finder
    ShoeFinder,
    /// Current name
    Finder,
}

impl ScreenChangeEvent {
    /// DOM event name
    #[must_use]
    pub fn dom_name(&self) -> &'static str {
        match self {
            Self::ShoeFinder => "shoeFinderScreenChange",
            Self::Finder => "finderScreenChange",
        }
    }
}

/// Messages from the finder core to surfaces
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FinderMessage {
    // ============================================
    // Transition Lifecycle
    // ============================================
    /// A transition started; outgoing screen should begin leaving
    TransitionStart(TransitionInfo),

    /// Incoming screen should animate in
    TransitionActive(TransitionInfo),

    /// Transition finished
    TransitionEnd(TransitionInfo),

    /// Viewport should scroll back to the top
    ScrollToTop,

    /// Screen change notification for page-level listeners
    ScreenChanged {
        /// Which notification name this is
        event: ScreenChangeEvent,
        /// Previously active screen
        previous: Option<ScreenId>,
        /// Newly active screen
        active: ScreenId,
    },

    /// The results screen became visible
    ResultsViewed {
        /// Results screen id
        screen_id: ScreenId,
        /// Number of visible results, if the results surface reported it
        result_count: Option<u32>,
    },

    // ============================================
    // Dependencies
    // ============================================
    /// A screen dependency started loading
    Loading {
        /// Screen waiting for data
        screen_id: ScreenId,
    },

    /// A screen dependency resolved
    DataLoaded {
        /// Screen the data belongs to
        screen_id: ScreenId,
        /// Response data, passed through unmodified
        data: Value,
    },

    /// A screen dependency failed; navigation was abandoned
    DependencyFailed {
        /// Screen whose dependency failed
        screen_id: ScreenId,
        /// Failure message
        reason: String,
    },

    /// Blocking message for the shopper
    Alert {
        /// Text to show
        message: String,
    },

    // ============================================
    // Form State
    // ============================================
    /// Form values changed
    FormUpdated {
        /// Steps complete after this update, in registration order
        completed_steps: Vec<ScreenId>,
        /// Whether every registered step is complete
        all_completed: bool,
    },

    /// A step became complete with the latest update
    StepCompleted {
        /// Step that completed
        screen_id: ScreenId,
    },

    // ============================================
    // History
    // ============================================
    /// A history entry was written for a screen
    HistoryRecorded {
        /// Screen recorded
        screen_id: ScreenId,
        /// Whether the entry replaced the current one instead of pushing
        replaced: bool,
    },
}

impl FinderMessage {
    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransitionStart(_) => "transition_start",
            Self::TransitionActive(_) => "transition_active",
            Self::TransitionEnd(_) => "transition_end",
            Self::ScrollToTop => "scroll_to_top",
            Self::ScreenChanged { .. } => "screen_changed",
            Self::ResultsViewed { .. } => "results_viewed",
            Self::Loading { .. } => "loading",
            Self::DataLoaded { .. } => "data_loaded",
            Self::DependencyFailed { .. } => "dependency_failed",
            Self::Alert { .. } => "alert",
            Self::FormUpdated { .. } => "form_updated",
            Self::StepCompleted { .. } => "step_completed",
            Self::HistoryRecorded { .. } => "history_recorded",
        }
    }

    /// Transition payload, for the three lifecycle messages
    #[must_use]
    pub fn transition(&self) -> Option<&TransitionInfo> {
        match self {
            Self::TransitionStart(info) | Self::TransitionActive(info) | Self::TransitionEnd(info) => {
                Some(info)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_names() {
        assert_eq!(ScreenChangeEvent::ShoeFinder.dom_name(), "shoeFinderScreenChange");
        assert_eq!(ScreenChangeEvent::Finder.dom_name(), "finderScreenChange");
    }

    #[test]
    fn test_transition_accessor() {
        let info = TransitionInfo {
            active: ScreenId::new("terrain"),
            previous: None,
            reverse: false,
        };
        assert_eq!(
            FinderMessage::TransitionActive(info.clone()).transition(),
            Some(&info)
        );
        assert!(FinderMessage::ScrollToTop.transition().is_none());
    }

    #[test]
    fn test_json_shape() {
        let msg = FinderMessage::ScreenChanged {
            event: ScreenChangeEvent::Finder,
            previous: Some(ScreenId::new("start")),
            active: ScreenId::new("terrain"),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "screen_changed");
        assert_eq!(json["previous"], "start");
        assert_eq!(json["active"], "terrain");
    }
}
