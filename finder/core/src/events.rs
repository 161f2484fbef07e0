//! Finder Events
//!
//! Events sent from surfaces to the finder core: clicks on navigation,
//! form input, browser back/forward, animation completion. Surfaces report
//! what happened; the navigator decides what it means.

use serde::{Deserialize, Serialize};

use crate::form::FormValue;
use crate::screens::{ScreenDescriptor, ScreenId};

/// Direction of a browser history traversal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryDirection {
    /// Browser back button
    Back,
    /// Browser forward button
    Forward,
}

/// Events from surfaces to the finder core
#[derive(Clone, Debug)]
pub enum FinderEvent {
    /// A screen component mounted and declared itself
    RegisterScreen(ScreenDescriptor),

    /// Registration finished; select the initial screen
    Start,

    /// "Continue" button
    NextScreen,

    /// Clickable navigation towards a position in the sequence
    RequestScreen {
        /// Requested index
        index: usize,
    },

    /// Jump straight to a screen, bypassing skip rules
    ChangeScreen {
        /// Target screen
        id: ScreenId,
    },

    /// Serialized form values changed
    FormChanged {
        /// All current values, in form order
        values: Vec<FormValue>,
    },

    /// Browser back/forward
    HistoryPop {
        /// Traversal direction
        direction: HistoryDirection,
    },

    /// The surface finished animating the active transition
    TransitionSettled,

    /// Results surface reported how many results it shows
    ResultsCounted {
        /// Visible results
        count: u32,
    },

    /// Stop the event loop
    Shutdown,
}

impl FinderEvent {
    /// Short name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegisterScreen(_) => "register_screen",
            Self::Start => "start",
            Self::NextScreen => "next_screen",
            Self::RequestScreen { .. } => "request_screen",
            Self::ChangeScreen { .. } => "change_screen",
            Self::FormChanged { .. } => "form_changed",
            Self::HistoryPop { .. } => "history_pop",
            Self::TransitionSettled => "transition_settled",
            Self::ResultsCounted { .. } => "results_counted",
            Self::Shutdown => "shutdown",
        }
    }
}
