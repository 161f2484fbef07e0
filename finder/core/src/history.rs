//! History Synchronizer
//!
//! Mirrors screen transitions into history entries and turns back/forward
//! traversal into screen change requests, so the browser back button walks
//! the finder instead of leaving the page.
//!
//! The first transition replaces the current entry; later transitions push
//! a new one, unless the transition was itself caused by a traversal.

use serde::{Deserialize, Serialize};

use crate::events::HistoryDirection;
use crate::messages::FinderMessage;
use crate::screens::ScreenId;

/// State stored with a history entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    /// Screen the entry points at
    pub id: Option<ScreenId>,
}

/// In-memory session history with browser semantics
///
/// Pushing discards forward entries. The initial entry has no state, like
/// the page the finder was loaded on.
#[derive(Clone, Debug)]
pub struct SessionHistory {
    entries: Vec<HistoryState>,
    cursor: usize,
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHistory {
    /// History containing only the landing entry
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![HistoryState { id: None }],
            cursor: 0,
        }
    }

    /// Overwrite the current entry
    pub fn replace_state(&mut self, state: HistoryState) {
        self.entries[self.cursor] = state;
    }

    /// Add an entry after the current one, discarding forward entries
    pub fn push_state(&mut self, state: HistoryState) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(state);
        self.cursor = self.entries.len() - 1;
    }

    /// Move the cursor; returns the state of the entry moved to
    pub fn go(&mut self, direction: HistoryDirection) -> Option<&HistoryState> {
        match direction {
            HistoryDirection::Back if self.cursor > 0 => self.cursor -= 1,
            HistoryDirection::Forward if self.cursor + 1 < self.entries.len() => {
                self.cursor += 1;
            }
            _ => return None,
        }
        self.entries.get(self.cursor)
    }

    /// State of the current entry
    #[must_use]
    pub fn current(&self) -> &HistoryState {
        &self.entries[self.cursor]
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the landing entry cannot be removed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position
    #[must_use]
    pub fn position(&self) -> usize {
        self.cursor
    }
}

/// Keeps [`SessionHistory`] in step with the navigator
#[derive(Debug, Default)]
pub struct HistorySynchronizer {
    history: SessionHistory,
    initialized: bool,
    pending_pop: Option<ScreenId>,
}

impl HistorySynchronizer {
    /// Create a synchronizer over a fresh history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// React to a bus message
    ///
    /// Only `TransitionStart` matters. Returns the recording message to
    /// publish when an entry was written.
    pub fn observe(&mut self, message: &FinderMessage) -> Option<FinderMessage> {
        let FinderMessage::TransitionStart(info) = message else {
            return None;
        };

        let state = HistoryState {
            id: Some(info.active.clone()),
        };

        if !self.initialized {
            self.initialized = true;
            self.history.replace_state(state);
            tracing::debug!(screen_id = %info.active, "History entry replaced");
            return Some(FinderMessage::HistoryRecorded {
                screen_id: info.active.clone(),
                replaced: true,
            });
        }

        // A traversal superseded by another request leaves its target behind
        if self.pending_pop.take().as_ref() == Some(&info.active) {
            tracing::debug!(screen_id = %info.active, "Transition came from history, not pushing");
            return None;
        }

        self.history.push_state(state);
        tracing::debug!(screen_id = %info.active, "History entry pushed");
        Some(FinderMessage::HistoryRecorded {
            screen_id: info.active.clone(),
            replaced: false,
        })
    }

    /// Handle a back/forward traversal
    ///
    /// Returns the screen to change to when the entry carries one. The next
    /// transition is treated as coming from history only if it lands on that
    /// screen.
    pub fn pop(&mut self, direction: HistoryDirection) -> Option<ScreenId> {
        let id = self.history.go(direction)?.id.clone()?;
        self.pending_pop = Some(id.clone());
        tracing::debug!(screen_id = %id, ?direction, "History traversal");
        Some(id)
    }

    /// Forget the pending traversal when the navigator ignored it
    pub fn cancel_pop(&mut self) {
        self.pending_pop = None;
    }

    /// Whether a traversal is waiting for its transition
    #[must_use]
    pub fn is_pop_pending(&self) -> bool {
        self.pending_pop.is_some()
    }

    /// The underlying history
    #[must_use]
    pub fn history(&self) -> &SessionHistory {
        &self.history
    }
}
