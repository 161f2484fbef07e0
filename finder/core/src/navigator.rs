//! Screen Navigator - The Finder State Machine
//!
//! The navigator owns the ordered screen sequence and the single active
//! screen. It decides where a navigation request really lands (skipping
//! answered steps, funnelling the shopper to the first unanswered question,
//! interposing priority checkpoints) and drives the transition lifecycle
//! every surface animates against.
//!
//! # Transition Protocol
//!
//! ```text
//!            change_screen
//!   Idle ─────────────────────► Starting ──(start_delay)──► Active
//!    ▲                          publish                     publish
//!    │                          TransitionStart             TransitionActive
//!    │                                                         │
//!    │                                  (end_delay or settled) │
//!    └──────────────── Ending ◄────────────────────────────────┘
//!                      publish TransitionEnd, ScreenChanged, ResultsViewed
//! ```
//!
//! Timers are deadlines checked by [`ScreenNavigator::poll`]; the owner of the
//! navigator sleeps until [`ScreenNavigator::next_wakeup`]. A screen
//! dependency runs on a spawned task and its outcome is picked up by the same
//! poll, so the navigator never blocks and is only ever touched by one task.
//!
//! # Busy Handling
//!
//! While a transition runs or a dependency loads, new requests are handled
//! by the configured [`BusyPolicy`]: dropped, or coalesced into a single
//! pending slot (last request wins) that is replayed once idle.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::bus::EventBus;
use crate::dependency::DependencyOutcome;
use crate::form::StepCompletion;
use crate::messages::{FinderMessage, ScreenChangeEvent, TransitionInfo};
use crate::screens::{Screen, ScreenId, ScreenType};

/// Durations of the transition lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionTimings {
    /// Starting → Active
    pub start_delay: Duration,
    /// Active → scroll to top
    pub scroll_delay: Duration,
    /// Active → Ending, unless the surface settles earlier
    pub end_delay: Duration,
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_millis(50),
            scroll_delay: Duration::from_millis(750),
            end_delay: Duration::from_millis(2000),
        }
    }
}

/// What happens to requests that arrive while the navigator is busy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Ignore them
    Drop,
    /// Keep the latest one and replay it once idle
    #[default]
    Coalesce,
}

impl BusyPolicy {
    /// Parse a policy name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Some(Self::Drop),
            "coalesce" => Some(Self::Coalesce),
            _ => None,
        }
    }
}

/// Navigator configuration
#[derive(Clone, Debug)]
pub struct NavigatorConfig {
    /// Transition lifecycle durations
    pub timings: TransitionTimings,
    /// Busy request handling
    pub busy_policy: BusyPolicy,
    /// Retry interval of the initial selection while no screen is registered
    pub bootstrap_poll: Duration,
    /// How often a loading dependency is checked
    pub dependency_poll: Duration,
    /// Screen whose display is reported as `ResultsViewed`
    pub results_screen_id: Option<ScreenId>,
    /// Also publish the legacy `shoeFinderScreenChange` notification
    pub legacy_screen_change_event: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            timings: TransitionTimings::default(),
            busy_policy: BusyPolicy::default(),
            bootstrap_poll: Duration::from_millis(50),
            dependency_poll: Duration::from_millis(10),
            results_screen_id: Some(ScreenId::new("Results")),
            legacy_screen_change_event: true,
        }
    }
}

/// Phase of the transition state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionPhase {
    /// No transition running
    Idle,
    /// Started, waiting to activate
    Starting,
    /// Incoming screen animating in
    Active,
    /// Finishing
    Ending,
}

/// A request held back while the navigator was busy
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingRequest {
    /// `next_screen`
    Next,
    /// `request_screen_change`
    Index(usize),
    /// `change_screen`
    Screen(ScreenId),
}

/// What a navigation call did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Transition started
    Started,
    /// Waiting for the target's dependency
    Loading,
    /// Busy; request kept for replay
    Deferred,
    /// Busy; request dropped
    Dropped,
    /// The target's dependency could not be started
    Failed,
    /// Nothing to do (unknown or already active target, empty sequence)
    Ignored,
}

impl ChangeOutcome {
    /// Whether the request will lead to a transition attempt
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Started | Self::Loading | Self::Deferred)
    }
}

/// Screen registration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigatorError {
    /// Screen has no id
    #[error("screen registered without an id")]
    MissingId,

    /// Another screen already uses this id
    #[error("screen {id} is already registered at index {index}")]
    DuplicateScreen {
        /// Conflicting id
        id: ScreenId,
        /// Index of the existing screen
        index: usize,
    },
}

#[derive(Debug)]
struct Transition {
    info: TransitionInfo,
    active_at: Instant,
    end_at: Instant,
}

#[derive(Debug)]
struct PendingDependency {
    index: usize,
    rx: oneshot::Receiver<DependencyOutcome>,
}

/// The screen navigator
pub struct ScreenNavigator<C: StepCompletion> {
    config: NavigatorConfig,
    completion: Arc<C>,
    bus: EventBus,
    screens: Vec<Screen>,
    active: Option<usize>,
    previous: Option<usize>,
    phase: TransitionPhase,
    transition: Option<Transition>,
    /// Scroll deadlines in firing order; earlier transitions keep theirs
    scroll_deadlines: VecDeque<Instant>,
    loading: Option<PendingDependency>,
    pending: Option<PendingRequest>,
    bootstrap_requested: bool,
    selection_done: bool,
    result_count: Option<u32>,
}

impl<C: StepCompletion> ScreenNavigator<C> {
    /// Create a navigator answering completion queries with `completion`
    /// and publishing on `bus`
    pub fn new(config: NavigatorConfig, completion: Arc<C>, bus: EventBus) -> Self {
        Self {
            config,
            completion,
            bus,
            screens: Vec::new(),
            active: None,
            previous: None,
            phase: TransitionPhase::Idle,
            transition: None,
            scroll_deadlines: VecDeque::new(),
            loading: None,
            pending: None,
            bootstrap_requested: false,
            selection_done: false,
            result_count: None,
        }
    }

    /// Configuration
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    // ============================================
    // Registration
    // ============================================

    /// Append a screen to the sequence
    ///
    /// # Errors
    ///
    /// Rejects screens without an id and ids that are already registered.
    /// The sequence is left unchanged in both cases.
    pub fn register_screen(&mut self, screen: Screen) -> Result<usize, NavigatorError> {
        if screen.id.is_empty() {
            tracing::warn!("Ignoring screen registered without an id");
            return Err(NavigatorError::MissingId);
        }
        if let Some(index) = self.screen_index_by_id(&screen.id) {
            tracing::warn!(screen_id = %screen.id, index, "Ignoring duplicate screen registration");
            return Err(NavigatorError::DuplicateScreen {
                id: screen.id,
                index,
            });
        }

        let index = self.screens.len();
        tracing::debug!(
            screen_id = %screen.id,
            screen_type = %screen.screen_type,
            priority = screen.has_priority,
            index,
            "Screen registered"
        );
        self.screens.push(screen);
        Ok(index)
    }

    /// Request the initial selection. Retried by [`Self::poll`] until at
    /// least one screen is registered.
    pub fn start(&mut self) -> bool {
        self.bootstrap_requested = true;
        self.init_selection()
    }

    /// Select the initial screen: the last one (results) if every step is
    /// already complete, otherwise the first one
    ///
    /// Returns false while no screen is registered. Runs once.
    pub fn init_selection(&mut self) -> bool {
        if self.selection_done {
            return true;
        }
        let Some(last) = self.last_index() else {
            tracing::trace!("No screens registered yet, selection postponed");
            return false;
        };

        self.selection_done = true;
        let target = if self.completion.all_steps_completed() {
            last
        } else {
            0
        };
        tracing::info!(
            screen_id = %self.screens[target].id,
            screens = self.screens.len(),
            "Initial screen selected"
        );
        self.change_screen_at(target);
        true
    }

    // ============================================
    // Navigation
    // ============================================

    /// Move forward from the active screen
    ///
    /// Yields once first so form updates queued before the click are applied.
    pub async fn next_screen(&mut self) -> ChangeOutcome {
        tokio::task::yield_now().await;
        self.request_next()
    }

    fn request_next(&mut self) -> ChangeOutcome {
        if self.is_busy() {
            return self.defer(PendingRequest::Next);
        }
        let target = self.active.map_or(0, |index| index + 1);
        self.request_screen_change(target)
    }

    /// Navigate towards `requested_index`, applying the skip rules
    pub fn request_screen_change(&mut self, requested_index: usize) -> ChangeOutcome {
        if self.is_busy() {
            return self.defer(PendingRequest::Index(requested_index));
        }
        match self.resolve_request(requested_index) {
            Some(target) => {
                tracing::debug!(
                    requested = requested_index,
                    target,
                    "Screen request resolved"
                );
                self.change_screen_at(target)
            }
            None => ChangeOutcome::Ignored,
        }
    }

    /// Where a request for `requested_index` lands
    ///
    /// Rules, first match wins:
    /// 1. the last index or beyond lands on the last screen
    /// 2. an empty sequence lands nowhere
    /// 3. a complete form screen is skipped
    /// 4. an incomplete form screen before the request wins
    /// 5. (bookkeeping: next complete / incomplete form screen after it)
    /// 6. a priority screen passed on the way is shown first while a form
    ///    screen after it is still unanswered
    /// 7. an incomplete form screen is shown
    /// 8. with nothing left to answer, land past the last form screen
    /// 9. skip over an already answered step ahead
    /// 10. otherwise the requested screen
    #[must_use]
    pub fn resolve_request(&self, requested_index: usize) -> Option<usize> {
        let last = self.last_index()?;
        let mut requested = requested_index;

        loop {
            if requested >= last {
                return Some(last);
            }

            let screen = &self.screens[requested];
            let requested_complete = screen.is_form() && self.is_complete(requested);
            if requested_complete {
                requested += 1;
                continue;
            }

            let mut next_completed = None;
            let mut next_incomplete = None;
            let mut last_form = None;
            for (index, candidate) in self.screens.iter().enumerate() {
                if !candidate.is_form() {
                    continue;
                }
                last_form = Some(index);
                let complete = self.is_complete(index);
                if index < requested && !complete {
                    return Some(index);
                }
                if index > requested {
                    if complete && next_completed.is_none() {
                        next_completed = Some(index);
                    }
                    if !complete && next_incomplete.is_none() {
                        next_incomplete = Some(index);
                    }
                }
            }

            if let Some(priority) = self.priority_screen_before(requested) {
                return Some(priority);
            }

            if screen.is_form() {
                return Some(requested);
            }

            if next_incomplete.is_none() {
                match last_form {
                    Some(last_form) if requested <= last_form => {
                        requested = last_form + 1;
                        continue;
                    }
                    _ => return Some(requested),
                }
            }

            if let Some(completed) = next_completed {
                requested = completed + 1;
                continue;
            }

            return Some(requested);
        }
    }

    /// Priority screen that must be shown before reaching `requested`
    fn priority_screen_before(&self, requested: usize) -> Option<usize> {
        let start = self.active.map_or(0, |index| index + 1);
        let mut tracked: Option<usize> = None;

        for index in start..requested {
            let screen = &self.screens[index];
            if let Some(priority) = tracked {
                if self.screens[priority].screen_type == screen.screen_type {
                    tracked = None;
                }
            }
            if screen.has_priority {
                tracked = Some(index);
            }
        }

        let priority = tracked?;
        let unanswered = (priority + 1..=requested)
            .any(|index| self.screens[index].is_form() && !self.is_complete(index));
        unanswered.then_some(priority)
    }

    /// Jump to screen `id`, bypassing the skip rules
    ///
    /// A target with a dependency is loaded on the current tokio runtime.
    /// Outside a runtime the load fails with `DependencyFailed` and `Alert`
    /// and the outcome is [`ChangeOutcome::Failed`].
    pub fn change_screen(&mut self, id: &ScreenId) -> ChangeOutcome {
        if id.is_empty() {
            return ChangeOutcome::Ignored;
        }
        let Some(index) = self.screen_index_by_id(id) else {
            tracing::debug!(screen_id = %id, "Change to unknown screen ignored");
            return ChangeOutcome::Ignored;
        };
        if self.active == Some(index) {
            return ChangeOutcome::Ignored;
        }
        if self.is_busy() {
            return self.defer(PendingRequest::Screen(id.clone()));
        }
        self.change_screen_at(index)
    }

    fn change_screen_at(&mut self, index: usize) -> ChangeOutcome {
        if self.active == Some(index) {
            return ChangeOutcome::Ignored;
        }

        let screen = &self.screens[index];
        let Some(dependency) = screen.dependency.clone() else {
            self.begin_transition(index, Instant::now());
            return ChangeOutcome::Started;
        };

        let screen_id = screen.id.clone();
        tracing::debug!(
            screen_id = %screen_id,
            dependency = dependency.name(),
            "Loading screen dependency"
        );

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.fail_dependency(screen_id, "No async runtime to load screen data".to_string());
            return ChangeOutcome::Failed;
        };

        let (tx, rx) = oneshot::channel();
        runtime.spawn(async move {
            let outcome = dependency.load().await;
            let _ = tx.send(outcome);
        });
        self.loading = Some(PendingDependency { index, rx });
        self.bus.publish(FinderMessage::Loading { screen_id });
        ChangeOutcome::Loading
    }

    fn defer(&mut self, request: PendingRequest) -> ChangeOutcome {
        match self.config.busy_policy {
            BusyPolicy::Drop => {
                tracing::debug!(?request, "Navigator busy, request dropped");
                ChangeOutcome::Dropped
            }
            BusyPolicy::Coalesce => {
                if let Some(replaced) = self.pending.replace(request) {
                    tracing::debug!(?replaced, "Pending request superseded");
                }
                ChangeOutcome::Deferred
            }
        }
    }

    fn replay(&mut self, request: PendingRequest) -> ChangeOutcome {
        tracing::debug!(?request, "Replaying pending request");
        match request {
            PendingRequest::Next => self.request_next(),
            PendingRequest::Index(index) => self.request_screen_change(index),
            PendingRequest::Screen(id) => self.change_screen(&id),
        }
    }

    // ============================================
    // Transition Lifecycle
    // ============================================

    fn begin_transition(&mut self, index: usize, now: Instant) {
        let previous = self.active;
        self.previous = previous;
        self.active = Some(index);

        let info = TransitionInfo {
            active: self.screens[index].id.clone(),
            previous: previous.map(|p| self.screens[p].id.clone()),
            reverse: previous.is_some_and(|p| index < p),
        };

        let timings = self.config.timings;
        let active_at = now + timings.start_delay;
        self.transition = Some(Transition {
            info: info.clone(),
            active_at,
            end_at: active_at + timings.end_delay,
        });
        self.phase = TransitionPhase::Starting;

        tracing::info!(
            active = %info.active,
            previous = ?info.previous.as_ref().map(ScreenId::as_str),
            reverse = info.reverse,
            "Screen transition started"
        );
        self.bus.publish(FinderMessage::TransitionStart(info));
    }

    fn activate_transition(&mut self) {
        let Some(transition) = self.transition.as_ref() else {
            return;
        };
        let info = transition.info.clone();
        self.scroll_deadlines
            .push_back(transition.active_at + self.config.timings.scroll_delay);
        self.phase = TransitionPhase::Active;
        tracing::debug!(active = %info.active, "Screen transition active");
        self.bus.publish(FinderMessage::TransitionActive(info));
    }

    fn finish_transition(&mut self) {
        let Some(transition) = self.transition.take() else {
            return;
        };
        let info = transition.info;

        self.phase = TransitionPhase::Ending;
        self.bus.publish(FinderMessage::TransitionEnd(info.clone()));
        self.phase = TransitionPhase::Idle;

        let mut names = Vec::with_capacity(2);
        if self.config.legacy_screen_change_event {
            names.push(ScreenChangeEvent::ShoeFinder);
        }
        names.push(ScreenChangeEvent::Finder);
        for event in names {
            self.bus.publish(FinderMessage::ScreenChanged {
                event,
                previous: info.previous.clone(),
                active: info.active.clone(),
            });
        }

        if self.config.results_screen_id.as_ref() == Some(&info.active) {
            tracing::info!(
                screen_id = %info.active,
                result_count = ?self.result_count,
                "Results shown"
            );
            self.bus.publish(FinderMessage::ResultsViewed {
                screen_id: info.active.clone(),
                result_count: self.result_count,
            });
        }

        tracing::debug!(active = %info.active, "Screen transition ended");
    }

    /// The surface finished animating; end an active transition now
    ///
    /// Returns whether a transition was ended.
    pub fn transition_settled(&mut self) -> bool {
        if self.phase != TransitionPhase::Active {
            return false;
        }
        self.finish_transition();
        self.replay_pending();
        true
    }

    /// Record the visible result count for `ResultsViewed`
    pub fn set_result_count(&mut self, count: u32) {
        self.result_count = Some(count);
    }

    // ============================================
    // Polling
    // ============================================

    /// Advance timers, pick up a finished dependency, retry the initial
    /// selection and replay a pending request
    ///
    /// Returns true if anything happened.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut activity = false;

        if self.bootstrap_requested && !self.selection_done {
            activity |= self.init_selection();
        }

        activity |= self.poll_dependency(now);
        activity |= self.poll_timers(now);
        activity |= self.replay_pending();
        activity
    }

    fn replay_pending(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        match self.pending.take() {
            Some(request) => {
                self.replay(request);
                true
            }
            None => false,
        }
    }

    fn poll_dependency(&mut self, now: Instant) -> bool {
        let Some(loading) = self.loading.as_mut() else {
            return false;
        };
        let outcome = match loading.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err("Screen data could not be loaded".to_string())
            }
        };
        let index = loading.index;
        self.loading = None;
        let screen_id = self.screens[index].id.clone();

        match outcome {
            Ok(data) => {
                tracing::debug!(screen_id = %screen_id, "Screen dependency loaded");
                self.bus.publish(FinderMessage::DataLoaded { screen_id, data });
                if self.active != Some(index) {
                    self.begin_transition(index, now);
                }
            }
            Err(reason) => self.fail_dependency(screen_id, reason),
        }
        true
    }

    fn fail_dependency(&mut self, screen_id: ScreenId, reason: String) {
        tracing::warn!(screen_id = %screen_id, reason = %reason, "Screen dependency failed");
        self.bus.publish(FinderMessage::DependencyFailed {
            screen_id,
            reason: reason.clone(),
        });
        self.bus.publish(FinderMessage::Alert { message: reason });
    }

    /// Fire every due deadline, earliest first
    fn poll_timers(&mut self, now: Instant) -> bool {
        let mut activity = false;
        loop {
            let transition_due = self.transition_deadline().filter(|at| *at <= now);
            let scroll_due = self.scroll_deadlines.front().copied().filter(|at| *at <= now);
            match (transition_due, scroll_due) {
                (Some(transition), Some(scroll)) if scroll < transition => self.scroll_to_top(),
                (Some(_), _) => self.advance_transition(),
                (None, Some(_)) => self.scroll_to_top(),
                (None, None) => break,
            }
            activity = true;
        }
        activity
    }

    fn transition_deadline(&self) -> Option<Instant> {
        let transition = self.transition.as_ref()?;
        match self.phase {
            TransitionPhase::Starting => Some(transition.active_at),
            TransitionPhase::Active => Some(transition.end_at),
            TransitionPhase::Idle | TransitionPhase::Ending => None,
        }
    }

    fn advance_transition(&mut self) {
        match self.phase {
            TransitionPhase::Starting => self.activate_transition(),
            TransitionPhase::Active => self.finish_transition(),
            TransitionPhase::Idle | TransitionPhase::Ending => {}
        }
    }

    fn scroll_to_top(&mut self) {
        self.scroll_deadlines.pop_front();
        self.bus.publish(FinderMessage::ScrollToTop);
    }

    /// When [`Self::poll`] next has something to do
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Instant> {
        let now = Instant::now();
        let transition = self.transition_deadline();
        let dependency = self
            .loading
            .as_ref()
            .map(|_| now + self.config.dependency_poll);
        let bootstrap = (self.bootstrap_requested && !self.selection_done)
            .then(|| now + self.config.bootstrap_poll);

        let scroll = self.scroll_deadlines.front().copied();

        [transition, scroll, dependency, bootstrap]
            .into_iter()
            .flatten()
            .min()
    }

    /// Whether timers, a dependency or a pending request are outstanding
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.is_busy() || !self.scroll_deadlines.is_empty() || self.pending.is_some()
    }

    /// Poll until no transition, dependency, scroll or pending request is left
    pub async fn run_until_idle(&mut self) {
        while self.has_pending_work() {
            match self.next_wakeup() {
                Some(at) => tokio::time::sleep_until(at).await,
                None => tokio::task::yield_now().await,
            }
            self.poll(Instant::now());
        }
    }

    // ============================================
    // Queries
    // ============================================

    /// Active screen
    #[must_use]
    pub fn active_screen(&self) -> Option<&Screen> {
        self.active.map(|index| &self.screens[index])
    }

    /// Active screen id
    #[must_use]
    pub fn active_screen_id(&self) -> Option<&ScreenId> {
        self.active_screen().map(|screen| &screen.id)
    }

    /// Previously active screen id
    #[must_use]
    pub fn previous_screen_id(&self) -> Option<&ScreenId> {
        self.previous.map(|index| &self.screens[index].id)
    }

    /// Index of the active screen
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// All screens in navigation order
    #[must_use]
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Screens of one type, in navigation order
    #[must_use]
    pub fn screens_by_type(&self, screen_type: ScreenType) -> Vec<&Screen> {
        self.screens
            .iter()
            .filter(|screen| screen.screen_type == screen_type)
            .collect()
    }

    /// Signed distance from the active screen to `id`
    ///
    /// Without an active screen the distance is measured from just before
    /// the first screen.
    #[must_use]
    pub fn relative_screen_index(&self, id: &ScreenId) -> Option<isize> {
        let target = isize::try_from(self.screen_index_by_id(id)?).ok()?;
        let active = match self.active {
            Some(index) => isize::try_from(index).ok()?,
            None => -1,
        };
        Some(target - active)
    }

    /// Position of `id` in the full sequence
    #[must_use]
    pub fn screen_index_by_id(&self, id: &ScreenId) -> Option<usize> {
        self.screens.iter().position(|screen| &screen.id == id)
    }

    /// Position of `id` among the form screens
    #[must_use]
    pub fn form_screen_index_by_id(&self, id: &ScreenId) -> Option<usize> {
        self.screens
            .iter()
            .filter(|screen| screen.is_form())
            .position(|screen| &screen.id == id)
    }

    /// Position of the active screen among the form screens
    #[must_use]
    pub fn active_form_screen_index(&self) -> Option<usize> {
        self.form_screen_index_by_id(self.active_screen_id()?)
    }

    /// Current transition phase
    #[must_use]
    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    /// Whether a transition is running
    #[must_use]
    pub fn is_transition_in_progress(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }

    /// Whether a screen dependency is loading
    #[must_use]
    pub fn is_loading_dependency(&self) -> bool {
        self.loading.is_some()
    }

    /// Whether new requests are currently deferred or dropped
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.is_transition_in_progress() || self.is_loading_dependency()
    }

    /// The request waiting for the navigator to become idle
    #[must_use]
    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    fn last_index(&self) -> Option<usize> {
        self.screens.len().checked_sub(1)
    }

    fn is_complete(&self, index: usize) -> bool {
        self.completion.completed_by_id(&self.screens[index].id)
    }
}
