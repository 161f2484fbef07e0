//! Finder - Page-Level Orchestration
//!
//! A [`Finder`] is one finder instance on a page: the navigator, the form
//! state it asks about, the session history it keeps in step, and the bus
//! every surface listens on.
//!
//! # Event Loop
//!
//! ```text
//!   FinderEvent ──► handle_event ──► navigator / form / history
//!                                         │
//!   next_wakeup ──► poll ─────────────────┤
//!                                         ▼
//!                                     EventBus ──► surfaces
//! ```
//!
//! [`Finder::run`] drives both from a channel of events; hosts that own a
//! loop of their own call [`Finder::handle_event`] and [`Finder::poll`]
//! directly.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::bus::{EventBus, SubscriberId};
use crate::config::FinderConfig;
use crate::events::{FinderEvent, HistoryDirection};
use crate::flow::FlowManifest;
use crate::form::FormStateTracker;
use crate::history::HistorySynchronizer;
use crate::messages::FinderMessage;
use crate::navigator::{NavigatorError, ScreenNavigator};
use crate::screens::{ScreenDescriptor, ScreenType};

/// One finder instance
pub struct Finder {
    config: FinderConfig,
    session_id: Uuid,
    bus: EventBus,
    form: Arc<FormStateTracker>,
    navigator: ScreenNavigator<FormStateTracker>,
    history: HistorySynchronizer,
    history_rx: mpsc::Receiver<FinderMessage>,
    shutdown: bool,
}

impl Finder {
    /// Create a finder with no screens
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        let bus = EventBus::with_capacity(config.bus_capacity);
        let (_, history_rx) = bus.subscribe_named("history");
        let form = Arc::new(FormStateTracker::new(bus.clone()));
        let navigator =
            ScreenNavigator::new(config.navigator.clone(), Arc::clone(&form), bus.clone());
        let session_id = Uuid::new_v4();

        tracing::debug!(session_id = %session_id, "Finder created");

        Self {
            config,
            session_id,
            bus,
            form,
            navigator,
            history: HistorySynchronizer::new(),
            history_rx,
            shutdown: false,
        }
    }

    /// Create a finder with the screens of a manifest registered
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest's screens or dependencies are
    /// invalid or two screens share an id.
    pub fn from_manifest(manifest: &FlowManifest, config: FinderConfig) -> anyhow::Result<Self> {
        let descriptors = manifest
            .descriptors(config.http_timeout)
            .context("Invalid flow manifest")?;

        let mut finder = Self::new(config);
        for descriptor in descriptors {
            let id = descriptor.id().clone();
            finder
                .register(descriptor)
                .with_context(|| format!("Failed to register screen {id}"))?;
        }
        Ok(finder)
    }

    /// Register a screen, and its step if it is a form screen
    ///
    /// # Errors
    ///
    /// Rejects screens without an id and duplicate ids.
    pub fn register(&mut self, descriptor: ScreenDescriptor) -> Result<usize, NavigatorError> {
        let ScreenDescriptor {
            screen,
            required_fields,
        } = descriptor;
        let id = screen.id.clone();
        let is_form = screen.screen_type == ScreenType::Form;

        let index = self.navigator.register_screen(screen)?;
        if is_form {
            self.form.register_step(id, required_fields);
        }
        Ok(index)
    }

    /// Subscribe to bus messages
    pub fn subscribe(&self, name: &str) -> (SubscriberId, mpsc::Receiver<FinderMessage>) {
        self.bus.subscribe_named(name)
    }

    /// Handle an event from a surface
    ///
    /// # Errors
    ///
    /// Currently infallible; registration problems are logged and skipped.
    pub async fn handle_event(&mut self, event: FinderEvent) -> anyhow::Result<()> {
        tracing::trace!(event = event.kind(), "Handling event");

        match event {
            FinderEvent::RegisterScreen(descriptor) => {
                if let Err(e) = self.register(descriptor) {
                    tracing::warn!(error = %e, "Screen registration rejected");
                }
            }
            FinderEvent::Start => {
                self.navigator.start();
            }
            FinderEvent::NextScreen => {
                self.navigator.next_screen().await;
            }
            FinderEvent::RequestScreen { index } => {
                self.navigator.request_screen_change(index);
            }
            FinderEvent::ChangeScreen { id } => {
                self.navigator.change_screen(&id);
            }
            FinderEvent::FormChanged { values } => {
                self.form.update_values(values);
            }
            FinderEvent::HistoryPop { direction } => {
                self.history_pop(direction);
            }
            FinderEvent::TransitionSettled => {
                self.navigator.transition_settled();
            }
            FinderEvent::ResultsCounted { count } => {
                self.navigator.set_result_count(count);
            }
            FinderEvent::Shutdown => {
                tracing::info!(session_id = %self.session_id, "Finder shutting down");
                self.shutdown = true;
            }
        }

        self.sync_history();
        Ok(())
    }

    fn history_pop(&mut self, direction: HistoryDirection) {
        let Some(id) = self.history.pop(direction) else {
            return;
        };
        let outcome = self.navigator.change_screen(&id);
        if !outcome.is_accepted() {
            self.history.cancel_pop();
        }
    }

    /// Feed transitions into the history synchronizer
    fn sync_history(&mut self) {
        while let Ok(message) = self.history_rx.try_recv() {
            if let Some(recorded) = self.history.observe(&message) {
                self.bus.publish(recorded);
            }
        }
    }

    /// Advance timers and dependencies
    pub fn poll(&mut self, now: Instant) -> bool {
        let activity = self.navigator.poll(now);
        self.sync_history();
        activity
    }

    /// Poll until the navigator has nothing left to do
    pub async fn run_until_idle(&mut self) {
        while self.navigator.has_pending_work() {
            match self.navigator.next_wakeup() {
                Some(at) => tokio::time::sleep_until(at).await,
                None => tokio::task::yield_now().await,
            }
            self.poll(Instant::now());
        }
    }

    /// Process events until `Shutdown` or until the channel closes
    ///
    /// When the channel closes, outstanding transitions are finished first.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::handle_event`].
    pub async fn run(&mut self, mut events: mpsc::Receiver<FinderEvent>) -> anyhow::Result<()> {
        tracing::info!(session_id = %self.session_id, "Finder event loop started");

        while !self.shutdown {
            let wakeup = self.navigator.next_wakeup();
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        tracing::debug!("Event channel closed, settling");
                        self.run_until_idle().await;
                        break;
                    }
                },
                () = sleep_until_wakeup(wakeup) => {}
            }
            self.poll(Instant::now());
        }

        tracing::info!(session_id = %self.session_id, "Finder event loop stopped");
        Ok(())
    }

    /// Session identifier
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// The navigator
    #[must_use]
    pub fn navigator(&self) -> &ScreenNavigator<FormStateTracker> {
        &self.navigator
    }

    /// The form state
    #[must_use]
    pub fn form(&self) -> &FormStateTracker {
        &self.form
    }

    /// The history synchronizer
    #[must_use]
    pub fn history(&self) -> &HistorySynchronizer {
        &self.history
    }

    /// The bus
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Whether `Shutdown` was received
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown
    }
}

async fn sleep_until_wakeup(wakeup: Option<Instant>) {
    match wakeup {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormValue;
    use crate::navigator::TransitionTimings;
    use crate::screens::ScreenId;
    use std::time::Duration;

    fn fast_config() -> FinderConfig {
        let mut config = FinderConfig::default();
        config.navigator.timings = TransitionTimings {
            start_delay: Duration::from_millis(1),
            scroll_delay: Duration::from_millis(1),
            end_delay: Duration::from_millis(2),
        };
        config.navigator.dependency_poll = Duration::from_millis(1);
        config
    }

    fn finder() -> Finder {
        let mut finder = Finder::new(fast_config());
        finder.register(ScreenDescriptor::new("start")).unwrap();
        finder
            .register(ScreenDescriptor::form("terrain", ["terrain"]))
            .unwrap();
        finder
            .register(ScreenDescriptor::form("mileage", ["mileage"]))
            .unwrap();
        finder.register(ScreenDescriptor::new("Results")).unwrap();
        finder
    }

    async fn step(finder: &mut Finder, event: FinderEvent) {
        finder.handle_event(event).await.unwrap();
        finder.run_until_idle().await;
    }

    fn active(finder: &Finder) -> Option<&str> {
        finder.navigator().active_screen_id().map(ScreenId::as_str)
    }

    #[test]
    fn test_register_form_registers_step() {
        let finder = finder();
        let steps = finder.form().steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id, ScreenId::new("terrain"));
    }

    #[tokio::test]
    async fn test_register_event_rejects_duplicate() {
        let mut finder = finder();
        step(
            &mut finder,
            FinderEvent::RegisterScreen(ScreenDescriptor::form("terrain", ["other"])),
        )
        .await;
        assert_eq!(finder.navigator().screens().len(), 4);
        assert_eq!(finder.form().steps()[0].required, vec!["terrain"]);
    }

    #[tokio::test]
    async fn test_answer_then_next() {
        let mut finder = finder();
        step(&mut finder, FinderEvent::Start).await;
        assert_eq!(active(&finder), Some("start"));

        step(&mut finder, FinderEvent::NextScreen).await;
        assert_eq!(active(&finder), Some("terrain"));

        step(
            &mut finder,
            FinderEvent::FormChanged {
                values: vec![FormValue::new("terrain", "trail")],
            },
        )
        .await;
        step(&mut finder, FinderEvent::NextScreen).await;
        assert_eq!(active(&finder), Some("mileage"));
    }

    #[tokio::test]
    async fn test_history_back_and_forward() {
        let mut finder = finder();
        let (_, mut rx) = finder.subscribe("test");
        step(&mut finder, FinderEvent::Start).await;
        step(&mut finder, FinderEvent::NextScreen).await;
        assert_eq!(finder.history().history().len(), 2);

        step(
            &mut finder,
            FinderEvent::HistoryPop {
                direction: HistoryDirection::Back,
            },
        )
        .await;
        assert_eq!(active(&finder), Some("start"));
        assert_eq!(finder.history().history().len(), 2);

        step(
            &mut finder,
            FinderEvent::HistoryPop {
                direction: HistoryDirection::Forward,
            },
        )
        .await;
        assert_eq!(active(&finder), Some("terrain"));
        assert_eq!(finder.history().history().len(), 2);

        let mut recorded = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let FinderMessage::HistoryRecorded { screen_id, replaced } = message {
                recorded.push((screen_id, replaced));
            }
        }
        assert_eq!(
            recorded,
            vec![
                (ScreenId::new("start"), true),
                (ScreenId::new("terrain"), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_deferred_pop_replaced_by_other_request_is_recorded() {
        let mut finder = finder();
        step(&mut finder, FinderEvent::Start).await;
        step(&mut finder, FinderEvent::NextScreen).await;
        assert_eq!(active(&finder), Some("terrain"));

        finder
            .handle_event(FinderEvent::ChangeScreen {
                id: ScreenId::new("mileage"),
            })
            .await
            .unwrap();
        finder
            .handle_event(FinderEvent::HistoryPop {
                direction: HistoryDirection::Back,
            })
            .await
            .unwrap();
        finder
            .handle_event(FinderEvent::ChangeScreen {
                id: ScreenId::new("Results"),
            })
            .await
            .unwrap();
        finder.run_until_idle().await;

        assert_eq!(active(&finder), Some("Results"));
        let history = finder.history().history();
        assert_eq!(history.len(), 3);
        assert_eq!(history.position(), 2);
        assert_eq!(history.current().id, Some(ScreenId::new("Results")));
        assert!(!finder.history().is_pop_pending());
    }

    #[tokio::test]
    async fn test_history_pop_past_landing_is_noop() {
        let mut finder = finder();
        step(&mut finder, FinderEvent::Start).await;
        step(
            &mut finder,
            FinderEvent::HistoryPop {
                direction: HistoryDirection::Back,
            },
        )
        .await;
        assert_eq!(active(&finder), Some("start"));
        assert!(!finder.history().is_pop_pending());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut finder = finder();
        let (tx, rx) = mpsc::channel(8);
        tx.send(FinderEvent::Start).await.unwrap();
        tx.send(FinderEvent::Shutdown).await.unwrap();

        finder.run(rx).await.unwrap();
        assert!(finder.is_shut_down());
        assert_eq!(active(&finder), Some("start"));
    }

    #[tokio::test]
    async fn test_run_settles_when_channel_closes() {
        let mut finder = finder();
        let (tx, rx) = mpsc::channel(8);
        tx.send(FinderEvent::Start).await.unwrap();
        drop(tx);

        finder.run(rx).await.unwrap();
        assert!(!finder.navigator().has_pending_work());
        assert!(!finder.is_shut_down());
    }
}
