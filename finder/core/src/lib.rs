//! Finder Core - Headless Screen Navigation for Multi-Step Finders
//!
//! A finder is a product-recommendation questionnaire: a fixed sequence of
//! screens (form questions, checkpoints, content) that leads a shopper to a
//! results page. This crate holds the navigation logic with no rendering in
//! it. Surfaces (page scripts, terminal drivers, tests) send events in and
//! render the messages that come out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Surfaces                               │
//! │  ┌──────────┐  ┌──────────┐  ┌───────────┐  ┌─────────────────┐  │
//! │  │ Progress │  │ Loaders  │  │ Analytics │  │ CLI / Headless  │  │
//! │  └────┬─────┘  └────┬─────┘  └─────┬─────┘  └────────┬────────┘  │
//! │       └─────────────┴──────────────┴─────────────────┘           │
//! │                 FinderEvent (up)   FinderMessage (down)          │
//! └───────────────────────────────┬──────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┼──────────────────────────────────┐
//! │                          FINDER CORE                             │
//! │  ┌────────────────────────────┴───────────────────────────────┐  │
//! │  │                          Finder                            │  │
//! │  │  ┌───────────┐  ┌──────────┐  ┌─────────┐  ┌────────────┐  │  │
//! │  │  │ Navigator │  │   Form   │  │ History │  │  EventBus  │  │  │
//! │  │  │           │  │  Tracker │  │  Sync   │  │            │  │  │
//! │  │  └───────────┘  └──────────┘  └─────────┘  └────────────┘  │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Finder`]: one finder instance and its event loop
//! - [`ScreenNavigator`]: screen sequence, skip rules and transition lifecycle
//! - [`FormStateTracker`]: form values and step completion
//! - [`EventBus`]: typed publish/subscribe for [`FinderMessage`]s
//! - [`FinderEvent`]: events sent from surfaces to the core
//!
//! # Quick Start
//!
//! ```ignore
//! use finder_core::{Finder, FinderConfig, FinderEvent, FlowManifest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manifest = FlowManifest::from_path("flow.toml".as_ref())?;
//!     let mut finder = Finder::from_manifest(&manifest, FinderConfig::default())?;
//!     let (_, mut messages) = finder.subscribe("renderer");
//!
//!     finder.handle_event(FinderEvent::Start).await?;
//!     finder.run_until_idle().await;
//!
//!     while let Ok(message) = messages.try_recv() {
//!         // Render message
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`screens`]: screen model and the `data-*` declaration protocol
//! - [`dependency`]: async data a screen waits for
//! - [`events`]: events from surfaces to the core
//! - [`messages`]: messages from the core to surfaces
//! - [`bus`]: the event bus
//! - [`form`]: form values and step completion
//! - [`history`]: session history synchronization
//! - [`navigator`]: the navigation state machine
//! - [`finder`]: page-level orchestration
//! - [`flow`]: TOML flow manifests
//! - [`config`]: configuration loading

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod config;
pub mod dependency;
pub mod events;
pub mod finder;
pub mod flow;
pub mod form;
pub mod history;
pub mod messages;
pub mod navigator;
pub mod screens;

// Re-exports for convenience
pub use bus::{EventBus, PublishResult, SubscriberId};
pub use dependency::{
    DependencyOutcome, DependencyRegistry, FnDependency, HttpDependency, ScreenDependency,
    StaticDependency,
};
pub use events::{FinderEvent, HistoryDirection};
pub use finder::Finder;
pub use flow::{FlowError, FlowManifest};
pub use form::{parse_query, FormStateTracker, FormStep, FormValue, StepCompletion};
pub use history::{HistoryState, HistorySynchronizer, SessionHistory};
pub use messages::{FinderMessage, ScreenChangeEvent, TransitionInfo};
pub use navigator::{
    BusyPolicy, ChangeOutcome, NavigatorConfig, NavigatorError, PendingRequest, ScreenNavigator,
    TransitionPhase, TransitionTimings,
};
pub use screens::{DescriptorError, Screen, ScreenDescriptor, ScreenId, ScreenType};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, FinderConfig, FinderToml,
};
