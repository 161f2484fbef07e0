//! Screen Dependencies
//!
//! Some screens need server data before they can be shown (the results
//! screen waits for recommendations, for instance). A dependency is an async
//! no-argument fetch that resolves to arbitrary JSON or fails with a message
//! that is shown to the shopper.
//!
//! # Implementations
//!
//! - [`StaticDependency`]: fixed payload or failure, optional delay
//! - [`FnDependency`]: wraps an async closure
//! - [`HttpDependency`]: GET a JSON document with `reqwest`

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

/// Result of running a dependency: payload or user-facing failure message
pub type DependencyOutcome = Result<Value, String>;

/// Async data a screen waits for before it becomes displayable
#[async_trait]
pub trait ScreenDependency: Send + Sync {
    /// Name used in logs and in `data-wait-for`
    fn name(&self) -> &str;

    /// Fetch the data
    async fn load(&self) -> DependencyOutcome;
}

/// A dependency with a fixed outcome
#[derive(Clone, Debug)]
pub struct StaticDependency {
    name: String,
    outcome: DependencyOutcome,
    delay: Duration,
}

impl StaticDependency {
    /// Resolve with `data`
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            name: "static".to_string(),
            outcome: Ok(data),
            delay: Duration::ZERO,
        }
    }

    /// Fail with `message`
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            name: "static".to_string(),
            outcome: Err(message.into()),
            delay: Duration::ZERO,
        }
    }

    /// Set the name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Resolve only after `delay`
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ScreenDependency for StaticDependency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> DependencyOutcome {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.clone()
    }
}

type LoadFn = dyn Fn() -> BoxFuture<'static, DependencyOutcome> + Send + Sync;

/// A dependency backed by an async closure
pub struct FnDependency {
    name: String,
    load: Box<LoadFn>,
}

impl FnDependency {
    /// Wrap `f`, which is called once per navigation attempt
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DependencyOutcome> + Send + 'static,
    {
        Self {
            name: name.into(),
            load: Box::new(move || f().boxed()),
        }
    }
}

impl fmt::Debug for FnDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDependency")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ScreenDependency for FnDependency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> DependencyOutcome {
        (self.load)().await
    }
}

/// GET a JSON document
#[derive(Clone, Debug)]
pub struct HttpDependency {
    name: String,
    url: String,
    http_client: reqwest::Client,
}

impl HttpDependency {
    /// Create a dependency fetching `url`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            http_client,
        })
    }

    /// Target URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ScreenDependency for HttpDependency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> DependencyOutcome {
        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| format!("Could not reach {}: {e}", self.url))?;

        if !response.status().is_success() {
            return Err(format!(
                "{} returned HTTP {}",
                self.url,
                response.status().as_u16()
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("Invalid response from {}: {e}", self.url))
    }
}

/// Named dependencies available to `data-wait-for`
#[derive(Clone, Default)]
pub struct DependencyRegistry {
    entries: HashMap<String, Arc<dyn ScreenDependency>>,
}

impl DependencyRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dependency under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, dependency: Arc<dyn ScreenDependency>) {
        self.entries.insert(name.into(), dependency);
    }

    /// Look up a dependency
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ScreenDependency>> {
        self.entries.get(name).cloned()
    }

    /// Number of registered dependencies
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("DependencyRegistry")
            .field("names", &names)
            .finish()
    }
}
