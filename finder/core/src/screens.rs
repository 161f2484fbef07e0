//! Screen Model
//!
//! Types describing the screens of a finder wizard. A screen is one page of
//! the questionnaire: a form question, a checkpoint interposed between form
//! sections, or free content such as the intro and results pages.
//!
//! # Registration
//!
//! Screens are declared either programmatically through [`ScreenDescriptor`]
//! builders or from the `data-*` attribute protocol used by page markup:
//!
//! ```text
//! data-id="terrain" data-type="form" data-required="terrain"
//! data-id="tip" data-type="checkpoint" data-priority="true"
//! data-id="results" data-wait-for="recommendations"
//! ```
//!
//! Registration order defines navigation order.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependency::{DependencyRegistry, ScreenDependency};

/// Screen identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenId(pub String);

impl ScreenId {
    /// Create a new screen ID from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is empty (a screen declared without `data-id`)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScreenId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ScreenId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of screen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenType {
    /// A question with required fields
    Form,
    /// An informational screen between form sections
    Checkpoint,
    /// Free content (intro, results)
    #[default]
    Content,
}

impl ScreenType {
    /// Parse a `data-type` value. Unknown or empty values are content screens.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "form" => Self::Form,
            "checkpoint" => Self::Checkpoint,
            _ => Self::Content,
        }
    }

    /// Label used in markup and logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Checkpoint => "checkpoint",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for ScreenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A registered screen
#[derive(Clone)]
pub struct Screen {
    /// Unique identifier
    pub id: ScreenId,
    /// Screen kind
    pub screen_type: ScreenType,
    /// Must be visited when navigation would skip past it
    pub has_priority: bool,
    /// Data that must load before the screen is displayable
    pub dependency: Option<Arc<dyn ScreenDependency>>,
}

impl Screen {
    /// Whether this is a form screen
    #[must_use]
    pub fn is_form(&self) -> bool {
        self.screen_type == ScreenType::Form
    }

    /// Whether this screen waits on a dependency
    #[must_use]
    pub fn has_dependency(&self) -> bool {
        self.dependency.is_some()
    }
}

impl fmt::Debug for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen")
            .field("id", &self.id)
            .field("screen_type", &self.screen_type)
            .field("has_priority", &self.has_priority)
            .field("dependency", &self.dependency.as_ref().map(|d| d.name()))
            .finish()
    }
}

/// Errors reading a screen declaration from attributes
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// `data-id` is missing or empty
    #[error("screen declaration is missing data-id")]
    MissingId,

    /// `data-wait-for` names a dependency nobody registered
    #[error("screen {screen} waits for unknown dependency {name}")]
    UnknownDependency {
        /// Screen declaring the dependency
        screen: String,
        /// The unresolved dependency name
        name: String,
    },
}

/// Everything needed to register a screen
#[derive(Clone, Debug)]
pub struct ScreenDescriptor {
    /// The screen to register
    pub screen: Screen,
    /// Required field names (form screens only)
    pub required_fields: Vec<String>,
}

impl ScreenDescriptor {
    /// Create a content screen descriptor
    pub fn new(id: impl Into<ScreenId>) -> Self {
        Self {
            screen: Screen {
                id: id.into(),
                screen_type: ScreenType::Content,
                has_priority: false,
                dependency: None,
            },
            required_fields: Vec::new(),
        }
    }

    /// Create a form screen descriptor with its required fields
    pub fn form<I, S>(id: impl Into<ScreenId>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(id)
            .with_type(ScreenType::Form)
            .with_required(required)
    }

    /// Create a checkpoint screen descriptor
    pub fn checkpoint(id: impl Into<ScreenId>) -> Self {
        Self::new(id).with_type(ScreenType::Checkpoint)
    }

    /// Set the screen type
    #[must_use]
    pub fn with_type(mut self, screen_type: ScreenType) -> Self {
        self.screen.screen_type = screen_type;
        self
    }

    /// Mark as a priority screen
    #[must_use]
    pub fn with_priority(mut self) -> Self {
        self.screen.has_priority = true;
        self
    }

    /// Attach a data dependency
    #[must_use]
    pub fn with_dependency(mut self, dependency: Arc<dyn ScreenDependency>) -> Self {
        self.screen.dependency = Some(dependency);
        self
    }

    /// Set required field names
    #[must_use]
    pub fn with_required<I, S>(mut self, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_fields = required.into_iter().map(Into::into).collect();
        self
    }

    /// Screen id
    #[must_use]
    pub fn id(&self) -> &ScreenId {
        &self.screen.id
    }

    /// Read a declaration from a `data-*` attribute map
    ///
    /// Recognized attributes: `data-id` (required), `data-type`,
    /// `data-priority` (`true`, `1` or an empty value), `data-wait-for`
    /// (resolved against `dependencies`) and `data-required`
    /// (comma-separated field names).
    ///
    /// # Errors
    ///
    /// Returns an error if `data-id` is missing or `data-wait-for` names an
    /// unregistered dependency.
    pub fn from_attributes(
        attrs: &HashMap<String, String>,
        dependencies: &DependencyRegistry,
    ) -> Result<Self, DescriptorError> {
        let id = attrs
            .get("data-id")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or(DescriptorError::MissingId)?;

        let mut descriptor = Self::new(id);

        if let Some(screen_type) = attrs.get("data-type") {
            descriptor.screen.screen_type = ScreenType::parse(screen_type);
        }

        if let Some(priority) = attrs.get("data-priority") {
            let priority = priority.trim().to_lowercase();
            descriptor.screen.has_priority =
                priority.is_empty() || priority == "true" || priority == "1";
        }

        if let Some(required) = attrs.get("data-required") {
            descriptor.required_fields = required
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(name) = attrs.get("data-wait-for").map(|s| s.trim()) {
            if !name.is_empty() {
                let dependency =
                    dependencies
                        .get(name)
                        .ok_or_else(|| DescriptorError::UnknownDependency {
                            screen: id.to_string(),
                            name: name.to_string(),
                        })?;
                descriptor.screen.dependency = Some(dependency);
            }
        }

        Ok(descriptor)
    }
}
