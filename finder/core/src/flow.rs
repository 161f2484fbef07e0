//! Flow Manifests
//!
//! A flow manifest declares the screens of a finder and the named data
//! dependencies they wait for, in TOML:
//!
//! ```toml
//! [dependencies.recommendations]
//! data = { shoes = ["ghost", "glycerin"] }
//! delay_ms = 300
//!
//! [[screens]]
//! id = "terrain"
//! type = "form"
//! required = ["terrain"]
//!
//! [[screens]]
//! id = "Results"
//! wait_for = "recommendations"
//! ```
//!
//! Each screen entry is turned into the same `data-*` attributes page markup
//! would carry and read through [`ScreenDescriptor::from_attributes`], so a
//! manifest and a page declare screens identically.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dependency::{DependencyRegistry, HttpDependency, ScreenDependency, StaticDependency};
use crate::screens::{DescriptorError, ScreenDescriptor};

/// Errors loading a flow manifest
#[derive(Debug, Error)]
pub enum FlowError {
    /// Failed to read the manifest
    #[error("Failed to read flow manifest at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse flow manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// The manifest declares no screens
    #[error("Flow manifest declares no screens")]
    NoScreens,

    /// A dependency entry is unusable
    #[error("Invalid dependency {name}: {reason}")]
    InvalidDependency {
        /// Dependency name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// A screen entry is unusable
    #[error("Invalid screen: {0}")]
    Screen(#[from] DescriptorError),
}

/// A named dependency
///
/// Exactly one of `data`, `error` or `url` must be set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencySpec {
    /// Payload to resolve with
    pub data: Option<toml::Value>,
    /// Failure message to reject with
    pub error: Option<String>,
    /// JSON document to fetch
    pub url: Option<String>,
    /// Artificial latency for `data`/`error`
    pub delay_ms: Option<u64>,
}

/// One screen entry
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSpec {
    /// Screen id
    pub id: String,
    /// `form`, `checkpoint` or anything else for content
    #[serde(rename = "type")]
    pub screen_type: Option<String>,
    /// Priority flag
    pub priority: bool,
    /// Required field names
    pub required: Vec<String>,
    /// Name of the dependency to wait for
    pub wait_for: Option<String>,
}

impl ScreenSpec {
    /// The equivalent `data-*` attribute map
    #[must_use]
    pub fn attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert("data-id".to_string(), self.id.clone());
        if let Some(ref screen_type) = self.screen_type {
            attrs.insert("data-type".to_string(), screen_type.clone());
        }
        if self.priority {
            attrs.insert("data-priority".to_string(), "true".to_string());
        }
        if !self.required.is_empty() {
            attrs.insert("data-required".to_string(), self.required.join(","));
        }
        if let Some(ref name) = self.wait_for {
            attrs.insert("data-wait-for".to_string(), name.clone());
        }
        attrs
    }
}

/// A parsed flow manifest
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowManifest {
    /// Named dependencies
    pub dependencies: BTreeMap<String, DependencySpec>,
    /// Screens in navigation order
    pub screens: Vec<ScreenSpec>,
}

impl FlowManifest {
    /// Read a manifest file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, FlowError> {
        let content = std::fs::read_to_string(path).map_err(|e| FlowError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let manifest = Self::parse(&content)?;
        tracing::info!(
            path = %path.display(),
            screens = manifest.screens.len(),
            dependencies = manifest.dependencies.len(),
            "Loaded flow manifest"
        );
        Ok(manifest)
    }

    /// Parse manifest text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or declares no screens.
    pub fn parse(content: &str) -> Result<Self, FlowError> {
        let manifest: Self = toml::from_str(content)?;
        if manifest.screens.is_empty() {
            return Err(FlowError::NoScreens);
        }
        Ok(manifest)
    }

    /// Build the dependency registry
    ///
    /// # Errors
    ///
    /// Returns an error for an entry that does not set exactly one source, or
    /// whose HTTP client cannot be built.
    pub fn dependency_registry(
        &self,
        http_timeout: Duration,
    ) -> Result<DependencyRegistry, FlowError> {
        let mut registry = DependencyRegistry::new();
        for (name, spec) in &self.dependencies {
            let invalid = |reason: String| FlowError::InvalidDependency {
                name: name.clone(),
                reason,
            };
            let delay = Duration::from_millis(spec.delay_ms.unwrap_or(0));

            let dependency: Arc<dyn ScreenDependency> = match (&spec.data, &spec.error, &spec.url)
            {
                (Some(data), None, None) => {
                    let data = serde_json::to_value(data)
                        .map_err(|e| invalid(format!("data is not JSON compatible: {e}")))?;
                    Arc::new(StaticDependency::ok(data).named(name).with_delay(delay))
                }
                (None, Some(message), None) => Arc::new(
                    StaticDependency::err(message.clone())
                        .named(name)
                        .with_delay(delay),
                ),
                (None, None, Some(url)) => Arc::new(
                    HttpDependency::new(name, url, http_timeout)
                        .map_err(|e| invalid(e.to_string()))?,
                ),
                _ => return Err(invalid("set exactly one of data, error or url".to_string())),
            };
            registry.register(name.clone(), dependency);
        }
        Ok(registry)
    }

    /// Screen descriptors in navigation order
    ///
    /// # Errors
    ///
    /// Returns an error for a bad dependency or a screen without an id or
    /// waiting for an undeclared dependency.
    pub fn descriptors(&self, http_timeout: Duration) -> Result<Vec<ScreenDescriptor>, FlowError> {
        let registry = self.dependency_registry(http_timeout)?;
        self.screens
            .iter()
            .map(|spec| {
                ScreenDescriptor::from_attributes(&spec.attributes(), &registry)
                    .map_err(FlowError::from)
            })
            .collect()
    }
}

impl std::str::FromStr for FlowManifest {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::ScreenType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MANIFEST: &str = r#"
[dependencies.recommendations]
data = { shoes = ["ghost", "glycerin"], count = 2 }

[dependencies.broken]
error = "Recommendations are unavailable"
delay_ms = 5

[[screens]]
id = "start"

[[screens]]
id = "terrain"
type = "form"
required = ["terrain"]

[[screens]]
id = "tip"
type = "checkpoint"
priority = true

[[screens]]
id = "Results"
wait_for = "recommendations"
"#;

    fn timeout() -> Duration {
        Duration::from_secs(1)
    }

    #[test]
    fn test_parse_manifest() {
        let manifest: FlowManifest = MANIFEST.parse().unwrap();
        assert_eq!(manifest.screens.len(), 4);
        assert_eq!(manifest.dependencies.len(), 2);

        let descriptors = manifest.descriptors(timeout()).unwrap();
        assert_eq!(descriptors[0].id().as_str(), "start");
        assert_eq!(descriptors[0].screen.screen_type, ScreenType::Content);
        assert_eq!(descriptors[1].required_fields, vec!["terrain"]);
        assert!(descriptors[1].screen.is_form());
        assert!(descriptors[2].screen.has_priority);
        assert!(descriptors[3].screen.has_dependency());
    }

    #[tokio::test]
    async fn test_static_dependencies_resolve() {
        let manifest: FlowManifest = MANIFEST.parse().unwrap();
        let registry = manifest.dependency_registry(timeout()).unwrap();

        let data = registry.get("recommendations").unwrap().load().await.unwrap();
        assert_eq!(data["count"], serde_json::json!(2));
        assert_eq!(data["shoes"][0], serde_json::json!("ghost"));

        let err = registry.get("broken").unwrap().load().await.unwrap_err();
        assert_eq!(err, "Recommendations are unavailable");
    }

    #[test]
    fn test_no_screens() {
        let err = FlowManifest::parse("[dependencies]\n").unwrap_err();
        assert!(matches!(err, FlowError::NoScreens));
    }

    #[test]
    fn test_dependency_needs_exactly_one_source() {
        let manifest = FlowManifest::parse(
            r#"
[dependencies.both]
data = 1
error = "no"

[[screens]]
id = "start"
"#,
        )
        .unwrap();
        let err = manifest.descriptors(timeout()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidDependency { ref name, .. } if name == "both"));
    }

    #[test]
    fn test_unknown_wait_for() {
        let manifest = FlowManifest::parse(
            r#"
[[screens]]
id = "Results"
wait_for = "missing"
"#,
        )
        .unwrap();
        let err = manifest.descriptors(timeout()).unwrap_err();
        assert!(matches!(
            err,
            FlowError::Screen(DescriptorError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn test_screen_without_id() {
        let manifest = FlowManifest::parse("[[screens]]\ntype = \"form\"\n").unwrap();
        let err = manifest.descriptors(timeout()).unwrap_err();
        assert!(matches!(err, FlowError::Screen(DescriptorError::MissingId)));
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MANIFEST.as_bytes()).unwrap();
        let manifest = FlowManifest::from_path(file.path()).unwrap();
        assert_eq!(manifest.screens.len(), 4);

        let missing = FlowManifest::from_path(Path::new("/nonexistent/flow.toml"));
        assert!(matches!(missing, Err(FlowError::ReadError { .. })));
    }
}
