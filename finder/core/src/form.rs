//! Form State Tracker
//!
//! Holds the latest serialized form values of the finder and the registered
//! steps (a form screen id plus the field names it requires), and answers
//! completion queries for the navigator.
//!
//! A step is complete when every required field has at least one non-empty
//! value. Values are kept in serialized form order, so repeated names
//! (checkbox groups, multi-selects) carry several values.

use std::collections::HashSet;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::bus::EventBus;
use crate::messages::FinderMessage;
use crate::screens::ScreenId;

/// One serialized `name=value` pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValue {
    /// Field name
    pub name: String,
    /// Field value
    pub value: String,
}

impl FormValue {
    /// Create a pair
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A form step: screen id and the fields it requires
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormStep {
    /// Form screen this step belongs to
    pub id: ScreenId,
    /// Field names that must be filled
    pub required: Vec<String>,
}

/// Completion queries the navigator depends on
pub trait StepCompletion: Send + Sync {
    /// Whether the step for screen `id` is complete. Unknown ids are not.
    fn completed_by_id(&self, id: &ScreenId) -> bool;

    /// Whether the step at `index` in registration order is complete
    fn completed_by_index(&self, index: usize) -> bool;

    /// Whether every registered step is complete
    fn all_steps_completed(&self) -> bool;

    /// Ids of the complete steps, in registration order
    fn completed_steps(&self) -> Vec<ScreenId>;
}

#[derive(Debug, Default)]
struct FormState {
    values: Vec<FormValue>,
    steps: Vec<FormStep>,
}

impl FormState {
    fn has_value(&self, name: &str) -> bool {
        self.values
            .iter()
            .any(|v| v.name == name && !v.value.trim().is_empty())
    }

    fn step_complete(&self, step: &FormStep) -> bool {
        step.required.iter().all(|name| self.has_value(name))
    }

    fn completed_ids(&self) -> Vec<ScreenId> {
        self.steps
            .iter()
            .filter(|step| self.step_complete(step))
            .map(|step| step.id.clone())
            .collect()
    }
}

/// Tracks form values and step completion
///
/// Shared as `Arc<FormStateTracker>`; updates publish `FormUpdated` and
/// `StepCompleted` on the bus.
#[derive(Debug)]
pub struct FormStateTracker {
    state: RwLock<FormState>,
    bus: EventBus,
}

impl FormStateTracker {
    /// Create an empty tracker publishing on `bus`
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: RwLock::new(FormState::default()),
            bus,
        }
    }

    /// Register a step, replacing an existing step with the same id
    pub fn register_step<I, S>(&self, id: ScreenId, required: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let step = FormStep {
            id,
            required: required.into_iter().map(Into::into).collect(),
        };
        let mut state = self.state.write();
        if let Some(existing) = state.steps.iter_mut().find(|s| s.id == step.id) {
            *existing = step;
        } else {
            tracing::debug!(step = %step.id, required = ?step.required, "Step registered");
            state.steps.push(step);
        }
    }

    /// Replace the current values and publish the resulting completion
    pub fn update_values(&self, values: Vec<FormValue>) {
        let (completed, newly_completed, all_completed) = {
            let mut state = self.state.write();
            let before: HashSet<ScreenId> = state.completed_ids().into_iter().collect();
            state.values = values;
            let completed = state.completed_ids();
            let newly_completed: Vec<ScreenId> = completed
                .iter()
                .filter(|id| !before.contains(*id))
                .cloned()
                .collect();
            let all_completed = completed.len() == state.steps.len();
            (completed, newly_completed, all_completed)
        };

        tracing::debug!(
            completed = completed.len(),
            all_completed = all_completed,
            "Form values updated"
        );

        self.bus.publish(FinderMessage::FormUpdated {
            completed_steps: completed,
            all_completed,
        });
        for screen_id in newly_completed {
            self.bus.publish(FinderMessage::StepCompleted { screen_id });
        }
    }

    /// Replace the current values from a `name=value&name=value` string
    pub fn update_from_query(&self, query: &str) {
        self.update_values(parse_query(query));
    }

    /// Values recorded for `name`
    #[must_use]
    pub fn values_for(&self, name: &str) -> Vec<String> {
        self.state
            .read()
            .values
            .iter()
            .filter(|v| v.name == name)
            .map(|v| v.value.clone())
            .collect()
    }

    /// All current values
    #[must_use]
    pub fn values(&self) -> Vec<FormValue> {
        self.state.read().values.clone()
    }

    /// Registered steps
    #[must_use]
    pub fn steps(&self) -> Vec<FormStep> {
        self.state.read().steps.clone()
    }
}

impl StepCompletion for FormStateTracker {
    fn completed_by_id(&self, id: &ScreenId) -> bool {
        let state = self.state.read();
        state
            .steps
            .iter()
            .find(|step| &step.id == id)
            .is_some_and(|step| state.step_complete(step))
    }

    fn completed_by_index(&self, index: usize) -> bool {
        let state = self.state.read();
        state
            .steps
            .get(index)
            .is_some_and(|step| state.step_complete(step))
    }

    fn all_steps_completed(&self) -> bool {
        let state = self.state.read();
        state.steps.iter().all(|step| state.step_complete(step))
    }

    fn completed_steps(&self) -> Vec<ScreenId> {
        self.state.read().completed_ids()
    }
}

/// Parse an `application/x-www-form-urlencoded` string into ordered pairs
#[must_use]
pub fn parse_query(query: &str) -> Vec<FormValue> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            FormValue::new(decode_component(name), decode_component(value))
        })
        .collect()
}

fn decode_component(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok());
                if let Some(byte) = hex {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'%');
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tracker() -> (FormStateTracker, tokio::sync::mpsc::Receiver<FinderMessage>) {
        let bus = EventBus::new();
        let (_id, rx) = bus.subscribe();
        let form = FormStateTracker::new(bus);
        form.register_step(ScreenId::new("terrain"), ["terrain"]);
        form.register_step(ScreenId::new("mileage"), ["mileage", "pace"]);
        (form, rx)
    }

    #[test]
    fn test_nothing_complete_initially() {
        let (form, _rx) = tracker();
        assert!(!form.completed_by_id(&ScreenId::new("terrain")));
        assert!(!form.completed_by_index(1));
        assert!(!form.all_steps_completed());
        assert!(form.completed_steps().is_empty());
    }

    #[test]
    fn test_step_requires_all_fields() {
        let (form, _rx) = tracker();
        form.update_values(vec![
            FormValue::new("terrain", "trail"),
            FormValue::new("mileage", "20"),
        ]);
        assert!(form.completed_by_id(&ScreenId::new("terrain")));
        assert!(!form.completed_by_id(&ScreenId::new("mileage")));

        form.update_values(vec![
            FormValue::new("terrain", "trail"),
            FormValue::new("mileage", "20"),
            FormValue::new("pace", "easy"),
        ]);
        assert!(form.completed_by_index(1));
        assert!(form.all_steps_completed());
    }

    #[test]
    fn test_blank_values_do_not_count() {
        let (form, _rx) = tracker();
        form.update_values(vec![
            FormValue::new("terrain", "  "),
            FormValue::new("terrain", ""),
        ]);
        assert!(!form.completed_by_id(&ScreenId::new("terrain")));

        form.update_values(vec![
            FormValue::new("terrain", ""),
            FormValue::new("terrain", "road"),
        ]);
        assert!(form.completed_by_id(&ScreenId::new("terrain")));
    }

    #[test]
    fn test_unknown_step_is_incomplete() {
        let (form, _rx) = tracker();
        assert!(!form.completed_by_id(&ScreenId::new("injuries")));
        assert!(!form.completed_by_index(7));
    }

    #[test]
    fn test_no_steps_means_all_completed() {
        let form = FormStateTracker::new(EventBus::new());
        assert!(form.all_steps_completed());
    }

    #[test]
    fn test_update_publishes_completion() {
        let (form, mut rx) = tracker();
        form.update_values(vec![FormValue::new("terrain", "road")]);

        assert_eq!(
            rx.try_recv().unwrap(),
            FinderMessage::FormUpdated {
                completed_steps: vec![ScreenId::new("terrain")],
                all_completed: false,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            FinderMessage::StepCompleted {
                screen_id: ScreenId::new("terrain")
            }
        );

        // Same values again: no new StepCompleted
        form.update_values(vec![FormValue::new("terrain", "road")]);
        assert!(matches!(
            rx.try_recv().unwrap(),
            FinderMessage::FormUpdated { .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_register_step_replaces() {
        let (form, _rx) = tracker();
        form.register_step(ScreenId::new("terrain"), ["surface"]);
        assert_eq!(form.steps().len(), 2);
        form.update_values(vec![FormValue::new("surface", "track")]);
        assert!(form.completed_by_id(&ScreenId::new("terrain")));
    }

    #[test]
    fn test_parse_query() {
        assert_eq!(
            parse_query("?terrain=road&goals=speed&goals=long+runs&note=50%25%20off&empty"),
            vec![
                FormValue::new("terrain", "road"),
                FormValue::new("goals", "speed"),
                FormValue::new("goals", "long runs"),
                FormValue::new("note", "50% off"),
                FormValue::new("empty", ""),
            ]
        );
    }

    #[test]
    fn test_parse_query_bad_escape_kept() {
        assert_eq!(parse_query("a=100%"), vec![FormValue::new("a", "100%")]);
        assert_eq!(parse_query("a=%zz"), vec![FormValue::new("a", "%zz")]);
    }

    #[test]
    fn test_update_from_query_and_values_for() {
        let (form, _rx) = tracker();
        form.update_from_query("goals=speed&goals=distance");
        assert_eq!(form.values_for("goals"), vec!["speed", "distance"]);
        assert_eq!(form.values().len(), 2);
    }
}
