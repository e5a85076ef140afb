//! trigger data: what changed during an evaluation
//!
//! each kind that reports changes owns one fixed-shape slot. accumulating
//! across a conditions list merges slot by slot, later conditions replacing
//! earlier ones in the same slot.

use std::rc::Rc;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// a `from -> to` pair; either side is absent when the value was unset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<T>,
}

impl<T> Transition<T> {
    pub fn new(from: Option<T>, to: Option<T>) -> Self {
        Self { from, to }
    }
}

impl Transition<String> {
    /// transition between two optional strings, treating empty strings as unset
    ///
    /// returns `None` when neither side carries a value
    pub fn between_strings(from: Option<&str>, to: Option<&str>) -> Option<Self> {
        let from = from.filter(|s| !s.is_empty()).map(String::from);
        let to = to.filter(|s| !s.is_empty()).map(String::from);
        if from.is_none() && to.is_none() {
            None
        } else {
            Some(Self { from, to })
        }
    }
}

/// entity state transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTrigger {
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// structured record of the changes an evaluation observed, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionsTriggerData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<Transition<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<Transition<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Transition<Rc<JsonValue>>>,
}

impl ConditionsTriggerData {
    /// true when no slot is filled
    pub fn is_empty(&self) -> bool {
        self.state.is_none() && self.view.is_none() && self.camera.is_none() && self.config.is_none()
    }

    /// merge `other` into `self`; filled slots in `other` win
    pub fn merge(&mut self, other: ConditionsTriggerData) {
        if other.state.is_some() {
            self.state = other.state;
        }
        if other.view.is_some() {
            self.view = other.view;
        }
        if other.camera.is_some() {
            self.camera = other.camera;
        }
        if other.config.is_some() {
            self.config = other.config;
        }
    }
}

/// result of evaluating one condition or a whole list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConditionsEvaluationResult {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_data: Option<ConditionsTriggerData>,
}

impl ConditionsEvaluationResult {
    /// result with no trigger data
    pub fn new(result: bool) -> Self {
        Self {
            result,
            trigger_data: None,
        }
    }

    /// result carrying trigger data
    pub fn with_trigger_data(result: bool, trigger_data: ConditionsTriggerData) -> Self {
        Self {
            result,
            trigger_data: Some(trigger_data),
        }
    }

    /// true when trigger data is present and has at least one slot filled
    pub fn has_trigger_data(&self) -> bool {
        self.trigger_data.as_ref().is_some_and(|t| !t.is_empty())
    }
}
