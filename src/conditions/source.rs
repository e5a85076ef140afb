//! condition state publishers
//!
//! a [`ConditionStateSource`] owns the current [`ConditionState`] and tells
//! subscribers about every transition. [`ConditionStateManager`] is the
//! in-memory implementation used by hosts that push state themselves.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value as JsonValue};

use super::error::ConditionsError;
use super::listeners::{ListenerId, ListenerRegistry};
use super::state::{ConditionState, ConditionStateChange};

/// callback invoked with every state transition
pub type StateChangeHandler = dyn Fn(&ConditionStateChange) -> Result<(), ConditionsError>;

/// source of condition state snapshots
pub trait ConditionStateSource {
    /// current snapshot, `None` until state has been set
    fn get_state(&self) -> Option<Rc<ConditionState>>;

    /// subscribe to state transitions
    fn add_listener(&self, handler: Rc<StateChangeHandler>) -> ListenerId;

    /// unsubscribe a handler
    fn remove_listener(&self, id: ListenerId);
}

/// in-memory state source
#[derive(Default)]
pub struct ConditionStateManager {
    state: RefCell<Option<Rc<ConditionState>>>,
    listeners: ListenerRegistry<StateChangeHandler>,
}

impl ConditionStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// replace the current snapshot
    ///
    /// subscribers are notified only when at least one field differs. the
    /// first snapshot always notifies. an unchanged config value keeps its
    /// previous reference so `config` conditions do not fire on equal values.
    pub fn set_state(&self, state: ConditionState) -> Result<(), ConditionsError> {
        let old = self.state.borrow().clone();

        let mut state = state;
        if let (Some(old), Some(new_config)) = (&old, &state.config) {
            if let Some(old_config) = &old.config {
                if old_config == new_config {
                    state.config = Some(Rc::clone(old_config));
                }
            }
        }

        let change = ConditionStateChange::between(old.clone(), Rc::new(state));
        if old.is_some() && change.change.is_empty() {
            tracing::trace!("state unchanged, not notifying");
            return Ok(());
        }

        *self.state.borrow_mut() = change.new.clone();

        tracing::debug!(
            fields = ?change.change.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "condition state changed"
        );

        for handler in self.listeners.snapshot() {
            handler(&change)?;
        }
        Ok(())
    }

    /// modify a copy of the current snapshot and set it
    pub fn update<F>(&self, f: F) -> Result<(), ConditionsError>
    where
        F: FnOnce(&mut ConditionState),
    {
        let mut next = self
            .state
            .borrow()
            .as_deref()
            .cloned()
            .unwrap_or_default();
        f(&mut next);
        self.set_state(next)
    }

    /// apply a JSON object patch to the current snapshot and set it
    ///
    /// present keys replace, `null` clears the field
    pub fn apply_patch(&self, patch: &Map<String, JsonValue>) -> Result<(), ConditionsError> {
        let current = self
            .state
            .borrow()
            .as_deref()
            .cloned()
            .unwrap_or_default();
        let next = current.merged_with(patch)?;
        self.set_state(next)
    }

    /// number of subscribed handlers
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl ConditionStateSource for ConditionStateManager {
    fn get_state(&self) -> Option<Rc<ConditionState>> {
        self.state.borrow().clone()
    }

    fn add_listener(&self, handler: Rc<StateChangeHandler>) -> ListenerId {
        self.listeners.add(handler)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
