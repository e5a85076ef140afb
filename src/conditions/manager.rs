//! conditions manager
//!
//! owns a conditions list, re-evaluates it whenever the state source or a
//! watched media query changes, and caches the latest evaluation. listeners
//! are notified when the boolean result flips or when a true result carries
//! trigger data.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use super::error::ConditionsError;
use super::eval::{evaluate_all, EvalContext};
use super::listeners::{ListenerId, ListenerRegistry};
use super::media_query::{MediaQueryHandler, MediaQueryList, MediaQueryProvider};
use super::source::{ConditionStateSource, StateChangeHandler};
use super::state::{ConditionState, ConditionStateChange};
use super::trigger::ConditionsEvaluationResult;
use super::types::Condition;

/// callback invoked with each accepted evaluation
pub type ConditionsListener = dyn Fn(&ConditionsEvaluationResult);

/// registrations the manager holds with its collaborators
#[derive(Default)]
struct Subscriptions {
    state: Option<ListenerId>,
    media: Vec<(Rc<dyn MediaQueryList>, ListenerId)>,
}

struct Inner {
    conditions: RefCell<Vec<Condition>>,
    source: Option<Rc<dyn ConditionStateSource>>,
    media: Option<Rc<dyn MediaQueryProvider>>,
    has_state_dependent_conditions: bool,
    evaluation: RefCell<ConditionsEvaluationResult>,
    listeners: ListenerRegistry<ConditionsListener>,
    subscriptions: RefCell<Subscriptions>,
}

impl Inner {
    fn handle_state_change(&self, change: &ConditionStateChange) -> Result<(), ConditionsError> {
        if change.is_entity_state_only() && !self.has_state_dependent_conditions {
            tracing::debug!("only entity state changed, skipping evaluation");
            return Ok(());
        }
        self.evaluate(Some(change), true)
    }

    fn evaluate(
        &self,
        change: Option<&ConditionStateChange>,
        call_listeners: bool,
    ) -> Result<(), ConditionsError> {
        let current: Option<Rc<ConditionState>> = match change.and_then(|c| c.new.clone()) {
            Some(new) => Some(new),
            None => self.source.as_ref().and_then(|s| s.get_state()),
        };
        let old = change.and_then(|c| c.old.as_deref());

        let ctx = EvalContext::new(current.as_deref())
            .with_old_state(old)
            .with_media(self.media.as_deref());

        let evaluation = {
            let conditions = self.conditions.borrow();
            evaluate_all(&conditions, &ctx)?
        };

        let previous = self.evaluation.borrow().result;
        if evaluation.result == previous && !evaluation.has_trigger_data() {
            tracing::debug!(result = evaluation.result, "evaluation unchanged");
            return Ok(());
        }

        tracing::debug!(
            result = evaluation.result,
            trigger_data = evaluation.has_trigger_data(),
            "evaluation changed"
        );
        *self.evaluation.borrow_mut() = evaluation.clone();

        if call_listeners {
            for listener in self.listeners.snapshot() {
                listener(&evaluation);
            }
        }
        Ok(())
    }

    fn destroy(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());

        if let (Some(source), Some(id)) = (&self.source, subscriptions.state) {
            source.remove_listener(id);
        }

        for id in self.listeners.ids() {
            self.listeners.remove(id);
        }

        for (list, id) in subscriptions.media {
            tracing::debug!(query = list.media(), "releasing media query watcher");
            list.remove_change_listener(id);
        }

        self.conditions.borrow_mut().clear();
    }
}

/// builder for [`ConditionsManager`]
pub struct ConditionsManagerBuilder {
    conditions: Vec<Condition>,
    source: Option<Rc<dyn ConditionStateSource>>,
    media: Option<Rc<dyn MediaQueryProvider>>,
}

impl ConditionsManagerBuilder {
    /// state source to evaluate against and subscribe to
    pub fn state_source(mut self, source: Rc<dyn ConditionStateSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// media query platform for `screen` conditions
    pub fn media_queries(mut self, media: Rc<dyn MediaQueryProvider>) -> Self {
        self.media = Some(media);
        self
    }

    /// construct the manager
    ///
    /// registers media query watchers, seeds the cached evaluation without
    /// notifying, then subscribes to the state source
    pub fn build(self) -> Result<ConditionsManager, ConditionsError> {
        let has_state_dependent_conditions =
            self.conditions.iter().any(Condition::depends_on_entity_state);

        let inner = Rc::new(Inner {
            conditions: RefCell::new(self.conditions),
            source: self.source,
            media: self.media,
            has_state_dependent_conditions,
            evaluation: RefCell::new(ConditionsEvaluationResult::new(false)),
            listeners: ListenerRegistry::new(),
            subscriptions: RefCell::new(Subscriptions::default()),
        });

        let manager = ConditionsManager { inner };
        manager.watch_media_queries();
        manager.inner.evaluate(None, false)?;
        manager.subscribe_to_source();

        Ok(manager)
    }
}

/// evaluates a conditions list against a state source and media queries
pub struct ConditionsManager {
    inner: Rc<Inner>,
}

impl ConditionsManager {
    /// start building a manager for a conditions list
    pub fn builder(conditions: Vec<Condition>) -> ConditionsManagerBuilder {
        ConditionsManagerBuilder {
            conditions,
            source: None,
            media: None,
        }
    }

    /// manager with no state source and no media platform
    pub fn new(conditions: Vec<Condition>) -> Result<Self, ConditionsError> {
        Self::builder(conditions).build()
    }

    fn watch_media_queries(&self) {
        let Some(media) = &self.inner.media else {
            return;
        };

        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let handler: Rc<MediaQueryHandler> = Rc::new(move || match weak.upgrade() {
            Some(inner) => inner.evaluate(None, true),
            None => Ok(()),
        });

        let conditions = self.inner.conditions.borrow();
        let mut subscriptions = self.inner.subscriptions.borrow_mut();
        let mut watched = HashSet::new();
        // each distinct query is watched once
        for query in conditions.iter().filter_map(Condition::media_query) {
            if !watched.insert(query) {
                continue;
            }
            let list = media.match_media(query);
            let id = list.add_change_listener(Rc::clone(&handler));
            tracing::debug!(query, "watching media query");
            subscriptions.media.push((list, id));
        }
    }

    fn subscribe_to_source(&self) {
        let Some(source) = &self.inner.source else {
            return;
        };

        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let handler: Rc<StateChangeHandler> =
            Rc::new(move |change: &ConditionStateChange| match weak.upgrade() {
                Some(inner) => inner.handle_state_change(change),
                None => Ok(()),
            });

        let id = source.add_listener(handler);
        self.inner.subscriptions.borrow_mut().state = Some(id);
    }

    /// register a listener; registering the same `Rc` twice is a no-op
    pub fn add_listener(&self, listener: Rc<ConditionsListener>) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    /// remove a listener; unknown ids are ignored
    pub fn remove_listener(&self, id: ListenerId) {
        self.inner.listeners.remove(id);
    }

    /// the cached evaluation; never re-evaluates
    pub fn get_evaluation(&self) -> ConditionsEvaluationResult {
        self.inner.evaluation.borrow().clone()
    }

    /// whether any condition reads entity state or the current user
    pub fn has_state_dependent_conditions(&self) -> bool {
        self.inner.has_state_dependent_conditions
    }

    /// number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// release every subscription and listener
    ///
    /// the manager is inert afterwards; calling this again does nothing
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}

impl Drop for ConditionsManager {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}
