//! media query capability
//!
//! `screen` conditions match against a platform media query rather than the
//! state snapshot. the platform is injected through [`MediaQueryProvider`] so
//! evaluation does not depend on a real display surface.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::error::ConditionsError;
use super::listeners::{ListenerId, ListenerRegistry};

/// callback invoked when a media query's match state changes
pub type MediaQueryHandler = dyn Fn() -> Result<(), ConditionsError>;

/// a live media query
pub trait MediaQueryList {
    /// the query string this list was created for
    fn media(&self) -> &str;

    /// current match state
    fn matches(&self) -> bool;

    /// subscribe to match state changes
    fn add_change_listener(&self, handler: Rc<MediaQueryHandler>) -> ListenerId;

    /// unsubscribe a handler registered with [`MediaQueryList::add_change_listener`]
    fn remove_change_listener(&self, id: ListenerId);
}

/// platform entry point for media queries
pub trait MediaQueryProvider {
    /// obtain the live list for a query
    fn match_media(&self, query: &str) -> Rc<dyn MediaQueryList>;
}

// ============================================================================
// Static Provider
// ============================================================================

/// media query list whose match state is set programmatically
pub struct StaticMediaQueryList {
    media: String,
    matches: Cell<bool>,
    listeners: ListenerRegistry<MediaQueryHandler>,
}

impl StaticMediaQueryList {
    fn new(media: &str, matches: bool) -> Self {
        Self {
            media: media.to_string(),
            matches: Cell::new(matches),
            listeners: ListenerRegistry::new(),
        }
    }

    /// number of subscribed handlers
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl MediaQueryList for StaticMediaQueryList {
    fn media(&self) -> &str {
        &self.media
    }

    fn matches(&self) -> bool {
        self.matches.get()
    }

    fn add_change_listener(&self, handler: Rc<MediaQueryHandler>) -> ListenerId {
        self.listeners.add(handler)
    }

    fn remove_change_listener(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

/// provider for hosts without a display surface (CLI replay, tests)
///
/// queries that were never set do not match.
#[derive(Default)]
pub struct StaticMediaQueries {
    lists: RefCell<HashMap<String, Rc<StaticMediaQueryList>>>,
}

impl StaticMediaQueries {
    pub fn new() -> Self {
        Self::default()
    }

    /// set the match state of a query, notifying subscribers if it flipped
    pub fn set_matches(&self, query: &str, matches: bool) -> Result<(), ConditionsError> {
        let list = self.list(query);
        if list.matches.replace(matches) == matches {
            return Ok(());
        }

        tracing::debug!(query, matches, "media query changed");

        for handler in list.listeners.snapshot() {
            handler()?;
        }
        Ok(())
    }

    /// the list for a query, created on first use
    pub fn list(&self, query: &str) -> Rc<StaticMediaQueryList> {
        let mut lists = self.lists.borrow_mut();
        let list = lists
            .entry(query.to_string())
            .or_insert_with(|| Rc::new(StaticMediaQueryList::new(query, false)));
        Rc::clone(list)
    }
}

impl MediaQueryProvider for StaticMediaQueries {
    fn match_media(&self, query: &str) -> Rc<dyn MediaQueryList> {
        self.list(query)
    }
}
