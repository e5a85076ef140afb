//! listener registry shared by every publisher in the conditions system
//!
//! registrations are keyed by a [`ListenerId`] token. registering the same
//! callback (same `Rc` allocation) twice returns the original token instead of
//! adding a second entry, so re-registration never causes duplicate calls.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// token identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// raw numeric value of this token
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// ordered, deduplicated set of callbacks
///
/// all methods take `&self` so callbacks may add or remove registrations while
/// a delivery is in progress: delivery iterates over [`ListenerRegistry::snapshot`].
pub struct ListenerRegistry<F: ?Sized> {
    /// next token value
    next_id: Cell<u64>,
    /// registrations in insertion order
    entries: RefCell<Vec<(ListenerId, Rc<F>)>>,
}

impl<F: ?Sized> ListenerRegistry<F> {
    /// create an empty registry
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            entries: RefCell::new(Vec::new()),
        }
    }

    /// register a callback, returning its token
    ///
    /// if this exact callback is already registered, its existing token is returned
    pub fn add(&self, listener: Rc<F>) -> ListenerId {
        let mut entries = self.entries.borrow_mut();

        if let Some((id, _)) = entries.iter().find(|(_, l)| same_callback(l, &listener)) {
            return *id;
        }

        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        entries.push((id, listener));
        id
    }

    /// remove a registration; unknown tokens are ignored
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// tokens of every registration, in insertion order
    pub fn ids(&self) -> Vec<ListenerId> {
        self.entries.borrow().iter().map(|(id, _)| *id).collect()
    }

    /// callbacks to deliver to, in insertion order
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect()
    }

    /// check whether a token is still registered
    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries.borrow().iter().any(|(entry_id, _)| *entry_id == id)
    }

    /// number of registrations
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// true when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<F: ?Sized> Default for ListenerRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> fmt::Debug for ListenerRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

// compare data pointers only; vtable pointers for the same closure may differ
// between codegen units
fn same_callback<F: ?Sized>(a: &Rc<F>, b: &Rc<F>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}
