//! Ordered listener lists with capability-token removal.
//!
//! Replaces multicast-delegate event fields: listeners are invoked in
//! registration order, and `add` hands back a [`ListenerToken`] that is the
//! only way to remove the callback again.

/// Capability for removing a previously added listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerToken(u64);

/// An ordered collection of callbacks for events of type `E`.
pub struct ListenerSet<E> {
    entries: Vec<(ListenerToken, Box<dyn FnMut(&E)>)>,
    next_token: u64,
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_token: 0,
        }
    }
}

impl<E> ListenerSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: impl FnMut(&E) + 'static) -> ListenerToken {
        let token = ListenerToken(self.next_token);
        self.next_token += 1;
        self.entries.push((token, Box::new(listener)));
        token
    }

    /// Remove by token. Returns false if the token was already removed.
    pub fn remove(&mut self, token: ListenerToken) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(t, _)| *t != token);
        self.entries.len() != before
    }

    /// Invoke every listener, in registration order.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> std::fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emits_in_registration_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut set = ListenerSet::new();
        for tag in ["a", "b", "c"] {
            let seen = Rc::clone(&seen);
            set.add(move |_: &()| seen.borrow_mut().push(tag));
        }
        set.emit(&());
        assert_eq!(*seen.borrow(), ["a", "b", "c"]);
    }

    #[test]
    fn token_removes_exactly_one() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut set = ListenerSet::new();
        let s1 = Rc::clone(&seen);
        set.add(move |_: &()| s1.borrow_mut().push("a"));
        let s2 = Rc::clone(&seen);
        let token = set.add(move |_: &()| s2.borrow_mut().push("b"));

        assert!(set.remove(token));
        assert!(!set.remove(token));
        set.emit(&());
        assert_eq!(*seen.borrow(), ["a"]);
    }
}
