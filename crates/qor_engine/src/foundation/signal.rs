//! Callback lists
//!
//! A `Signal` is an ordered list of boxed callbacks invoked with a shared
//! argument. Nodes use one for "child added" notifications and the physics
//! bridge uses one for its one-shot "bodies generated" event.

use std::fmt;

type Slot<A> = Box<dyn FnMut(&A)>;

/// Ordered list of callbacks taking `&A`
pub struct Signal<A> {
    slots: Vec<Slot<A>>,
}

impl<A> Default for Signal<A> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal").field("slots", &self.slots.len()).finish()
    }
}

impl<A> Signal<A> {
    /// Create an empty signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback
    pub fn connect(&mut self, slot: impl FnMut(&A) + 'static) {
        self.slots.push(Box::new(slot));
    }

    /// Invoke every callback in connection order
    pub fn emit(&mut self, args: &A) {
        for slot in &mut self.slots {
            slot(args);
        }
    }

    /// Drop all callbacks
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of connected callbacks
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when nothing is connected
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_emit_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut signal = Signal::<u32>::new();

        let a = Rc::clone(&seen);
        signal.connect(move |v| a.borrow_mut().push(*v));
        let b = Rc::clone(&seen);
        signal.connect(move |v| b.borrow_mut().push(*v * 10));

        signal.emit(&3);
        assert_eq!(*seen.borrow(), vec![3, 30]);

        signal.clear();
        assert!(signal.is_empty());
        signal.emit(&4);
        assert_eq!(seen.borrow().len(), 2);
    }
}
