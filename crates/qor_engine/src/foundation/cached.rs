//! Pull-based memoized values
//!
//! A [`Cached`] holds a value plus a dirty flag. Writers call [`Cached::pend`];
//! readers call [`Cached::get`] with the function that recomputes the value,
//! which only runs when the flag is set. Both work through `&self` so a
//! node's world transform can be refreshed during an immutable traversal.

use std::cell::Cell;

/// Memoized value with an explicit dirty flag
#[derive(Debug, Clone)]
pub struct Cached<T: Copy> {
    value: Cell<T>,
    dirty: Cell<bool>,
}

impl<T: Copy + Default> Default for Cached<T> {
    fn default() -> Self {
        Self::dirty(T::default())
    }
}

impl<T: Copy> Cached<T> {
    /// Create a cache that recomputes on first read
    pub fn dirty(initial: T) -> Self {
        Self {
            value: Cell::new(initial),
            dirty: Cell::new(true),
        }
    }

    /// Return the cached value, recomputing it first if dirty
    pub fn get(&self, compute: impl FnOnce() -> T) -> T {
        if self.dirty.get() {
            self.value.set(compute());
            self.dirty.set(false);
        }
        self.value.get()
    }

    /// Mark the value stale
    pub fn pend(&self) {
        self.dirty.set(true);
    }

    /// Overwrite the value and mark it clean
    pub fn set(&self, value: T) {
        self.value.set(value);
        self.dirty.set(false);
    }

    /// True when the next `get` will recompute
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recomputes_only_when_pended() {
        let cache = Cached::dirty(0);
        let mut calls = 0;

        assert_eq!(cache.get(|| { calls += 1; 7 }), 7);
        assert_eq!(cache.get(|| { calls += 1; 8 }), 7);
        assert_eq!(calls, 1);

        cache.pend();
        assert!(cache.is_dirty());
        assert_eq!(cache.get(|| { calls += 1; 9 }), 9);
        assert_eq!(calls, 2);
    }
}
