use std::cell::Cell;

/// State of a lazily derived value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cached<T> {
    /// The inputs changed since the last derivation; the next read recomputes.
    Stale,
    /// Derived from the current inputs.
    Valid(T),
}

/// Interior-mutable slot holding one [`Cached`] value.
///
/// Reads go through [`CacheCell::get_or_compute`], which recomputes iff the
/// slot is stale and leaves it valid afterwards. Owners call
/// [`CacheCell::invalidate`] whenever an input of the derivation changes.
#[derive(Debug, Clone)]
pub struct CacheCell<T: Copy> {
    slot: Cell<Cached<T>>,
}

impl<T: Copy> Default for CacheCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> CacheCell<T> {
    pub fn new() -> Self {
        Self {
            slot: Cell::new(Cached::Stale),
        }
    }

    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> T {
        match self.slot.get() {
            Cached::Valid(value) => value,
            Cached::Stale => {
                let value = compute();
                self.slot.set(Cached::Valid(value));
                value
            }
        }
    }

    pub fn invalidate(&self) {
        self.slot.set(Cached::Stale);
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.slot.get(), Cached::Stale)
    }

    pub fn state(&self) -> Cached<T> {
        self.slot.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cell_starts_stale() {
        let cell: CacheCell<u32> = CacheCell::new();
        assert!(cell.is_stale());
        assert_eq!(cell.state(), Cached::Stale);
    }

    #[test]
    fn compute_runs_once_until_invalidated() {
        let cell = CacheCell::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            7_u32
        };

        assert_eq!(cell.get_or_compute(compute), 7);
        assert_eq!(cell.get_or_compute(compute), 7);
        assert_eq!(calls.get(), 1);
        assert_eq!(cell.state(), Cached::Valid(7));

        cell.invalidate();
        assert!(cell.is_stale());
        assert_eq!(cell.get_or_compute(compute), 7);
        assert_eq!(calls.get(), 2);
    }
}
