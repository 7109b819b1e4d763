//! Optimistic local state with rollback.

/// A value shown to the user before the backend has confirmed it.
///
/// `apply` updates what is displayed immediately; `confirm` makes it the new
/// baseline and `rollback` restores the last confirmed value. With several
/// updates in flight a rollback discards all of them.
#[derive(Debug, Clone)]
pub struct Optimistic<T> {
    confirmed: T,
    current: T,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(value: T) -> Self {
        Self {
            confirmed: value.clone(),
            current: value,
        }
    }

    /// The value to display.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The last value the backend accepted.
    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    /// True while local changes await confirmation.
    pub fn is_dirty(&self) -> bool
    where
        T: PartialEq,
    {
        self.current != self.confirmed
    }

    /// Applies a local change ahead of the backend.
    pub fn apply<F>(&mut self, f: F)
    where
        F: FnOnce(&mut T),
    {
        f(&mut self.current);
    }

    /// Applies a change the backend already made, to both values.
    pub fn apply_confirmed<F>(&mut self, f: F)
    where
        F: Fn(&mut T),
    {
        f(&mut self.confirmed);
        f(&mut self.current);
    }

    pub fn confirm(&mut self) {
        self.confirmed = self.current.clone();
    }

    pub fn rollback(&mut self) {
        self.current = self.confirmed.clone();
    }

    /// Replaces both values with fresh backend data.
    pub fn reset(&mut self, value: T) {
        self.confirmed = value.clone();
        self.current = value;
    }
}

impl<T: Clone + Default> Default for Optimistic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_then_rollback() {
        let mut list = Optimistic::new(vec![1, 2]);
        list.apply(|v| v.push(3));
        assert_eq!(list.current(), &vec![1, 2, 3]);
        assert!(list.is_dirty());

        list.rollback();
        assert_eq!(list.current(), &vec![1, 2]);
        assert!(!list.is_dirty());
    }

    #[test]
    fn test_confirm_moves_baseline() {
        let mut list = Optimistic::new(vec![1]);
        list.apply(|v| v.clear());
        list.confirm();
        list.apply(|v| v.push(7));
        list.rollback();
        assert!(list.current().is_empty());
        assert!(list.confirmed().is_empty());
    }
}
