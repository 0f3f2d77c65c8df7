//! Optimistic values: a committed value plus an optional pending one

/// A value whose displayed state may run ahead of what the backend confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked<T> {
    committed: T,
    pending: Option<T>,
}

impl<T: Clone> Tracked<T> {
    /// A value the backend has confirmed
    pub fn new(value: T) -> Self {
        Self {
            committed: value,
            pending: None,
        }
    }

    /// The value to show: the pending one while a mutation is in flight
    pub fn displayed(&self) -> &T {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    /// The last confirmed value
    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Show `value` until the mutation settles
    pub fn begin(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// The mutation succeeded
    pub fn commit(&mut self) {
        if let Some(value) = self.pending.take() {
            self.committed = value;
        }
    }

    /// The mutation failed; fall back to the confirmed value
    pub fn rollback(&mut self) {
        self.pending = None;
    }

    /// Replace the confirmed value with a fresh read, dropping any pending one
    pub fn reset(&mut self, value: T) {
        self.committed = value;
        self.pending = None;
    }
}

impl<T: Clone + Default> Default for Tracked<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rollback_restores_committed() {
        let mut flag = Tracked::new(false);
        flag.begin(true);
        assert!(*flag.displayed());
        assert!(flag.is_pending());

        flag.rollback();
        assert!(!*flag.displayed());
        assert!(!flag.is_pending());
    }

    #[test]
    fn commit_keeps_pending_value() {
        let mut likes = Tracked::new(3u32);
        likes.begin(4);
        likes.commit();
        assert_eq!(*likes.committed(), 4);
        assert_eq!(*likes.displayed(), 4);

        // commit without a pending value changes nothing
        likes.commit();
        assert_eq!(*likes.committed(), 4);
    }
}
