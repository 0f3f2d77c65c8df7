//! Request generations: only the response to the latest request is applied

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic request counter owned by one fetching component
#[derive(Debug, Clone, Default)]
pub struct Generation {
    latest: Arc<AtomicU64>,
}

/// Tag carried by one in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, superseding every earlier ticket
    pub fn next(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` belongs to the most recent request
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_tickets_supersede_earlier_ones() {
        let generation = Generation::new();
        let first = generation.next();
        assert!(generation.is_current(first));

        let second = generation.next();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
        assert!(second > first);

        // clones share the counter
        let shared = generation.clone();
        let third = shared.next();
        assert!(!generation.is_current(second));
        assert!(generation.is_current(third));
    }
}
