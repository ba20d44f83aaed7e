use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait defining the interface for load balancing strategies
pub trait LoadBalancingStrategy: Send + Sync + 'static {
    /// Pick an index into a snapshot of `len` candidates, or `None` when it is empty
    fn next_index(&self, len: usize) -> Option<usize>;
    /// Create a new instance of this strategy as a boxed trait object
    fn boxed(self) -> Box<dyn LoadBalancingStrategy>
    where
        Self: Sized,
    {
        Box::new(self)
    }
}

/// Round-robin load balancing strategy.
///
/// The cursor is stored already reduced modulo the size of the last snapshot it
/// served, and is reduced again against the current snapshot before use, so a
/// healthy set that shrank between calls can never produce an out-of-bounds index.
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    cursor: AtomicUsize,
}

impl RoundRobinStrategy {
    /// Create a new round-robin strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor value (diagnostics and tests)
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

impl LoadBalancingStrategy for RoundRobinStrategy {
    fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        // Single read-modify-write: concurrent callers each observe a distinct cursor value
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cursor| {
                Some((cursor % len + 1) % len)
            })
            .unwrap_or_else(|current| current);
        Some(previous % len)
    }
}

/// Stateless-by-contract selector over whatever healthy snapshot the caller hands in.
pub struct Router {
    strategy: Box<dyn LoadBalancingStrategy>,
}

impl Default for Router {
    fn default() -> Self {
        Self::round_robin()
    }
}

impl Router {
    pub fn new(strategy: Box<dyn LoadBalancingStrategy>) -> Self {
        Self { strategy }
    }

    pub fn round_robin() -> Self {
        Self::new(RoundRobinStrategy::new().boxed())
    }

    /// Select the next candidate from `snapshot`; `None` for an empty snapshot
    pub fn next<T: Clone>(&self, snapshot: &[T]) -> Option<T> {
        self.strategy
            .next_index(snapshot.len())
            .and_then(|index| snapshot.get(index).cloned())
    }

    /// Like [`Router::next`], but when the pick is rejected by `accept`, walk forward
    /// in snapshot order from it to the first accepted candidate.
    ///
    /// The cursor advances exactly once per call either way.
    pub fn next_accepted<T: Clone>(
        &self,
        snapshot: &[T],
        mut accept: impl FnMut(&T) -> bool,
    ) -> Option<T> {
        let len = snapshot.len();
        let start = self.strategy.next_index(len)?;
        (0..len)
            .map(|offset| &snapshot[(start + offset) % len])
            .find(|candidate| accept(candidate))
            .cloned()
    }
}
