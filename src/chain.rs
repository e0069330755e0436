//! Ordered interceptor chain with a protected trace slot.

use std::fmt;
use std::sync::Arc;

use crate::interceptor::{Interceptor, InterceptorId};

/// The ordered, mutable sequence of interceptors attached to one client.
///
/// Position in the chain is execution order. The chain is built around one
/// protected invariant: the trace interceptor it was created with stays ahead
/// of every other interceptor, no matter which registration site edited the
/// chain or in what order the edits arrived. The backing list is never handed
/// out; every mutating method re-anchors the trace interceptor after applying
/// its edit, so even an explicit [`Chain::insert`] at index 0 lands behind it.
///
/// Among non-trace interceptors, order follows the registration calls:
/// appends keep their call order, inserts land at the index they asked for.
pub struct Chain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    trace: InterceptorId,
}

impl Chain {
    /// Create a chain whose protected head is `trace`.
    pub(crate) fn new(trace: Arc<dyn Interceptor>) -> Self {
        let id = InterceptorId::of(&trace);
        Self {
            interceptors: vec![trace],
            trace: id,
        }
    }

    /// Identity of the protected trace interceptor.
    #[must_use]
    pub const fn trace_id(&self) -> InterceptorId {
        self.trace
    }

    /// Append an interceptor at the end of the chain.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
        self.restore_trace_position();
    }

    /// Insert an interceptor at `index`.
    ///
    /// The index is interpreted against the chain as the caller sees it and
    /// is clamped to the current length, so registration never fails. An
    /// insert at index 0 ends up immediately behind the trace interceptor,
    /// ahead of everything registered before it.
    pub fn insert(&mut self, index: usize, interceptor: Arc<dyn Interceptor>) {
        let index = index.min(self.interceptors.len());
        self.interceptors.insert(index, interceptor);
        self.restore_trace_position();
    }

    /// Remove the interceptor with the given identity, if present.
    ///
    /// # Panics
    ///
    /// Panics when asked to remove the trace interceptor: that would lose the
    /// identity this chain is contracted to keep in front, which is a
    /// programming error, not a runtime condition.
    pub fn remove(&mut self, id: InterceptorId) -> Option<Arc<dyn Interceptor>> {
        assert!(
            id != self.trace,
            "the trace interceptor cannot be removed from the chain"
        );
        let position = self
            .interceptors
            .iter()
            .position(|interceptor| InterceptorId::of(interceptor) == id)?;
        let removed = self.interceptors.remove(position);
        self.restore_trace_position();
        Some(removed)
    }

    /// Number of interceptors, the trace interceptor included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Whether the chain is empty. Never true for a live chain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Whether an interceptor with the given identity is in the chain.
    #[must_use]
    pub fn contains(&self, id: InterceptorId) -> bool {
        self.interceptors
            .iter()
            .any(|interceptor| InterceptorId::of(interceptor) == id)
    }

    /// Current order of interceptor identities. Read-only; repeated calls
    /// without intervening mutation return the same sequence.
    #[must_use]
    pub fn effective_order(&self) -> Vec<InterceptorId> {
        self.interceptors.iter().map(InterceptorId::of).collect()
    }

    /// Interceptor names in chain order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.interceptors
            .iter()
            .map(|interceptor| interceptor.name())
            .collect()
    }

    /// Iterate over the interceptors in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Interceptor>> {
        self.interceptors.iter()
    }

    /// Cheap copy of the current order, handed to request execution so
    /// in-flight requests are isolated from later edits.
    pub(crate) fn snapshot(&self) -> Arc<[Arc<dyn Interceptor>]> {
        Arc::from(self.interceptors.as_slice())
    }

    /// Move the trace interceptor back to the front, keeping the relative
    /// order of everything else. Called after every mutation; its absence
    /// from the chain means an edit destroyed the identity we protect.
    fn restore_trace_position(&mut self) {
        let position = self
            .interceptors
            .iter()
            .position(|interceptor| InterceptorId::of(interceptor) == self.trace);
        let Some(position) = position else {
            panic!("the trace interceptor is no longer in the chain; its identity must be preserved")
        };
        if position > 0 {
            let trace = self.interceptors.remove(position);
            self.interceptors.insert(0, trace);
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("order", &self.names()).finish()
    }
}
