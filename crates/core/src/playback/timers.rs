use std::collections::BTreeMap;
use std::time::Instant;

/// Ordered by deadline, then by scheduling order, which is also the order
/// actions fire in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct TimerKey {
    deadline: Instant,
    seq: u64,
}

/// Deadline-ordered queue of deferred actions drained by the caller's loop.
///
/// Cancelling removes the entries outright, so a cancelled action can
/// never be returned by [`TimerQueue::pop_due`].
#[derive(Debug)]
pub struct TimerQueue<A> {
    pending: BTreeMap<TimerKey, A>,
    next_seq: u64,
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<A> TimerQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Instant, action: A) {
        let key = TimerKey {
            deadline,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.insert(key, action);
    }

    pub fn cancel_all(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, A)> {
        let entry = self.pending.first_entry()?;
        if entry.key().deadline > now {
            return None;
        }
        let (key, action) = entry.remove_entry();
        Some((key.deadline, action))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.keys().next().map(|key| key.deadline)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
