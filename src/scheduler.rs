//! # Scheduler State
//!
//! The process-wide scheduling state: thread table, FIFO ready queue,
//! blocked set, running thread, quantum accounting, and the graveyard for
//! records whose threads terminated themselves. This module is pure state —
//! the switch protocol and the public operations in `kernel` drive it.
//!
//! ## Partition invariant
//!
//! At every instant where the timer signal is unmasked, the live
//! identifiers split exactly into `{running}` ∪ ready queue ∪ blocked set,
//! pairwise disjoint, and each member's state field agrees with the
//! collection holding it.
//!
//! ## Allocation discipline
//!
//! The ready queue and the graveyard are the two collections the preemption
//! handler touches, so both have their full capacity reserved up front:
//! the handler may interrupt user code mid-allocation and must not allocate
//! itself.

use std::collections::{BTreeSet, VecDeque};

use crate::config::MAX_THREADS;
use crate::error;
use crate::thread::{Thread, Tid};

/// Central scheduler state. Owned by `kernel` as a module-scoped singleton
/// between `init` and main-thread termination.
pub struct Scheduler {
    /// Quantum length in microseconds per priority index. Immutable after
    /// `init`.
    quantum_table: Vec<i32>,

    /// Authoritative set of live threads, indexed by identifier.
    threads: [Option<Thread>; MAX_THREADS],

    /// Identifiers in `Ready` state, strict FIFO.
    ready: VecDeque<Tid>,

    /// Identifiers in `Blocked` state.
    blocked: BTreeSet<Tid>,

    /// Identifier of the running thread.
    running: Tid,

    /// Quanta since `init`, the current one included. 1 right after `init`.
    total_quantums: i32,

    /// Records of self-terminated threads, kept alive until the next
    /// dispatch because a thread cannot free the stack it is standing on.
    graveyard: Vec<Thread>,
}

impl Scheduler {
    pub fn new(quantum_table: Vec<i32>) -> Self {
        Scheduler {
            quantum_table,
            threads: std::array::from_fn(|_| None),
            ready: VecDeque::with_capacity(MAX_THREADS),
            blocked: BTreeSet::new(),
            running: crate::config::MAIN_TID,
            total_quantums: 1,
            graveyard: Vec::with_capacity(MAX_THREADS),
        }
    }

    // -----------------------------------------------------------------------
    // Quantum table
    // -----------------------------------------------------------------------

    /// Number of priority levels.
    pub fn priority_count(&self) -> usize {
        self.quantum_table.len()
    }

    /// Quantum length for a priority index. The index is validated at the
    /// public boundary; an out-of-range index here means the validation was
    /// bypassed and the state is unrecoverable.
    pub fn quantum_for(&self, priority: usize) -> i32 {
        match self.quantum_table.get(priority) {
            Some(&usec) => usec,
            None => error::die("priority index outside the quantum table"),
        }
    }

    // -----------------------------------------------------------------------
    // Thread table
    // -----------------------------------------------------------------------

    pub fn contains(&self, tid: Tid) -> bool {
        tid < MAX_THREADS && self.threads[tid].is_some()
    }

    pub fn thread(&self, tid: Tid) -> Option<&Thread> {
        self.threads.get(tid).and_then(|slot| slot.as_ref())
    }

    pub fn thread_mut(&mut self, tid: Tid) -> Option<&mut Thread> {
        self.threads.get_mut(tid).and_then(|slot| slot.as_mut())
    }

    /// Store a record in the slot named by its own id.
    pub fn insert(&mut self, thread: Thread) {
        let tid = thread.id;
        self.threads[tid] = Some(thread);
    }

    /// Take a record out of the table, transferring ownership (and with it
    /// the stack) to the caller.
    pub fn remove(&mut self, tid: Tid) -> Option<Thread> {
        self.threads.get_mut(tid).and_then(|slot| slot.take())
    }

    /// Lowest free identifier, or `None` when all slots are live.
    pub fn next_free_id(&self) -> Option<Tid> {
        (0..MAX_THREADS).find(|&tid| self.threads[tid].is_none())
    }

    // -----------------------------------------------------------------------
    // Ready queue
    // -----------------------------------------------------------------------

    pub fn ready_is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Append to the tail of the ready queue.
    pub fn push_ready(&mut self, tid: Tid) {
        self.ready.push_back(tid);
    }

    /// Pop the head of the ready queue.
    pub fn pop_ready(&mut self) -> Option<Tid> {
        self.ready.pop_front()
    }

    /// Drop an identifier from wherever it sits in the queue, preserving
    /// the order of the rest.
    pub fn unqueue_ready(&mut self, tid: Tid) {
        self.ready.retain(|&queued| queued != tid);
    }

    // -----------------------------------------------------------------------
    // Blocked set
    // -----------------------------------------------------------------------

    pub fn set_blocked(&mut self, tid: Tid) {
        self.blocked.insert(tid);
    }

    pub fn clear_blocked(&mut self, tid: Tid) {
        self.blocked.remove(&tid);
    }

    pub fn is_blocked(&self, tid: Tid) -> bool {
        self.blocked.contains(&tid)
    }

    // -----------------------------------------------------------------------
    // Running thread & accounting
    // -----------------------------------------------------------------------

    pub fn running(&self) -> Tid {
        self.running
    }

    pub fn set_running(&mut self, tid: Tid) {
        self.running = tid;
    }

    pub fn total_quantums(&self) -> i32 {
        self.total_quantums
    }

    /// One increment per dispatch decision, the no-switch case included.
    pub fn bump_total_quantums(&mut self) {
        self.total_quantums += 1;
    }

    // -----------------------------------------------------------------------
    // Deferred free
    // -----------------------------------------------------------------------

    /// Park a self-terminated record until the next dispatch. The caller is
    /// still executing on the record's stack.
    pub fn defer_free(&mut self, thread: Thread) {
        self.graveyard.push(thread);
    }

    /// Drop every parked record. Runs on the successor's stack, never on a
    /// stack being freed.
    pub fn reap_deferred(&mut self) {
        self.graveyard.clear();
    }

    #[cfg(test)]
    fn deferred_count(&self) -> usize {
        self.graveyard.len()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::ThreadState;

    extern "C" fn nop_entry() {}

    fn scheduler_with_main() -> Scheduler {
        let mut sched = Scheduler::new(vec![100_000, 200_000]);
        sched.insert(Thread::main_thread(sched.quantum_for(0)));
        sched
    }

    fn spawn_into(sched: &mut Scheduler, priority: usize) -> Tid {
        let tid = sched.next_free_id().unwrap();
        let quantum = sched.quantum_for(priority);
        sched.insert(Thread::spawned(tid, priority, quantum, nop_entry));
        sched.push_ready(tid);
        tid
    }

    #[test]
    fn test_fresh_scheduler() {
        let sched = scheduler_with_main();
        assert_eq!(sched.total_quantums(), 1);
        assert_eq!(sched.running(), 0);
        assert!(sched.ready_is_empty());
        assert_eq!(sched.priority_count(), 2);
        assert_eq!(sched.quantum_for(1), 200_000);
    }

    #[test]
    fn test_lowest_free_id_allocation() {
        let mut sched = scheduler_with_main();
        assert_eq!(spawn_into(&mut sched, 0), 1);
        assert_eq!(spawn_into(&mut sched, 0), 2);
        assert_eq!(spawn_into(&mut sched, 1), 3);

        // Freeing a middle slot makes it the next one handed out.
        sched.unqueue_ready(2);
        assert!(sched.remove(2).is_some());
        assert_eq!(sched.next_free_id(), Some(2));
        assert_eq!(spawn_into(&mut sched, 0), 2);
        assert_eq!(sched.next_free_id(), Some(4));
    }

    #[test]
    fn test_ready_queue_is_fifo() {
        let mut sched = scheduler_with_main();
        let a = spawn_into(&mut sched, 0);
        let b = spawn_into(&mut sched, 0);
        let c = spawn_into(&mut sched, 0);

        assert_eq!(sched.pop_ready(), Some(a));
        assert_eq!(sched.pop_ready(), Some(b));
        assert_eq!(sched.pop_ready(), Some(c));
        assert_eq!(sched.pop_ready(), None);
    }

    #[test]
    fn test_unqueue_preserves_order() {
        let mut sched = scheduler_with_main();
        let a = spawn_into(&mut sched, 0);
        let b = spawn_into(&mut sched, 0);
        let c = spawn_into(&mut sched, 0);

        sched.unqueue_ready(b);
        assert_eq!(sched.pop_ready(), Some(a));
        assert_eq!(sched.pop_ready(), Some(c));
        assert_eq!(sched.pop_ready(), None);
    }

    #[test]
    fn test_blocked_set() {
        let mut sched = scheduler_with_main();
        let a = spawn_into(&mut sched, 0);
        sched.unqueue_ready(a);
        sched.set_blocked(a);
        assert!(sched.is_blocked(a));

        sched.clear_blocked(a);
        assert!(!sched.is_blocked(a));
    }

    #[test]
    fn test_deferred_free_drains() {
        let mut sched = scheduler_with_main();
        let a = spawn_into(&mut sched, 0);
        sched.unqueue_ready(a);
        let mut record = sched.remove(a).unwrap();
        record.state = ThreadState::Terminated;
        sched.defer_free(record);
        assert_eq!(sched.deferred_count(), 1);

        sched.reap_deferred();
        assert_eq!(sched.deferred_count(), 0);
        assert!(!sched.contains(a));
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut sched = scheduler_with_main();
        for expected in 1..MAX_THREADS {
            assert_eq!(spawn_into(&mut sched, 0), expected);
        }
        assert_eq!(sched.next_free_id(), None);
    }
}
