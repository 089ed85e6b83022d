//! # Thread Records
//!
//! One record per live identifier. A record owns its stack and saved
//! context; queues and sets elsewhere in the scheduler store bare
//! identifiers, so the record in the thread table is the single owner of
//! every per-thread resource.

use crate::context::{Context, Stack};

/// Thread identifier: a slot index in `[0, MAX_THREADS)`.
pub type Tid = usize;

// ---------------------------------------------------------------------------
// Thread state machine
// ---------------------------------------------------------------------------

/// Execution state of a thread.
///
/// ```text
///   ┌─────────┐     dispatch        ┌─────────┐
///   │  Ready  │ ──────────────────► │ Running │
///   └─────────┘                     └─────────┘
///        ▲         preempt               │
///        └───────────────────────────────┤
///        ▲                               │ block(self)
///        │          resume()             ▼
///        │                          ┌─────────┐
///        └───────────────────────── │ Blocked │
///                                   └─────────┘
/// ```
///
/// `Terminated` never appears in any queue: it marks a running thread that
/// asked to die and exists only between `terminate(self)` and the switch
/// that dispatches its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Eligible to run, waiting in the ready queue.
    Ready,
    /// Currently executing. Exactly one thread at any instant.
    Running,
    /// Out of the ready queue until resumed.
    Blocked,
    /// Self-termination marker consumed by the next switch.
    Terminated,
}

// ---------------------------------------------------------------------------
// Thread record
// ---------------------------------------------------------------------------

/// The per-thread record: identity, scheduling parameters, accounting, and
/// the owned execution resources.
pub struct Thread {
    /// Identifier, equal to this record's slot in the thread table.
    pub id: Tid,

    /// Current priority index into the quantum table. A change takes
    /// effect the next time the thread is scheduled in.
    pub priority: usize,

    /// Quantum length for the current scheduling cycle, in microseconds.
    /// Refreshed from the quantum table on every schedule-in.
    pub quantum_usec: i32,

    /// Number of quanta this thread has been scheduled in. 1 immediately
    /// after the first schedule-in.
    pub quantum_count: i32,

    /// Entry function. The main thread has none.
    pub entry: Option<extern "C" fn()>,

    /// Saved execution point. Filled by `Context::prepare` for a spawned
    /// thread, by the switch's save for anything that has run.
    pub context: Context,

    /// Current state.
    pub state: ThreadState,

    /// Owned stack. The main thread runs on the process stack.
    stack: Option<Stack>,
}

impl Thread {
    /// Record for the main thread: already running when the library comes
    /// up, so it starts with one quantum on the books and no stack of its
    /// own. Its context is first filled when it is preempted.
    pub fn main_thread(quantum_usec: i32) -> Self {
        Thread {
            id: crate::config::MAIN_TID,
            priority: 0,
            quantum_usec,
            quantum_count: 1,
            entry: None,
            context: Context::new(),
            state: ThreadState::Running,
            stack: None,
        }
    }

    /// Record for a spawned thread: allocates the stack and prepares the
    /// context so the first dispatch enters `entry`. Ready, never run.
    pub fn spawned(id: Tid, priority: usize, quantum_usec: i32, entry: extern "C" fn()) -> Self {
        let mut stack = Stack::alloc();
        let mut context = Context::new();
        context.prepare(&mut stack, entry);
        Thread {
            id,
            priority,
            quantum_usec,
            quantum_count: 0,
            entry: Some(entry),
            context,
            state: ThreadState::Ready,
            stack: Some(stack),
        }
    }

    #[inline]
    pub fn has_stack(&self) -> bool {
        self.stack.is_some()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn nop_entry() {}

    #[test]
    fn test_main_thread_record() {
        let main = Thread::main_thread(250_000);
        assert_eq!(main.id, crate::config::MAIN_TID);
        assert_eq!(main.state, ThreadState::Running);
        assert_eq!(main.quantum_count, 1);
        assert_eq!(main.quantum_usec, 250_000);
        assert!(main.entry.is_none());
        assert!(!main.has_stack());
    }

    #[test]
    fn test_spawned_thread_record() {
        let t = Thread::spawned(3, 1, 100_000, nop_entry);
        assert_eq!(t.id, 3);
        assert_eq!(t.priority, 1);
        assert_eq!(t.state, ThreadState::Ready);
        assert_eq!(t.quantum_count, 0);
        assert!(t.entry.is_some());
        assert!(t.has_stack());
    }
}
