//! # Configuration
//!
//! Compile-time constants governing the thread library. The quantum table
//! itself is runtime configuration, supplied to `kernel::init`.

/// Maximum number of concurrently live threads, the main thread included.
/// Identifiers are allocated from `[0, MAX_THREADS)`, lowest free first.
pub const MAX_THREADS: usize = 100;

/// Per-thread stack size in bytes. Must leave room for the deepest call
/// chain plus one signal frame, since the preemption handler runs on the
/// interrupted thread's stack.
pub const STACK_SIZE: usize = 16384;

/// Identifier reserved for the main thread. It runs on the process stack
/// and cannot be blocked.
pub const MAIN_TID: usize = 0;
