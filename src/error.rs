//! # Diagnostics
//!
//! Two failure classes, two fates. A *library error* is caller-visible and
//! recoverable: one line on stderr, `-1` back to the caller, scheduler state
//! untouched. A *system error* means a host primitive failed underneath us
//! (signal install, mask change, timer arm, stack allocation); nothing can
//! be salvaged, so one line on stderr and the process exits with status 1.

use std::fmt;
use std::process;

/// Prefix for every recoverable, caller-visible failure.
pub const LIB_ERROR_PREFIX: &str = "thread library error: ";

/// Prefix for every fatal host-primitive failure.
pub const SYS_ERROR_PREFIX: &str = "system error: ";

/// Recoverable library errors surfaced to callers as `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// `init` called while the library is already running.
    AlreadyInitialized,
    /// Any other operation called before `init`.
    NotInitialized,
    /// `init` given an empty quantum table or a non-positive entry.
    NonPositiveQuantum,
    /// `spawn` with all identifier slots in use.
    CapacityFull,
    /// Operation on an identifier with no live thread.
    UnknownThread,
    /// `block` aimed at the main thread.
    BlockMainThread,
    /// Negative priority index.
    NegativePriority,
    /// Priority index past the end of the quantum table.
    PriorityOutOfRange,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::AlreadyInitialized => "library is already initialized",
            Error::NotInitialized => "library is not initialized",
            Error::NonPositiveQuantum => "size or quantum value is non-positive",
            Error::CapacityFull => "thread capacity is full",
            Error::UnknownThread => "no thread with the given id exists",
            Error::BlockMainThread => "can not block the main thread",
            Error::NegativePriority => "new priority is negative",
            Error::PriorityOutOfRange => "priority has no quantum table entry",
        };
        f.write_str(msg)
    }
}

/// Report a library error and produce the caller-visible failure value.
pub fn fail(err: Error) -> i32 {
    eprintln!("{LIB_ERROR_PREFIX}{err}");
    -1
}

/// Report a system error and abort the process. Does not return; no attempt
/// is made to salvage scheduler state.
pub fn die(msg: &str) -> ! {
    eprintln!("{SYS_ERROR_PREFIX}{msg}");
    process::exit(1);
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_stable() {
        assert_eq!(
            Error::NonPositiveQuantum.to_string(),
            "size or quantum value is non-positive"
        );
        assert_eq!(Error::CapacityFull.to_string(), "thread capacity is full");
        assert_eq!(
            Error::UnknownThread.to_string(),
            "no thread with the given id exists"
        );
        assert_eq!(
            Error::BlockMainThread.to_string(),
            "can not block the main thread"
        );
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(LIB_ERROR_PREFIX, "thread library error: ");
        assert_eq!(SYS_ERROR_PREFIX, "system error: ");
    }
}
