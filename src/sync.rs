//! # Critical Sections
//!
//! Signal-level mutual exclusion for the scheduler state. There is no
//! kernel-level parallelism anywhere in this library, so blocking the one
//! preemption signal for the duration of a mutation is a complete locking
//! story.

use crate::timer;

/// Execute a closure with the preemption signal masked.
///
/// This is the entry discipline of every public operation: mask, mutate,
/// unmask on the way out. A closure that switches away (`block` on the
/// running thread, `terminate` of the running thread) resumes inside the
/// closure later, with the switch protocol having kept the mask consistent
/// in between; the trailing unmask here is then a no-op.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    timer::mask();
    let result = f();
    timer::unmask();
    result
}
