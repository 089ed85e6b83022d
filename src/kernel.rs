//! # Kernel
//!
//! The switch protocol and the public operations. Everything here runs
//! under the critical-section discipline: mask the preemption signal on
//! entry, mutate, unmask on every return path. The switch itself is the
//! only place a thread can suspend — reached asynchronously from the timer
//! signal at end of quantum, or synchronously from a thread blocking or
//! terminating itself.
//!
//! ## Startup sequence
//!
//! ```text
//! main()
//!   ├─► kernel::init(&quantums)   ← install handler, adopt the caller as
//!   │                               thread 0, arm the timer
//!   ├─► kernel::spawn(entry, p)   ← register threads (×N)
//!   └─► ...                       ← preemption now drives the switch;
//!                                   kernel::terminate(0) tears down
//! ```

use std::process;
use std::ptr;

use libc::c_int;
use log::{debug, trace};

use crate::config::MAIN_TID;
use crate::context::SavePoint;
use crate::error::{self, Error};
use crate::scheduler::Scheduler;
use crate::sync;
use crate::thread::{Thread, ThreadState, Tid};
use crate::timer;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Module-scoped scheduler singleton, allocated by `init` and torn down by
/// `terminate(0)`. A raw pointer rather than a reference because the signal
/// path needs to reach it without borrowing through safe statics.
///
/// # Safety
/// Written only inside critical sections; read from the switch entry, where
/// the signal is masked or was delivered masked.
static mut SCHEDULER: *mut Scheduler = ptr::null_mut();

fn scheduler() -> Option<&'static mut Scheduler> {
    unsafe { SCHEDULER.as_mut() }
}

fn initialized() -> bool {
    unsafe { !SCHEDULER.is_null() }
}

/// Resolve a caller-supplied identifier to a live slot index.
fn live_tid(sched: &Scheduler, tid: i32) -> Option<Tid> {
    if tid < 0 {
        return None;
    }
    let tid = tid as Tid;
    sched.contains(tid).then_some(tid)
}

// ---------------------------------------------------------------------------
// Switch protocol
// ---------------------------------------------------------------------------

/// Single entry point for every scheduling decision.
///
/// Invoked three ways: by the timer signal at end of quantum, by `block` on
/// the running thread, and by `terminate` on the running thread. One branch
/// returns normally (the outgoing thread being resumed later, or no switch
/// at all); the other leaves through a context restore.
///
/// No logging in here: this code runs in signal context.
pub(crate) extern "C" fn switch_entry(_signum: c_int) {
    timer::mask();

    let Some(sched) = scheduler() else {
        // Stray expiry with no scheduler to drive.
        timer::unmask();
        return;
    };

    // Records parked by a self-termination are freed here, on the
    // successor's stack.
    sched.reap_deferred();

    let cur = sched.running();

    if sched.ready_is_empty() {
        // The running thread is the only runnable one: charge it another
        // quantum and continue without a switch.
        let quantum = match sched.thread_mut(cur) {
            Some(t) => {
                if t.state == ThreadState::Terminated {
                    error::die("a terminated thread has no successor to run");
                }
                t.quantum_count += 1;
                t.quantum_usec
            }
            None => error::die("thread table lost the running thread"),
        };
        sched.bump_total_quantums();
        timer::arm(quantum);
        timer::unmask();
        return;
    }

    let cur_state = match sched.thread(cur) {
        Some(t) => t.state,
        None => error::die("thread table lost the running thread"),
    };

    if cur_state == ThreadState::Terminated {
        // Self-termination: the record leaves the table now, but the stack
        // under our feet must survive until the successor is running.
        match sched.remove(cur) {
            Some(record) => sched.defer_free(record),
            None => error::die("thread table lost the running thread"),
        }
    } else {
        let arrival = match sched.thread_mut(cur) {
            Some(t) => t.context.save(),
            None => error::die("thread table lost the running thread"),
        };
        if arrival == SavePoint::Resumed {
            // A later switch restored us; service resumes here.
            timer::unmask();
            return;
        }
        if cur_state == ThreadState::Running {
            match sched.thread_mut(cur) {
                Some(t) => t.state = ThreadState::Ready,
                None => error::die("thread table lost the running thread"),
            }
            sched.push_ready(cur);
        }
        // A blocked outgoing thread is already in the blocked set.
    }

    let next = match sched.pop_ready() {
        Some(tid) => tid,
        None => error::die("ready queue drained inside the switch"),
    };

    let priority = match sched.thread(next) {
        Some(t) => t.priority,
        None => error::die("ready queue referenced a dead thread"),
    };
    let quantum = sched.quantum_for(priority);
    match sched.thread_mut(next) {
        Some(t) => {
            t.state = ThreadState::Running;
            t.quantum_usec = quantum;
            t.quantum_count += 1;
        }
        None => error::die("ready queue referenced a dead thread"),
    }
    sched.set_running(next);
    sched.bump_total_quantums();
    timer::arm(quantum);
    timer::unmask();

    match sched.thread(next) {
        Some(t) => unsafe { t.context.restore() },
        None => error::die("ready queue referenced a dead thread"),
    }
}

/// Landing point for an entry function that returned. Reached through the
/// retirement trampoline the port layer plants under every fresh stack.
pub(crate) extern "C" fn retire_current() -> ! {
    let tid = get_tid();
    terminate(tid);
    error::die("terminated thread was rescheduled");
}

// ---------------------------------------------------------------------------
// Public operations
// ---------------------------------------------------------------------------

/// Initialize the library and adopt the calling thread as thread 0.
///
/// `quantum_usecs[p]` is the quantum length in microseconds for priority
/// `p`; every entry must be positive. On success the caller is the running
/// thread, `get_total_quantums()` is 1, and the timer is armed with
/// `quantum_usecs[0]`.
///
/// Returns 0 on success, -1 on a library error.
pub fn init(quantum_usecs: &[i32]) -> i32 {
    sync::critical_section(|| {
        if initialized() {
            return error::fail(Error::AlreadyInitialized);
        }
        if quantum_usecs.is_empty() || quantum_usecs.iter().any(|&usec| usec <= 0) {
            return error::fail(Error::NonPositiveQuantum);
        }

        timer::install(switch_entry);

        let mut sched = Box::new(Scheduler::new(quantum_usecs.to_vec()));
        let main_quantum = sched.quantum_for(0);
        sched.insert(Thread::main_thread(main_quantum));
        unsafe {
            SCHEDULER = Box::into_raw(sched);
        }

        timer::arm(main_quantum);
        debug!("library initialized with {} priorities", quantum_usecs.len());
        0
    })
}

/// Create a thread running `entry` at `priority`.
///
/// The new thread gets the lowest free identifier, starts in the ready
/// state with a quantum count of 0, and joins the tail of the ready queue.
///
/// Returns the new identifier, or -1 on a library error.
pub fn spawn(entry: extern "C" fn(), priority: i32) -> i32 {
    sync::critical_section(|| {
        let Some(sched) = scheduler() else {
            return error::fail(Error::NotInitialized);
        };
        let Some(tid) = sched.next_free_id() else {
            return error::fail(Error::CapacityFull);
        };
        if priority < 0 {
            return error::fail(Error::NegativePriority);
        }
        let priority = priority as usize;
        if priority >= sched.priority_count() {
            return error::fail(Error::PriorityOutOfRange);
        }

        let quantum = sched.quantum_for(priority);
        sched.insert(Thread::spawned(tid, priority, quantum, entry));
        sched.push_ready(tid);
        debug!("spawned thread {tid} at priority {priority}");
        tid as i32
    })
}

/// Terminate the thread with identifier `tid`.
///
/// Terminating the main thread (`tid == 0`) releases every record and exits
/// the process with status 0. A thread terminating itself does not return;
/// its record is freed by the next switch. Any other victim is removed and
/// freed immediately.
///
/// Returns 0 on success, -1 on a library error.
pub fn terminate(tid: i32) -> i32 {
    sync::critical_section(|| {
        let Some(sched) = scheduler() else {
            return error::fail(Error::NotInitialized);
        };
        let Some(victim) = live_tid(sched, tid) else {
            return error::fail(Error::UnknownThread);
        };

        if victim == MAIN_TID {
            debug!("terminating the main thread; process exits");
            teardown();
            timer::unmask();
            process::exit(0);
        }

        let state = match sched.thread(victim) {
            Some(t) => t.state,
            None => error::die("thread table lost a live thread"),
        };
        debug!("terminating thread {victim}");
        match state {
            ThreadState::Running => {
                // Only the running thread itself can observe itself
                // running; mark it and let the switch free the record.
                match sched.thread_mut(victim) {
                    Some(t) => t.state = ThreadState::Terminated,
                    None => error::die("thread table lost a live thread"),
                }
                switch_entry(0);
                error::die("terminated thread was rescheduled");
            }
            ThreadState::Ready => {
                sched.unqueue_ready(victim);
                sched.remove(victim);
            }
            ThreadState::Blocked => {
                sched.clear_blocked(victim);
                sched.remove(victim);
            }
            ThreadState::Terminated => return error::fail(Error::UnknownThread),
        }
        0
    })
}

/// Move the thread with identifier `tid` to the blocked state.
///
/// Blocking the running thread yields: the switch picks a successor and
/// this call returns only when the thread is resumed and scheduled again.
/// Blocking an already blocked thread is a no-op; blocking the main thread
/// is an error.
///
/// Returns 0 on success, -1 on a library error.
pub fn block(tid: i32) -> i32 {
    sync::critical_section(|| {
        let Some(sched) = scheduler() else {
            return error::fail(Error::NotInitialized);
        };
        let Some(target) = live_tid(sched, tid) else {
            return error::fail(Error::UnknownThread);
        };
        if target == MAIN_TID {
            return error::fail(Error::BlockMainThread);
        }

        let state = match sched.thread(target) {
            Some(t) => t.state,
            None => error::die("thread table lost a live thread"),
        };
        match state {
            ThreadState::Blocked => {}
            ThreadState::Running => {
                trace!("thread {target} blocks itself");
                sched.set_blocked(target);
                match sched.thread_mut(target) {
                    Some(t) => t.state = ThreadState::Blocked,
                    None => error::die("thread table lost a live thread"),
                }
                switch_entry(0);
                // Resumed and rescheduled; fall through to return.
            }
            ThreadState::Ready => {
                trace!("thread {target} blocked while ready");
                sched.unqueue_ready(target);
                sched.set_blocked(target);
                match sched.thread_mut(target) {
                    Some(t) => t.state = ThreadState::Blocked,
                    None => error::die("thread table lost a live thread"),
                }
            }
            ThreadState::Terminated => return error::fail(Error::UnknownThread),
        }
        0
    })
}

/// Move a blocked thread back to the tail of the ready queue.
///
/// Resuming a running or ready thread is a no-op, not an error.
///
/// Returns 0 on success, -1 on a library error.
pub fn resume(tid: i32) -> i32 {
    sync::critical_section(|| {
        let Some(sched) = scheduler() else {
            return error::fail(Error::NotInitialized);
        };
        let Some(target) = live_tid(sched, tid) else {
            return error::fail(Error::UnknownThread);
        };

        let state = match sched.thread(target) {
            Some(t) => t.state,
            None => error::die("thread table lost a live thread"),
        };
        if state == ThreadState::Blocked {
            trace!("thread {target} resumed");
            sched.clear_blocked(target);
            match sched.thread_mut(target) {
                Some(t) => t.state = ThreadState::Ready,
                None => error::die("thread table lost a live thread"),
            }
            sched.push_ready(target);
        }
        0
    })
}

/// Change the priority of the thread with identifier `tid`.
///
/// Takes effect the next time the thread is scheduled in; the quantum
/// currently in flight is never shortened or stretched.
///
/// Returns 0 on success, -1 on a library error.
pub fn change_priority(tid: i32, priority: i32) -> i32 {
    sync::critical_section(|| {
        let Some(sched) = scheduler() else {
            return error::fail(Error::NotInitialized);
        };
        let Some(target) = live_tid(sched, tid) else {
            return error::fail(Error::UnknownThread);
        };
        if priority < 0 {
            return error::fail(Error::NegativePriority);
        }
        let priority = priority as usize;
        if priority >= sched.priority_count() {
            return error::fail(Error::PriorityOutOfRange);
        }

        match sched.thread_mut(target) {
            Some(t) => t.priority = priority,
            None => error::die("thread table lost a live thread"),
        }
        0
    })
}

/// Identifier of the calling thread.
pub fn get_tid() -> i32 {
    sync::critical_section(|| match scheduler() {
        Some(sched) => sched.running() as i32,
        None => error::fail(Error::NotInitialized),
    })
}

/// Total number of quanta since `init`, the current one included.
pub fn get_total_quantums() -> i32 {
    sync::critical_section(|| match scheduler() {
        Some(sched) => sched.total_quantums(),
        None => error::fail(Error::NotInitialized),
    })
}

/// Number of quanta the thread with identifier `tid` has been scheduled
/// in, the current one included if it is running.
///
/// Returns the count, or -1 on a library error.
pub fn get_quantums(tid: i32) -> i32 {
    sync::critical_section(|| {
        let Some(sched) = scheduler() else {
            return error::fail(Error::NotInitialized);
        };
        let Some(target) = live_tid(sched, tid) else {
            return error::fail(Error::UnknownThread);
        };
        match sched.thread(target) {
            Some(t) => t.quantum_count,
            None => error::die("thread table lost a live thread"),
        }
    })
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

/// Release the scheduler and every thread record it owns, and stop the
/// timer. Only main-thread termination reaches this.
fn teardown() {
    unsafe {
        let sched = SCHEDULER;
        SCHEDULER = ptr::null_mut();
        if !sched.is_null() {
            drop(Box::from_raw(sched));
        }
    }
    timer::disarm();
}
