//! # Timer & Signal Driver
//!
//! Arms the virtual interval timer and gates its signal. Every quantum is a
//! programmed expiry of `ITIMER_VIRTUAL`, delivered as `SIGVTALRM` to the
//! switch entry installed at `init`; every critical section is a span with
//! that one signal blocked at the process level.
//!
//! A failure in any primitive here (install, mask change, timer load) is a
//! system-level catastrophe, not a library error: report and exit.

use std::mem::MaybeUninit;
use std::ptr;

use libc::c_int;

use crate::error;

/// Signal set holding exactly the preemption signal.
fn preempt_sigset() -> libc::sigset_t {
    unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::zeroed();
        if libc::sigemptyset(set.as_mut_ptr()) != 0 {
            error::die("sigemptyset failed");
        }
        if libc::sigaddset(set.as_mut_ptr(), libc::SIGVTALRM) != 0 {
            error::die("sigaddset failed");
        }
        set.assume_init()
    }
}

/// Block the preemption signal at the process level. Entry half of every
/// critical section.
pub fn mask() {
    let set = preempt_sigset();
    if unsafe { libc::sigprocmask(libc::SIG_BLOCK, &set, ptr::null_mut()) } != 0 {
        error::die("failed to block the timer signal");
    }
}

/// Unblock the preemption signal. Exit half of every critical section; any
/// expiry that fired while masked is delivered here.
pub fn unmask() {
    let set = preempt_sigset();
    if unsafe { libc::sigprocmask(libc::SIG_UNBLOCK, &set, ptr::null_mut()) } != 0 {
        error::die("failed to unblock the timer signal");
    }
}

/// Bind `handler` to the preemption signal.
pub fn install(handler: extern "C" fn(c_int)) {
    unsafe {
        let mut action = MaybeUninit::<libc::sigaction>::zeroed().assume_init();
        action.sa_sigaction = handler as usize;
        action.sa_flags = 0;
        if libc::sigemptyset(&mut action.sa_mask) != 0 {
            error::die("sigemptyset failed");
        }
        if libc::sigaction(libc::SIGVTALRM, &action, ptr::null_mut()) != 0 {
            error::die("sigaction failed");
        }
    }
}

/// Load the virtual interval timer with `quantum_usec` microseconds, as
/// both the initial expiry and the reload interval. Called on every
/// schedule-in.
pub fn arm(quantum_usec: i32) {
    let interval = libc::timeval {
        tv_sec: (quantum_usec / 1_000_000) as libc::time_t,
        tv_usec: (quantum_usec % 1_000_000) as libc::suseconds_t,
    };
    let value = libc::itimerval {
        it_interval: interval,
        it_value: interval,
    };
    if unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &value, ptr::null_mut()) } != 0 {
        error::die("setitimer failed");
    }
}

/// Stop the virtual interval timer. Part of main-thread teardown.
pub fn disarm() {
    let zero = libc::timeval {
        tv_sec: 0,
        tv_usec: 0,
    };
    let value = libc::itimerval {
        it_interval: zero,
        it_value: zero,
    };
    if unsafe { libc::setitimer(libc::ITIMER_VIRTUAL, &value, ptr::null_mut()) } != 0 {
        error::die("setitimer failed");
    }
}
