//! Shared harness for end-to-end scenarios.
//!
//! The library owns process-wide state: the SIGVTALRM disposition, the
//! virtual interval timer, and a singleton scheduler. The test harness runs
//! tests on its own threads, which would make signal delivery
//! nondeterministic and turn `terminate(0)`'s process exit into a harness
//! kill. Each scenario therefore runs in a forked child — single-threaded,
//! so every expiry lands on the thread driving the scheduler — and the
//! parent asserts the child's exit status. A scenario that ends in
//! `terminate(0)` exits 0; a failed assertion exits 101.

#![allow(dead_code)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

pub fn run_scenario(scenario: impl FnOnce()) {
    unsafe {
        match libc::fork() {
            -1 => panic!("fork failed"),
            0 => {
                let outcome = catch_unwind(AssertUnwindSafe(scenario));
                libc::_exit(if outcome.is_ok() { 0 } else { 101 });
            }
            child => {
                let mut status = 0;
                if libc::waitpid(child, &mut status, 0) != child {
                    panic!("waitpid failed");
                }
                assert!(
                    libc::WIFEXITED(status),
                    "scenario child was killed by a signal"
                );
                assert_eq!(
                    libc::WEXITSTATUS(status),
                    0,
                    "scenario child reported failure"
                );
            }
        }
    }
}

/// Busy-wait until `cond` holds. Burning CPU is the point: the virtual
/// timer only advances while the process is running.
pub fn spin_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while !cond() {
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        std::hint::spin_loop();
    }
}
