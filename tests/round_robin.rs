//! Two-thread round robin: preemption hands the CPU to the spawned thread,
//! blocking yields it back, resuming re-queues it, self-termination frees
//! the identifier for reuse.

mod common;

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use uthreads::kernel;

static WORKER_TID: AtomicI32 = AtomicI32::new(-1);
static FIRST_VISIT: AtomicBool = AtomicBool::new(false);
static SECOND_VISIT: AtomicBool = AtomicBool::new(false);

extern "C" fn worker() {
    WORKER_TID.store(kernel::get_tid(), Ordering::SeqCst);
    FIRST_VISIT.store(true, Ordering::SeqCst);
    kernel::block(kernel::get_tid());

    // Resumed and rescheduled.
    SECOND_VISIT.store(true, Ordering::SeqCst);
    kernel::terminate(kernel::get_tid());
}

extern "C" fn idle() {
    loop {
        std::hint::spin_loop();
    }
}

#[test]
fn round_robin_block_resume_terminate() {
    common::run_scenario(|| {
        // Main runs on 100ms quanta; the worker's priority maps to a quantum
        // so long it can never be preempted mid-body, which keeps the counts
        // below exact.
        assert_eq!(kernel::init(&[100_000, 1_000_000_000]), 0);
        assert_eq!(kernel::spawn(worker, 1), 1);

        // Main burns its quantum, the worker is dispatched, runs once and
        // blocks itself, which yields straight back to main.
        common::spin_until("worker's first visit", || FIRST_VISIT.load(Ordering::SeqCst));
        assert_eq!(kernel::get_tid(), 0);
        assert_eq!(WORKER_TID.load(Ordering::SeqCst), 1);
        assert_eq!(kernel::get_total_quantums(), 3);
        assert_eq!(kernel::get_quantums(0), 2);
        assert_eq!(kernel::get_quantums(1), 1);

        // Blocking a blocked thread is a no-op; resuming twice likewise.
        assert_eq!(kernel::block(1), 0);
        assert_eq!(kernel::resume(1), 0);
        assert_eq!(kernel::resume(1), 0);

        // Next expiry dispatches the worker again; it terminates itself.
        common::spin_until("worker's second visit", || {
            SECOND_VISIT.load(Ordering::SeqCst)
        });
        assert_eq!(kernel::get_tid(), 0);
        assert_eq!(kernel::get_total_quantums(), 5);
        assert_eq!(kernel::get_quantums(0), 3);

        // The self-terminated identifier is free again, lowest-first.
        assert_eq!(kernel::spawn(idle, 0), 1);
        assert_eq!(kernel::terminate(1), 0);

        kernel::terminate(0);
        unreachable!("terminate(0) returned");
    });
}
