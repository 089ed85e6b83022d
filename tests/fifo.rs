//! Dispatch order: the ready queue is strict FIFO, and `resume` appends to
//! the tail behind threads that became ready earlier.

mod common;

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use uthreads::kernel;

static ORDER: [AtomicI32; 8] = [const { AtomicI32::new(-1) }; 8];
static VISITS: AtomicUsize = AtomicUsize::new(0);

fn record_visit() {
    let slot = VISITS.fetch_add(1, Ordering::SeqCst);
    ORDER[slot].store(kernel::get_tid(), Ordering::SeqCst);
}

/// Records one visit and dies.
extern "C" fn recorder() {
    record_visit();
    kernel::terminate(kernel::get_tid());
}

/// Parks first; records a visit once resumed, then dies.
extern "C" fn parker() {
    kernel::block(kernel::get_tid());
    record_visit();
    kernel::terminate(kernel::get_tid());
}

fn order_prefix(len: usize) -> Vec<i32> {
    ORDER[..len]
        .iter()
        .map(|slot| slot.load(Ordering::SeqCst))
        .collect()
}

#[test]
fn fifo_dispatch_and_resume_order() {
    common::run_scenario(|| {
        // Main runs on 100ms quanta; workers get a quantum so long they are
        // never preempted mid-body, keeping the dispatch order exact.
        assert_eq!(kernel::init(&[100_000, 1_000_000_000]), 0);

        // Three threads enter the ready queue in spawn order and must be
        // dispatched in that order.
        assert_eq!(kernel::spawn(recorder, 1), 1);
        assert_eq!(kernel::spawn(recorder, 1), 2);
        assert_eq!(kernel::spawn(recorder, 1), 3);

        common::spin_until("all recorders ran", || VISITS.load(Ordering::SeqCst) >= 3);
        assert_eq!(kernel::get_tid(), 0);
        assert_eq!(order_prefix(3), vec![1, 2, 3]);
        assert_eq!(kernel::get_total_quantums(), 5);
        assert_eq!(kernel::get_quantums(0), 2);

        // A resumed thread goes to the tail: the recorder spawned after it
        // was already ready, so it runs first.
        assert_eq!(kernel::spawn(parker, 1), 1);
        common::spin_until("parker parked", || kernel::get_quantums(1) >= 1);
        assert_eq!(kernel::spawn(recorder, 1), 2);
        assert_eq!(kernel::resume(1), 0);

        common::spin_until("tail pair ran", || VISITS.load(Ordering::SeqCst) >= 5);
        assert_eq!(order_prefix(5), vec![1, 2, 3, 2, 1]);

        kernel::terminate(0);
        unreachable!("terminate(0) returned");
    });
}
