//! # uthreads demo
//!
//! Three threads sharing one kernel thread under 50ms quanta:
//!
//! | Thread | Behavior |
//! |--------|----------|
//! | `spinner` | Burns CPU and counts its own quanta — only ever preempted |
//! | `batcher` | Does a chunk of work, then blocks itself until resumed |
//! | main     | Resumes `batcher` each round, prints accounting, tears down |
//!
//! Expected dynamics: the spinner and the batcher alternate with main in
//! round-robin order; the batcher makes progress only when main resumes it;
//! per-thread quantum counts sum (minus overlaps) to the total.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use uthreads::kernel;

static SPINS: AtomicU64 = AtomicU64::new(0);
static BATCHES: AtomicU64 = AtomicU64::new(0);
static BATCHER_PARKED: AtomicBool = AtomicBool::new(false);

/// CPU-bound thread: never yields, only the timer takes the CPU back.
extern "C" fn spinner() {
    loop {
        SPINS.fetch_add(1, Ordering::Relaxed);
    }
}

/// Batch worker: one unit of work per wakeup, then parks itself.
extern "C" fn batcher() {
    loop {
        BATCHES.fetch_add(1, Ordering::Relaxed);
        BATCHER_PARKED.store(true, Ordering::Release);
        kernel::block(kernel::get_tid());
    }
}

fn main() {
    if kernel::init(&[50_000]) != 0 {
        return;
    }

    let spinner_tid = kernel::spawn(spinner, 0);
    let batcher_tid = kernel::spawn(batcher, 0);
    println!("spawned spinner as {spinner_tid}, batcher as {batcher_tid}");

    // Let the clock run for a dozen dispatches, resuming the batcher
    // whenever it has parked itself.
    while kernel::get_total_quantums() < 12 {
        if BATCHER_PARKED.swap(false, Ordering::Acquire) {
            kernel::resume(batcher_tid);
        }
        std::hint::spin_loop();
    }

    println!(
        "total quantums {:>3}  main {:>2}  spinner {:>2}  batcher {:>2}",
        kernel::get_total_quantums(),
        kernel::get_quantums(0),
        kernel::get_quantums(spinner_tid),
        kernel::get_quantums(batcher_tid),
    );
    println!(
        "spinner iterations {}  batches completed {}",
        SPINS.load(Ordering::Relaxed),
        BATCHES.load(Ordering::Relaxed),
    );

    kernel::terminate(0);
}
