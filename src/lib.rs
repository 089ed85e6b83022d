//! # uthreads — Preemptive User-Level Threading
//!
//! A user-level threading library that multiplexes many logical threads
//! onto a single kernel thread. Threads run entry functions of signature
//! "no arguments, no result"; the library provides creation, termination,
//! blocking and resuming, priority change, and quantum accounting.
//!
//! ## Overview
//!
//! Scheduling is driven by a virtual-time interrupt: each dispatch arms the
//! process's virtual interval timer with the incoming thread's quantum, and
//! the expiry signal returns control to the switch, which picks the next
//! ready thread and resumes it on its own stack. Between expiries the model
//! is cooperative — a thread can yield early only by blocking or
//! terminating itself.
//!
//! Every public operation is a critical section with respect to the timer
//! signal: mask on entry, mutate, unmask on every return path. Because the
//! whole library lives on one kernel thread, that masking is a complete
//! mutual-exclusion story.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  Application Threads                   │
//! ├────────────────────────────────────────────────────────┤
//! │                Kernel API (kernel.rs)                  │
//! │   init · spawn · terminate · block · resume            │
//! │   change_priority · get_tid · get_*_quantums           │
//! ├──────────────┬──────────────────┬──────────────────────┤
//! │  Scheduler   │  Switch protocol │  Critical sections   │
//! │ scheduler.rs │  kernel.rs       │  sync.rs             │
//! │ ─ table      │  ─ save outgoing │  ─ mask / unmask     │
//! │ ─ FIFO queue │  ─ pop ready     │                      │
//! │ ─ graveyard  │  ─ restore next  │                      │
//! ├──────────────┴──────────────────┴──────────────────────┤
//! │     Thread Records (thread.rs) · Contexts (context.rs) │
//! ├────────────────────────────────────────────────────────┤
//! │     Timer & Signal Driver (timer.rs)                   │
//! │     SIGVTALRM · ITIMER_VIRTUAL · sigprocmask           │
//! ├────────────────────────────────────────────────────────┤
//! │     Port Layer (arch/x86_64.rs)                        │
//! │     register save/load · fresh stack frames            │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory model
//!
//! - One owned 16 KiB stack per spawned thread; the main thread uses the
//!   process stack.
//! - Queues and sets store identifiers, never owning references: the
//!   thread table is the single owner of every record.
//! - A thread that terminates itself cannot free the stack it stands on;
//!   its record is parked in a graveyard drained by the next dispatch, on
//!   the successor's stack.
//! - The collections the signal handler touches are capacity-reserved at
//!   `init`, so the handler never allocates.
//!
//! ## Quick start
//!
//! ```ignore
//! use uthreads::kernel;
//!
//! extern "C" fn worker() {
//!     // ... do work, possibly kernel::block(kernel::get_tid()) ...
//!     // falling off the end terminates the thread
//! }
//!
//! fn main() {
//!     // One priority level: 100ms quanta.
//!     kernel::init(&[100_000]);
//!     kernel::spawn(worker, 0);
//!     // ... main keeps running until preempted ...
//!     kernel::terminate(0); // frees everything, exits the process
//! }
//! ```

pub mod arch;
pub mod config;
pub mod context;
pub mod error;
pub mod kernel;
pub mod scheduler;
pub mod sync;
pub mod thread;
pub mod timer;
