//! # Architecture Port Layer
//!
//! The register half of the context primitive is the only code in the
//! library that knows the CPU. Currently implements the x86-64 port;
//! extensible to other architectures by adding sibling modules.

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "x86_64")]
pub use x86_64::{initial_registers, load_registers, save_registers, Registers};

#[cfg(not(target_arch = "x86_64"))]
compile_error!("uthreads only supports x86_64");
