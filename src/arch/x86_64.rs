//! # x86-64 Port Layer
//!
//! Register-level context capture and resumption for the System V AMD64
//! ABI. Implements the setjmp-style protocol the scheduler relies on:
//! `save_registers` returns 0 to the call that saved, and the same call
//! site observes a return value of 1 when `load_registers` later jumps
//! back into it.
//!
//! ## Saved register set
//!
//! Only the callee-saved registers plus the stack and instruction pointers
//! need to survive a switch; everything caller-saved is dead across the
//! call boundary by ABI contract.
//!
//! ## Fresh-thread stack layout (top = high address, growing down)
//!
//! ```text
//! [stack top, 16-aligned]
//!   retirement trampoline   <- fake return address: entry() falling off
//!                              the end lands in retire_shim
//!   ...                     <- rsp on first dispatch (8 mod 16, as after
//!                              a call instruction)
//! ```

use std::arch::naked_asm;

// ---------------------------------------------------------------------------
// Register file
// ---------------------------------------------------------------------------

/// Callee-saved register file plus stack and instruction pointers.
///
/// Field order is load-bearing: the offsets in `save_registers` and
/// `load_registers` index straight into this layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Registers {
    /// Stack pointer. 0x00
    pub rsp: u64,
    /// Frame pointer. 0x08
    pub rbp: u64,
    /// Callee-saved general purpose. 0x10..0x38
    pub rbx: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    /// Resume point. 0x38
    pub rip: u64,
}

const _: () = assert!(core::mem::size_of::<Registers>() == 64);

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

/// Capture the current execution point into `regs`.
///
/// Returns 0 on the capturing call. When `load_registers` is later invoked
/// on the same `Registers`, control re-arrives at this call site with a
/// return value of 1.
///
/// # Safety
/// `regs` must be valid for writes. The caller's frame must still exist,
/// unmodified, whenever the snapshot is loaded again.
#[unsafe(naked)]
pub unsafe extern "C" fn save_registers(_regs: *mut Registers) -> u64 {
    naked_asm!(
        // The return address on the stack is the resume point.
        "mov rax, [rsp]",
        "mov [rdi + 0x38], rax",
        // Caller's stack pointer, with the return address popped.
        "lea rax, [rsp + 8]",
        "mov [rdi + 0x00], rax",
        "mov [rdi + 0x08], rbp",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], r12",
        "mov [rdi + 0x20], r13",
        "mov [rdi + 0x28], r14",
        "mov [rdi + 0x30], r15",
        "xor eax, eax",
        "ret",
    )
}

/// Resume execution at the point captured in `regs`. Does not return.
///
/// The call that built `regs` via `save_registers` observes a return value
/// of 1; a fresh snapshot from `initial_registers` begins its entry
/// function instead.
///
/// # Safety
/// `regs` must hold either a `save_registers` snapshot whose stack is still
/// alive, or an `initial_registers` frame over a live stack buffer.
#[unsafe(naked)]
pub unsafe extern "C" fn load_registers(_regs: *const Registers) -> ! {
    naked_asm!(
        "mov rbp, [rdi + 0x08]",
        "mov rbx, [rdi + 0x10]",
        "mov r12, [rdi + 0x18]",
        "mov r13, [rdi + 0x20]",
        "mov r14, [rdi + 0x28]",
        "mov r15, [rdi + 0x30]",
        "mov rsp, [rdi + 0x00]",
        "mov eax, 1",
        "jmp qword ptr [rdi + 0x38]",
    )
}

// ---------------------------------------------------------------------------
// Fresh-thread frame
// ---------------------------------------------------------------------------

/// Build the register file for a thread that has never run.
///
/// The first `load_registers` on the result jumps straight to `entry` with
/// the stack pointer near the top of `stack`, aligned as if `entry` had
/// been reached by a `call`. The slot above holds the retirement
/// trampoline, so an entry function that returns terminates its thread
/// instead of walking off into garbage.
pub fn initial_registers(stack: &mut [u8], entry: extern "C" fn()) -> Registers {
    let base = stack.as_mut_ptr() as u64;
    let top = (base + stack.len() as u64) & !0xf;
    let slot = top - 8;

    let shim: unsafe extern "C" fn() -> ! = retire_shim;
    unsafe {
        (slot as *mut u64).write(shim as usize as u64);
    }

    Registers {
        rsp: slot,
        rip: entry as usize as u64,
        ..Registers::default()
    }
}

/// Landing pad for an entry function that returns.
///
/// Entered by `ret`, so the stack is 16-aligned rather than the 8-mod-16 a
/// normal prologue expects; realign before calling into Rust.
#[unsafe(naked)]
unsafe extern "C" fn retire_shim() -> ! {
    naked_asm!(
        "and rsp, -16",
        "call {retire}",
        "ud2",
        retire = sym crate::kernel::retire_current,
    )
}
