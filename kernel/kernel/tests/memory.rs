//! Heap, stack growth, and kernel-heap behavior.

mod common;

use kernel_addresses::VirtualAddress;
use kernel_hal::{CallCode, MemoryFaultCode, TrapEvent};
use kernel_info::memory::{PAGE_SIZE, USER_STACK_LIMIT, VMEM_1_BASE};
use kernel::{Pid, ProcState};

fn brk_addr(pages_past_data: u64) -> u64 {
    // Init's break sits right after one text and one data page.
    (4 + 2 + pages_past_data) * PAGE_SIZE
}

#[test]
fn brk_grows_and_shrinks_the_heap() {
    let mut k = common::boot();
    let free = k.free_frames();

    assert_eq!(k.kernel_call(CallCode::Brk, [brk_addr(3), 0, 0]), 0);
    assert_eq!(k.free_frames(), free - 3);

    // The new pages are usable.
    k.poke_user(Pid::new(1), VirtualAddress::new(brk_addr(0)), b"heap").unwrap();
    let mut buf = [0u8; 4];
    k.peek_user(Pid::new(1), VirtualAddress::new(brk_addr(0)), &mut buf).unwrap();
    assert_eq!(&buf, b"heap");

    assert_eq!(k.kernel_call(CallCode::Brk, [brk_addr(0), 0, 0]), 0);
    assert_eq!(k.free_frames(), free);
}

#[test]
fn brk_may_not_run_into_the_stack() {
    let mut k = common::boot();
    let free = k.free_frames();
    assert_eq!(k.kernel_call(CallCode::Brk, [USER_STACK_LIMIT - 1, 0, 0]), -1);
    assert_eq!(k.free_frames(), free, "failed call must not leak frames");
}

#[test]
fn brk_below_the_guard_pages_is_refused() {
    let mut k = common::boot();
    assert_eq!(k.kernel_call(CallCode::Brk, [0, 0, 0]), -1);
    assert_eq!(k.kernel_call(CallCode::Brk, [VMEM_1_BASE, 0, 0]), -1);
}

#[test]
fn stack_grows_on_a_fault_just_below_it() {
    let mut k = common::boot();
    let init = Pid::new(1);
    let free = k.free_frames();
    let below = k.context_of(init).unwrap().sp - PAGE_SIZE;

    k.trap(TrapEvent::Memory {
        addr: below,
        code: MemoryFaultCode::Unmapped,
    });

    assert_eq!(k.state_of(init), Some(ProcState::Running), "growth is transparent");
    assert_eq!(k.free_frames(), free - 1);
    k.poke_user(init, below, b"!").unwrap();
}

#[test]
fn fault_in_the_red_zone_is_fatal() {
    let mut k = common::boot();
    let init = Pid::new(1);
    // The page adjacent to the heap may never become stack.
    k.trap(TrapEvent::Memory {
        addr: VirtualAddress::new(brk_addr(0)),
        code: MemoryFaultCode::Unmapped,
    });
    assert_eq!(k.state_of(init), None, "killed and reclaimed");
    assert!(k.is_halted(), "nothing left to run");
}

#[test]
fn protection_fault_is_fatal() {
    let mut k = common::boot();
    k.trap(TrapEvent::Memory {
        addr: k.context_of(Pid::new(1)).unwrap().pc,
        code: MemoryFaultCode::Protection,
    });
    assert_eq!(k.state_of(Pid::new(1)), None);
}

#[test]
fn kernel_reference_is_fatal() {
    let mut k = common::boot();
    k.trap(TrapEvent::Memory {
        addr: VirtualAddress::new(VMEM_1_BASE + 0x100),
        code: MemoryFaultCode::Unmapped,
    });
    assert_eq!(k.state_of(Pid::new(1)), None);
}

#[test]
fn kernel_break_moves_both_ways() {
    let mut k = common::boot();
    let free = k.free_frames();
    let brk = VirtualAddress::new(VMEM_1_BASE + 8 * PAGE_SIZE);
    k.set_kernel_break(brk + 2 * PAGE_SIZE).unwrap();
    assert_eq!(k.free_frames(), free - 2);
    k.set_kernel_break(brk).unwrap();
    assert_eq!(k.free_frames(), free);
}

#[test]
fn terminated_process_memory_returns_to_the_free_list() {
    let mut k = common::boot();
    let free = k.free_frames();
    assert!(k.kernel_call(CallCode::Fork, [0, 0, 0]) > 0);
    // The child (now running) exits; its stack, heap, kernel stack, and
    // page table all come back.
    k.kernel_call(CallCode::Exit, [0, 0, 0]);
    assert_eq!(k.free_frames(), free);
}
