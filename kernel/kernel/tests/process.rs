//! Fork, exec, exit, wait, and the family tree.

mod common;

use kernel::{BlockReason, Kernel, Pid, ProcState};
use kernel_addresses::VirtualAddress;
use kernel_hal::{CallCode, TrapEvent};
use kernel_info::memory::{MEM_INVALID_PAGES, PAGE_SIZE};
use kernel_sim::SimMachine;

fn data_addr() -> VirtualAddress {
    VirtualAddress::new((MEM_INVALID_PAGES as u64 + 1) * PAGE_SIZE)
}

#[test]
fn getpid_reports_the_caller() {
    let mut k = common::boot();
    assert_eq!(k.kernel_call(CallCode::GetPid, [0, 0, 0]), 1);
    k.kernel_call(CallCode::Fork, [0, 0, 0]);
    assert_eq!(k.kernel_call(CallCode::GetPid, [0, 0, 0]), 2);
}

#[test]
fn fork_gives_the_child_a_private_copy() {
    let mut k = common::boot();
    let parent = Pid::new(1);
    let child = Pid::new(k.kernel_call(CallCode::Fork, [0, 0, 0]) as u32);
    assert_eq!(child, Pid::new(2));
    assert_eq!(k.context_of(child).unwrap().regs[0], 0, "child sees zero");
    assert_eq!(k.context_of(parent).unwrap().regs[0], child.as_u64());

    // Same bytes at the same addresses...
    let mut c = [0u8; 11];
    let mut p = [0u8; 11];
    k.peek_user(child, data_addr(), &mut c).unwrap();
    k.peek_user(parent, data_addr(), &mut p).unwrap();
    assert_eq!(c, p);

    // ...but different frames: writing one side leaves the other alone.
    k.poke_user(child, data_addr(), b"CHILD").unwrap();
    k.peek_user(parent, data_addr(), &mut p).unwrap();
    assert_eq!(&p, b"hello world");
}

#[test]
fn fork_costs_exactly_the_copied_pages() {
    let mut k = common::boot();
    let free = k.free_frames();
    k.kernel_call(CallCode::Fork, [0, 0, 0]);
    // Kernel stack (4) + text + data + user stack; the page table comes
    // from a banked half slot.
    assert_eq!(k.free_frames(), free - 7);
}

#[test]
fn exit_then_wait_delivers_pid_and_status() {
    let mut k = common::boot();
    let child = Pid::new(k.kernel_call(CallCode::Fork, [0, 0, 0]) as u32);
    // The child runs first and exits.
    k.kernel_call(CallCode::Exit, [42, 0, 0]);
    assert_eq!(k.current(), Pid::new(1));
    assert_eq!(k.state_of(child), None, "child fully reclaimed");

    let status_addr = k.context_of(Pid::new(1)).unwrap().sp - 64;
    assert_eq!(
        k.kernel_call(CallCode::Wait, [status_addr.as_u64(), 0, 0]),
        child.as_u64() as i64
    );
    let mut status = [0u8; 8];
    k.peek_user(Pid::new(1), status_addr, &mut status).unwrap();
    assert_eq!(i64::from_le_bytes(status), 42);
}

#[test]
fn wait_blocks_until_a_child_exits() {
    let mut k = common::boot();
    let init = Pid::new(1);
    let child = Pid::new(k.kernel_call(CallCode::Fork, [0, 0, 0]) as u32);
    // Child sleeps; init waits; idle spins.
    k.kernel_call(CallCode::Delay, [3, 0, 0]);
    assert_eq!(k.current(), init);
    let status_addr = k.context_of(init).unwrap().sp - 64;
    k.kernel_call(CallCode::Wait, [status_addr.as_u64(), 0, 0]);
    assert_eq!(k.current(), k.idle_pid());
    assert_eq!(k.state_of(init), Some(ProcState::Blocked(BlockReason::Child)));

    for _ in 0..3 {
        k.trap(TrapEvent::Clock);
    }
    assert_eq!(k.current(), child, "woken child preempts idle");
    k.kernel_call(CallCode::Exit, [7, 0, 0]);

    assert_eq!(k.current(), init);
    assert_eq!(k.context_of(init).unwrap().regs[0], child.as_u64());
    let mut status = [0u8; 8];
    k.peek_user(init, status_addr, &mut status).unwrap();
    assert_eq!(i64::from_le_bytes(status), 7);
}

#[test]
fn wait_with_no_children_errors_immediately() {
    let mut k = common::boot();
    let status_addr = k.context_of(Pid::new(1)).unwrap().sp - 64;
    assert_eq!(k.kernel_call(CallCode::Wait, [status_addr.as_u64(), 0, 0]), -1);
    assert_eq!(k.current(), Pid::new(1), "no block, no switch");
}

#[test]
fn wait_with_a_bad_pointer_errors() {
    let mut k = common::boot();
    k.kernel_call(CallCode::Fork, [0, 0, 0]);
    k.trap(TrapEvent::Clock);
    k.trap(TrapEvent::Clock);
    assert_eq!(k.current(), Pid::new(1));
    assert_eq!(k.kernel_call(CallCode::Wait, [0x100, 0, 0]), -1, "guard page");
}

#[test]
fn orphaned_child_exits_without_a_parent() {
    let mut k = common::boot();
    let child = Pid::new(k.kernel_call(CallCode::Fork, [0, 0, 0]) as u32);
    // Bring init back and let it die first.
    k.trap(TrapEvent::Clock);
    k.trap(TrapEvent::Clock);
    assert_eq!(k.current(), Pid::new(1));
    k.kernel_call(CallCode::Exit, [0, 0, 0]);

    assert_eq!(k.current(), child);
    k.kernel_call(CallCode::Exit, [5, 0, 0]);
    assert!(k.is_halted(), "everyone is gone");
}

#[test]
fn failed_fork_unwinds_completely() {
    let _ = env_logger::builder().is_test(true).try_init();
    // A machine small enough that the copies cannot all be made.
    let mut k = Kernel::boot(SimMachine::new(64), common::images(), "init", &[]).unwrap();
    let free = k.free_frames();
    // Eat all but two frames with heap.
    let brk = (4 + 2 + (free as u64 - 2)) * PAGE_SIZE;
    assert_eq!(k.kernel_call(CallCode::Brk, [brk, 0, 0]), 0);
    assert_eq!(k.free_frames(), 2);

    assert_eq!(k.kernel_call(CallCode::Fork, [0, 0, 0]), -1);
    assert_eq!(k.free_frames(), 2, "partial copies returned");
    assert_eq!(k.state_of(Pid::new(2)), None, "no half-built process");
    assert_eq!(k.current(), Pid::new(1));
}
