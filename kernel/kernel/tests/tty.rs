//! Terminal input and output through the trap interface.

mod common;

use kernel::{BlockReason, Pid, ProcState};
use kernel_addresses::VirtualAddress;
use kernel_hal::{CallCode, TrapEvent};
use kernel_info::memory::{MEM_INVALID_PAGES, PAGE_SIZE};
use kernel_info::tty::TERMINAL_MAX_LINE;

/// Init's data page, used as a user-space scratch buffer.
fn buf_addr() -> VirtualAddress {
    VirtualAddress::new((MEM_INVALID_PAGES as u64 + 1) * PAGE_SIZE)
}

#[test]
fn read_blocks_until_a_line_arrives() {
    let mut k = common::boot();
    let init = Pid::new(1);

    k.kernel_call(CallCode::TtyRead, [0, buf_addr().as_u64(), 16]);
    assert_eq!(k.current(), k.idle_pid());
    assert_eq!(k.state_of(init), Some(ProcState::Blocked(BlockReason::TtyRead)));

    k.machine_mut().type_line(0, b"hi\n");
    k.trap(TrapEvent::TtyReceive { id: 0 });
    assert_eq!(k.state_of(init), Some(ProcState::Ready));
    assert_eq!(k.context_of(init).unwrap().regs[0], 3);

    let mut got = [0u8; 3];
    k.peek_user(init, buf_addr(), &mut got).unwrap();
    assert_eq!(&got, b"hi\n");

    k.trap(TrapEvent::Clock);
    assert_eq!(k.current(), init, "reader resumes off the ready queue");
}

#[test]
fn queued_line_is_returned_without_blocking() {
    let mut k = common::boot();
    k.machine_mut().type_line(0, b"hi\n");
    k.trap(TrapEvent::TtyReceive { id: 0 });

    assert_eq!(k.kernel_call(CallCode::TtyRead, [0, buf_addr().as_u64(), 16]), 3);
    assert_eq!(k.current(), Pid::new(1), "no block, no switch");
}

#[test]
fn one_line_feeds_several_short_reads() {
    let mut k = common::boot();
    k.machine_mut().type_line(0, b"abcdef\n");
    k.trap(TrapEvent::TtyReceive { id: 0 });

    assert_eq!(k.kernel_call(CallCode::TtyRead, [0, buf_addr().as_u64(), 3]), 3);
    let mut got = [0u8; 3];
    k.peek_user(Pid::new(1), buf_addr(), &mut got).unwrap();
    assert_eq!(&got, b"abc");

    assert_eq!(k.kernel_call(CallCode::TtyRead, [0, buf_addr().as_u64(), 3]), 3);
    k.peek_user(Pid::new(1), buf_addr(), &mut got).unwrap();
    assert_eq!(&got, b"def");

    // The newline is all that is left of the line.
    assert_eq!(k.kernel_call(CallCode::TtyRead, [0, buf_addr().as_u64(), 3]), 1);
}

#[test]
fn blocked_readers_share_a_line_in_fifo_order() {
    let mut k = common::boot();
    let init = Pid::new(1);
    let child = Pid::new(k.kernel_call(CallCode::Fork, [0, 0, 0]) as u32);

    // Child blocks first, then init; both on terminal 0.
    k.kernel_call(CallCode::TtyRead, [0, buf_addr().as_u64(), 2]);
    assert_eq!(k.current(), init);
    k.kernel_call(CallCode::TtyRead, [0, buf_addr().as_u64(), 16]);
    assert_eq!(k.current(), k.idle_pid());

    k.machine_mut().type_line(0, b"xyz\n");
    k.trap(TrapEvent::TtyReceive { id: 0 });

    // The child asked for two bytes; init gets the rest of the line.
    assert_eq!(k.context_of(child).unwrap().regs[0], 2);
    let mut two = [0u8; 2];
    k.peek_user(child, buf_addr(), &mut two).unwrap();
    assert_eq!(&two, b"xy");

    assert_eq!(k.context_of(init).unwrap().regs[0], 2);
    k.peek_user(init, buf_addr(), &mut two).unwrap();
    assert_eq!(&two, b"z\n");

    k.trap(TrapEvent::Clock);
    assert_eq!(k.current(), child, "first blocked, first dispatched");
}

#[test]
fn writes_on_one_terminal_are_serialized() {
    let mut k = common::boot();
    let init = Pid::new(1);
    let child = Pid::new(k.kernel_call(CallCode::Fork, [0, 0, 0]) as u32);

    // Child's transmit starts immediately; init queues behind it.
    k.kernel_call(CallCode::TtyWrite, [1, buf_addr().as_u64(), 5]);
    assert_eq!(k.current(), init);
    assert!(k.machine().transmit_busy(1));
    k.kernel_call(CallCode::TtyWrite, [1, buf_addr().as_u64(), 3]);
    assert_eq!(k.current(), k.idle_pid());
    assert_eq!(k.machine().output(1).len(), 1, "one transmit in flight");

    k.machine_mut().complete_transmit(1);
    k.trap(TrapEvent::TtyTransmit { id: 1 });
    assert_eq!(k.state_of(child), Some(ProcState::Ready));
    assert_eq!(k.context_of(child).unwrap().regs[0], 5);
    assert!(k.machine().transmit_busy(1), "init's transmit started");

    k.machine_mut().complete_transmit(1);
    k.trap(TrapEvent::TtyTransmit { id: 1 });
    assert_eq!(k.context_of(init).unwrap().regs[0], 3);

    assert_eq!(k.machine().output(1), [b"hello".to_vec(), b"hel".to_vec()]);
}

#[test]
fn bad_terminal_arguments_are_rejected() {
    let mut k = common::boot();
    let buf = buf_addr().as_u64();
    assert_eq!(k.kernel_call(CallCode::TtyRead, [4, buf, 16]), -1);
    assert_eq!(k.kernel_call(CallCode::TtyWrite, [9, buf, 16]), -1);
    let too_long = TERMINAL_MAX_LINE as u64 + 1;
    assert_eq!(k.kernel_call(CallCode::TtyRead, [0, buf, too_long]), -1);
    assert_eq!(k.kernel_call(CallCode::TtyWrite, [0, buf, too_long]), -1);
    // Guard-page buffer.
    assert_eq!(k.kernel_call(CallCode::TtyWrite, [0, 0x100, 8]), -1);
    assert_eq!(k.current(), Pid::new(1), "all rejected before any block");
}

#[test]
fn zero_length_transfers_complete_at_once() {
    let mut k = common::boot();
    let buf = buf_addr().as_u64();
    assert_eq!(k.kernel_call(CallCode::TtyRead, [0, buf, 0]), 0);
    assert_eq!(k.kernel_call(CallCode::TtyWrite, [0, buf, 0]), 0);
    assert_eq!(k.current(), Pid::new(1));
    assert!(k.machine().output(0).is_empty());
}
