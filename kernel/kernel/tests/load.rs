//! Exec: replacing a running process's image.

mod common;

use kernel::Pid;
use kernel_addresses::VirtualAddress;
use kernel_hal::CallCode;
use kernel_info::memory::{MEM_INVALID_PAGES, PAGE_SIZE};

fn text_addr() -> VirtualAddress {
    VirtualAddress::new(MEM_INVALID_PAGES as u64 * PAGE_SIZE)
}

fn data_addr() -> VirtualAddress {
    text_addr() + PAGE_SIZE
}

#[test]
fn exec_replaces_the_image() {
    let mut k = common::boot();
    let init = Pid::new(1);
    k.poke_user(init, data_addr(), b"other\0").unwrap();

    assert_eq!(k.kernel_call(CallCode::Exec, [data_addr().as_u64(), 0, 0]), 0);

    let ctx = k.context_of(init).unwrap();
    assert_eq!(ctx.pc, text_addr(), "entry of the new program");
    let mut text = [0u8; 32];
    k.peek_user(init, text_addr(), &mut text).unwrap();
    assert_eq!(text, [0x77; 32]);
    let mut data = [0u8; 5];
    k.peek_user(init, data_addr(), &mut data).unwrap();
    assert_eq!(&data, b"fresh");
}

#[test]
fn exec_passes_arguments_through() {
    let mut k = common::boot();
    let init = Pid::new(1);
    let base = data_addr();
    // Name, one argument string, then the pointer vector.
    k.poke_user(init, base, b"other\0").unwrap();
    k.poke_user(init, base + 8, b"-v\0").unwrap();
    let mut argv = [0u8; 16];
    argv[..8].copy_from_slice(&(base + 8).as_u64().to_le_bytes());
    k.poke_user(init, base + 16, &argv).unwrap();

    assert_eq!(
        k.kernel_call(CallCode::Exec, [base.as_u64(), (base + 16).as_u64(), 0]),
        0
    );

    let sp = k.context_of(init).unwrap().sp;
    let mut word = [0u8; 8];
    k.peek_user(init, sp, &mut word).unwrap();
    assert_eq!(u64::from_le_bytes(word), 1, "argc");
    k.peek_user(init, sp + 8, &mut word).unwrap();
    let argv0 = VirtualAddress::new(u64::from_le_bytes(word));
    let mut s = [0u8; 3];
    k.peek_user(init, argv0, &mut s).unwrap();
    assert_eq!(&s, b"-v\0");
}

#[test]
fn exec_of_a_missing_program_is_survivable() {
    let mut k = common::boot();
    let init = Pid::new(1);
    k.poke_user(init, data_addr(), b"ghost\0").unwrap();

    assert_eq!(k.kernel_call(CallCode::Exec, [data_addr().as_u64(), 0, 0]), -1);
    assert_eq!(k.current(), init, "caller keeps running");

    // The old image is untouched.
    let mut text = [0u8; 4];
    k.peek_user(init, text_addr(), &mut text).unwrap();
    assert_eq!(text, [0x42; 4]);
}

#[test]
fn exec_of_an_oversized_program_is_survivable() {
    let mut k = common::boot();
    let init = Pid::new(1);
    let free = k.free_frames();
    k.poke_user(init, data_addr(), b"huge\0").unwrap();

    assert_eq!(k.kernel_call(CallCode::Exec, [data_addr().as_u64(), 0, 0]), -1);
    assert_eq!(k.current(), init);
    assert_eq!(k.free_frames(), free, "rejected before any teardown");

    let mut text = [0u8; 4];
    k.peek_user(init, text_addr(), &mut text).unwrap();
    assert_eq!(text, [0x42; 4]);
}

#[test]
fn exec_of_a_truncated_program_kills_the_caller() {
    let mut k = common::boot();
    let init = Pid::new(1);
    k.poke_user(init, data_addr(), b"bad\0").unwrap();

    // The old image is gone by the time the read fails; there is
    // nothing to return to.
    k.kernel_call(CallCode::Exec, [data_addr().as_u64(), 0, 0]);
    assert_eq!(k.state_of(init), None, "caller terminated");
    assert!(k.is_halted(), "it was the only real process");
}

#[test]
fn exec_with_oversized_arguments_is_survivable() {
    let mut k = common::boot();
    let init = Pid::new(1);

    // One long NUL-terminated heap string, referenced three times, adds
    // up to more argument data than region 0 can hold at all.
    let heap = data_addr() + PAGE_SIZE;
    assert_eq!(
        k.kernel_call(CallCode::Brk, [(heap + 220 * PAGE_SIZE).as_u64(), 0, 0]),
        0
    );
    let mut big = vec![b'a'; 900_000];
    big.push(0);
    k.poke_user(init, heap, &big).unwrap();

    k.poke_user(init, data_addr(), b"other\0").unwrap();
    let mut argv = [0u8; 32];
    for ptr in argv.chunks_exact_mut(8).take(3) {
        ptr.copy_from_slice(&heap.as_u64().to_le_bytes());
    }
    k.poke_user(init, data_addr() + 8, &argv).unwrap();

    assert_eq!(
        k.kernel_call(CallCode::Exec, [data_addr().as_u64(), (data_addr() + 8).as_u64(), 0]),
        -1
    );
    assert_eq!(k.current(), init, "caller keeps running");
    let mut text = [0u8; 4];
    k.peek_user(init, text_addr(), &mut text).unwrap();
    assert_eq!(text, [0x42; 4]);
}

#[test]
fn exec_with_a_bad_name_pointer_is_an_error() {
    let mut k = common::boot();
    assert_eq!(k.kernel_call(CallCode::Exec, [0x100, 0, 0]), -1);
    assert_eq!(k.current(), Pid::new(1));
}
