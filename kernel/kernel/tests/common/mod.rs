//! Shared harness: a booted kernel on a simulated machine.
#![allow(dead_code)] // not every suite uses every helper

use kernel::Kernel;
use kernel_sim::{SimImage, SimImages, SimMachine};

pub const FRAMES: usize = 256;

/// The standard program store: an idle loop, an init program with one
/// page of text, a page of data+bss, and a few alternates the exec
/// tests swap in.
pub fn images() -> SimImages {
    SimImages::new()
        .with_image("idle", SimImage::new(&[0x90; 64]))
        .with_image(
            "init",
            SimImage::new(&[0x42; 4096]).with_data(b"hello world").with_bss(64),
        )
        .with_image("other", SimImage::new(&[0x77; 32]).with_data(b"fresh"))
        .with_image("bad", SimImage::new(&[0xAA; 4096]).truncated(100))
        .with_image("huge", SimImage::new(&[0x11; 32]).with_bss(600 * 4096))
}

pub fn boot() -> Kernel<SimMachine, SimImages> {
    boot_with_args(&[])
}

pub fn boot_with_args(args: &[&[u8]]) -> Kernel<SimMachine, SimImages> {
    let _ = env_logger::builder().is_test(true).try_init();
    Kernel::boot(SimMachine::new(FRAMES), images(), "init", args).expect("boot failed")
}
