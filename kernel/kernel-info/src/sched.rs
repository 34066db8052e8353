//! # Scheduling Parameters

/// Round-robin time slice. A process switched in runs for this many clock
/// ticks before the clock trap preempts it (if anything else is ready).
pub const QUANTUM_TICKS: u64 = 2;

const _: () = assert!(QUANTUM_TICKS > 0);
