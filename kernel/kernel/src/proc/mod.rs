//! Processes: control blocks, the family tree, scheduling queues, and
//! the context-switch protocol.

mod pcb;
mod queues;
mod switch;
mod table;

pub use pcb::{BlockReason, ChildExit, Pid, ProcState};
pub(crate) use pcb::{Pcb, PendingCall};
pub(crate) use switch::Switch;
