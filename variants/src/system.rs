//! The uniform surface the console drives regardless of which variant is
//! selected, so `jvmcore-console` doesn't need to know whether it's talking
//! to one core or a cluster (mirrors how the model repo's `Machine` trait
//! let the frontend stay board-agnostic).

use jvmcore::exception::ExceptionCode;

/// A snapshot of one core's externally-visible state, for the console's
/// debug dump.
pub struct CoreSnapshot {
    pub core_id: usize,
    pub halted: bool,
    pub exception: ExceptionCode,
    pub sp: u8,
    pub stack_top: u32,
}

pub trait System {
    /// Advance every core by one cycle. Returns `true` once every core has
    /// halted (hit a trap-entry microcode routine).
    fn step(&mut self) -> bool;

    fn is_halted(&self) -> bool;

    fn core_count(&self) -> usize;

    fn snapshot(&self, core: usize) -> CoreSnapshot;
}
