/// Identifies who is driving a BMB transaction this cycle.
///
/// `Core(n)` is a core's own memory controller acting on behalf of
/// microcode; the other variants are internal sub-masters the memory
/// controller drives on a core's behalf (method-cache fill, array-cache
/// fill, GC block copy) and exist only so the arbiter and snoop bus can
/// attribute a transaction back to the right originating core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BusMaster {
    Core(usize),
    BcFill(usize),
    AcFill(usize),
    GcCopy(usize),
}

impl BusMaster {
    /// The originating core index, regardless of which internal sub-master
    /// issued the transaction.
    pub fn core(self) -> usize {
        match self {
            BusMaster::Core(n)
            | BusMaster::BcFill(n)
            | BusMaster::AcFill(n)
            | BusMaster::GcCopy(n) => n,
        }
    }
}

/// BMB command opcode (spec.md §6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BmbOpcode {
    Read,
    Write,
}

/// A single BMB command. `length_bytes` is one less than the burst length
/// in bytes, per spec.md §6; a plain single-word transaction uses
/// `length_bytes = 3` (one 4-byte beat). `mask` carries one bit per byte of
/// `data`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BmbCommand {
    pub address: u32,
    pub opcode: BmbOpcode,
    pub length_bytes: u32,
    pub data: u32,
    pub mask: u8,
    pub source: BusMaster,
    pub context: u32,
}

/// A single BMB response beat. `last` is set on the final beat of a burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BmbResponse {
    pub data: u32,
    pub success: bool,
    pub context: u32,
    pub last: bool,
}

/// The BMB master-side view of the bus: a memory controller offers a
/// command every cycle until it fires (`valid && ready`), then polls for
/// the matching response. Re-offering an identical command on every cycle
/// until `try_command` returns `true` is the caller's responsibility —
/// address and data must not change mid-retry (spec.md §3 Invariant 3).
pub trait Bmb {
    /// Offer a command this cycle. Returns whether it fired.
    fn try_command(&mut self, cmd: &BmbCommand) -> bool;

    /// Poll for a response beat belonging to the most recently fired
    /// command. `None` means no response is available this cycle.
    fn poll_response(&mut self) -> Option<BmbResponse>;
}

/// The value the top two address bits must hold to select the I/O region.
pub const IO_REGION_TAG: u32 = 0b11;

/// Returns `true` if `address`'s top two bits mark it as I/O-region rather
/// than main memory (spec.md §6).
pub fn is_io_address(address: u32) -> bool {
    (address >> 30) == IO_REGION_TAG
}

/// Extracts the 8-bit I/O sub-address from a full bus address.
pub fn io_sub_address(address: u32) -> u8 {
    (address & 0xFF) as u8
}
