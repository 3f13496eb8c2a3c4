//! C4: bytecode fetch (spec.md §4.4).
//!
//! Holds the Java PC (`jpc`), reads the current opcode out of [`JbcRam`],
//! translates it through the jump table (C1), latches operand bytes, and
//! merges in the interrupt/exception priority logic: an exception raised by
//! the memory controller always wins over a pending interrupt, and both win
//! over straight-line bytecode advance (spec.md §4.5 "priority-merged before
//! consumption").

use crate::exception::{ExceptionCode, ExceptionRegister};
use crate::jbc_ram::JbcRam;
use crate::jump_table::{self, EXCEPTION_ENTRY, INTERRUPT_ENTRY};

/// What C4 latches for C5 to consume this cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchOutputs {
    pub entry: u16,
    pub opd: u16,
    pub jpc: u32,
}

pub struct BytecodeFetch {
    pub jpc: u32,
    /// Operand byte latch, shifted in as `jopdfetch` cycles consume bytes.
    opd: u16,
    /// `true` once an interrupt line has been raised but not yet serviced.
    interrupt_pending: bool,
}

impl BytecodeFetch {
    pub fn new() -> Self {
        Self {
            jpc: 0,
            opd: 0,
            interrupt_pending: false,
        }
    }

    pub fn raise_interrupt(&mut self) {
        self.interrupt_pending = true;
    }

    /// Run one fetch cycle. `jfetch`/`jopdfetch` come from the microcode
    /// word just retired (spec.md §4.3); `exceptions` is the controller's
    /// exception register. Returns the entry address and operand bytes for
    /// this bytecode, and advances `jpc` when a fetch actually happened.
    ///
    /// `jopdfetch` pulls exactly one operand byte per call: the new byte
    /// becomes the low byte of `opd`, the previous low byte shifts up to the
    /// high byte (spec.md §4.4). A bytecode with a 16-bit operand rides two
    /// `jopdfetch` pulses across two microwords to assemble the full value.
    pub fn step(&mut self, jbc: &JbcRam, exceptions: &mut ExceptionRegister, jfetch: bool, jopdfetch: bool) -> FetchOutputs {
        if jopdfetch {
            let byte = jbc.read(self.jpc);
            self.jpc = self.jpc.wrapping_add(1);
            self.opd = (self.opd << 8) | u16::from(byte);
        }

        if !jfetch {
            return FetchOutputs {
                entry: 0,
                opd: self.opd,
                jpc: self.jpc,
            };
        }

        if exceptions.is_pending() {
            let code = exceptions.read();
            exceptions.acknowledge();
            debug_assert_ne!(code, ExceptionCode::None);
            return FetchOutputs {
                entry: EXCEPTION_ENTRY,
                opd: self.opd,
                jpc: self.jpc,
            };
        }

        if self.interrupt_pending {
            self.interrupt_pending = false;
            return FetchOutputs {
                entry: INTERRUPT_ENTRY,
                opd: self.opd,
                jpc: self.jpc,
            };
        }

        let opcode = jbc.read(self.jpc);
        self.jpc = self.jpc.wrapping_add(1);
        let entry = jump_table::translate(opcode);

        FetchOutputs {
            entry,
            opd: self.opd,
            jpc: self.jpc,
        }
    }
}

impl Default for BytecodeFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_translates_and_advances_jpc() {
        let jbc = JbcRam::new(11);
        let mut fetch = BytecodeFetch::new();
        let mut exc = ExceptionRegister::new();
        let out = fetch.step(&jbc, &mut exc, true, false);
        assert_eq!(out.entry, jump_table::translate(0x00));
        assert_eq!(fetch.jpc, 1);
    }

    #[test]
    fn exception_redirect_wins_over_normal_fetch() {
        let jbc = JbcRam::new(11);
        let mut fetch = BytecodeFetch::new();
        let mut exc = ExceptionRegister::new();
        exc.raise(ExceptionCode::NullPointer);

        let out = fetch.step(&jbc, &mut exc, true, false);
        assert_eq!(out.entry, EXCEPTION_ENTRY);
        assert!(!exc.is_pending());
        // jpc did not advance: the faulting bytecode is not retired.
        assert_eq!(fetch.jpc, 0);
    }

    #[test]
    fn exception_wins_over_pending_interrupt() {
        let jbc = JbcRam::new(11);
        let mut fetch = BytecodeFetch::new();
        let mut exc = ExceptionRegister::new();
        fetch.raise_interrupt();
        exc.raise(ExceptionCode::ArrayBounds);

        let out = fetch.step(&jbc, &mut exc, true, false);
        assert_eq!(out.entry, EXCEPTION_ENTRY);
        // Interrupt is still pending, to be serviced on the cycle after.
        let out2 = fetch.step(&jbc, &mut exc, true, false);
        assert_eq!(out2.entry, INTERRUPT_ENTRY);
    }

    #[test]
    fn no_jfetch_holds_opd_and_jpc() {
        let jbc = JbcRam::new(11);
        let mut fetch = BytecodeFetch::new();
        let mut exc = ExceptionRegister::new();
        let out = fetch.step(&jbc, &mut exc, false, false);
        assert_eq!(out.jpc, 0);
    }
}
