//! C5: microcode fetch (spec.md §4.3) — the 2K-entry ROM, PC, IR latch,
//! and the PC-update priority logic (JPC write > branch > jump > PC+1).

pub mod decode;
pub mod image;

use decode::UOp;

pub const ROM_SIZE: usize = 2048;

/// One ROM word: the ~opcode plus the two fetch side-flags that are latched
/// alongside it rather than decoded combinationally (spec.md §4.3: "jfetch
/// and jopdfetch ride along with the microinstruction, not through decode").
#[derive(Clone, Copy, Debug)]
pub struct MicroWord {
    pub op: UOp,
    /// Signals C4 to latch the next bytecode's jump-table entry into PC.
    pub jfetch: bool,
    /// Signals C4 to also latch the next bytecode's operand bytes.
    pub jopdfetch: bool,
}

impl MicroWord {
    pub const fn new(op: UOp) -> Self {
        Self {
            op,
            jfetch: false,
            jopdfetch: false,
        }
    }

    /// Last word of a routine for a bytecode with no operand bytes.
    pub const fn fetch(op: UOp) -> Self {
        Self {
            op,
            jfetch: true,
            jopdfetch: false,
        }
    }

    /// Last word of a routine for a bytecode that also needs its operand
    /// bytes latched (e.g. `bipush`, `getfield`).
    pub const fn fetch_with_opd(op: UOp) -> Self {
        Self {
            op,
            jfetch: true,
            jopdfetch: true,
        }
    }

    /// A mid-routine pulse that latches one operand byte without fetching
    /// the next bytecode (spec.md §4.4: `jopdfetch` shifts in one byte at a
    /// time, so a 16-bit operand needs two pulses — this one, then the
    /// routine's closing [`MicroWord::fetch_with_opd`]).
    pub const fn opd_fetch(op: UOp) -> Self {
        Self {
            op,
            jfetch: false,
            jopdfetch: true,
        }
    }
}

pub struct UcodeRom {
    words: Box<[MicroWord; ROM_SIZE]>,
}

impl UcodeRom {
    pub fn new() -> Self {
        Self {
            words: Box::new(image::build_default_rom()),
        }
    }

    pub fn word(&self, addr: u16) -> MicroWord {
        self.words[addr as usize % ROM_SIZE]
    }
}

impl Default for UcodeRom {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch-stage registers: PC and the registered IR (spec.md §4.3).
#[derive(Clone, Copy, Debug, Default)]
pub struct UcodeFetch {
    pub pc: u16,
    pub ir: Option<MicroWord>,
}

/// Reset value of `ir`: a synthetic word that carries no opcode work of its
/// own (`Nop`) but sets `jfetch` so the very first cycle pulls the jump-table
/// entry for whatever bytecode sits at `jpc` 0, instead of falling through
/// ROM address 0 (reserved, holds `Trap`).
const BOOT_WORD: MicroWord = MicroWord::fetch(UOp::Nop);

/// Where PC should go next, in priority order (spec.md §4.3: "a microcode
/// jump/branch always wins over straight-line PC+1; an entry-address load
/// from C4's jump-table translate always wins over both").
pub enum PcSource {
    JumpTableEntry(u16),
    Branch(i8),
    Jump(i16),
    Increment,
}

impl UcodeFetch {
    pub fn new() -> Self {
        Self {
            pc: 0,
            ir: Some(BOOT_WORD),
        }
    }

    /// Compute next PC from this cycle's decoded controls plus any pending
    /// jump-table entry load, applying the priority order.
    pub fn next_pc(&self, entry: Option<u16>, branch_taken: Option<i8>, jump: Option<i16>) -> u16 {
        let source = if let Some(e) = entry {
            PcSource::JumpTableEntry(e)
        } else if let Some(off) = branch_taken {
            PcSource::Branch(off)
        } else if let Some(off) = jump {
            PcSource::Jump(off)
        } else {
            PcSource::Increment
        };
        match source {
            PcSource::JumpTableEntry(addr) => addr,
            PcSource::Branch(off) => self.pc.wrapping_add(off as i16 as u16),
            PcSource::Jump(off) => self.pc.wrapping_add(off as u16),
            PcSource::Increment => self.pc.wrapping_add(1),
        }
    }

    /// Advance PC and latch a freshly fetched word into IR.
    pub fn tick(&mut self, rom: &UcodeRom, next_pc: u16) {
        self.pc = next_pc;
        self.ir = Some(rom.word(self.pc));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decode::UOp;

    #[test]
    fn straight_line_increments() {
        let fetch = UcodeFetch { pc: 10, ir: None };
        assert_eq!(fetch.next_pc(None, None, None), 11);
    }

    #[test]
    fn jump_table_entry_wins_over_branch() {
        let fetch = UcodeFetch { pc: 10, ir: None };
        assert_eq!(fetch.next_pc(Some(0x100), Some(-1), None), 0x100);
    }

    #[test]
    fn branch_offset_is_signed() {
        let fetch = UcodeFetch { pc: 10, ir: None };
        assert_eq!(fetch.next_pc(None, Some(-2), None), 8);
    }

    #[test]
    fn rom_nop_entry_decodes_cleanly() {
        let rom = UcodeRom::new();
        let word = rom.word(0x010);
        match word.op {
            UOp::Nop => {}
            other => panic!("expected Nop at the nop entry, got {other:?}"),
        }
        assert!(word.jfetch);
    }
}
