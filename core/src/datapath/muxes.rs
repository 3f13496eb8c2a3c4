//! Mux select enums for the stack datapath (spec.md §4.1) and the
//! four-mode immediate unit.

/// Load mux (lmux): selects among {logic, shifter, RAM readout, imm, din,
/// register-mux}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadMuxSel {
    Logic,
    Shifter,
    RamReadout,
    Imm,
    Din,
    RegMux,
}

/// A mux: selects between {sum, lmux}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AMuxSel {
    Sum,
    LoadMux,
}

/// B's enable source: B is enabled from A by default, or from the RAM
/// readout (spec.md §4.1 "B is enabled by enaB from either A (default) or
/// RAM").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BSource {
    FromA,
    FromRam,
}

/// Read address mux (rda): {VP+0, VP+1, VP+2, VP+3, VP+opd[6:0], AR, SP,
/// direct}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadAddrSel {
    Vp0,
    Vp1,
    Vp2,
    Vp3,
    VpOpd,
    Ar,
    Sp,
    Direct,
}

/// Write address mux (wra): same set as [`ReadAddrSel`] but with SP
/// replaced by SP+1 (push).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteAddrSel {
    Vp0,
    Vp1,
    Vp2,
    Vp3,
    VpOpd,
    Ar,
    SpPush,
    Direct,
}

/// Memory-data mux (mmux): writes A or B into stack RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemDataSel {
    A,
    B,
}

/// Stack-pointer mux (smux): {hold, dec, inc, load-from-A}.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpMuxSel {
    Hold,
    Dec,
    Inc,
    LoadFromA,
}

/// Immediate unit mode (spec.md §4.1: "four modes {8-bit unsigned, 8-bit
/// signed, 16-bit unsigned, 16-bit signed}, registered one cycle").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImmMode {
    U8,
    S8,
    U16,
    S16,
}

/// Compute the combinational (pre-register) immediate value from the
/// current bytecode operand bytes.
pub fn decode_immediate(mode: ImmMode, opd: u16) -> u32 {
    match mode {
        ImmMode::U8 => u32::from(opd & 0xFF),
        ImmMode::S8 => ((opd & 0xFF) as u8 as i8) as i32 as u32,
        ImmMode::U16 => u32::from(opd),
        ImmMode::S16 => (opd as i16) as i32 as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_8_bit_sign_extends() {
        assert_eq!(decode_immediate(ImmMode::S8, 0x00FF), 0xFFFF_FFFF);
        assert_eq!(decode_immediate(ImmMode::U8, 0x00FF), 0x0000_00FF);
    }

    #[test]
    fn signed_16_bit_sign_extends() {
        assert_eq!(decode_immediate(ImmMode::S16, 0x8000), 0xFFFF_8000);
        assert_eq!(decode_immediate(ImmMode::U16, 0x8000), 0x0000_8000);
    }
}
