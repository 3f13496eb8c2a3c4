//! C6: purely combinational microcode decode (spec.md §4.3).
//!
//! `decode` takes one fetched [`super::MicroWord`] and produces the full
//! signal bundle the rest of the pipeline consumes this cycle: stack/ALU
//! controls for C2, a memory-op request for C11, a branch/jump spec for
//! C5's PC update, and the multiplier/JPC-write/wait flags.

use crate::datapath::StackControls;
use crate::datapath::alu::LogicOp;
use crate::datapath::muxes::{AMuxSel, BSource, ImmMode, LoadMuxSel, MemDataSel, ReadAddrSel, SpMuxSel, WriteAddrSel};
use crate::datapath::shifter::ShiftOp;

/// Memory-op signals C6 can assert into C11 (spec.md §4.3), named to match
/// the spec's own microcode mnemonics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemOp {
    Rd,
    Rdc,
    Rdf,
    Wr,
    Wrf,
    AddrWr,
    BcRd,
    StIdx,
    IaLoad,
    IaStore,
    GetField,
    PutField,
    GetStatic,
    PutStatic,
    Copy,
    CInval,
    PutRef,
    AtmStart,
    AtmEnd,
}

/// Branch condition tag (spec.md §4.3: "implicit condition over
/// {unconditional, zf, nz}").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchCond {
    Always,
    Zf,
    Nz,
}

/// One microcode instruction as stored in the ROM. A structured sum type
/// rather than a literal bit-packed word: the bit-level encoding is an
/// artifact of the (out-of-scope, spec.md §1) microcode assembler, not of
/// this engine's semantics — see DESIGN.md.
#[derive(Clone, Copy, Debug)]
pub enum UOp {
    Nop,
    /// Load an immediate (from the current bytecode operand) into A.
    LdImm { mode: ImmMode },
    /// 33-bit add (`subtract = false`) or B-A subtract into A.
    Alu { subtract: bool },
    Logic { op: LogicOp },
    Shift { op: ShiftOp },
    /// Read stack RAM at `addr` into A.
    Ld { addr: ReadAddrSel },
    /// Read a baked-in constant-region slot (spec.md §3 "Reset-initialisable
    /// from a static image") into A — how `iconst_*`/`aconst_null` get their
    /// operand-free literal without touching the bytecode operand latch.
    LdConst { slot: u8 },
    /// Write A (or B) into stack RAM at `addr`, adjusting SP per `sp`.
    St {
        addr: WriteAddrSel,
        data: MemDataSel,
        sp: SpMuxSel,
    },
    /// Push A onto the operand stack.
    Push,
    /// Pop the operand stack into A.
    Pop,
    /// Latch the BMB readout (`din`) into A — the cycle after a memory
    /// request completes.
    LdDin,
    /// VP <= A (method-invoke frame switch).
    LdVp,
    /// AR <= A (address register latch for memory microcode).
    LdAr,
    /// `stmul`: start the multiplier from A, B.
    StMul,
    /// `ldmul`: load the multiplier result into A.
    LdMul,
    /// Issue a memory-controller request using A/B/AR as address/data.
    Mem { op: MemOp },
    /// Conditional/unconditional microcode branch; `offset` is the signed
    /// 6-bit field carried in IR[5:0].
    Branch { offset: i8, cond: BranchCond },
    /// Unconditional microcode jump; `offset` is the signed 9-bit field
    /// carried in IR[8:0].
    Jump { offset: i16 },
    /// `stjpc`: write Java PC from A (method invoke/return).
    StJpc,
    /// Trap on an unimplemented bytecode.
    Trap,
}

/// Full per-cycle control bundle C6 emits.
#[derive(Clone, Copy, Debug)]
pub struct Controls {
    pub stack: StackControls,
    pub mem: Option<MemOp>,
    pub branch: Option<(i8, BranchCond)>,
    pub jump: Option<i16>,
    pub mul_start: bool,
    pub mul_read: bool,
    pub ena_jpc: bool,
    /// Direct RAM address for this cycle, when `stack.read_addr` or
    /// `stack.write_addr` is [`ReadAddrSel::Direct`]/[`WriteAddrSel::Direct`].
    pub direct_addr: u8,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            stack: StackControls::default(),
            mem: None,
            branch: None,
            jump: None,
            mul_start: false,
            mul_read: false,
            ena_jpc: false,
            direct_addr: 0,
        }
    }
}

/// Decode one microinstruction into this cycle's control signals.
pub fn decode(op: UOp) -> Controls {
    let mut c = Controls::default();
    match op {
        UOp::Nop => {}
        UOp::LdImm { mode } => {
            c.stack.imm_mode = mode;
            c.stack.load_mux = LoadMuxSel::Imm;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
        }
        UOp::Alu { subtract } => {
            c.stack.alu_subtract = subtract;
            c.stack.a_mux = AMuxSel::Sum;
            c.stack.ena_a = true;
        }
        UOp::Logic { op } => {
            c.stack.logic_op = op;
            c.stack.load_mux = LoadMuxSel::Logic;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
        }
        UOp::Shift { op } => {
            c.stack.shift_op = op;
            c.stack.load_mux = LoadMuxSel::Shifter;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
        }
        UOp::Ld { addr } => {
            c.stack.read_addr = addr;
            c.stack.load_mux = LoadMuxSel::RamReadout;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
        }
        UOp::LdConst { slot } => {
            c.stack.read_addr = ReadAddrSel::Direct;
            c.direct_addr = slot;
            c.stack.load_mux = LoadMuxSel::RamReadout;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
        }
        UOp::St { addr, data, sp } => {
            c.stack.write_addr = addr;
            c.stack.mem_data = data;
            c.stack.mem_write_enable = true;
            c.stack.sp_mux = sp;
        }
        UOp::Push => {
            c.stack.write_addr = WriteAddrSel::SpPush;
            c.stack.mem_data = MemDataSel::A;
            c.stack.mem_write_enable = true;
            c.stack.sp_mux = SpMuxSel::Inc;
        }
        UOp::Pop => {
            c.stack.read_addr = ReadAddrSel::Sp;
            c.stack.load_mux = LoadMuxSel::RamReadout;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
            c.stack.b_source = BSource::FromA;
            c.stack.sp_mux = SpMuxSel::Dec;
        }
        UOp::LdDin => {
            c.stack.load_mux = LoadMuxSel::Din;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
        }
        UOp::LdVp => {
            c.stack.vp_write = true;
        }
        UOp::LdAr => {
            c.stack.ar_write = true;
        }
        UOp::StMul => {
            c.mul_start = true;
        }
        UOp::LdMul => {
            c.stack.load_mux = LoadMuxSel::RegMux;
            c.stack.a_mux = AMuxSel::LoadMux;
            c.stack.ena_a = true;
            c.mul_read = true;
        }
        UOp::Mem { op } => {
            c.mem = Some(op);
        }
        UOp::Branch { offset, cond } => {
            c.branch = Some((offset, cond));
        }
        UOp::Jump { offset } => {
            c.jump = Some(offset);
        }
        UOp::StJpc => {
            c.ena_jpc = true;
        }
        UOp::Trap => {}
    }
    c
}
