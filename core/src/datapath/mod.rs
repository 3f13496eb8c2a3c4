//! C2: stack RAM, ALU, shifter and the register file (spec.md §4.1).
//!
//! `Datapath::step` is the pure-ish, single-cycle transform Design Note 1
//! asks for: it reads the current register/RAM snapshot plus this cycle's
//! control signals and inputs, and produces both the new register state
//! and this cycle's outputs (`aout`, `bout`, flags, `sp_ov`) in one call.
//! The stack RAM's actual write is deferred to [`StackRam::commit`] (called
//! from the pipeline glue, C12) so other components can observe the
//! pre-write readout this same cycle, matching two-port registered-RAM
//! semantics.

pub mod alu;
pub mod muxes;
pub mod shifter;
pub mod stack_ram;

use alu::{Flags, LogicOp, compute_flags, logic_unit};
use muxes::{
    AMuxSel, BSource, ImmMode, LoadMuxSel, MemDataSel, ReadAddrSel, SpMuxSel, WriteAddrSel,
    decode_immediate,
};
use shifter::{ShiftOp, barrel_shift};
use stack_ram::{SP_OVERFLOW_THRESHOLD, SP_RESET, StackRam};

/// Register file driven by the datapath (spec.md §3 "Registers").
#[derive(Clone, Copy, Debug)]
pub struct Registers {
    pub a: u32,
    pub b: u32,
    pub sp: u8,
    pub vp: u8,
    pub ar: u8,
    pub mul_res: u32,
    /// One-cycle-registered output of the immediate unit.
    pub imm_reg: u32,
    /// Latched once SP hits the overflow threshold; sticky until reset.
    pub sp_ov: bool,
}

impl Registers {
    pub fn reset() -> Self {
        Self {
            a: 0,
            b: 0,
            sp: SP_RESET,
            vp: 0,
            ar: 0,
            mul_res: 0,
            imm_reg: 0,
            sp_ov: false,
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::reset()
    }
}

/// All control signals C6 (microcode decode) drives into the stack
/// datapath for one cycle (spec.md §4.1).
#[derive(Clone, Copy, Debug)]
pub struct StackControls {
    pub load_mux: LoadMuxSel,
    pub a_mux: AMuxSel,
    pub ena_a: bool,
    pub ena_b: bool,
    pub b_source: BSource,
    pub logic_op: LogicOp,
    pub shift_op: ShiftOp,
    pub imm_mode: ImmMode,
    pub alu_subtract: bool,
    pub read_addr: ReadAddrSel,
    pub write_addr: WriteAddrSel,
    pub mem_write_enable: bool,
    pub mem_data: MemDataSel,
    pub sp_mux: SpMuxSel,
    /// VP <= A (spec.md §4.1 "VP-base register is writable from A").
    pub vp_write: bool,
    /// AR <= A.
    pub ar_write: bool,
}

impl Default for StackControls {
    fn default() -> Self {
        Self {
            load_mux: LoadMuxSel::Din,
            a_mux: AMuxSel::LoadMux,
            ena_a: false,
            ena_b: false,
            b_source: BSource::FromA,
            logic_op: LogicOp::PassB,
            shift_op: ShiftOp::Ushr,
            imm_mode: ImmMode::U8,
            alu_subtract: false,
            read_addr: ReadAddrSel::Sp,
            write_addr: WriteAddrSel::SpPush,
            mem_write_enable: false,
            mem_data: MemDataSel::A,
            sp_mux: SpMuxSel::Hold,
            vp_write: false,
            ar_write: false,
        }
    }
}

/// External inputs to the datapath for one cycle: the BMB readout (`din`),
/// the current bytecode operand word, and a direct RAM address carried in
/// microcode (spec.md §4.3 "Direct RAM address carried in IR[4:0]").
#[derive(Clone, Copy, Debug, Default)]
pub struct DatapathInputs {
    pub din: u32,
    pub opd: u16,
    pub direct_addr: u8,
}

/// This cycle's datapath outputs.
#[derive(Clone, Copy, Debug, Default)]
pub struct DatapathOutputs {
    pub aout: u32,
    pub bout: u32,
    pub flags: Flags,
    pub sp_ov: bool,
}

pub struct Datapath {
    pub ram: StackRam,
    pub regs: Registers,
}

impl Datapath {
    pub fn new() -> Self {
        Self {
            ram: StackRam::new(),
            regs: Registers::reset(),
        }
    }

    fn resolve_read_addr(&self, sel: ReadAddrSel, inputs: &DatapathInputs) -> u8 {
        match sel {
            ReadAddrSel::Vp0 => self.regs.vp,
            ReadAddrSel::Vp1 => self.regs.vp.wrapping_add(1),
            ReadAddrSel::Vp2 => self.regs.vp.wrapping_add(2),
            ReadAddrSel::Vp3 => self.regs.vp.wrapping_add(3),
            ReadAddrSel::VpOpd => self.regs.vp.wrapping_add((inputs.opd & 0x7F) as u8),
            ReadAddrSel::Ar => self.regs.ar,
            ReadAddrSel::Sp => self.regs.sp,
            ReadAddrSel::Direct => inputs.direct_addr,
        }
    }

    fn resolve_write_addr(&self, sel: WriteAddrSel, inputs: &DatapathInputs) -> u8 {
        match sel {
            WriteAddrSel::Vp0 => self.regs.vp,
            WriteAddrSel::Vp1 => self.regs.vp.wrapping_add(1),
            WriteAddrSel::Vp2 => self.regs.vp.wrapping_add(2),
            WriteAddrSel::Vp3 => self.regs.vp.wrapping_add(3),
            WriteAddrSel::VpOpd => self.regs.vp.wrapping_add((inputs.opd & 0x7F) as u8),
            WriteAddrSel::Ar => self.regs.ar,
            WriteAddrSel::SpPush => self.regs.sp.wrapping_add(1),
            WriteAddrSel::Direct => inputs.direct_addr,
        }
    }

    /// Advance the datapath by one cycle. Stack-RAM writes are queued but
    /// not yet committed — call `self.ram.commit()` once the rest of the
    /// pipeline has observed this cycle's readout.
    pub fn step(&mut self, controls: &StackControls, inputs: &DatapathInputs) -> DatapathOutputs {
        let a_old = self.regs.a;
        let b_old = self.regs.b;

        let read_addr = self.resolve_read_addr(controls.read_addr, inputs);
        let ram_readout = self.ram.read(read_addr);

        let flags = compute_flags(a_old, b_old);

        let imm_now = decode_immediate(controls.imm_mode, inputs.opd);
        let shifted = barrel_shift(controls.shift_op, b_old, a_old);
        let logic = logic_unit(controls.logic_op, a_old, b_old);
        let adder = alu::add_sub_33(a_old, b_old, controls.alu_subtract);

        let lmux_value = match controls.load_mux {
            LoadMuxSel::Logic => logic,
            LoadMuxSel::Shifter => shifted,
            LoadMuxSel::RamReadout => ram_readout,
            LoadMuxSel::Imm => self.regs.imm_reg,
            LoadMuxSel::Din => inputs.din,
            LoadMuxSel::RegMux => self.regs.mul_res,
        };

        let a_candidate = match controls.a_mux {
            AMuxSel::Sum => adder.sum,
            AMuxSel::LoadMux => lmux_value,
        };

        let b_candidate = match controls.b_source {
            BSource::FromA => a_old,
            BSource::FromRam => ram_readout,
        };

        // SP pre-computation (SPP/SPM every cycle, per spec.md §4.1).
        let sp_plus = self.regs.sp.wrapping_add(1);
        let sp_minus = self.regs.sp.wrapping_sub(1);
        let sp_next = match controls.sp_mux {
            SpMuxSel::Hold => self.regs.sp,
            SpMuxSel::Dec => sp_minus,
            SpMuxSel::Inc => sp_plus,
            SpMuxSel::LoadFromA => (a_candidate & 0xFF) as u8,
        };
        let sp_ov_next = self.regs.sp_ov || sp_next >= SP_OVERFLOW_THRESHOLD;

        if controls.mem_write_enable {
            let write_addr = self.resolve_write_addr(controls.write_addr, inputs);
            let data = match controls.mem_data {
                MemDataSel::A => a_candidate,
                MemDataSel::B => b_candidate,
            };
            self.ram.queue_write(write_addr, data);
        }

        if controls.ena_a {
            self.regs.a = a_candidate;
        }
        if controls.ena_b {
            self.regs.b = b_candidate;
        }
        self.regs.imm_reg = imm_now;
        self.regs.sp = sp_next;
        self.regs.sp_ov = sp_ov_next;
        if controls.vp_write {
            self.regs.vp = (a_candidate & 0xFF) as u8;
        }
        if controls.ar_write {
            self.regs.ar = (a_candidate & 0xFF) as u8;
        }

        DatapathOutputs {
            aout: self.regs.a,
            bout: self.regs.b,
            flags,
            sp_ov: sp_ov_next,
        }
    }
}

impl Default for Datapath {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iadd_pops_both_and_pushes_sum() {
        let mut dp = Datapath::new();
        dp.regs.a = 5;
        dp.regs.b = 3;

        let controls = StackControls {
            a_mux: AMuxSel::Sum,
            ena_a: true,
            alu_subtract: false,
            ..Default::default()
        };
        let out = dp.step(&controls, &DatapathInputs::default());
        assert_eq!(out.aout, 8);
    }

    #[test]
    fn sp_overflow_latches_and_stays_latched() {
        let mut dp = Datapath::new();
        dp.regs.sp = stack_ram::SP_OVERFLOW_THRESHOLD - 1;
        let controls = StackControls {
            sp_mux: SpMuxSel::Inc,
            ..Default::default()
        };
        let out = dp.step(&controls, &DatapathInputs::default());
        assert!(out.sp_ov);

        // Even moving SP back down, the latch stays set until reset.
        let controls = StackControls {
            sp_mux: SpMuxSel::Dec,
            ..Default::default()
        };
        let out = dp.step(&controls, &DatapathInputs::default());
        assert!(out.sp_ov);
    }

    #[test]
    fn vp_relative_local_read() {
        let mut dp = Datapath::new();
        dp.regs.vp = 32;
        dp.ram.queue_write(34, 0x1234);
        dp.ram.commit();

        let controls = StackControls {
            read_addr: ReadAddrSel::Vp2,
            a_mux: AMuxSel::LoadMux,
            load_mux: LoadMuxSel::RamReadout,
            ena_a: true,
            ..Default::default()
        };
        let out = dp.step(&controls, &DatapathInputs::default());
        assert_eq!(out.aout, 0x1234);
    }
}
