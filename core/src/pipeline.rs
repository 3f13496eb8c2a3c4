//! C12: pipeline glue — the only place that wires C1-C11 and C13 together
//! into one cycle (spec.md §4 overview). Every other module is step-once-
//! per-cycle and otherwise stateless about its neighbors (Design Note 5:
//! explicit message/command surfaces, not shared mutable pointers).

use crate::cache::array::ArrayCache;
use crate::cache::method::MethodCache;
use crate::cache::object::ObjectCache;
use crate::core::bus::Bmb;
use crate::datapath::{Datapath, DatapathInputs};
use crate::device::sys_regs::SysRegs;
use crate::device::uart::Uart;
use crate::exception::{ExceptionCode, ExceptionRegister};
use crate::fetch::BytecodeFetch;
use crate::io::IoRegion;
use crate::jbc_ram::JbcRam;
use crate::lock::GlobalLock;
use crate::memctl::state::MemRequest;
use crate::memctl::{AddressTranslation, MemController, StepResult};
use crate::multiplier::Multiplier;
use crate::snoop::{SnoopBus, SnoopMessage};
use crate::ucode::decode::{BranchCond, MemOp, UOp, decode};
use crate::ucode::{MicroWord, UcodeFetch, UcodeRom};

pub struct EngineConfig {
    pub core_id: usize,
    pub jpc_bits: u32,
    pub translation: AddressTranslation,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            core_id: 0,
            jpc_bits: 11,
            translation: AddressTranslation::GcCopyOnly,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StepOutputs {
    pub retired_bytecode: bool,
    pub exception: Option<ExceptionCode>,
    pub halted: bool,
}

pub struct Engine {
    core_id: usize,
    pub datapath: Datapath,
    rom: UcodeRom,
    ucode: UcodeFetch,
    fetch: BytecodeFetch,
    pub jbc: JbcRam,
    mul: Multiplier,
    memctl: MemController,
    pub method_cache: MethodCache,
    pub object_cache: ObjectCache,
    pub array_cache: ArrayCache,
    pub exceptions: ExceptionRegister,
    snoop_out: SnoopBus,
    snoop_in: SnoopBus,
    pub io: IoRegion,
    /// Exposed so a multi-core driver can swap in a cluster-wide lock
    /// instance each cycle instead of each engine holding its own (Design
    /// Note 5: explicit message/state surfaces, not shared mutable
    /// pointers).
    pub lock: GlobalLock,
    din_latched: u32,
    halted: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut datapath = Datapath::new();
        datapath
            .ram
            .load_constants(&crate::ucode::image::CONST_IMAGE);

        Self {
            core_id: config.core_id,
            datapath,
            rom: UcodeRom::new(),
            ucode: UcodeFetch::new(),
            fetch: BytecodeFetch::new(),
            jbc: JbcRam::new(config.jpc_bits),
            mul: Multiplier::new(),
            memctl: MemController::new(config.core_id, config.translation),
            method_cache: MethodCache::new(),
            object_cache: ObjectCache::new(),
            array_cache: ArrayCache::new(),
            exceptions: ExceptionRegister::new(),
            snoop_out: SnoopBus::new(),
            snoop_in: SnoopBus::new(),
            io: IoRegion::new(config.core_id as u32),
            lock: GlobalLock::new(),
            din_latched: 0,
            halted: false,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// `true` if this core's memory controller needs a BMB transaction
    /// this cycle. A multi-core driver uses this to build the arbiter's
    /// request vector before calling [`Engine::step`].
    pub fn wants_bus(&self) -> bool {
        self.memctl.wants_bus()
    }

    pub fn sys_regs(&mut self) -> &mut SysRegs {
        &mut self.io.sys
    }

    pub fn uart(&mut self) -> &mut Uart {
        &mut self.io.uart
    }

    /// Messages this core's memory writes broadcast to the rest of the
    /// cluster. A multi-core driver drains this once per cycle and feeds
    /// the result into every other core's [`Engine::receive_snoop`].
    pub fn drain_snoop_out(&mut self) -> Vec<SnoopMessage> {
        self.snoop_out.advance();
        self.snoop_out.visible().to_vec()
    }

    /// Accept a message broadcast by another core this cycle. Not visible
    /// to this core's caches until the next `step` (Design Note 9).
    pub fn receive_snoop(&mut self, msg: SnoopMessage) {
        self.snoop_in.broadcast(msg);
    }

    fn branch_taken(cond: BranchCond, flags: crate::datapath::alu::Flags) -> bool {
        match cond {
            BranchCond::Always => true,
            BranchCond::Zf => flags.zf,
            BranchCond::Nz => !flags.zf,
        }
    }

    /// Advance the engine by one cycle.
    pub fn step(&mut self, bus: &mut dyn Bmb) -> StepOutputs {
        if self.halted {
            return StepOutputs {
                halted: true,
                ..Default::default()
            };
        }

        self.snoop_in.advance();
        for msg in self.snoop_in.visible() {
            self.object_cache.apply_snoop(msg);
            self.array_cache.apply_snoop(msg);
        }

        let current: MicroWord = self.ucode.ir.unwrap_or(MicroWord::new(UOp::Nop));
        if matches!(current.op, UOp::Trap) {
            self.halted = true;
            return StepOutputs {
                halted: true,
                ..Default::default()
            };
        }

        let controls = decode(current.op);

        let fetch_out = self.fetch.step(&self.jbc, &mut self.exceptions, current.jfetch, current.jopdfetch);

        let inputs = DatapathInputs {
            din: self.din_latched,
            opd: fetch_out.opd,
            direct_addr: controls.direct_addr,
        };
        let outputs = self.datapath.step(&controls.stack, &inputs);

        if controls.mul_start {
            self.mul.start(self.datapath.regs.a, self.datapath.regs.b);
        }
        self.mul.tick();
        if controls.mul_read {
            self.datapath.regs.mul_res = self.mul.result();
        }

        if controls.ena_jpc {
            self.fetch.jpc = self.datapath.regs.a;
        }

        let mut exception = None;
        if let Some(mem_op) = controls.mem {
            if self.memctl.is_idle() {
                self.memctl.begin(MemRequest {
                    op: mem_op,
                    handle: self.datapath.regs.ar as u32,
                    index_or_field: self.datapath.regs.a,
                    value: self.datapath.regs.b,
                });
            }
            match self.memctl.step(
                bus,
                &mut self.jbc,
                &mut self.method_cache,
                &mut self.object_cache,
                &mut self.array_cache,
                &mut self.snoop_out,
                &mut self.exceptions,
                &mut self.io,
                &mut self.lock,
            ) {
                StepResult::Done { data } => self.din_latched = data,
                StepResult::Exception(code) => exception = Some(code),
                StepResult::Busy | StepResult::Idle => {}
            }
        }

        let entry = if current.jfetch { Some(fetch_out.entry) } else { None };
        let branch = controls.branch.and_then(|(offset, cond)| {
            Self::branch_taken(cond, outputs.flags).then_some(offset)
        });
        let next_pc = self.ucode.next_pc(entry, branch, controls.jump);
        self.ucode.tick(&self.rom, next_pc);

        self.jbc.tick();
        self.datapath.ram.commit();
        self.lock.tick();

        StepOutputs {
            retired_bytecode: current.jfetch,
            exception,
            halted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::{BmbCommand, BmbResponse};

    struct NullBus;
    impl Bmb for NullBus {
        fn try_command(&mut self, _cmd: &BmbCommand) -> bool {
            true
        }
        fn poll_response(&mut self) -> Option<BmbResponse> {
            Some(BmbResponse {
                data: 0,
                success: true,
                context: 0,
                last: true,
            })
        }
    }

    #[test]
    fn iconst_chain_leaves_sum_on_stack() {
        // iconst_2, iconst_3, iadd
        let program = [0x05u8, 0x06, 0x60];
        let mut engine = Engine::new(EngineConfig::default());
        let mut word = [0u8; 4];
        word[..3].copy_from_slice(&program);
        engine.jbc.queue_word_write(0, u32::from_be_bytes(word));
        engine.jbc.tick();

        let mut bus = NullBus;

        // Run enough cycles for the natural boot fetch plus iconst_2,
        // iconst_3, iadd.
        for _ in 0..12 {
            if engine.is_halted() {
                break;
            }
            engine.step(&mut bus);
        }

        assert_eq!(engine.datapath.regs.sp, crate::datapath::stack_ram::SP_RESET.wrapping_add(1));
        assert_eq!(engine.datapath.ram.read(engine.datapath.regs.sp), 5);
    }

    #[test]
    fn trap_entry_halts_the_engine() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.ucode.ir = Some(engine.rom.word(crate::jump_table::UNIMPLEMENTED_ENTRY));
        let mut bus = NullBus;
        engine.step(&mut bus);
        assert!(engine.is_halted());
    }
}
