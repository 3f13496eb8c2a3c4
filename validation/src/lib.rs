//! `TracingBmb`, a BMB responder that records every command it fires, and
//! the JSON test-vector types the `gen_bytecode_tests` binary writes and the
//! `tests/` harnesses read back. Mirrors `phosphor-cpu-validation`'s
//! `TracingBus` / `TestCase` pair, retargeted at one pipeline cycle per
//! entry instead of one CPU bus cycle per entry.

use jvmcore::core::bus::{Bmb, BmbCommand, BmbOpcode, BmbResponse};
use serde::{Deserialize, Serialize};

/// Cycles between a command firing and its response beat, matching the
/// `variants` crate's main-memory model so recorded vectors stay
/// representative of the variant the bytecodes actually run on.
const RESPONSE_LATENCY: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmbOp {
    Read,
    Write,
    /// A pipeline cycle with no bus transaction in flight.
    Internal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BmbCycle {
    pub address: u32,
    pub data: u32,
    pub op: BmbOp,
}

struct Pending {
    cmd: BmbCommand,
    cycles_left: u8,
    /// Index into `cycles` of the entry this command fired, so a read's
    /// placeholder `data` can be filled in once the response resolves.
    cycle_index: usize,
}

/// A flat word-addressed memory that records every fired command as a
/// [`BmbCycle`].
pub struct TracingBmb {
    pub memory: Vec<u32>,
    pub cycles: Vec<BmbCycle>,
    pending: Option<Pending>,
}

impl TracingBmb {
    pub fn new(size_words: usize) -> Self {
        Self {
            memory: vec![0; size_words],
            cycles: Vec::new(),
            pending: None,
        }
    }

    pub fn load_words(&mut self, base: usize, words: &[u32]) {
        self.memory[base..base + words.len()].copy_from_slice(words);
    }

    pub fn clear_cycles(&mut self) {
        self.cycles.clear();
    }
}

impl Default for TracingBmb {
    fn default() -> Self {
        Self::new(0x1000)
    }
}

impl Bmb for TracingBmb {
    fn try_command(&mut self, cmd: &BmbCommand) -> bool {
        if self.pending.is_some() {
            return false;
        }
        let recorded_data = match cmd.opcode {
            BmbOpcode::Write => cmd.data,
            // Filled in once the read resolves in `poll_response`.
            BmbOpcode::Read => 0,
        };
        let op = match cmd.opcode {
            BmbOpcode::Read => BmbOp::Read,
            BmbOpcode::Write => BmbOp::Write,
        };
        let cycle_index = self.cycles.len();
        self.cycles.push(BmbCycle {
            address: cmd.address,
            data: recorded_data,
            op,
        });
        self.pending = Some(Pending {
            cmd: *cmd,
            cycles_left: RESPONSE_LATENCY,
            cycle_index,
        });
        true
    }

    fn poll_response(&mut self) -> Option<BmbResponse> {
        let ready = match &mut self.pending {
            None => return None,
            Some(p) if p.cycles_left > 0 => {
                p.cycles_left -= 1;
                false
            }
            Some(_) => true,
        };
        if !ready {
            return None;
        }
        let Pending { cmd, cycle_index, .. } = self.pending.take().expect("checked above");
        let index = (cmd.address / 4) as usize;
        let in_bounds = index < self.memory.len();
        let data = match cmd.opcode {
            BmbOpcode::Read => {
                let data = if in_bounds { self.memory[index] } else { 0 };
                self.cycles[cycle_index].data = data;
                data
            }
            BmbOpcode::Write => {
                if in_bounds {
                    self.memory[index] = cmd.data;
                }
                0
            }
        };
        Some(BmbResponse {
            data,
            success: in_bounds,
            context: cmd.context,
            last: true,
        })
    }
}

/// A snapshot of everything pipeline-visible about one bytecode's execution:
/// the register file, the Java PC, the hardware exception register, and a
/// small window of stack-RAM words around SP. Does not track individual
/// stack-RAM addresses touched (unlike the model repo's per-CPU `ram: Vec<(u16,
/// u8)>`, which has direct read/write instrumentation on its flat bus) —
/// sampling a fixed window around SP is sufficient for the stack-only
/// bytecodes this harness exercises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub jpc: u32,
    pub sp: u8,
    pub a: u32,
    pub b: u32,
    pub ar: u8,
    pub vp: u8,
    pub exception: u32,
    /// `(address, value)` pairs for a small window of stack-RAM slots around
    /// `sp`.
    pub stack_window: Vec<(u8, u32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BytecodeTestCase {
    pub name: String,
    pub initial: PipelineState,
    #[serde(rename = "final")]
    pub final_state: PipelineState,
    pub cycles: Vec<BmbCycle>,
}
