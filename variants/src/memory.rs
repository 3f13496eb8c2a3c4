//! The external memory module every variant wires a core's memory
//! controller to: a flat word array behind a fixed-latency BMB responder.
//! Real timing (SDRAM PHY, refresh) is out of scope (spec.md Non-goals);
//! this is the minimum the protocol's valid/ready + response-beat handshake
//! needs to exercise the controller end to end.

use jvmcore::core::bus::{Bmb, BmbCommand, BmbOpcode, BmbResponse};

/// Cycles between a command firing and its response beat becoming visible.
const RESPONSE_LATENCY: u8 = 2;

struct Pending {
    cmd: BmbCommand,
    cycles_left: u8,
}

/// A single contiguous main-memory region, word-addressed.
pub struct MainMemory {
    words: Vec<u32>,
    pending: Option<Pending>,
}

impl MainMemory {
    pub fn new(size_words: usize) -> Self {
        Self {
            words: vec![0; size_words],
            pending: None,
        }
    }

    pub fn from_words(words: Vec<u32>) -> Self {
        Self {
            words,
            pending: None,
        }
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    fn apply_mask(old: u32, new: u32, mask: u8) -> u32 {
        let old_b = old.to_be_bytes();
        let new_b = new.to_be_bytes();
        let mut out = [0u8; 4];
        for i in 0..4 {
            out[i] = if mask & (1 << i) != 0 { new_b[i] } else { old_b[i] };
        }
        u32::from_be_bytes(out)
    }
}

impl Bmb for MainMemory {
    fn try_command(&mut self, cmd: &BmbCommand) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(Pending {
            cmd: *cmd,
            cycles_left: RESPONSE_LATENCY,
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
        let Pending { cmd, .. } = self.pending.take().expect("checked above");
        let index = (cmd.address / 4) as usize;
        let in_bounds = index < self.words.len();
        let data = match cmd.opcode {
            BmbOpcode::Read => {
                if in_bounds {
                    self.words[index]
                } else {
                    0
                }
            }
            BmbOpcode::Write => {
                if in_bounds {
                    self.words[index] = Self::apply_mask(self.words[index], cmd.data, cmd.mask);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut mem = MainMemory::new(16);
        let write = BmbCommand {
            address: 4,
            opcode: BmbOpcode::Write,
            length_bytes: 3,
            data: 0xCAFE_BABE,
            mask: 0xF,
            source: jvmcore::core::bus::BusMaster::Core(0),
            context: 1,
        };
        assert!(mem.try_command(&write));
        assert!(mem.poll_response().is_none());
        let resp = mem.poll_response().unwrap();
        assert!(resp.success);

        let read = BmbCommand {
            opcode: BmbOpcode::Read,
            ..write
        };
        assert!(mem.try_command(&read));
        let _ = mem.poll_response();
        let resp = mem.poll_response().unwrap();
        assert_eq!(resp.data, 0xCAFE_BABE);
    }

    #[test]
    fn out_of_bounds_access_reports_failure() {
        let mut mem = MainMemory::new(4);
        let cmd = BmbCommand {
            address: 100,
            opcode: BmbOpcode::Read,
            length_bytes: 3,
            data: 0,
            mask: 0,
            source: jvmcore::core::bus::BusMaster::Core(0),
            context: 0,
        };
        assert!(mem.try_command(&cmd));
        let _ = mem.poll_response();
        let resp = mem.poll_response().unwrap();
        assert!(!resp.success);
    }

    #[test]
    fn second_command_rejected_while_one_in_flight() {
        let mut mem = MainMemory::new(4);
        let cmd = BmbCommand {
            address: 0,
            opcode: BmbOpcode::Read,
            length_bytes: 3,
            data: 0,
            mask: 0,
            source: jvmcore::core::bus::BusMaster::Core(0),
            context: 0,
        };
        assert!(mem.try_command(&cmd));
        assert!(!mem.try_command(&cmd));
    }
}
