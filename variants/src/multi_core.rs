//! The multi-core variant: N engines sharing one [`MainMemory`] behind a
//! round-robin [`BusArbiter`], with snoop messages relayed between cores
//! and a cluster-wide [`GlobalLock`] folded in and out of each engine
//! around its step (spec.md §4.6 — lock and arbiter are multi-core only).

use jvmcore::arbiter::BusArbiter;
use jvmcore::core::bus::{Bmb, BmbCommand, BmbResponse};
use jvmcore::lock::GlobalLock;
use jvmcore::memctl::AddressTranslation;
use jvmcore::pipeline::{Engine, EngineConfig};

use crate::image::MemoryImage;
use crate::memory::MainMemory;
use crate::registry::VariantEntry;
use crate::system::{CoreSnapshot, System};

const CORE_COUNT: usize = 2;

/// Gates a shared [`MainMemory`] so only the arbiter-granted core's
/// transactions reach it this cycle; an ungranted core just sees its
/// command rejected and retries next cycle, same as real bus contention.
struct GatedBus<'a> {
    inner: &'a mut MainMemory,
    granted: bool,
}

impl Bmb for GatedBus<'_> {
    fn try_command(&mut self, cmd: &BmbCommand) -> bool {
        self.granted && self.inner.try_command(cmd)
    }

    fn poll_response(&mut self) -> Option<BmbResponse> {
        if !self.granted {
            return None;
        }
        self.inner.poll_response()
    }
}

pub struct MultiCoreSystem {
    engines: Vec<Engine>,
    memory: MainMemory,
    arbiter: BusArbiter,
    lock: GlobalLock,
}

impl MultiCoreSystem {
    pub fn new(image: MemoryImage) -> Self {
        let engines = (0..CORE_COUNT)
            .map(|core_id| {
                Engine::new(EngineConfig {
                    core_id,
                    translation: AddressTranslation::EveryAccess,
                    ..EngineConfig::default()
                })
            })
            .collect();
        Self {
            engines,
            memory: MainMemory::from_words(image.words().to_vec()),
            arbiter: BusArbiter::new(CORE_COUNT),
            lock: GlobalLock::new(),
        }
    }

    fn relay_snoop(&mut self) {
        let mut outgoing = Vec::with_capacity(self.engines.len());
        for engine in &mut self.engines {
            outgoing.push(engine.drain_snoop_out());
        }
        for (i, msgs) in outgoing.into_iter().enumerate() {
            for msg in msgs {
                for (j, engine) in self.engines.iter_mut().enumerate() {
                    if j != i {
                        engine.receive_snoop(msg);
                    }
                }
            }
        }
    }
}

impl System for MultiCoreSystem {
    fn step(&mut self) -> bool {
        let requests: Vec<bool> = self.engines.iter().map(Engine::wants_bus).collect();
        let grant = self.arbiter.arbitrate(&requests);

        for (i, engine) in self.engines.iter_mut().enumerate() {
            engine.lock = self.lock.clone();
            let mut gated = GatedBus {
                inner: &mut self.memory,
                granted: grant == Some(i),
            };
            engine.step(&mut gated);
            self.lock = engine.lock.clone();
        }

        self.relay_snoop();

        self.engines.iter().all(Engine::is_halted)
    }

    fn is_halted(&self) -> bool {
        self.engines.iter().all(Engine::is_halted)
    }

    fn core_count(&self) -> usize {
        self.engines.len()
    }

    fn snapshot(&self, core: usize) -> CoreSnapshot {
        let engine = &self.engines[core];
        CoreSnapshot {
            core_id: core,
            halted: engine.is_halted(),
            exception: engine.exceptions.read(),
            sp: engine.datapath.regs.sp,
            stack_top: engine.datapath.ram.read(engine.datapath.regs.sp),
        }
    }
}

inventory::submit! {
    VariantEntry {
        name: "multi-core",
        description: "two engines, shared main memory, round-robin arbiter, global lock",
        create: |image| Box::new(MultiCoreSystem::new(image)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_cores_step_without_panicking() {
        let image = MemoryImage::from_bytes(&[0; 64]).unwrap();
        let mut system = MultiCoreSystem::new(image);
        for _ in 0..8 {
            system.step();
        }
        assert_eq!(system.core_count(), 2);
    }

    #[test]
    fn registered_under_multi_core_name() {
        let entry = crate::registry::find("multi-core").unwrap();
        let image = MemoryImage::from_bytes(&[]).unwrap();
        let system = (entry.create)(image);
        assert_eq!(system.core_count(), 2);
    }
}
