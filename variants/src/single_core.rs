//! The single-core variant: one [`Engine`] wired to one [`MainMemory`], no
//! lock/arbiter (spec.md §4.6: "multi-core only — absent from the single-
//! core variant").

use jvmcore::memctl::AddressTranslation;
use jvmcore::pipeline::{Engine, EngineConfig};

use crate::image::MemoryImage;
use crate::memory::MainMemory;
use crate::registry::VariantEntry;
use crate::system::{CoreSnapshot, System};

pub struct SingleCoreSystem {
    engine: Engine,
    memory: MainMemory,
}

impl SingleCoreSystem {
    pub fn new(image: MemoryImage) -> Self {
        let config = EngineConfig {
            core_id: 0,
            translation: AddressTranslation::GcCopyOnly,
            ..EngineConfig::default()
        };
        Self {
            engine: Engine::new(config),
            memory: MainMemory::from_words(image.words().to_vec()),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl System for SingleCoreSystem {
    fn step(&mut self) -> bool {
        self.engine.step(&mut self.memory);
        self.engine.is_halted()
    }

    fn is_halted(&self) -> bool {
        self.engine.is_halted()
    }

    fn core_count(&self) -> usize {
        1
    }

    fn snapshot(&self, core: usize) -> CoreSnapshot {
        debug_assert_eq!(core, 0);
        CoreSnapshot {
            core_id: 0,
            halted: self.engine.is_halted(),
            exception: self.engine.exceptions.read(),
            sp: self.engine.datapath.regs.sp,
            stack_top: self.engine.datapath.ram.read(self.engine.datapath.regs.sp),
        }
    }
}

inventory::submit! {
    VariantEntry {
        name: "single-core",
        description: "one engine, one main-memory module, no lock/arbiter",
        create: |image| Box::new(SingleCoreSystem::new(image)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_all_zero_image_loops_on_nop_forever() {
        // opcode 0x00 is nop; an all-zero image never retires anything else
        // and so never halts.
        let image = MemoryImage::from_bytes(&[0, 0, 0, 0]).unwrap();
        let mut system = SingleCoreSystem::new(image);
        for _ in 0..8 {
            system.step();
        }
        assert!(!system.is_halted());
    }

    #[test]
    fn registered_under_single_core_name() {
        let entry = crate::registry::find("single-core").unwrap();
        let image = MemoryImage::from_bytes(&[]).unwrap();
        let system = (entry.create)(image);
        assert_eq!(system.core_count(), 1);
    }
}
