//! Cross-core snoop broadcast (spec.md §4.5, §4.7, §4.8, Design Notes §9).
//!
//! A snoop is emitted by the memory controller whenever a write completes
//! through the object or array dereference path (`HANDLE_DATA_WAIT`,
//! writes only). Per Design Note 9, effects are applied at the start of the
//! *next* cycle rather than the one they arrive on, so a store and its own
//! snoop echo are never observed concurrently by the originating core.

/// A handle/index pair identifying what was just written, broadcast to
/// every other core's object/array cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnoopMessage {
    /// An array element store: invalidate the whole cache line covering
    /// `handle`'s element at `index` (array cache invalidates per-line).
    ArrayStore { handle: u32, index: u32 },
    /// An object field store: invalidate only the matching field slot.
    ObjectFieldStore { handle: u32, field_index: u8 },
}

/// Per-core inbox: snoop messages queued this cycle become visible to the
/// owning core's caches starting next cycle.
#[derive(Default)]
pub struct SnoopBus {
    /// Messages queued during the current cycle, not yet visible.
    incoming: Vec<SnoopMessage>,
    /// Messages visible to caches during the current cycle (queued last
    /// cycle).
    visible: Vec<SnoopMessage>,
}

impl SnoopBus {
    pub fn new() -> Self {
        Self {
            incoming: Vec::new(),
            visible: Vec::new(),
        }
    }

    /// Broadcast a message. Not visible to cache lookups until the next
    /// `advance`.
    pub fn broadcast(&mut self, msg: SnoopMessage) {
        self.incoming.push(msg);
    }

    /// Messages visible to this cycle's cache lookups.
    pub fn visible(&self) -> &[SnoopMessage] {
        &self.visible
    }

    /// Roll `incoming` into `visible` for the next cycle. Call once per
    /// cycle, before caches consult `visible()`.
    pub fn advance(&mut self) {
        self.visible.clear();
        std::mem::swap(&mut self.visible, &mut self.incoming);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snoop_not_visible_same_cycle() {
        let mut bus = SnoopBus::new();
        bus.broadcast(SnoopMessage::ArrayStore {
            handle: 0x1000,
            index: 3,
        });
        assert!(bus.visible().is_empty());
        bus.advance();
        assert_eq!(bus.visible().len(), 1);
        bus.advance();
        assert!(bus.visible().is_empty());
    }
}
