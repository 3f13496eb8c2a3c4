//! C9: object field cache (spec.md §5 "Object Cache") — each line holds all
//! 8 cacheable field slots of one handle at once, so an object with few
//! fields fills its whole line on first touch instead of one slot per
//! field. Field indices at or above the cacheable window always miss; the
//! hardware-object (`wasHwo`) bypass for those lives in the memory
//! controller, which knows the resolved data pointer this cache never sees.

use super::advance_victim;
use crate::snoop::SnoopMessage;

pub const LINES: usize = 16;
/// Slots per line — only `field_index < FIELD_SLOTS` is cacheable.
pub const FIELD_SLOTS: usize = 8;

#[derive(Clone, Copy, Debug, Default)]
struct Line {
    handle: u32,
    /// Bit `i` set means slot `i` holds valid data for `handle`.
    valid_bits: u8,
    data: [u32; FIELD_SLOTS],
}

pub struct ObjectCache {
    lines: [Line; LINES],
    next_victim: usize,
}

/// `true` if `field_index` falls inside the cacheable window.
pub fn is_cacheable_field(field_index: u8) -> bool {
    (field_index as usize) < FIELD_SLOTS
}

impl ObjectCache {
    pub fn new() -> Self {
        Self {
            lines: [Line::default(); LINES],
            next_victim: 0,
        }
    }

    fn find_line(&self, handle: u32) -> Option<&Line> {
        self.lines.iter().find(|l| l.valid_bits != 0 && l.handle == handle)
    }

    fn find_line_mut(&mut self, handle: u32) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.valid_bits != 0 && l.handle == handle)
    }

    /// Look up a field. Fields outside the cacheable window never hit — the
    /// caller routes those through the hardware-object bypass instead.
    pub fn lookup(&self, handle: u32, field_index: u8) -> Option<u32> {
        if handle == 0 || !is_cacheable_field(field_index) {
            return None;
        }
        let line = self.find_line(handle)?;
        let bit = 1 << field_index;
        (line.valid_bits & bit != 0).then(|| line.data[field_index as usize])
    }

    /// Fill one slot of `handle`'s line. If another handle already occupies
    /// a victim-eligible line it's evicted wholesale; if `handle` already
    /// has a line (a different field of the same object was cached
    /// earlier), the slot is just added to it instead of consuming a new
    /// victim.
    pub fn insert(&mut self, handle: u32, field_index: u8, data: u32) {
        if handle == 0 || !is_cacheable_field(field_index) {
            return;
        }
        let bit = 1 << field_index;
        if let Some(line) = self.find_line_mut(handle) {
            line.valid_bits |= bit;
            line.data[field_index as usize] = data;
            return;
        }
        let line = &mut self.lines[self.next_victim];
        if line.valid_bits != 0 {
            log::trace!(
                "object cache: evicting line {} ({:#x}) for {handle:#x}",
                self.next_victim,
                line.handle
            );
        }
        *line = Line {
            handle,
            valid_bits: bit,
            data: [0; FIELD_SLOTS],
        };
        line.data[field_index as usize] = data;
        advance_victim(&mut self.next_victim, LINES);
    }

    /// Write-through update: a `putfield` to a cached slot updates it in
    /// place without consuming a victim slot or touching the FIFO pointer.
    /// A slot that isn't yet cached is left alone (spec.md §5: write-through
    /// never fills).
    pub fn write_through(&mut self, handle: u32, field_index: u8, data: u32) {
        if !is_cacheable_field(field_index) {
            return;
        }
        if let Some(line) = self.find_line_mut(handle) {
            let bit = 1 << field_index;
            if line.valid_bits & bit != 0 {
                line.data[field_index as usize] = data;
            }
        }
    }

    /// Apply a snoop-bus message from another core: invalidate just the
    /// matching slot, not the whole line (spec.md §6 "cross-core snoop
    /// invalidation").
    pub fn apply_snoop(&mut self, msg: &SnoopMessage) {
        if let SnoopMessage::ObjectFieldStore { handle, field_index } = *msg {
            if let Some(line) = self.find_line_mut(handle) {
                let bit = 1 << field_index;
                if line.valid_bits & bit != 0 {
                    log::trace!("object cache: snoop invalidated ({handle:#x}, {field_index})");
                    line.valid_bits &= !bit;
                }
            }
        }
    }
}

impl Default for ObjectCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit() {
        let mut cache = ObjectCache::new();
        assert!(cache.lookup(7, 2).is_none());
        cache.insert(7, 2, 0xABCD);
        assert_eq!(cache.lookup(7, 2), Some(0xABCD));
    }

    #[test]
    fn field_outside_cacheable_window_never_cached() {
        let mut cache = ObjectCache::new();
        cache.insert(7, 8, 0xABCD);
        assert!(cache.lookup(7, 8).is_none());
    }

    #[test]
    fn second_field_of_same_object_shares_the_line() {
        let mut cache = ObjectCache::new();
        cache.insert(7, 0, 0x11);
        cache.insert(7, 1, 0x22);
        assert_eq!(cache.lookup(7, 0), Some(0x11));
        assert_eq!(cache.lookup(7, 1), Some(0x22));
    }

    #[test]
    fn write_through_updates_without_eviction() {
        let mut cache = ObjectCache::new();
        cache.insert(7, 2, 1);
        cache.write_through(7, 2, 99);
        assert_eq!(cache.lookup(7, 2), Some(99));
    }

    #[test]
    fn write_through_does_not_fill_an_uncached_slot() {
        let mut cache = ObjectCache::new();
        cache.insert(7, 2, 1);
        cache.write_through(7, 3, 99);
        assert!(cache.lookup(7, 3).is_none());
    }

    #[test]
    fn snoop_invalidates_only_the_matching_slot() {
        let mut cache = ObjectCache::new();
        cache.insert(7, 2, 1);
        cache.insert(7, 3, 2);
        cache.apply_snoop(&SnoopMessage::ObjectFieldStore { handle: 7, field_index: 2 });
        assert!(cache.lookup(7, 2).is_none());
        assert_eq!(cache.lookup(7, 3), Some(2));
    }

    #[test]
    fn fifo_evicts_oldest_handle_after_wraparound() {
        let mut cache = ObjectCache::new();
        for h in 1..=LINES as u32 {
            cache.insert(h, 0, h * 0x100);
        }
        assert!(cache.lookup(1, 0).is_some());
        cache.insert(LINES as u32 + 1, 0, 0xFF00);
        assert!(cache.lookup(1, 0).is_none());
        assert!(cache.lookup(2, 0).is_some());
    }
}
