//! C10: array element cache (spec.md §5 "Array Cache"). A line holds the 4
//! elements of one 4-word-aligned group, keyed by the handle and the index's
//! upper bits (`index >> 2`); a miss bursts the whole group in one fill
//! instead of caching a single element at a time. A fill can be in flight (a
//! multi-cycle memory-controller round trip) when a snoop invalidation for
//! the same line arrives from another core — the snooped store is newer
//! than the fill data in that case, so the fill result must be discarded
//! rather than committed (Design Note 7 / spec.md §6 "array-cache
//! snoop-during-fill rule"). Snoop invalidation is line-granular: any store
//! to an element in the group invalidates the whole group, not just the
//! stored slot.

use super::advance_victim;
use crate::snoop::SnoopMessage;

pub const LINES: usize = 16;
/// Elements per line.
pub const GROUP_SIZE: u32 = 4;

fn group_tag(index: u32) -> u32 {
    index >> 2
}

fn slot(index: u32) -> usize {
    (index & (GROUP_SIZE - 1)) as usize
}

#[derive(Clone, Copy, Debug, Default)]
struct Line {
    handle: u32,
    group_tag: u32,
    /// Bit `i` set means slot `i` holds valid data.
    valid_bits: u8,
    data: [u32; GROUP_SIZE as usize],
}

pub struct ArrayCache {
    lines: [Line; LINES],
    next_victim: usize,
    /// `(handle, group_tag)` of a fill currently in flight, if any.
    pending_fill: Option<(u32, u32)>,
    /// Set if a snoop for `pending_fill`'s group arrived before the fill
    /// completed; the next `complete_fill` then discards instead of
    /// committing.
    fill_discarded: bool,
}

impl ArrayCache {
    pub fn new() -> Self {
        Self {
            lines: [Line::default(); LINES],
            next_victim: 0,
            pending_fill: None,
            fill_discarded: false,
        }
    }

    fn find_line(&self, handle: u32, tag: u32) -> Option<&Line> {
        self.lines
            .iter()
            .find(|l| l.valid_bits != 0 && l.handle == handle && l.group_tag == tag)
    }

    fn find_line_mut(&mut self, handle: u32, tag: u32) -> Option<&mut Line> {
        self.lines
            .iter_mut()
            .find(|l| l.valid_bits != 0 && l.handle == handle && l.group_tag == tag)
    }

    pub fn lookup(&self, handle: u32, index: u32) -> Option<u32> {
        if handle == 0 {
            return None;
        }
        let line = self.find_line(handle, group_tag(index))?;
        let s = slot(index);
        (line.valid_bits & (1 << s) != 0).then(|| line.data[s])
    }

    /// Begin a fill for a miss. Call once per miss, before issuing the
    /// memory-controller burst read of the whole 4-word group.
    pub fn start_fill(&mut self, handle: u32, index: u32) {
        self.pending_fill = Some((handle, group_tag(index)));
        self.fill_discarded = false;
    }

    /// Complete a fill once all 4 words of the group have come back from the
    /// memory controller. If a snoop for the same group arrived while the
    /// fill was in flight, the line is left uncached rather than committed
    /// with stale data.
    pub fn complete_fill(&mut self, handle: u32, words: [u32; GROUP_SIZE as usize]) {
        let Some((pending_handle, tag)) = self.pending_fill.take() else {
            return;
        };
        debug_assert_eq!(pending_handle, handle);
        if self.fill_discarded {
            log::debug!("array cache: discarding stale fill for ({handle:#x}, group {tag})");
            self.fill_discarded = false;
            return;
        }
        let line = &mut self.lines[self.next_victim];
        if line.valid_bits != 0 {
            log::trace!(
                "array cache: evicting line {} ({:#x}, group {}) for ({handle:#x}, group {tag})",
                self.next_victim,
                line.handle,
                line.group_tag
            );
        }
        *line = Line {
            handle,
            group_tag: tag,
            valid_bits: 0b1111,
            data: words,
        };
        advance_victim(&mut self.next_victim, LINES);
    }

    pub fn write_through(&mut self, handle: u32, index: u32, data: u32) {
        let tag = group_tag(index);
        if let Some(line) = self.find_line_mut(handle, tag) {
            let s = slot(index);
            if line.valid_bits & (1 << s) != 0 {
                line.data[s] = data;
            }
        }
    }

    /// Apply a snoop-bus message: invalidate the whole resident group, or
    /// mark an in-flight fill for the same group to be discarded on
    /// completion.
    pub fn apply_snoop(&mut self, msg: &SnoopMessage) {
        if let SnoopMessage::ArrayStore { handle, index } = *msg {
            let tag = group_tag(index);
            if let Some(line) = self.find_line_mut(handle, tag) {
                log::trace!("array cache: snoop invalidated ({handle:#x}, group {tag})");
                line.valid_bits = 0;
            }
            if self.pending_fill == Some((handle, tag)) {
                self.fill_discarded = true;
            }
        }
    }
}

impl Default for ArrayCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_fill_then_hit() {
        let mut cache = ArrayCache::new();
        assert!(cache.lookup(3, 10).is_none());
        cache.start_fill(3, 10);
        cache.complete_fill(3, [100, 101, 777, 103]);
        assert_eq!(cache.lookup(3, 10), Some(777));
    }

    #[test]
    fn a_single_miss_fills_all_four_elements_of_the_group() {
        let mut cache = ArrayCache::new();
        cache.start_fill(3, 9);
        cache.complete_fill(3, [10, 11, 12, 13]);
        assert_eq!(cache.lookup(3, 8), Some(10));
        assert_eq!(cache.lookup(3, 9), Some(11));
        assert_eq!(cache.lookup(3, 10), Some(12));
        assert_eq!(cache.lookup(3, 11), Some(13));
    }

    #[test]
    fn different_group_of_same_handle_misses() {
        let mut cache = ArrayCache::new();
        cache.start_fill(3, 1);
        cache.complete_fill(3, [1, 2, 3, 4]);
        assert!(cache.lookup(3, 5).is_none());
    }

    #[test]
    fn snoop_during_fill_discards_stale_data() {
        let mut cache = ArrayCache::new();
        cache.start_fill(3, 10);
        cache.apply_snoop(&SnoopMessage::ArrayStore { handle: 3, index: 10 });
        cache.complete_fill(3, [0, 0, 777, 0]);
        assert!(cache.lookup(3, 10).is_none());
    }

    #[test]
    fn snoop_for_different_group_does_not_discard() {
        let mut cache = ArrayCache::new();
        cache.start_fill(3, 10);
        cache.apply_snoop(&SnoopMessage::ArrayStore { handle: 3, index: 20 });
        cache.complete_fill(3, [0, 0, 777, 0]);
        assert_eq!(cache.lookup(3, 10), Some(777));
    }

    #[test]
    fn snoop_invalidates_the_whole_group_not_just_the_stored_slot() {
        let mut cache = ArrayCache::new();
        cache.start_fill(3, 8);
        cache.complete_fill(3, [1, 2, 3, 4]);
        cache.apply_snoop(&SnoopMessage::ArrayStore { handle: 3, index: 9 });
        assert!(cache.lookup(3, 8).is_none());
        assert!(cache.lookup(3, 9).is_none());
    }
}
