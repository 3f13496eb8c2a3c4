//! C8: method cache (spec.md §5 "Method Cache") — caches the bytecode
//! extent of a previously invoked method so a later invoke of the same
//! method skips the BC_FILL sequence in the memory controller.

use super::advance_victim;

pub const LINES: usize = 16;

#[derive(Clone, Copy, Debug, Default)]
struct Line {
    tag: u32,
    valid: bool,
    base_addr: u32,
    length_words: u16,
}

pub struct MethodCache {
    lines: [Line; LINES],
    next_victim: usize,
}

/// What a hit returns: where the method's bytecode already lives in JBC
/// RAM, so C11 can skip straight to dispatch instead of BC_FILL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodLocation {
    pub base_addr: u32,
    pub length_words: u16,
}

impl MethodCache {
    pub fn new() -> Self {
        Self {
            lines: [Line::default(); LINES],
            next_victim: 0,
        }
    }

    /// Look up a method by its handle (the method's object reference).
    /// Tag `0` never hits, regardless of `valid` (spec.md §5 resolved open
    /// question: the zero handle is reserved and cannot be a legitimate
    /// method tag).
    pub fn lookup(&self, handle: u32) -> Option<MethodLocation> {
        if handle == 0 {
            return None;
        }
        self.lines
            .iter()
            .find(|l| l.valid && l.tag == handle)
            .map(|l| MethodLocation {
                base_addr: l.base_addr,
                length_words: l.length_words,
            })
    }

    /// Insert a freshly filled method into the FIFO victim line. Advances
    /// the victim pointer exactly once, as this is only ever called on a
    /// confirmed miss.
    pub fn insert(&mut self, handle: u32, base_addr: u32, length_words: u16) {
        let line = &mut self.lines[self.next_victim];
        if line.valid {
            log::trace!(
                "method cache: evicting line {} (tag {:#x}) for tag {handle:#x}",
                self.next_victim,
                line.tag
            );
        }
        *line = Line {
            tag: handle,
            valid: true,
            base_addr,
            length_words,
        };
        log::trace!("method cache: filled line {} with tag {handle:#x}", self.next_victim);
        advance_victim(&mut self.next_victim, LINES);
    }

    /// Flush the whole cache (e.g. on a GC compaction that may move method
    /// bodies, spec.md §6 GC copy).
    pub fn invalidate_all(&mut self) {
        log::debug!("method cache: invalidated by GC copy");
        for l in &mut self.lines {
            l.valid = false;
        }
    }
}

impl Default for MethodCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_then_hit_after_insert() {
        let mut cache = MethodCache::new();
        assert!(cache.lookup(42).is_none());
        cache.insert(42, 0x1000, 64);
        assert_eq!(
            cache.lookup(42),
            Some(MethodLocation {
                base_addr: 0x1000,
                length_words: 64
            })
        );
    }

    #[test]
    fn zero_tag_never_hits() {
        let mut cache = MethodCache::new();
        cache.insert(0, 0x2000, 8);
        assert!(cache.lookup(0).is_none());
    }

    #[test]
    fn fifo_evicts_oldest_after_wraparound() {
        let mut cache = MethodCache::new();
        for h in 1..=LINES as u32 {
            cache.insert(h, h * 0x100, 1);
        }
        assert!(cache.lookup(1).is_some());
        // One more insert evicts handle 1, the oldest line.
        cache.insert(LINES as u32 + 1, 0xFF00, 1);
        assert!(cache.lookup(1).is_none());
        assert!(cache.lookup(2).is_some());
    }
}
