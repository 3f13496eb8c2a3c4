//! C13 (part 1): the global re-entrant lock protecting `monitorenter`/
//! `monitorexit` across cores (spec.md §4.6 "fair re-entrant mutex with a
//! pending queue").

use std::collections::VecDeque;

#[derive(Clone)]
pub struct GlobalLock {
    holder: Option<usize>,
    hold_count: u32,
    queue: VecDeque<usize>,
}

impl GlobalLock {
    pub fn new() -> Self {
        Self {
            holder: None,
            hold_count: 0,
            queue: VecDeque::new(),
        }
    }

    /// Request the lock for `core`. Re-entrant: a core that already holds it
    /// just bumps the hold count. Otherwise the core queues up (FIFO) if
    /// someone else holds it.
    pub fn request(&mut self, core: usize) {
        match self.holder {
            Some(h) if h == core => self.hold_count += 1,
            Some(_) => {
                if !self.queue.contains(&core) {
                    self.queue.push_back(core);
                }
            }
            None => {
                log::debug!("core {core} acquired the global lock uncontended");
                self.holder = Some(core);
                self.hold_count = 1;
            }
        }
    }

    /// Release one level of `core`'s hold. Only fully releases (and lets the
    /// next queued core in on the next `tick`) once the hold count hits 0.
    pub fn release(&mut self, core: usize) {
        if self.holder == Some(core) {
            self.hold_count = self.hold_count.saturating_sub(1);
            if self.hold_count == 0 {
                self.holder = None;
            }
        }
    }

    /// Hand the lock to the next queued core, if free. Call once per cycle.
    pub fn tick(&mut self) {
        if self.holder.is_none() {
            if let Some(next) = self.queue.pop_front() {
                log::debug!("core {next} granted the global lock from the wait queue");
                self.holder = Some(next);
                self.hold_count = 1;
            }
        }
    }

    pub fn held_by(&self, core: usize) -> bool {
        self.holder == Some(core)
    }

    pub fn is_free(&self) -> bool {
        self.holder.is_none()
    }
}

impl Default for GlobalLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncontended_request_grants_immediately() {
        let mut lock = GlobalLock::new();
        lock.request(0);
        lock.tick();
        assert!(lock.held_by(0));
    }

    #[test]
    fn reentrant_request_does_not_requeue_the_holder() {
        let mut lock = GlobalLock::new();
        lock.request(0);
        lock.tick();
        lock.request(0);
        lock.release(0);
        assert!(lock.held_by(0)); // one level still held
        lock.release(0);
        assert!(lock.is_free());
    }

    #[test]
    fn contended_request_waits_in_fifo_order() {
        let mut lock = GlobalLock::new();
        lock.request(0);
        lock.tick();
        lock.request(1);
        lock.request(2);

        lock.release(0);
        lock.tick();
        assert!(lock.held_by(1));

        lock.release(1);
        lock.tick();
        assert!(lock.held_by(2));
    }
}
