/**********************************************
  > File Name		: lru.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sat 15 May 2021 02:17:53 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Least Recently Used replacement.
 *
 * Every frame carries the logical time of its last use. The clock
 * ticks once per access, hit or fault, so the eviction order only
 * depends on the access sequence.
 *
 * The tracker does not know which frames are occupied, the caller
 * tells it when asking for a victim.
 */

use super::FrameId;
use crate::errors::PagerError;

pub type LogicalClock = u64;

#[derive(Debug, Clone, Copy)]
pub struct LruEntry {
    pub frame: FrameId,
    pub last_used: LogicalClock,
}

#[derive(Debug)]
pub struct LruTracker {
    entries: Vec<LruEntry>,
    clock: LogicalClock,
}

impl LruTracker {
    pub fn new(num_frames: usize) -> Self {
        LruTracker {
            entries: (0..num_frames)
                .map(|frame| LruEntry { frame, last_used: 0 })
                .collect(),
            clock: 0,
        }
    }

    pub fn clock(&self) -> LogicalClock {
        self.clock
    }

    pub fn last_used(&self, frame: FrameId) -> LogicalClock {
        self.entries[frame].last_used
    }

    pub fn touch(&mut self, frame: FrameId) {
        self.entries[frame].last_used = self.clock;
        self.clock += 1;
    }

    /*
     * Oldest occupied frame, ties go to the lowest frame id.
     */
    pub fn select_victim<F>(&self, is_occupied: F) -> Result<FrameId, PagerError>
    where
        F: Fn(FrameId) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| is_occupied(e.frame))
            .min_by_key(|e| (e.last_used, e.frame))
            .map(|e| e.frame)
            .ok_or(PagerError::NoVictim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_ticks_per_touch() {
        let mut lru = LruTracker::new(2);
        lru.touch(0);
        lru.touch(0);
        lru.touch(1);
        assert_eq!(lru.clock(), 3);
        assert_eq!(lru.last_used(0), 1);
        assert_eq!(lru.last_used(1), 2);
    }

    #[test]
    fn victim_is_oldest_occupied() {
        let mut lru = LruTracker::new(4);
        lru.touch(2);
        lru.touch(0);
        lru.touch(1);
        lru.touch(3);
        assert_eq!(lru.select_victim(|_| true).unwrap(), 2);
        assert_eq!(lru.select_victim(|f| f != 2).unwrap(), 0);
        lru.touch(2);
        assert_eq!(lru.select_victim(|_| true).unwrap(), 0);
    }

    #[test]
    fn ties_go_to_lowest_frame() {
        let lru = LruTracker::new(3);
        assert_eq!(lru.select_victim(|f| f > 0).unwrap(), 1);
    }

    #[test]
    fn no_victim_without_occupied_frames() {
        let lru = LruTracker::new(3);
        assert!(matches!(lru.select_victim(|_| false), Err(PagerError::NoVictim)));
    }
}
