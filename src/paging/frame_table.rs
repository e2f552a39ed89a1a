/**********************************************
  > File Name		: frame_table.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sat 15 May 2021 10:41:09 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * The global frame table.
 *
 * One entry per physical frame, shared by all processes. An entry
 * records which (process, page) pair occupies the frame, so the
 * resolver can find the page table to update when the frame is
 * taken away from its owner.
 *
 * Frames are handed out lowest id first.
 */

use log::debug;

use super::{FrameId, PageNumber, ProcessId};
use crate::errors::PagerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTableEntry {
    pub free: bool,
    pub owner: Option<(ProcessId, PageNumber)>,
}

impl FrameTableEntry {
    fn new() -> Self {
        FrameTableEntry {
            free: true,
            owner: None,
        }
    }
}

#[derive(Debug)]
pub struct FrameTable {
    entries: Vec<FrameTableEntry>,
    num_free: usize,
}

impl FrameTable {
    pub fn new(num_frames: usize) -> Self {
        debug!("frame table with {} frames", num_frames);
        FrameTable {
            entries: vec![FrameTableEntry::new(); num_frames],
            num_free: num_frames,
        }
    }

    pub fn num_frames(&self) -> usize {
        self.entries.len()
    }

    pub fn num_free(&self) -> usize {
        self.num_free
    }

    pub fn allocate(&mut self, pid: ProcessId, page: PageNumber) -> Result<FrameId, PagerError> {
        if self.num_free == 0 {
            return Err(PagerError::NoFreeFrame);
        }
        let frame = match self.entries.iter().position(|e| e.free) {
            None => return Err(PagerError::NoFreeFrame),
            Some(v) => v,
        };
        self.entries[frame] = FrameTableEntry {
            free: false,
            owner: Some((pid, page)),
        };
        self.num_free -= 1;
        Ok(frame)
    }

    /*
     * The owning page table entry must already be invalidated.
     * Freeing a free frame is a no-op.
     */
    pub fn free(&mut self, frame: FrameId) {
        let entry = &mut self.entries[frame];
        if entry.free {
            return;
        }
        entry.free = true;
        entry.owner = None;
        self.num_free += 1;
    }

    /*
     * Hand an occupied frame over to a new owner without
     * passing through the free state.
     */
    pub fn reassign(&mut self, frame: FrameId, pid: ProcessId, page: PageNumber) -> Result<(), PagerError> {
        let entry = &mut self.entries[frame];
        if entry.free {
            return Err(PagerError::FrameFree(frame));
        }
        entry.owner = Some((pid, page));
        Ok(())
    }

    pub fn owner_of(&self, frame: FrameId) -> Result<(ProcessId, PageNumber), PagerError> {
        match self.entries.get(frame) {
            Some(FrameTableEntry { free: false, owner: Some(owner) }) => Ok(*owner),
            _ => Err(PagerError::FrameFree(frame)),
        }
    }

    pub fn is_free(&self, frame: FrameId) -> bool {
        self.entries.get(frame).map_or(true, |e| e.free)
    }

    pub fn frames_owned_by(&self, pid: ProcessId) -> Vec<FrameId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e.owner, Some((owner, _)) if owner == pid))
            .map(|(frame, _)| frame)
            .collect()
    }

    pub fn entries(&self) -> &[FrameTableEntry] {
        &self.entries
    }
}
