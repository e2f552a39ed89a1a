/**********************************************
  > File Name		: config.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sat 15 May 2021 09:12:40 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Tunables of the simulated machine.
 *
 * The physical memory size and the page size together decide how
 * many frames the global frame table holds. Nothing else in the
 * pager is sized up front: page tables are sized per process at
 * admission.
 */

use std::path::{Path, PathBuf};

use crate::errors::PagerError;
use crate::paging::ProcessId;

pub const PAGE_SIZE: usize = 4096;
pub const PHYSICAL_MEMORY_SIZE: usize = 1 << 30;
pub const VIRTUAL_MEMORY_SIZE: u64 = 1 << 32;
pub const MAX_FRAMES: usize = PHYSICAL_MEMORY_SIZE / PAGE_SIZE;

#[derive(Debug, Clone)]
pub struct PagerConfig {
    pub page_size: usize,
    pub physical_memory_size: usize,
    pub backing_dir: PathBuf, //where process_<pid>_*.bin files live.
}

impl Default for PagerConfig {
    fn default() -> Self {
        PagerConfig {
            page_size: PAGE_SIZE,
            physical_memory_size: PHYSICAL_MEMORY_SIZE,
            backing_dir: PathBuf::from("."),
        }
    }
}

impl PagerConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_physical_memory_size(mut self, size: usize) -> Self {
        self.physical_memory_size = size;
        self
    }

    /*
     * Size physical memory by frame count instead of bytes.
     * Must be called after the page size is settled.
     */
    pub fn with_frames(mut self, frames: usize) -> Self {
        self.physical_memory_size = frames.saturating_mul(self.page_size);
        self
    }

    pub fn with_backing_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.backing_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn num_frames(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.physical_memory_size / self.page_size
    }

    pub fn validate(&self) -> Result<(), PagerError> {
        if self.page_size == 0 {
            return Err(PagerError::InvalidConfig(String::from("page size is zero")));
        }
        if self.num_frames() == 0 {
            return Err(PagerError::InvalidConfig(format!(
                "physical memory of {} bytes holds no page of {} bytes",
                self.physical_memory_size, self.page_size
            )));
        }
        Ok(())
    }

    pub fn executable_path(&self, pid: ProcessId) -> PathBuf {
        self.backing_dir.join(format!("process_{}_executable.bin", pid))
    }

    pub fn swap_path(&self, pid: ProcessId) -> PathBuf {
        self.backing_dir.join(format!("process_{}_swap.bin", pid))
    }
}

/*
 * Number of pages a process of `process_memory` bytes needs,
 * rounded up to whole pages.
 */
pub fn pages_needed(process_memory: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    process_memory / page_size + (process_memory % page_size != 0) as usize
}
