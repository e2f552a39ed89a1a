/**********************************************
  > File Name		: pager.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sun 16 May 2021 02:55:16 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * The pager resolves memory accesses of all resident processes
 * against one pool of physical frames.
 *
 * Accessing a page requires it to be resident in a frame. When it
 * is not, the pager claims a free frame, or takes the least recently
 * used one away from its owner. A page taken away is copied to its
 * process's swap file if and only if it is modified, and comes back
 * from there the next time it is faulted in.
 *
 * The pager is the only one allowed to touch the frame table and the
 * LRU tracker. Page tables, frame table and LRU are changed together
 * in one step after all file I/O of a fault succeeded, a failed fault
 * leaves them as they were.
 */

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;

use log::{debug, info, warn};

use super::backing_store::BackingStore;
use super::frame_table::FrameTable;
use super::lru::{LogicalClock, LruTracker};
use super::page_table::{PageTable, PageTableEntry};
use super::physical_memory::PhysicalMemory;
use super::{FrameId, PageNumber, ProcessId};
use crate::config::{pages_needed, PagerConfig, VIRTUAL_MEMORY_SIZE};
use crate::errors::PagerError;
use crate::process::resources::{ReleasedResources, ResourceTracker};

/*
 * How an access was satisfied.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Hit {
        frame: FrameId,
    },
    //faulted into a free frame.
    Loaded {
        frame: FrameId,
    },
    //faulted into a frame taken from `victim`.
    Replaced {
        frame: FrameId,
        victim: (ProcessId, PageNumber),
        written_back: bool,
    },
}

impl Resolution {
    pub fn frame(&self) -> FrameId {
        match *self {
            Resolution::Hit { frame } => frame,
            Resolution::Loaded { frame } => frame,
            Resolution::Replaced { frame, .. } => frame,
        }
    }

    pub fn is_fault(&self) -> bool {
        !matches!(self, Resolution::Hit { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagerStats {
    pub hits: u64,
    pub faults: u64,
    pub evictions: u64,
    pub writebacks: u64,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TerminationReport {
    pub frames_freed: usize,
    pub released: ReleasedResources,
}

#[derive(Debug)]
struct Process {
    page_table: PageTable,
    store: BackingStore,
}

#[derive(Debug)]
pub struct Pager {
    config: PagerConfig,
    frame_table: FrameTable,
    lru: LruTracker,
    memory: PhysicalMemory,
    processes: HashMap<ProcessId, Process>,
    resources: ResourceTracker,
    stats: PagerStats,
}

impl Pager {
    pub fn new(config: PagerConfig) -> Result<Self, PagerError> {
        config.validate()?;
        let num_frames = config.num_frames();
        info!(
            "pager with {} frames of {} bytes, backing files in {:?}",
            num_frames, config.page_size, config.backing_dir
        );
        Ok(Pager {
            frame_table: FrameTable::new(num_frames),
            lru: LruTracker::new(num_frames),
            memory: PhysicalMemory::new(num_frames, config.page_size),
            processes: HashMap::new(),
            resources: ResourceTracker::new(),
            stats: PagerStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    pub fn stats(&self) -> PagerStats {
        self.stats
    }

    pub fn clock(&self) -> LogicalClock {
        self.lru.clock()
    }

    pub fn frame_table(&self) -> &FrameTable {
        &self.frame_table
    }

    pub fn lru(&self) -> &LruTracker {
        &self.lru
    }

    pub fn resources(&self) -> &ResourceTracker {
        &self.resources
    }

    pub fn page_table(&self, pid: ProcessId) -> Result<&PageTable, PagerError> {
        Ok(&self.process(pid)?.page_table)
    }

    pub fn is_admitted(&self, pid: ProcessId) -> bool {
        self.processes.contains_key(&pid)
    }

    /*
     * Current content of a frame. Empty if nothing was ever
     * loaded into it.
     */
    pub fn frame_data(&self, frame: FrameId) -> &[u8] {
        self.memory.frame(frame)
    }

    fn process(&self, pid: ProcessId) -> Result<&Process, PagerError> {
        self.processes.get(&pid).ok_or(PagerError::UnknownProcess(pid))
    }

    fn process_mut(&mut self, pid: ProcessId) -> Result<&mut Process, PagerError> {
        self.processes.get_mut(&pid).ok_or(PagerError::UnknownProcess(pid))
    }

    /*
     * Admission.
     */

    /*
     * Page table for `pid`, backed by process_<pid>_executable.bin
     * and process_<pid>_swap.bin in the backing directory.
     */
    pub fn init_page_table(&mut self, pid: ProcessId, num_pages: usize) -> Result<(), PagerError> {
        let store = BackingStore::new(
            self.config.executable_path(pid),
            self.config.swap_path(pid),
            self.config.page_size,
        );
        self.init_page_table_with_store(pid, num_pages, store)
    }

    pub fn init_page_table_with_store(
        &mut self,
        pid: ProcessId,
        num_pages: usize,
        store: BackingStore,
    ) -> Result<(), PagerError> {
        if self.processes.contains_key(&pid) {
            return Err(PagerError::ProcessExists(pid));
        }
        let page_table = PageTable::init(pid, num_pages)?;
        debug!("page table of process {} holds {} pages", pid, num_pages);
        self.processes.insert(pid, Process { page_table, store });
        Ok(())
    }

    pub fn allocate_resources(&mut self, pid: ProcessId) -> Result<(), PagerError> {
        self.resources.allocate_resources(pid)
    }

    /*
     * Admit a process of `process_memory` bytes: page table sized
     * to whole pages plus an empty resource record. A process never
     * needs more than the virtual address space.
     */
    pub fn admit(&mut self, pid: ProcessId, process_memory: usize) -> Result<(), PagerError> {
        if process_memory as u64 > VIRTUAL_MEMORY_SIZE {
            return Err(PagerError::InvalidSize);
        }
        let num_pages = pages_needed(process_memory, self.page_size());
        let store = BackingStore::new(
            self.config.executable_path(pid),
            self.config.swap_path(pid),
            self.config.page_size,
        );
        self.admit_with_store(pid, num_pages, store)
    }

    pub fn admit_with_store(
        &mut self,
        pid: ProcessId,
        num_pages: usize,
        store: BackingStore,
    ) -> Result<(), PagerError> {
        if self.resources.contains(pid) {
            return Err(PagerError::ProcessExists(pid));
        }
        self.init_page_table_with_store(pid, num_pages, store)?;
        self.resources.allocate_resources(pid)?;
        info!("admitted process {} with {} pages", pid, num_pages);
        Ok(())
    }

    pub fn allocate_block(&mut self, pid: ProcessId, size: usize) -> Result<usize, PagerError> {
        self.resources.allocate_block(pid, size)
    }

    pub fn open_file<P: AsRef<Path>>(
        &mut self,
        pid: ProcessId,
        path: P,
        options: &OpenOptions,
    ) -> Result<usize, PagerError> {
        self.resources.open_file(pid, path, options)
    }

    /*
     * Fault resolution.
     */

    pub fn resolve(
        &mut self,
        pid: ProcessId,
        page: PageNumber,
        is_write: bool,
    ) -> Result<Resolution, PagerError> {
        let entry = *self.process(pid)?.page_table.lookup(page)?;

        if entry.valid {
            let frame = match entry.frame {
                Some(v) => v,
                None => {
                    return Err(PagerError::Inconsistent(format!(
                        "valid page {} of process {} has no frame",
                        page, pid
                    )))
                }
            };
            self.lru.touch(frame);
            if is_write {
                self.process_mut(pid)?.page_table.mark_write(page)?;
            }
            self.stats.hits += 1;
            debug!("page {} of process {} hit in frame {}", page, pid, frame);
            return Ok(Resolution::Hit { frame });
        }

        debug!("page fault on page {} of process {}", page, pid);
        let res = match self.frame_table.allocate(pid, page) {
            Ok(frame) => self.load_free(pid, page, &entry, frame, is_write),
            Err(PagerError::NoFreeFrame) => {
                debug!("no free frame");
                self.evict_and_load(pid, page, &entry, is_write)
            }
            Err(e) => Err(e),
        };
        match &res {
            Ok(_) => self.stats.faults += 1,
            Err(e) => warn!("page {} of process {} not resolved: {}", page, pid, e),
        }
        res
    }

    /*
     * Read the incoming page into a scratch buffer, nothing is
     * changed if that fails.
     */
    fn fetch(&mut self, pid: ProcessId, page: PageNumber, in_swap: bool) -> Result<Vec<u8>, PagerError> {
        let mut buf = vec![0; self.page_size()];
        self.process_mut(pid)?.store.load(page, in_swap, &mut buf)?;
        Ok(buf)
    }

    fn install(
        &mut self,
        pid: ProcessId,
        page: PageNumber,
        frame: FrameId,
        data: &[u8],
        is_write: bool,
    ) -> Result<(), PagerError> {
        self.memory.load(frame, data);
        let page_table = &mut self.process_mut(pid)?.page_table;
        page_table.mark_resident(page, frame)?;
        if is_write {
            page_table.mark_write(page)?;
        }
        self.lru.touch(frame);
        Ok(())
    }

    fn load_free(
        &mut self,
        pid: ProcessId,
        page: PageNumber,
        entry: &PageTableEntry,
        frame: FrameId,
        is_write: bool,
    ) -> Result<Resolution, PagerError> {
        let data = match self.fetch(pid, page, entry.in_swap) {
            Ok(v) => v,
            Err(e) => {
                //give the claimed frame back.
                self.frame_table.free(frame);
                return Err(e);
            }
        };
        self.install(pid, page, frame, &data, is_write)?;
        debug!("loaded page {} of process {} into free frame {}", page, pid, frame);
        Ok(Resolution::Loaded { frame })
    }

    fn evict_and_load(
        &mut self,
        pid: ProcessId,
        page: PageNumber,
        entry: &PageTableEntry,
        is_write: bool,
    ) -> Result<Resolution, PagerError> {
        let frame_table = &self.frame_table;
        let victim = self.lru.select_victim(|f| !frame_table.is_free(f))?;
        let (old_pid, old_page) = self.frame_table.owner_of(victim)?;
        let old_entry = *self.process(old_pid)?.page_table.lookup(old_page)?;
        debug!(
            "victim frame {} holds page {} of process {} (last used {})",
            victim,
            old_page,
            old_pid,
            self.lru.last_used(victim)
        );

        let written_back = if old_entry.modified {
            let old = self
                .processes
                .get_mut(&old_pid)
                .ok_or(PagerError::UnknownProcess(old_pid))?;
            old.store.write_back(old_page, self.memory.frame(victim))?;
            old.page_table.mark_swapped(old_page)?;
            self.stats.writebacks += 1;
            true
        } else {
            false
        };

        //the victim stays resident if the incoming page cannot be read.
        let data = self.fetch(pid, page, entry.in_swap)?;

        self.process_mut(old_pid)?.page_table.mark_evicted(old_page)?;
        self.frame_table.reassign(victim, pid, page)?;
        self.install(pid, page, victim, &data, is_write)?;
        self.stats.evictions += 1;
        debug!(
            "frame {} now holds page {} of process {}",
            victim, page, pid
        );
        Ok(Resolution::Replaced {
            frame: victim,
            victim: (old_pid, old_page),
            written_back,
        })
    }

    /*
     * Byte level access.
     */

    fn check_span(&self, offset: usize, len: usize) -> Result<(), PagerError> {
        let page_size = self.page_size();
        if offset.checked_add(len).map_or(true, |end| end > page_size) {
            return Err(PagerError::OffsetOutOfPage {
                offset,
                len,
                page_size,
            });
        }
        Ok(())
    }

    pub fn read(
        &mut self,
        pid: ProcessId,
        page: PageNumber,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<Resolution, PagerError> {
        self.check_span(offset, buf.len())?;
        let res = self.resolve(pid, page, false)?;
        let end = offset + buf.len();
        buf.copy_from_slice(&self.memory.frame(res.frame())[offset..end]);
        Ok(res)
    }

    pub fn write(
        &mut self,
        pid: ProcessId,
        page: PageNumber,
        offset: usize,
        data: &[u8],
    ) -> Result<Resolution, PagerError> {
        self.check_span(offset, data.len())?;
        let res = self.resolve(pid, page, true)?;
        let end = offset + data.len();
        self.memory.frame_mut(res.frame())[offset..end].copy_from_slice(data);
        Ok(res)
    }

    /*
     * Resolve a virtual address, returns the offset within the page
     * alongside.
     */
    pub fn access_address(
        &mut self,
        pid: ProcessId,
        vaddr: u64,
        is_write: bool,
    ) -> Result<(Resolution, usize), PagerError> {
        if vaddr >= VIRTUAL_MEMORY_SIZE {
            return Err(PagerError::AddressOutOfRange { pid, vaddr });
        }
        let page_size = self.page_size() as u64;
        let page = (vaddr / page_size) as PageNumber;
        let offset = (vaddr % page_size) as usize;
        let res = self.resolve(pid, page, is_write)?;
        Ok((res, offset))
    }

    /*
     * Termination.
     *
     * Frames go back to the pool first, without write-back, then the
     * page table is dropped, then the tracked resources.
     */
    pub fn terminate(&mut self, pid: ProcessId) -> Result<TerminationReport, PagerError> {
        if !self.processes.contains_key(&pid) && !self.resources.contains(pid) {
            return Err(PagerError::UnknownProcess(pid));
        }

        let mut report = TerminationReport::default();
        if let Some(process) = self.processes.get_mut(&pid) {
            for frame in self.frame_table.frames_owned_by(pid) {
                let (_, page) = self.frame_table.owner_of(frame)?;
                process.page_table.mark_evicted(page)?;
                self.frame_table.free(frame);
                report.frames_freed += 1;
            }
        }
        if let Some(process) = self.processes.remove(&pid) {
            process.page_table.destroy();
        }
        if self.resources.contains(pid) {
            report.released = self.resources.release(pid)?;
        }
        info!(
            "terminated process {}: {} frames freed, {} blocks and {} handles released",
            pid, report.frames_freed, report.released.blocks, report.released.handles
        );
        Ok(report)
    }

    /*
     * Check that the frame table and the page tables describe the
     * same set of (frame, process, page) triples, and that invalid
     * entries point nowhere.
     */
    pub fn verify_consistency(&self) -> Result<(), PagerError> {
        for (frame, entry) in self.frame_table.entries().iter().enumerate() {
            match (entry.free, entry.owner) {
                (true, None) => {}
                (false, Some((pid, page))) => {
                    let pte = self
                        .processes
                        .get(&pid)
                        .ok_or_else(|| {
                            PagerError::Inconsistent(format!(
                                "frame {} owned by unknown process {}",
                                frame, pid
                            ))
                        })?
                        .page_table
                        .lookup(page)?;
                    if !pte.valid || pte.frame != Some(frame) {
                        return Err(PagerError::Inconsistent(format!(
                            "frame {} owned by page {} of process {}, whose entry is {:?}",
                            frame, page, pid, pte
                        )));
                    }
                }
                _ => {
                    return Err(PagerError::Inconsistent(format!(
                        "frame {} has entry {:?}",
                        frame, entry
                    )))
                }
            }
        }
        for (pid, process) in self.processes.iter() {
            for (page, pte) in process.page_table.entries().iter().enumerate() {
                match (pte.valid, pte.frame) {
                    (false, None) => {}
                    (true, Some(frame)) => {
                        if self.frame_table.owner_of(frame).ok() != Some((*pid, page)) {
                            return Err(PagerError::Inconsistent(format!(
                                "page {} of process {} claims frame {} owned by {:?}",
                                page,
                                pid,
                                frame,
                                self.frame_table.owner_of(frame).ok()
                            )));
                        }
                    }
                    _ => {
                        return Err(PagerError::Inconsistent(format!(
                            "page {} of process {} has entry {:?}",
                            page, pid, pte
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}
