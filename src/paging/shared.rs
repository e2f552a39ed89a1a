/**********************************************
  > File Name		: shared.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Tue 18 May 2021 07:36:58 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * A pager shared between threads.
 *
 * Every operation holds one global lock from lookup to commit, so no
 * thread ever sees a frame that has been reassigned while its old
 * page table entry still points at it. Backing store I/O dominates
 * a fault anyway.
 */

use std::sync::{Arc, Mutex, MutexGuard};

use super::pager::{Pager, PagerStats, Resolution, TerminationReport};
use super::{PageNumber, ProcessId};
use crate::errors::PagerError;

#[derive(Debug, Clone)]
pub struct SharedPager {
    inner: Arc<Mutex<Pager>>,
}

impl SharedPager {
    pub fn new(pager: Pager) -> Self {
        SharedPager {
            inner: Arc::new(Mutex::new(pager)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Pager>, PagerError> {
        self.inner.lock().map_err(|_| PagerError::LockPoisoned)
    }

    /*
     * Run `f` with the lock held.
     */
    pub fn with<T, F>(&self, f: F) -> Result<T, PagerError>
    where
        F: FnOnce(&mut Pager) -> Result<T, PagerError>,
    {
        let mut pager = self.lock()?;
        f(&mut pager)
    }

    pub fn admit(&self, pid: ProcessId, process_memory: usize) -> Result<(), PagerError> {
        self.lock()?.admit(pid, process_memory)
    }

    pub fn resolve(&self, pid: ProcessId, page: PageNumber, is_write: bool) -> Result<Resolution, PagerError> {
        self.lock()?.resolve(pid, page, is_write)
    }

    pub fn read(
        &self,
        pid: ProcessId,
        page: PageNumber,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<Resolution, PagerError> {
        self.lock()?.read(pid, page, offset, buf)
    }

    pub fn write(
        &self,
        pid: ProcessId,
        page: PageNumber,
        offset: usize,
        data: &[u8],
    ) -> Result<Resolution, PagerError> {
        self.lock()?.write(pid, page, offset, data)
    }

    /*
     * The caller must make sure no fault of `pid` is still running
     * on another thread.
     */
    pub fn terminate(&self, pid: ProcessId) -> Result<TerminationReport, PagerError> {
        self.lock()?.terminate(pid)
    }

    pub fn stats(&self) -> Result<PagerStats, PagerError> {
        Ok(self.lock()?.stats())
    }

    pub fn verify_consistency(&self) -> Result<(), PagerError> {
        self.lock()?.verify_consistency()
    }
}
