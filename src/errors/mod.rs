/**********************************************
  > File Name		: errors.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Tue 02 Mar 2021 11:05:17 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Define the error enum for global usage.
 */

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::paging::{FrameId, PageNumber, ProcessId};

#[derive(Debug, Error)]
pub enum PagerError {
    #[error("page table must hold at least one page")]
    InvalidSize,
    #[error("page {page} is out of range for process {pid} ({num_pages} pages)")]
    OutOfRange {
        pid: ProcessId,
        page: PageNumber,
        num_pages: usize,
    },
    //expected when memory is full, the resolver evicts instead.
    #[error("no free frame")]
    NoFreeFrame,
    #[error("no occupied frame to evict")]
    NoVictim,
    //a bookkeeping bug if it ever reaches the caller.
    #[error("frame {0} is free")]
    FrameFree(FrameId),
    #[error("backing store {path:?}: {source}")]
    BackingStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("resource file {path:?}: {source}")]
    ResourceFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown process {0}")]
    UnknownProcess(ProcessId),
    #[error("process {0} is already admitted")]
    ProcessExists(ProcessId),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("address {vaddr:#x} of process {pid} is outside the virtual address space")]
    AddressOutOfRange { pid: ProcessId, vaddr: u64 },
    #[error("offset {offset} with length {len} does not fit in a page of {page_size} bytes")]
    OffsetOutOfPage {
        offset: usize,
        len: usize,
        page_size: usize,
    },
    #[error("process {pid} has no handle {handle}")]
    UnknownHandle { pid: ProcessId, handle: usize },
    #[error("tables are inconsistent: {0}")]
    Inconsistent(String),
    #[error("pager lock poisoned")]
    LockPoisoned,
}

impl PagerError {
    /*
     * Only backing store failures are worth a retry, everything
     * else is either a caller error or a bookkeeping bug.
     */
    pub fn is_retryable(&self) -> bool {
        matches!(self, PagerError::BackingStore { .. })
    }
}

/*
 * Errors of a malformed access trace line.
 */
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("missing {what} in {line:?}")]
    MissingField { what: &'static str, line: String },
    #[error("invalid {what} {token:?} in {line:?}")]
    InvalidNumber {
        what: &'static str,
        token: String,
        line: String,
    },
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("trailing tokens in {0:?}")]
    TrailingTokens(String),
}
