/**********************************************
  > File Name		: mod.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sat 15 May 2021 09:58:30 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * The paging component simulates demand paged virtual memory for
 * several processes sharing a fixed pool of physical frames.
 *
 * Each process owns a flat page table. The frame table and the LRU
 * tracker are global and only the pager changes them. Pages that
 * are not resident live in the process's executable image or, once
 * evicted while dirty, in its swap file.
 */

pub mod backing_store;
pub mod frame_table;
pub mod lru;
pub mod page_table;
pub mod pager;
pub mod physical_memory;
pub mod shared;


pub type ProcessId = u32;
pub type PageNumber = usize;
pub type FrameId = usize;
