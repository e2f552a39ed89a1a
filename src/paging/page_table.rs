/**********************************************
  > File Name		: page_table.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sat 15 May 2021 10:03:21 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * One flat page table per process, indexed by page number.
 * The table only records where a page lives, it never touches
 * frame contents or backing files itself.
 */

use super::{FrameId, PageNumber, ProcessId};
use crate::errors::PagerError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry {
    pub frame: Option<FrameId>,
    pub valid: bool, //resident in `frame`.
    pub modified: bool,
    pub in_swap: bool, //evicted dirty at least once, the swap copy is the latest.
}

#[derive(Debug)]
pub struct PageTable {
    pid: ProcessId,
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    pub fn init(pid: ProcessId, num_pages: usize) -> Result<Self, PagerError> {
        if num_pages == 0 {
            return Err(PagerError::InvalidSize);
        }
        Ok(PageTable {
            pid,
            entries: vec![PageTableEntry::default(); num_pages],
        })
    }

    pub fn num_pages(&self) -> usize {
        self.entries.len()
    }

    fn check(&self, page: PageNumber) -> Result<(), PagerError> {
        if page >= self.entries.len() {
            return Err(PagerError::OutOfRange {
                pid: self.pid,
                page,
                num_pages: self.entries.len(),
            });
        }
        Ok(())
    }

    pub fn lookup(&self, page: PageNumber) -> Result<&PageTableEntry, PagerError> {
        self.check(page)?;
        Ok(&self.entries[page])
    }

    /*
     * The caller must already own `frame` in the frame table.
     */
    pub fn mark_resident(&mut self, page: PageNumber, frame: FrameId) -> Result<(), PagerError> {
        self.check(page)?;
        let entry = &mut self.entries[page];
        entry.valid = true;
        entry.frame = Some(frame);
        entry.modified = false;
        Ok(())
    }

    pub fn mark_write(&mut self, page: PageNumber) -> Result<(), PagerError> {
        self.check(page)?;
        self.entries[page].modified = true;
        Ok(())
    }

    pub fn mark_evicted(&mut self, page: PageNumber) -> Result<(), PagerError> {
        self.check(page)?;
        let entry = &mut self.entries[page];
        entry.valid = false;
        entry.frame = None;
        entry.modified = false;
        Ok(())
    }

    pub fn mark_swapped(&mut self, page: PageNumber) -> Result<(), PagerError> {
        self.check(page)?;
        self.entries[page].in_swap = true;
        Ok(())
    }

    /*
     * Pages currently resident, with their frames.
     */
    pub fn resident_pages(&self) -> impl Iterator<Item = (PageNumber, FrameId)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.valid)
            .filter_map(|(page, e)| e.frame.map(|f| (page, f)))
    }

    pub fn entries(&self) -> &[PageTableEntry] {
        &self.entries
    }

    /*
     * Every frame this table held must have been given back
     * to the frame table before.
     */
    pub fn destroy(self) {
        debug_assert!(
            self.entries.iter().all(|e| !e.valid),
            "page table of process {} destroyed with resident pages",
            self.pid
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_all_invalid() {
        let pt = PageTable::init(1, 4).unwrap();
        assert_eq!(pt.num_pages(), 4);
        for page in 0..4 {
            let entry = pt.lookup(page).unwrap();
            assert_eq!(*entry, PageTableEntry::default());
            assert_eq!(entry.frame, None);
        }
        assert!(matches!(PageTable::init(1, 0), Err(PagerError::InvalidSize)));
    }

    #[test]
    fn lookup_out_of_range() {
        let pt = PageTable::init(3, 2).unwrap();
        match pt.lookup(2) {
            Err(PagerError::OutOfRange { pid, page, num_pages }) => {
                assert_eq!((pid, page, num_pages), (3, 2, 2));
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn resident_write_evict() {
        let mut pt = PageTable::init(1, 3).unwrap();
        pt.mark_resident(1, 7).unwrap();
        pt.mark_write(1).unwrap();
        let entry = *pt.lookup(1).unwrap();
        assert!(entry.valid && entry.modified);
        assert_eq!(entry.frame, Some(7));
        assert_eq!(pt.resident_pages().collect::<Vec<_>>(), vec![(1, 7)]);

        pt.mark_swapped(1).unwrap();
        pt.mark_evicted(1).unwrap();
        let entry = *pt.lookup(1).unwrap();
        assert!(!entry.valid && !entry.modified);
        assert_eq!(entry.frame, None);
        assert!(entry.in_swap);
        assert_eq!(pt.resident_pages().count(), 0);
        pt.destroy();
    }
}
