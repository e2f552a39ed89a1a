/**********************************************
  > File Name		: backing_store.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sun 16 May 2021 09:48:27 AM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Introduction:
 *
 * Every process is backed by two paged files. The executable image
 * is the read-only source of a page's initial content, the swap
 * area keeps pages that were evicted while dirty.
 *
 * Both files are split into pages of the same size, page n lives
 * at byte offset n * page_size. There is no header in front of the
 * pages.
 *
 * Files are opened on first use. The swap file is created (and
 * truncated) the first time it is opened, so swap content never
 * survives the process that wrote it.
 *
 * A page is always transferred whole. A short read or write is an
 * error, the caller never sees a truncated page.
 */

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use log::debug;

use super::PageNumber;
use crate::errors::PagerError;
use crate::io_or_return;

#[derive(Debug)]
pub struct PageFile {
    path: PathBuf,
    page_size: usize,
    writable: bool,
    fp: Option<File>, //opened file, None until first use.
}

impl PageFile {
    pub fn read_only<P: AsRef<Path>>(path: P, page_size: usize) -> Self {
        PageFile {
            path: path.as_ref().to_path_buf(),
            page_size,
            writable: false,
            fp: None,
        }
    }

    pub fn read_write<P: AsRef<Path>>(path: P, page_size: usize) -> Self {
        PageFile {
            path: path.as_ref().to_path_buf(),
            page_size,
            writable: true,
            fp: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.fp.is_some()
    }

    fn open(&mut self) -> Result<&File, PagerError> {
        let fp = match self.fp.take() {
            Some(fp) => fp,
            None => {
                let res = if self.writable {
                    OpenOptions::new()
                        .read(true)
                        .write(true)
                        .create(true)
                        .truncate(true)
                        .open(&self.path)
                } else {
                    OpenOptions::new().read(true).open(&self.path)
                };
                let fp = io_or_return!(res, &self.path);
                debug!("opened page file {:?}", self.path);
                fp
            }
        };
        Ok(&*self.fp.insert(fp))
    }

    fn page_offset(&self, page: PageNumber) -> u64 {
        (page as u64) * (self.page_size as u64)
    }

    /*
     * Read exactly one page into `buf`.
     */
    pub fn read_page(&mut self, page: PageNumber, buf: &mut [u8]) -> Result<(), PagerError> {
        debug_assert_eq!(buf.len(), self.page_size);
        let offset = self.page_offset(page);
        let res = self.open()?.read_exact_at(buf, offset);
        io_or_return!(res, &self.path);
        debug!("read page {} from {:?} at offset {}", page, self.path, offset);
        Ok(())
    }

    pub fn write_page(&mut self, page: PageNumber, buf: &[u8]) -> Result<(), PagerError> {
        debug_assert_eq!(buf.len(), self.page_size);
        if !self.writable {
            return Err(PagerError::BackingStore {
                path: self.path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "page file is read-only",
                ),
            });
        }
        let offset = self.page_offset(page);
        let res = self.open()?.write_all_at(buf, offset);
        io_or_return!(res, &self.path);
        debug!("wrote page {} to {:?} at offset {}", page, self.path, offset);
        Ok(())
    }
}

/*
 * The pair of page files behind one process.
 */
#[derive(Debug)]
pub struct BackingStore {
    executable: PageFile,
    swap: PageFile,
}

impl BackingStore {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(executable: P, swap: Q, page_size: usize) -> Self {
        BackingStore {
            executable: PageFile::read_only(executable, page_size),
            swap: PageFile::read_write(swap, page_size),
        }
    }

    /*
     * Fetch a page's current content: from swap if it was ever
     * evicted dirty, otherwise from the executable image.
     */
    pub fn load(&mut self, page: PageNumber, in_swap: bool, buf: &mut [u8]) -> Result<(), PagerError> {
        if in_swap {
            self.swap.read_page(page, buf)
        } else {
            self.executable.read_page(page, buf)
        }
    }

    pub fn write_back(&mut self, page: PageNumber, buf: &[u8]) -> Result<(), PagerError> {
        self.swap.write_page(page, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PS: usize = 64;

    fn image(dir: &TempDir, pages: usize) -> PathBuf {
        let path = dir.path().join("exe.bin");
        let data: Vec<u8> = (0..pages * PS).map(|i| (i / PS) as u8).collect();
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn reads_page_at_offset() {
        let dir = TempDir::new().unwrap();
        let mut pf = PageFile::read_only(image(&dir, 3), PS);
        let mut buf = vec![0xff; PS];
        pf.read_page(2, &mut buf).unwrap();
        assert!(buf.iter().all(|b| *b == 2));
        assert!(pf.is_open());
    }

    #[test]
    fn short_read_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.bin");
        fs::write(&path, vec![1u8; PS + PS / 2]).unwrap();
        let mut pf = PageFile::read_only(&path, PS);
        let mut buf = vec![0; PS];
        pf.read_page(0, &mut buf).unwrap();
        match pf.read_page(1, &mut buf) {
            Err(PagerError::BackingStore { path: p, source }) => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
            }
            other => panic!("expected BackingStore, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut pf = PageFile::read_only(dir.path().join("nope.bin"), PS);
        let mut buf = vec![0; PS];
        let err = pf.read_page(0, &mut buf).unwrap_err();
        assert!(err.is_retryable());
        assert!(!pf.is_open());
    }

    #[test]
    fn swap_is_created_lazily() {
        let dir = TempDir::new().unwrap();
        let swap_path = dir.path().join("swap.bin");
        let mut store = BackingStore::new(image(&dir, 4), &swap_path, PS);
        assert!(!swap_path.exists());

        store.write_back(3, &[9; PS]).unwrap();
        assert_eq!(fs::metadata(&swap_path).unwrap().len(), 4 * PS as u64);
        let on_disk = fs::read(&swap_path).unwrap();
        assert!(on_disk[3 * PS..].iter().all(|b| *b == 9));

        let mut buf = vec![0; PS];
        store.load(3, true, &mut buf).unwrap();
        assert_eq!(buf, vec![9; PS]);
        store.load(3, false, &mut buf).unwrap();
        assert_eq!(buf, vec![3; PS]);
    }

    #[test]
    fn stale_swap_is_truncated() {
        let dir = TempDir::new().unwrap();
        let swap_path = dir.path().join("swap.bin");
        fs::write(&swap_path, vec![5u8; 8 * PS]).unwrap();
        let mut store = BackingStore::new(image(&dir, 1), &swap_path, PS);
        store.write_back(0, &[1; PS]).unwrap();
        assert_eq!(fs::metadata(&swap_path).unwrap().len(), PS as u64);
    }

    #[test]
    fn executable_is_read_only() {
        let dir = TempDir::new().unwrap();
        let mut pf = PageFile::read_only(image(&dir, 1), PS);
        assert!(pf.write_page(0, &[0; PS]).is_err());
    }
}
