/**********************************************
  > File Name		: resources.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Mon 17 May 2021 08:20:44 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Non-paging resources of a process: heap blocks and open files.
 *
 * A record is created at admission and dropped as a whole at
 * termination. Dropping a record frees every block and closes every
 * file it holds, there is no way to release half of it.
 */

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, error};

use crate::errors::PagerError;
use crate::paging::ProcessId;

#[derive(Debug)]
pub struct FileHandle {
    pub path: PathBuf,
    pub fp: File,
}

#[derive(Debug, Default)]
pub struct ProcessResources {
    heap_blocks: Vec<Box<[u8]>>,
    open_handles: Vec<FileHandle>,
}

impl ProcessResources {
    pub fn num_blocks(&self) -> usize {
        self.heap_blocks.len()
    }

    pub fn num_handles(&self) -> usize {
        self.open_handles.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleasedResources {
    pub blocks: usize,
    pub handles: usize,
}

#[derive(Debug, Default)]
pub struct ResourceTracker {
    table: HashMap<ProcessId, ProcessResources>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        ResourceTracker {
            table: HashMap::new(),
        }
    }

    pub fn contains(&self, pid: ProcessId) -> bool {
        self.table.contains_key(&pid)
    }

    pub fn get(&self, pid: ProcessId) -> Result<&ProcessResources, PagerError> {
        self.table.get(&pid).ok_or(PagerError::UnknownProcess(pid))
    }

    fn get_mut(&mut self, pid: ProcessId) -> Result<&mut ProcessResources, PagerError> {
        self.table.get_mut(&pid).ok_or(PagerError::UnknownProcess(pid))
    }

    pub fn allocate_resources(&mut self, pid: ProcessId) -> Result<(), PagerError> {
        if self.table.contains_key(&pid) {
            return Err(PagerError::ProcessExists(pid));
        }
        self.table.insert(pid, ProcessResources::default());
        Ok(())
    }

    /*
     * Hand a zeroed block of `size` bytes to `pid`, returns its index.
     */
    pub fn allocate_block(&mut self, pid: ProcessId, size: usize) -> Result<usize, PagerError> {
        let res = self.get_mut(pid)?;
        res.heap_blocks.push(vec![0; size].into_boxed_slice());
        debug!("process {} allocated a block of {} bytes", pid, size);
        Ok(res.heap_blocks.len() - 1)
    }

    pub fn block_mut(&mut self, pid: ProcessId, index: usize) -> Result<&mut [u8], PagerError> {
        match self.get_mut(pid)?.heap_blocks.get_mut(index) {
            Some(block) => Ok(&mut block[..]),
            None => Err(PagerError::UnknownHandle { pid, handle: index }),
        }
    }

    pub fn open_file<P: AsRef<Path>>(
        &mut self,
        pid: ProcessId,
        path: P,
        options: &OpenOptions,
    ) -> Result<usize, PagerError> {
        let path = path.as_ref().to_path_buf();
        let res = self.get_mut(pid)?;
        let fp = match options.open(&path) {
            Ok(v) => v,
            Err(e) => {
                error!("process {} failed to open {:?}: {}", pid, path, e);
                return Err(PagerError::ResourceFile { path, source: e });
            }
        };
        debug!("process {} opened {:?}", pid, path);
        res.open_handles.push(FileHandle { path, fp });
        Ok(res.open_handles.len() - 1)
    }

    pub fn file(&self, pid: ProcessId, handle: usize) -> Result<&FileHandle, PagerError> {
        self.get(pid)?
            .open_handles
            .get(handle)
            .ok_or(PagerError::UnknownHandle { pid, handle })
    }

    /*
     * Free every block and close every file of `pid`, then forget it.
     */
    pub fn release(&mut self, pid: ProcessId) -> Result<ReleasedResources, PagerError> {
        let res = self.table.remove(&pid).ok_or(PagerError::UnknownProcess(pid))?;
        let released = ReleasedResources {
            blocks: res.num_blocks(),
            handles: res.num_handles(),
        };
        drop(res);
        debug!(
            "process {} released {} blocks and {} handles",
            pid, released.blocks, released.handles
        );
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn allocate_and_release() {
        let dir = TempDir::new().unwrap();
        let mut rt = ResourceTracker::new();
        rt.allocate_resources(1).unwrap();
        assert!(matches!(rt.allocate_resources(1), Err(PagerError::ProcessExists(1))));

        for i in 0..10 {
            assert_eq!(rt.allocate_block(1, 1024).unwrap(), i);
        }
        rt.block_mut(1, 3).unwrap()[0] = 42;
        assert!(rt.block_mut(1, 10).is_err());

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        for name in &["file1.txt", "file2.txt", "file3.txt"] {
            rt.open_file(1, dir.path().join(name), &options).unwrap();
        }
        assert_eq!(rt.get(1).unwrap().num_blocks(), 10);
        assert_eq!(rt.get(1).unwrap().num_handles(), 3);
        assert_eq!(rt.file(1, 2).unwrap().path, dir.path().join("file3.txt"));

        let released = rt.release(1).unwrap();
        assert_eq!(released, ReleasedResources { blocks: 10, handles: 3 });
        assert!(!rt.contains(1));
        assert!(matches!(rt.get(1), Err(PagerError::UnknownProcess(1))));
        assert!(rt.release(1).is_err());
    }

    #[test]
    fn unknown_process() {
        let mut rt = ResourceTracker::new();
        assert!(matches!(rt.allocate_block(9, 16), Err(PagerError::UnknownProcess(9))));
    }

    #[test]
    fn failed_open_is_not_tracked() {
        let dir = TempDir::new().unwrap();
        let mut rt = ResourceTracker::new();
        rt.allocate_resources(2).unwrap();
        let mut options = OpenOptions::new();
        options.read(true);
        let err = rt.open_file(2, dir.path().join("missing.txt"), &options);
        assert!(matches!(err, Err(PagerError::ResourceFile { .. })));
        assert_eq!(rt.get(2).unwrap().num_handles(), 0);
    }
}
