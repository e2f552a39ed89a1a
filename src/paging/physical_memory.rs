/**********************************************
  > File Name		: physical_memory.rs
  > Author		    : lunar
  > Email			: lunar_ubuntu@qq.com
  > Created Time	: Sat 15 May 2021 03:30:02 PM CST
  > Location        : Shanghai
  > Copyright@ https://github.com/xiaoqixian
 **********************************************/

/*
 * Frame contents. A frame's buffer is only allocated the first
 * time a page is loaded into it, a gigabyte of simulated memory
 * costs nothing until it is used.
 */

use super::FrameId;

#[derive(Debug)]
pub struct PhysicalMemory {
    page_size: usize,
    frames: Vec<Option<Box<[u8]>>>,
}

impl PhysicalMemory {
    pub fn new(num_frames: usize, page_size: usize) -> Self {
        PhysicalMemory {
            page_size,
            frames: (0..num_frames).map(|_| None).collect(),
        }
    }

    pub fn frame(&self, frame: FrameId) -> &[u8] {
        match &self.frames[frame] {
            Some(data) => &data[..],
            None => &[],
        }
    }

    pub fn frame_mut(&mut self, frame: FrameId) -> &mut [u8] {
        let page_size = self.page_size;
        self.frames[frame].get_or_insert_with(|| vec![0; page_size].into_boxed_slice())
    }

    /*
     * `data` must be exactly one page.
     */
    pub fn load(&mut self, frame: FrameId, data: &[u8]) {
        self.frame_mut(frame).copy_from_slice(data);
    }

    pub fn allocated_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_allocated_lazily() {
        let mut pm = PhysicalMemory::new(4, 16);
        assert_eq!(pm.allocated_frames(), 0);
        assert!(pm.frame(2).is_empty());
        pm.load(2, &[7; 16]);
        assert_eq!(pm.allocated_frames(), 1);
        assert_eq!(pm.frame(2), &[7; 16][..]);
        pm.frame_mut(2)[0] = 1;
        assert_eq!(pm.frame(2)[0], 1);
    }
}
