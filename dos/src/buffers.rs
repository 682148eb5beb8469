//! 缓冲区的抽象
//!
//! 所有读写都经过数量固定的缓冲区，不使用堆。
//! 缓冲区分配后只属于一个通道和一个后端，
//! 直到清理回调把它还给缓冲池。

use core::array;
use core::fmt;

use derive_more::Into;

use crate::config::{BUFFER_COUNT, BUFFER_SIZE};
use crate::dir::DirState;
use crate::fileops::FileOps;

/// 缓冲区的一次分配。
///
/// 同一个缓冲区归还后再分配出去，得到的是另一个`BufferId`，
/// 旧的`BufferId`从此失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Into)]
pub struct BufferId {
    index: usize,
    generation: u32,
}

impl BufferId {
    pub const fn index(self) -> usize {
        self.index
    }
}

/// 后端私有的扩展区。
///
/// 打开时由后端选定变体，此后决定了补充与清理走哪个后端，
/// 不会在不同后端之间重新解释。
pub enum Private<F: FileOps> {
    None,
    /// 虚拟目录
    Dir(DirState<F::Dir>),
    /// 真实文件
    File(F::File),
}

impl<F: FileOps> Private<F> {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dir(_) => "dir",
            Self::File(_) => "file",
        }
    }
}

/// 一个扇区大小的传输缓冲区
pub struct Buffer<F: FileOps> {
    data: [u8; BUFFER_SIZE],
    /// 下一个未读（未写）字节的偏移
    position: usize,
    /// 从`position`起有效字节的个数
    length: usize,
    /// 此缓冲区装着文件的最后一块，不会再补充
    pub send_eoi: bool,
    /// 绑定的通道号
    pub secondary: u8,
    pub read: bool,
    pub write: bool,
    pub pvt: Private<F>,
    allocated: bool,
    /// 每次归还加一，归还时不清零
    generation: u32,
}

impl<F: FileOps> Buffer<F> {
    fn new() -> Self {
        Self {
            data: [0; BUFFER_SIZE],
            position: 0,
            length: 0,
            send_eoi: false,
            secondary: 0,
            read: false,
            write: false,
            pvt: Private::None,
            allocated: false,
            generation: 0,
        }
    }

    pub const fn position(&self) -> usize {
        self.position
    }

    /// 剩余的有效字节数
    pub const fn len(&self) -> usize {
        self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub const fn data(&self) -> &[u8; BUFFER_SIZE] {
        &self.data
    }

    /// 剩余的有效字节
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.position..self.position + self.length]
    }

    pub fn set_span(&mut self, position: usize, length: usize) {
        assert!(position + length <= BUFFER_SIZE);
        self.position = position;
        self.length = length;
    }

    /// 越过`n`个有效字节，最多越过全部剩余字节
    pub fn skip(&mut self, n: usize) {
        let n = n.min(self.length);
        self.position += n;
        self.length -= n;
    }

    /// 读出下一个有效字节
    pub fn pop(&mut self) -> Option<u8> {
        if self.length == 0 {
            return None;
        }
        let byte = self.data[self.position];
        self.skip(1);
        Some(byte)
    }

    /// 在有效字节后追加一个字节，缓冲区满时返回`false`
    pub fn push(&mut self, byte: u8) -> bool {
        let end = self.position + self.length;
        if end == BUFFER_SIZE {
            return false;
        }
        self.data[end] = byte;
        self.length += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.position + self.length == BUFFER_SIZE
    }

    /// 用`bytes`覆盖整个缓冲区的内容，返回写入的个数
    pub fn fill(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(BUFFER_SIZE);
        self.data[..n].copy_from_slice(&bytes[..n]);
        self.set_span(0, n);
        n
    }
}

impl<F: FileOps> fmt::Debug for Buffer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("position", &self.position)
            .field("length", &self.length)
            .field("send_eoi", &self.send_eoi)
            .field("secondary", &self.secondary)
            .field("read", &self.read)
            .field("write", &self.write)
            .field("pvt", &self.pvt.kind())
            .field("allocated", &self.allocated)
            .field("generation", &self.generation)
            .finish()
    }
}

/// 缓冲池，容量在编译时确定
#[derive(Debug)]
pub struct BufferPool<F: FileOps> {
    buffers: [Buffer<F>; BUFFER_COUNT],
}

impl<F: FileOps> Default for BufferPool<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileOps> BufferPool<F> {
    pub const CAPACITY: usize = BUFFER_COUNT;

    pub fn new() -> Self {
        Self {
            buffers: array::from_fn(|_| Buffer::new()),
        }
    }

    /// 取出一个空闲缓冲区，耗尽时返回`None`，调用者须放弃此次操作
    pub fn alloc(&mut self) -> Option<BufferId> {
        let Some(index) = self.buffers.iter().position(|buf| !buf.allocated) else {
            log::warn!("Run out of buffers");
            return None;
        };
        let buf = &mut self.buffers[index];
        buf.allocated = true;
        log::trace!("alloc buffer #{index}");
        Some(BufferId {
            index,
            generation: buf.generation,
        })
    }

    /// `id`仍是这个缓冲区当前的分配
    pub fn is_live(&self, id: BufferId) -> bool {
        let buf = &self.buffers[id.index];
        buf.allocated && buf.generation == id.generation
    }

    /// 把缓冲区还给缓冲池，并丢弃其后端私有状态。
    ///
    /// `id`已经失效（归还过，或者缓冲区已另行分配）时什么也不做，返回`false`。
    pub fn free(&mut self, id: BufferId) -> bool {
        if !self.is_live(id) {
            log::warn!("stale {id:?} freed");
            return false;
        }
        let buf = &mut self.buffers[id.index];
        let generation = buf.generation.wrapping_add(1);
        *buf = Buffer::new();
        buf.generation = generation;
        log::trace!("free buffer #{}", id.index);
        true
    }

    pub fn get(&self, id: BufferId) -> &Buffer<F> {
        &self.buffers[id.index]
    }

    pub fn get_mut(&mut self, id: BufferId) -> &mut Buffer<F> {
        &mut self.buffers[id.index]
    }

    /// 查找绑定到通道`secondary`的缓冲区
    pub fn find(&self, secondary: u8) -> Option<BufferId> {
        self.buffers
            .iter()
            .position(|buf| buf.allocated && buf.secondary == secondary)
            .map(|index| BufferId {
                index,
                generation: self.buffers[index].generation,
            })
    }

    /// 已分配的缓冲区个数
    pub fn allocated(&self) -> usize {
        self.buffers.iter().filter(|buf| buf.allocated).count()
    }
}
