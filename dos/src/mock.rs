//! 测试用的内存后端与记录总线

use std::vec;

use bus_dev::{BusDevice, BusMode, Preemption};
use enumflags2::BitFlags;
use vfs::{CbmName, DirEntry, EntryFlag, Error, FileType};

use crate::buffers::{Buffer, Private};
use crate::config::BUFFER_SIZE;
use crate::fileops::FileOps;

#[derive(Debug, Clone)]
pub struct MemFile {
    pub name: CbmName,
    pub ty: FileType,
    pub flags: BitFlags<EntryFlag>,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MemFs {
    pub files: Vec<MemFile>,
    pub label: CbmName,
    pub free: u16,
    /// 游标产出这么多项之后读取失败
    pub fail_readdir_at: Option<usize>,
    /// 第几次（从0数起）补充失败
    pub fail_refill_at: Option<usize>,
    pub fail_open: bool,
    pub refills: usize,
    pub cleanups: usize,
}

/// 打开时的快照，遍历途中删除文件不受影响
#[derive(Debug)]
pub struct MemDir {
    entries: vec::IntoIter<DirEntry>,
    yielded: usize,
}

#[derive(Debug)]
pub struct MemHandle {
    name: CbmName,
    offset: usize,
}

impl MemFs {
    pub fn add(&mut self, name: &[u8], ty: FileType, data: &[u8]) {
        self.add_with(name, ty, BitFlags::empty(), data);
    }

    pub fn add_with(&mut self, name: &[u8], ty: FileType, flags: BitFlags<EntryFlag>, data: &[u8]) {
        self.files.push(MemFile {
            name: CbmName::new(name),
            ty,
            flags,
            data: data.to_vec(),
        });
    }

    pub fn file(&self, name: &[u8]) -> Option<&MemFile> {
        let name = CbmName::new(name);
        self.files.iter().find(|file| file.name == name)
    }

    fn file_mut(&mut self, name: &CbmName) -> Result<&mut MemFile, Error> {
        self.files
            .iter_mut()
            .find(|file| file.name == *name)
            .ok_or(Error::FileNotFound)
    }

    /// 从`handle`处读出下一块
    fn read_chunk(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error> {
        let Private::File(handle) = &mut buf.pvt else {
            return Err(Error::ReadError);
        };
        let name = handle.name;
        let start = handle.offset;

        let file = self.file_mut(&name)?;
        let end = file.data.len().min(start + BUFFER_SIZE);
        let last = end == file.data.len();
        handle.offset = end;

        let chunk = file.data[start..end].to_vec();
        buf.fill(&chunk);
        buf.send_eoi = last;
        Ok(())
    }

    /// 把缓冲区里积累的字节追加到文件末尾
    fn flush(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error> {
        let Private::File(handle) = &buf.pvt else {
            return Err(Error::WriteError);
        };
        let name = handle.name;
        self.file_mut(&name)?
            .data
            .extend_from_slice(buf.remaining());
        buf.set_span(0, 0);
        Ok(())
    }
}

impl FileOps for MemFs {
    type Dir = MemDir;
    type File = MemHandle;

    fn open_read(&mut self, _path: &[u8], name: &CbmName, buf: &mut Buffer<Self>) -> Result<(), Error> {
        if self.fail_open {
            return Err(Error::ReadError);
        }
        self.file_mut(name)?;

        buf.pvt = Private::File(MemHandle {
            name: *name,
            offset: 0,
        });
        self.read_chunk(buf)
    }

    fn open_write(
        &mut self,
        _path: &[u8],
        name: &CbmName,
        ty: FileType,
        buf: &mut Buffer<Self>,
        append: bool,
    ) -> Result<(), Error> {
        if self.fail_open {
            return Err(Error::WriteError);
        }
        if append {
            self.file_mut(name)?;
        } else {
            self.files.push(MemFile {
                name: *name,
                ty,
                flags: BitFlags::empty(),
                data: Vec::new(),
            });
        }

        buf.set_span(0, 0);
        buf.pvt = Private::File(MemHandle {
            name: *name,
            offset: 0,
        });
        Ok(())
    }

    fn delete(&mut self, _path: &[u8], name: &CbmName) -> Result<(), Error> {
        let index = self
            .files
            .iter()
            .position(|file| file.name == *name)
            .ok_or(Error::FileNotFound)?;
        self.files.remove(index);
        Ok(())
    }

    fn refill(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error> {
        let n = self.refills;
        self.refills += 1;
        if self.fail_refill_at == Some(n) {
            return Err(Error::ReadError);
        }

        if buf.write {
            self.flush(buf)
        } else {
            self.read_chunk(buf)
        }
    }

    fn cleanup(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error> {
        self.cleanups += 1;
        if buf.write {
            self.flush(buf)?;
        }
        Ok(())
    }

    fn opendir(&mut self, _path: &[u8]) -> Result<Self::Dir, Error> {
        let entries: Vec<_> = self
            .files
            .iter()
            .map(|file| DirEntry {
                name: file.name,
                blocks: file.data.len().div_ceil(254) as u16,
                ty: file.ty,
                flags: file.flags,
            })
            .collect();

        Ok(MemDir {
            entries: entries.into_iter(),
            yielded: 0,
        })
    }

    fn readdir(&mut self, dir: &mut Self::Dir) -> Result<Option<DirEntry>, Error> {
        if self.fail_readdir_at == Some(dir.yielded) {
            return Err(Error::ReadError);
        }
        let entry = dir.entries.next();
        dir.yielded += usize::from(entry.is_some());
        Ok(entry)
    }

    fn disk_label(&mut self) -> Result<CbmName, Error> {
        Ok(self.label)
    }

    fn disk_free(&mut self) -> u16 {
        self.free
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Mode(BusMode),
    Byte(u8),
    Block(Vec<u8>),
    Disable,
    Enable,
}

/// 记下所有总线操作，并检查发送都发生在临界区内
#[derive(Debug)]
pub struct RecordingBus {
    pub events: Vec<Event>,
    pub interrupts: bool,
    pub mode: BusMode,
}

impl Default for RecordingBus {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            interrupts: true,
            mode: BusMode::Normal,
        }
    }
}

impl BusDevice for RecordingBus {
    fn mode(&self) -> BusMode {
        self.mode
    }

    fn set_mode(&mut self, mode: BusMode) {
        self.mode = mode;
        self.events.push(Event::Mode(mode));
    }

    fn send_byte(&mut self, byte: u8) {
        assert!(!self.interrupts, "byte sent with interrupts enabled");
        self.events.push(Event::Byte(byte));
    }

    fn send_block(&mut self, data: &[u8]) {
        assert!(!self.interrupts, "block sent with interrupts enabled");
        self.events.push(Event::Block(data.to_vec()));
    }
}

impl Preemption for RecordingBus {
    fn disable(&mut self) -> bool {
        self.events.push(Event::Disable);
        core::mem::replace(&mut self.interrupts, false)
    }

    fn enable(&mut self) {
        self.events.push(Event::Enable);
        self.interrupts = true;
    }
}
