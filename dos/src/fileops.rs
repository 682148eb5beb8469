//! 后端的能力集与通用的文件操作

use vfs::{CbmName, DirEntry, Error, FileType};

use crate::buffers::{Buffer, BufferId};
use crate::command::{self, Command, OpenRequest};
use crate::config::DEFAULT_DISK_ID;
use crate::control::Dos;
use crate::dir::{self, Pattern, TypeFilter};

/// 存储后端特质。
///
/// 每个`open_*`同步地准备好第一块数据，并把自己的私有状态
/// （[`Private::File`](crate::Private::File)）装进缓冲区；
/// 此后缓冲区的补充与清理都只经过这个后端。
pub trait FileOps: Sized {
    /// 目录游标
    type Dir;
    /// 打开的文件
    type File;

    fn open_read(
        &mut self,
        path: &[u8],
        name: &CbmName,
        buf: &mut Buffer<Self>,
    ) -> Result<(), Error>;

    fn open_write(
        &mut self,
        path: &[u8],
        name: &CbmName,
        ty: FileType,
        buf: &mut Buffer<Self>,
        append: bool,
    ) -> Result<(), Error>;

    fn delete(&mut self, path: &[u8], name: &CbmName) -> Result<(), Error>;

    /// 读缓冲区：产出下一块并设置`send_eoi`；
    /// 写缓冲区：写回已积累的字节并清空。
    fn refill(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error>;

    /// 释放后端资源，缓冲区本身由调用者归还
    fn cleanup(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error> {
        let _ = buf;
        Ok(())
    }

    /// 游标须容忍遍历途中删除文件
    fn opendir(&mut self, path: &[u8]) -> Result<Self::Dir, Error>;

    /// `Ok(None)`表示目录已读完
    fn readdir(&mut self, dir: &mut Self::Dir) -> Result<Option<DirEntry>, Error>;

    fn disk_label(&mut self) -> Result<CbmName, Error>;

    fn disk_id(&mut self) -> Result<[u8; 5], Error> {
        Ok(DEFAULT_DISK_ID)
    }

    /// 剩余的空闲块数
    fn disk_free(&mut self) -> u16;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Read,
    Write,
    Append,
    /// 允许读取未关闭的文件，FAT没有对应的概念，按读处理
    Modify,
}

impl<F: FileOps> Dos<F> {
    /// 解析并执行一条打开命令，`$`开头的打开目录
    pub fn open(&mut self, command: &[u8], secondary: u8) -> Result<BufferId, Error> {
        match command::parse_open(command) {
            Ok(Command::Directory(req)) => {
                self.open_directory(req.path, req.pattern, req.filter, secondary)
            }
            Ok(Command::Open(req)) => self.open_file(&req, secondary),
            Err(e) => self.record(Err(e)),
        }
    }

    /// 打开文件。
    ///
    /// 通道0强制为读、通道1强制为写；未指定类型时通道0/1为PRG，其余为SEQ。
    pub fn open_file(&mut self, req: &OpenRequest<'_>, secondary: u8) -> Result<BufferId, Error> {
        if req.name.is_empty() {
            return self.record(Err(Error::SyntaxNoName));
        }

        let (mode, ty) = resolve_mode(secondary, req.mode, req.ty);

        let Some(id) = self.buffers_mut().alloc() else {
            return self.record(Err(Error::NoChannel));
        };

        let res = self.open_into(id, req, mode, ty, secondary);
        if res.is_err() {
            self.buffers_mut().free(id);
        }
        self.record(res.map(|()| id))
    }

    fn open_into(
        &mut self,
        id: BufferId,
        req: &OpenRequest<'_>,
        mode: OpenMode,
        ty: FileType,
        secondary: u8,
    ) -> Result<(), Error> {
        let (ops, buffers) = self.split();

        // 文件名可以带通配符，隐藏文件也算
        let found = {
            let mut dh = ops.opendir(req.path)?;
            dir::next_match(ops, &mut dh, &Pattern::new(req.name), TypeFilter::ALL)?
        };

        let name = match (mode, found) {
            // 模式可以带通配符，替换的是匹配到的那个文件
            (OpenMode::Write, Some(existing)) if req.rewrite => {
                ops.delete(req.path, &existing.name)?;
                existing.name
            }
            (OpenMode::Write, Some(_)) => return Err(Error::FileExists),
            (OpenMode::Write, None) => CbmName::new(req.name),
            (_, Some(existing)) => existing.name,
            (_, None) => return Err(Error::FileNotFound),
        };

        let buf = buffers.get_mut(id);
        buf.secondary = secondary;

        match mode {
            OpenMode::Read | OpenMode::Modify => {
                buf.read = true;
                log::debug!("open {name:?} for reading on #{secondary}");
                ops.open_read(req.path, &name, buf)
            }
            OpenMode::Write | OpenMode::Append => {
                buf.write = true;
                log::debug!("open {name:?} ({ty:?}) for writing on #{secondary}");
                ops.open_write(req.path, &name, ty, buf, mode == OpenMode::Append)
            }
        }
    }

    /// 删除所有匹配`pattern`的文件（目录除外），返回删除的个数
    pub fn delete(&mut self, path: &[u8], pattern: &[u8]) -> Result<u8, Error> {
        let res = self.delete_matching(path, &Pattern::new(pattern));
        self.record(res)
    }

    fn delete_matching(&mut self, path: &[u8], pattern: &Pattern) -> Result<u8, Error> {
        let ops = self.ops_mut();
        let mut dh = ops.opendir(path)?;
        let mut count = 0u8;

        while let Some(entry) = dir::next_match(ops, &mut dh, pattern, TypeFilter::default())? {
            if entry.ty == FileType::Dir {
                continue;
            }
            ops.delete(path, &entry.name)?;
            count = count.saturating_add(1);
        }

        Ok(count)
    }

    /// 标准协议的读取：取出下一个字节，缓冲区读空时向后端补充。
    ///
    /// `Ok(None)`即文件结束。出错后须调用[`Dos::close`]。
    pub fn next_byte(&mut self, id: BufferId) -> Result<Option<u8>, Error> {
        self.check_live(id)?;
        loop {
            let buf = self.buffer_mut(id);
            if let Some(byte) = buf.pop() {
                return Ok(Some(byte));
            }
            if buf.send_eoi {
                return Ok(None);
            }
            self.refill(id)?;
        }
    }

    /// 标准协议的写入，缓冲区满时先写回
    pub fn write_byte(&mut self, id: BufferId, byte: u8) -> Result<(), Error> {
        self.check_live(id)?;
        let buf = self.buffer(id);
        if !buf.write {
            return Err(Error::WriteError);
        }
        if buf.is_full() {
            self.refill(id)?;
        }
        if self.buffer_mut(id).push(byte) {
            Ok(())
        } else {
            Err(Error::WriteError)
        }
    }

    /// 关闭通道，写缓冲区中剩余的字节由后端的清理写回
    pub fn close(&mut self, id: BufferId) -> Result<(), Error> {
        let res = self.cleanup(id);
        self.record(res)
    }
}

fn resolve_mode(secondary: u8, mode: Option<OpenMode>, ty: Option<FileType>) -> (OpenMode, FileType) {
    let mode = match secondary {
        0 => OpenMode::Read,
        1 => OpenMode::Write,
        _ => mode.unwrap_or_default(),
    };

    let ty = match ty {
        Some(FileType::Del) | None if secondary < 2 => FileType::Prg,
        Some(FileType::Del) | None => FileType::Seq,
        Some(ty) => ty,
    };

    (mode, ty)
}
