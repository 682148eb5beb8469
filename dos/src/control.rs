use vfs::Error;

use crate::buffers::{Buffer, BufferId, BufferPool, Private};
use crate::dir;
use crate::fileops::FileOps;

/// 一个逻辑驱动器：后端加上缓冲池。
///
/// 后端由嵌入方选定后传入，缓冲区一旦分配就只由这个后端补充和清理。
#[derive(Debug)]
pub struct Dos<F: FileOps> {
    ops: F,
    buffers: BufferPool<F>,
    /// 最近一次操作的状态，供命令通道读取
    status: Option<Error>,
}

impl<F: FileOps> Dos<F> {
    pub fn new(ops: F) -> Self {
        Self {
            ops,
            buffers: BufferPool::new(),
            status: None,
        }
    }

    pub fn ops(&self) -> &F {
        &self.ops
    }

    pub fn ops_mut(&mut self) -> &mut F {
        &mut self.ops
    }

    pub fn buffers(&self) -> &BufferPool<F> {
        &self.buffers
    }

    pub(crate) fn buffers_mut(&mut self) -> &mut BufferPool<F> {
        &mut self.buffers
    }

    pub fn buffer(&self, id: BufferId) -> &Buffer<F> {
        self.buffers.get(id)
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> &mut Buffer<F> {
        self.buffers.get_mut(id)
    }

    pub fn find_buffer(&self, secondary: u8) -> Option<BufferId> {
        self.buffers.find(secondary)
    }

    /// `None`即OK
    pub fn status(&self) -> Option<Error> {
        self.status
    }

    /// 让缓冲区的所属后端产出下一块数据（写缓冲区则是写回）。
    ///
    /// 出错后缓冲区仍然处于分配状态，调用者必须接着调用[`Dos::cleanup`]。
    pub fn refill(&mut self, id: BufferId) -> Result<(), Error> {
        self.check_live(id)?;
        let buf = self.buffers.get_mut(id);

        if buf.read && buf.send_eoi {
            log::warn!("refill after the last chunk of buffer {id:?}");
            return Ok(());
        }

        match buf.pvt {
            Private::Dir(_) => dir::refill(&mut self.ops, buf),
            Private::File(_) => self.ops.refill(buf),
            Private::None => Err(Error::ReadError),
        }
    }

    /// 释放后端资源并把缓冲区还给缓冲池，每次分配恰好调用一次。
    ///
    /// 失效的`id`返回`NoChannel`，不会碰到缓冲区现在的主人。
    pub fn cleanup(&mut self, id: BufferId) -> Result<(), Error> {
        self.check_live(id)?;
        let buf = self.buffers.get_mut(id);
        let res = match buf.pvt {
            Private::File(_) => self.ops.cleanup(buf),
            // 目录和空缓冲区只需归还
            Private::Dir(_) | Private::None => Ok(()),
        };

        self.buffers.free(id);
        res
    }

    /// `id`已归还或缓冲区已另行分配时返回`NoChannel`
    pub(crate) fn check_live(&self, id: BufferId) -> Result<(), Error> {
        if self.buffers.is_live(id) {
            Ok(())
        } else {
            log::warn!("stale {id:?}");
            Err(Error::NoChannel)
        }
    }

    /// 记下操作结果，原样返回
    pub(crate) fn record<T>(&mut self, res: Result<T, Error>) -> Result<T, Error> {
        self.status = res.as_ref().err().copied();
        if let Some(e) = self.status {
            log::debug!("status {:02} ({e:?})", e.code());
        }
        res
    }

    /// 同时借出后端与缓冲池
    pub(crate) fn split(&mut self) -> (&mut F, &mut BufferPool<F>) {
        (&mut self.ops, &mut self.buffers)
    }
}
