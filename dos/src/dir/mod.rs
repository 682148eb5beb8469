//! 虚拟目录
//!
//! `$`打开的通道不对应任何真实文件：
//! 表头、每个匹配的目录项、表尾依次合成到缓冲区里，每次补充产出一条记录。

pub mod listing;
mod pattern;

use vfs::{DirEntry, Error};

use crate::buffers::{Buffer, BufferId, Private};
use crate::control::Dos;
use crate::fileops::FileOps;

pub use self::pattern::{Pattern, TypeFilter};

/// 目录通道的私有状态
pub struct DirState<D> {
    dh: D,
    pattern: Pattern,
    filter: TypeFilter,
}

/// 取出下一个同时满足模式和类型过滤器的目录项
pub(crate) fn next_match<F: FileOps>(
    ops: &mut F,
    dh: &mut F::Dir,
    pattern: &Pattern,
    filter: TypeFilter,
) -> Result<Option<DirEntry>, Error> {
    while let Some(entry) = ops.readdir(dh)? {
        if filter.accepts(&entry) && pattern.matches(&entry.name) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

/// 目录缓冲区的补充：下一个匹配项，或者表尾
pub(crate) fn refill<F: FileOps>(ops: &mut F, buf: &mut Buffer<F>) -> Result<(), Error> {
    let Private::Dir(state) = &mut buf.pvt else {
        return Err(Error::ReadError);
    };

    match next_match(ops, &mut state.dh, &state.pattern, state.filter) {
        Ok(Some(entry)) => {
            log::trace!("dir entry {:?}", entry.name);
            buf.fill(&listing::entry(&entry));
        }
        Ok(None) => {
            log::trace!("dir footer");
            buf.fill(&listing::footer(ops.disk_free()));
            buf.send_eoi = true;
        }
        Err(e) => {
            // 游标就此作废，缓冲区等待清理
            buf.pvt = Private::None;
            return Err(e);
        }
    }

    Ok(())
}

impl<F: FileOps> Dos<F> {
    /// 打开目录通道，第一块数据是表头
    pub fn open_directory(
        &mut self,
        path: &[u8],
        pattern: &[u8],
        filter: TypeFilter,
        secondary: u8,
    ) -> Result<BufferId, Error> {
        let Some(id) = self.buffers_mut().alloc() else {
            return self.record(Err(Error::NoChannel));
        };

        let res = self.start_listing(id, path, Pattern::new(pattern), filter, secondary);
        if res.is_err() {
            self.buffers_mut().free(id);
        }
        self.record(res.map(|()| id))
    }

    fn start_listing(
        &mut self,
        id: BufferId,
        path: &[u8],
        pattern: Pattern,
        filter: TypeFilter,
        secondary: u8,
    ) -> Result<(), Error> {
        let (ops, buffers) = self.split();

        let dh = ops.opendir(path)?;
        let label = ops.disk_label()?;
        let disk_id = ops.disk_id()?;
        log::debug!("list {pattern:?} ({filter:?}) of {label:?} on #{secondary}");

        let buf = buffers.get_mut(id);
        buf.fill(&listing::header(&label, &disk_id));
        buf.secondary = secondary;
        buf.read = true;
        buf.send_eoi = false;
        buf.pvt = Private::Dir(DirState { dh, pattern, filter });

        Ok(())
    }
}
