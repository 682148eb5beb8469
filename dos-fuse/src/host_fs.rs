use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::vec;

use dos::{Buffer, FileOps, Private};
use enumflags2::BitFlags;
use vfs::{CbmName, DirEntry, EntryFlag, Error, FileType};

/// 目录列表里一块的有效字节数
const BLOCK_PAYLOAD: u64 = 254;

/// 把宿主机的一个目录当作磁盘
#[derive(Debug)]
pub struct HostFs {
    root: PathBuf,
    label: CbmName,
    id: [u8; 5],
    /// 总块数
    capacity: u16,
}

#[derive(Debug)]
pub struct HostFile {
    file: File,
    /// 读：尚未读出的字节数
    remaining: u64,
}

impl HostFs {
    pub fn new(root: impl Into<PathBuf>, label: &[u8], id: [u8; 5], capacity: u16) -> Self {
        Self {
            root: root.into(),
            label: CbmName::new(label),
            id,
            capacity,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 命令里的路径只能指向根目录之下
    fn dir_path(&self, path: &[u8]) -> Result<PathBuf, Error> {
        let rel = Path::new(std::str::from_utf8(path).map_err(|_| Error::FileNotFound)?);
        let mut dir = self.root.clone();
        for comp in rel.components() {
            match comp {
                Component::Normal(part) => dir.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => return Err(Error::FileNotFound),
            }
        }
        Ok(dir)
    }

    /// 列出目录，按宿主机文件名排序
    fn scan(&self, dir: &Path) -> Result<Vec<(PathBuf, DirEntry)>, Error> {
        let mut entries = fs::read_dir(dir)
            .map_err(|e| io_error(e, Error::DriveNotReady))?
            .map(|entry| {
                let entry = entry.map_err(|e| io_error(e, Error::ReadError))?;
                let meta = entry.metadata().map_err(|e| io_error(e, Error::ReadError))?;
                Ok((entry.path(), dir_entry(&entry.file_name(), &meta)))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(entries)
    }

    /// 找到名称恰好是`name`的宿主机文件
    fn lookup(&self, path: &[u8], name: &CbmName) -> Result<PathBuf, Error> {
        self.scan(&self.dir_path(path)?)?
            .into_iter()
            .find(|(_, entry)| entry.name == *name && entry.ty != FileType::Dir)
            .map(|(host, _)| host)
            .ok_or(Error::FileNotFound)
    }

    fn used_blocks(&self) -> Result<u16, Error> {
        let used = self
            .scan(&self.root)?
            .iter()
            .map(|(_, entry)| entry.blocks)
            .fold(0u16, u16::saturating_add);
        Ok(used)
    }
}

/// 宿主机的目录项转成磁盘目录项
fn dir_entry(file_name: &std::ffi::OsStr, meta: &fs::Metadata) -> DirEntry {
    let bytes = file_name.as_encoded_bytes();

    let (stem, ty) = if meta.is_dir() {
        (bytes, FileType::Dir)
    } else {
        match bytes.iter().rposition(|&b| b == b'.') {
            Some(dot) if dot > 0 => {
                let ext = bytes[dot + 1..].to_ascii_lowercase();
                match ext.as_slice() {
                    b"prg" => (&bytes[..dot], FileType::Prg),
                    b"seq" => (&bytes[..dot], FileType::Seq),
                    b"usr" => (&bytes[..dot], FileType::Usr),
                    b"rel" => (&bytes[..dot], FileType::Rel),
                    _ => (bytes, FileType::Prg),
                }
            }
            _ => (bytes, FileType::Prg),
        }
    };

    let mut flags = BitFlags::empty();
    if bytes.first() == Some(&b'.') {
        flags |= EntryFlag::Hidden;
    }
    if meta.permissions().readonly() {
        flags |= EntryFlag::ReadOnly;
    }

    let blocks = if meta.is_dir() {
        0
    } else {
        meta.len().div_ceil(BLOCK_PAYLOAD).min(u64::from(u16::MAX)) as u16
    };

    DirEntry {
        name: CbmName::new(stem),
        blocks,
        ty,
        flags,
    }
}

/// 新文件在宿主机上的名字，只能是目录里的一项
fn host_name(name: &CbmName, ty: FileType) -> Result<String, Error> {
    let stem = String::from_utf8_lossy(name.trimmed());

    let mut comps = Path::new(stem.as_ref()).components();
    let single = matches!((comps.next(), comps.next()), (Some(Component::Normal(_)), None));
    if !single || stem.contains(['/', '\\', '\0']) {
        log::warn!("rejected host name {stem:?}");
        return Err(Error::SyntaxNoName);
    }

    Ok(match ty {
        FileType::Seq => format!("{stem}.seq"),
        FileType::Usr => format!("{stem}.usr"),
        FileType::Rel => format!("{stem}.rel"),
        _ => format!("{stem}.prg"),
    })
}

fn io_error(e: io::Error, fallback: Error) -> Error {
    log::warn!("host I/O: {e}");
    match e.kind() {
        io::ErrorKind::NotFound => Error::FileNotFound,
        io::ErrorKind::AlreadyExists => Error::FileExists,
        io::ErrorKind::PermissionDenied => Error::WriteProtect,
        _ => fallback,
    }
}

fn handle(buf: &mut Buffer<HostFs>) -> Result<&mut HostFile, Error> {
    match &mut buf.pvt {
        Private::File(file) => Ok(file),
        _ => Err(Error::ReadError),
    }
}

fn read_chunk(buf: &mut Buffer<HostFs>) -> Result<(), Error> {
    let mut chunk = [0; dos::config::BUFFER_SIZE];
    let file = handle(buf)?;

    let want = file.remaining.min(chunk.len() as u64) as usize;
    file.file
        .read_exact(&mut chunk[..want])
        .map_err(|e| io_error(e, Error::ReadError))?;
    file.remaining -= want as u64;
    let last = file.remaining == 0;

    buf.fill(&chunk[..want]);
    buf.send_eoi = last;
    Ok(())
}

fn flush(buf: &mut Buffer<HostFs>) -> Result<(), Error> {
    let mut chunk = [0; dos::config::BUFFER_SIZE];
    let n = buf.len();
    chunk[..n].copy_from_slice(buf.remaining());

    handle(buf)?
        .file
        .write_all(&chunk[..n])
        .map_err(|e| io_error(e, Error::WriteError))?;
    buf.set_span(0, 0);
    Ok(())
}

impl FileOps for HostFs {
    type Dir = vec::IntoIter<DirEntry>;
    type File = HostFile;

    fn open_read(&mut self, path: &[u8], name: &CbmName, buf: &mut Buffer<Self>) -> Result<(), Error> {
        let host = self.lookup(path, name)?;
        let file = File::open(&host).map_err(|e| io_error(e, Error::ReadError))?;
        let remaining = file
            .metadata()
            .map_err(|e| io_error(e, Error::ReadError))?
            .len();
        log::debug!("read {}", host.display());

        buf.pvt = Private::File(HostFile { file, remaining });
        read_chunk(buf)
    }

    fn open_write(
        &mut self,
        path: &[u8],
        name: &CbmName,
        ty: FileType,
        buf: &mut Buffer<Self>,
        append: bool,
    ) -> Result<(), Error> {
        let host = if append {
            self.lookup(path, name)?
        } else {
            self.dir_path(path)?.join(host_name(name, ty)?)
        };

        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .create_new(!append)
            .open(&host)
            .map_err(|e| io_error(e, Error::WriteError))?;
        log::debug!("write {}", host.display());

        buf.set_span(0, 0);
        buf.pvt = Private::File(HostFile { file, remaining: 0 });
        Ok(())
    }

    fn delete(&mut self, path: &[u8], name: &CbmName) -> Result<(), Error> {
        let host = self.lookup(path, name)?;
        if fs::metadata(&host).is_ok_and(|meta| meta.permissions().readonly()) {
            return Err(Error::WriteProtect);
        }
        fs::remove_file(&host).map_err(|e| io_error(e, Error::WriteError))
    }

    fn refill(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error> {
        if buf.write { flush(buf) } else { read_chunk(buf) }
    }

    fn cleanup(&mut self, buf: &mut Buffer<Self>) -> Result<(), Error> {
        if buf.write {
            flush(buf)?;
            handle(buf)?
                .file
                .flush()
                .map_err(|e| io_error(e, Error::WriteError))?;
        }
        Ok(())
    }

    fn opendir(&mut self, path: &[u8]) -> Result<Self::Dir, Error> {
        let entries: Vec<_> = self
            .scan(&self.dir_path(path)?)?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect();
        Ok(entries.into_iter())
    }

    fn readdir(&mut self, dir: &mut Self::Dir) -> Result<Option<DirEntry>, Error> {
        Ok(dir.next())
    }

    fn disk_label(&mut self) -> Result<CbmName, Error> {
        Ok(self.label)
    }

    fn disk_id(&mut self) -> Result<[u8; 5], Error> {
        Ok(self.id)
    }

    fn disk_free(&mut self) -> u16 {
        match self.used_blocks() {
            Ok(used) => self.capacity.saturating_sub(used),
            Err(_) => 0,
        }
    }
}
