use core::fmt;

use enumflags2::{BitFlags, bitflags};

/// 目录项名称的固定宽度
pub const CBM_NAME_LENGTH: usize = 16;

/// Shifted space，名称不足16字节时用它填充，同时标记名称的逻辑结尾
pub const NAME_PAD: u8 = 0xA0;

/// 定宽、以[`NAME_PAD`]填充的文件名。
///
/// 字节按主机字符集原样保存，大小写不做转换。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CbmName([u8; CBM_NAME_LENGTH]);

impl CbmName {
    pub const EMPTY: Self = Self([NAME_PAD; CBM_NAME_LENGTH]);

    /// 超过16字节的部分被截断
    pub fn new(bytes: &[u8]) -> Self {
        let mut name = Self::EMPTY;
        name.0
            .iter_mut()
            .zip(bytes)
            .for_each(|(b1, b2)| *b1 = *b2);
        name
    }

    pub const fn as_bytes(&self) -> &[u8; CBM_NAME_LENGTH] {
        &self.0
    }

    /// 去掉填充后的名称
    pub fn trimmed(&self) -> &[u8] {
        let len = self
            .0
            .iter()
            .position(|&b| b == NAME_PAD)
            .unwrap_or(CBM_NAME_LENGTH);
        &self.0[..len]
    }
}

impl Default for CbmName {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for CbmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.trimmed().escape_ascii())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FileType {
    #[default]
    Del,
    Seq,
    Prg,
    Usr,
    Rel,
    /// 原生分区
    Cbm,
    Dir,
}

impl FileType {
    /// 目录列表中显示的三字母类型
    pub const fn code(self) -> &'static [u8; 3] {
        match self {
            Self::Del => b"DEL",
            Self::Seq => b"SEQ",
            Self::Prg => b"PRG",
            Self::Usr => b"USR",
            Self::Rel => b"REL",
            Self::Cbm => b"CBM",
            Self::Dir => b"DIR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[bitflags]
#[repr(u8)]
pub enum EntryFlag {
    ReadOnly = 0b0000_0001,
    Hidden = 0b0000_0010,
    /// The file was never closed properly
    Splat = 0b0000_0100,
}

/// 目录游标每次产出的一个目录项，用完即弃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirEntry {
    pub name: CbmName,
    /// 占用的块数
    pub blocks: u16,
    pub ty: FileType,
    pub flags: BitFlags<EntryFlag>,
}

impl DirEntry {
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(EntryFlag::Hidden)
    }
}
