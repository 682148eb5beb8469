use vfs::{CBM_NAME_LENGTH, CbmName, DirEntry, FileType};

/// 文件名匹配模式。
///
/// `?`匹配任意一个字符，`*`匹配此后的一切（`*`之后的字符永远不会被读到），
/// 其余字符原样比较，区分大小写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pattern {
    /// 多留一个字节，超长的模式才不会因为截断而误匹配
    bytes: [u8; CBM_NAME_LENGTH + 1],
    len: usize,
}

impl Pattern {
    pub fn new(pattern: &[u8]) -> Self {
        let mut bytes = [0; CBM_NAME_LENGTH + 1];
        let len = pattern.len().min(bytes.len());
        bytes[..len].copy_from_slice(&pattern[..len]);
        Self { bytes, len }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// 空模式等同于没有模式
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn matches(&self, name: &CbmName) -> bool {
        if self.is_empty() {
            return true;
        }

        let mut pattern = self.as_bytes().iter();
        for &b in name.trimmed() {
            match pattern.next() {
                Some(b'*') => return true,
                Some(b'?') => {}
                Some(&p) if p == b => {}
                _ => return false,
            }
        }

        matches!(pattern.next(), None | Some(b'*'))
    }
}

/// 目录列表的类型过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeFilter {
    /// `None`不限类型
    pub ty: Option<FileType>,
    /// 同时列出隐藏文件
    pub hidden: bool,
}

impl TypeFilter {
    /// 任何类型，包括隐藏文件
    pub const ALL: Self = Self {
        ty: None,
        hidden: true,
    };

    /// 解析`=X`后缀的字母。
    ///
    /// 不认识的字母不报错，视同不过滤。
    pub fn from_suffix(letter: u8) -> Self {
        let ty = match letter {
            b'S' => FileType::Seq,
            b'P' => FileType::Prg,
            b'U' => FileType::Usr,
            b'R' => FileType::Rel,
            b'C' => FileType::Cbm,
            // DEL本来就匹配一切，B兼容CMD驱动器
            b'B' | b'D' => FileType::Dir,
            b'H' => return Self::ALL,
            _ => return Self::default(),
        };

        Self {
            ty: Some(ty),
            hidden: false,
        }
    }

    pub fn accepts(&self, entry: &DirEntry) -> bool {
        if self.ty.is_some_and(|ty| ty != entry.ty) {
            return false;
        }
        self.hidden || !entry.is_hidden()
    }
}
