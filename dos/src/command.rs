//! 打开命令的拆分
//!
//! `[@][驱动器][路径]:名称[,类型][,模式]`，或`$[驱动器][路径]:模式[=类型]`。

use vfs::{Error, FileType};

use crate::dir::TypeFilter;
use crate::fileops::OpenMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Directory(DirectoryRequest<'a>),
    Open(OpenRequest<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectoryRequest<'a> {
    pub path: &'a [u8],
    /// 空模式匹配一切
    pub pattern: &'a [u8],
    pub filter: TypeFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenRequest<'a> {
    pub path: &'a [u8],
    /// 可以带通配符
    pub name: &'a [u8],
    pub mode: Option<OpenMode>,
    pub ty: Option<FileType>,
    /// 以`@`开头，覆盖同名文件
    pub rewrite: bool,
}

pub fn parse_open(command: &[u8]) -> Result<Command<'_>, Error> {
    match command {
        [] => Err(Error::SyntaxNoName),
        [b'$', body @ ..] => Ok(Command::Directory(parse_directory(body))),
        _ => Ok(Command::Open(parse_file(command))),
    }
}

fn parse_directory(body: &[u8]) -> DirectoryRequest<'_> {
    // 只有驱动器号
    if body.iter().all(u8::is_ascii_digit) {
        return DirectoryRequest::default();
    }

    let (path, name) = split_path(body);
    let (pattern, filter) = match name.iter().position(|&b| b == b'=') {
        Some(eq) => (
            &name[..eq],
            name.get(eq + 1)
                .map_or(TypeFilter::default(), |&letter| TypeFilter::from_suffix(letter)),
        ),
        None => (name, TypeFilter::default()),
    };

    DirectoryRequest {
        path,
        pattern,
        filter,
    }
}

fn parse_file(command: &[u8]) -> OpenRequest<'_> {
    let (rewrite, command) = match command {
        [b'@', rest @ ..] => (true, rest),
        _ => (false, command),
    };

    let mut parts = command.split(|&b| b == b',');
    let (path, name) = split_path(parts.next().unwrap_or_default());

    let mut req = OpenRequest {
        path,
        name,
        rewrite,
        ..Default::default()
    };

    // 只看每段的首字母
    for part in parts {
        match part.first() {
            Some(b'R') => req.mode = Some(OpenMode::Read),
            Some(b'W') => req.mode = Some(OpenMode::Write),
            Some(b'A') => req.mode = Some(OpenMode::Append),
            Some(b'M') => req.mode = Some(OpenMode::Modify),
            Some(b'D') => req.ty = Some(FileType::Del),
            Some(b'S') => req.ty = Some(FileType::Seq),
            Some(b'P') => req.ty = Some(FileType::Prg),
            Some(b'U') => req.ty = Some(FileType::Usr),
            Some(b'L') => req.ty = Some(FileType::Rel),
            _ => {}
        }
    }

    req
}

/// 以`:`分开路径与名称，路径开头的驱动器号丢掉
fn split_path(bytes: &[u8]) -> (&[u8], &[u8]) {
    match bytes.iter().position(|&b| b == b':') {
        Some(colon) => {
            let path = &bytes[..colon];
            let drive = path.iter().take_while(|b| b.is_ascii_digit()).count();
            (&path[drive..], &bytes[colon + 1..])
        }
        None => (b"", bytes),
    }
}
