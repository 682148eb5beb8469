/// 驱动器状态，只有状态码，文字由命令通道负责格式化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 底层存储读取失败
    ReadError,
    /// 底层存储写入失败
    WriteError,
    WriteProtect,
    /// 没有给出文件名
    SyntaxNoName,
    FileNotFound,
    FileExists,
    /// 缓冲区耗尽
    NoChannel,
    DiskFull,
    DriveNotReady,
}

impl Error {
    /// DOS错误号
    pub const fn code(self) -> u8 {
        match self {
            Self::ReadError => 20,
            Self::WriteError => 25,
            Self::WriteProtect => 26,
            Self::SyntaxNoName => 34,
            Self::FileNotFound => 62,
            Self::FileExists => 63,
            Self::NoChannel => 70,
            Self::DiskFull => 72,
            Self::DriveNotReady => 74,
        }
    }
}
