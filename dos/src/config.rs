//! Constants used in the drive core

/// 缓冲区个数，同时也是能同时打开的通道上限
pub const BUFFER_COUNT: usize = 4;

/// 一个缓冲区的容量，即一个扇区
pub const BUFFER_SIZE: usize = 256;

/// 目录列表中的盘片ID（两字节ID、空格、两字节DOS标记）
pub const DEFAULT_DISK_ID: [u8; 5] = *b"IK 2A";

/// Turbodisk的M-E命令中，文件名长度所在的偏移
pub const TURBODISK_NAME_LENGTH_OFFSET: usize = 9;
