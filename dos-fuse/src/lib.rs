//! 宿主机上的驱动器：把一个目录当作磁盘，用记录总线模拟传输

mod host_fs;
pub mod listing;
mod trace_bus;

use dos::config::TURBODISK_NAME_LENGTH_OFFSET;

pub use self::{
    host_fs::{HostFile, HostFs},
    trace_bus::TraceBus,
};

/// 构造Turbodisk的M-E命令，文件名跟在长度字节之后
pub fn turbodisk_command(name: &[u8]) -> Vec<u8> {
    let mut command = b"M-E".to_vec();
    command.resize(TURBODISK_NAME_LENGTH_OFFSET, 0);
    command.push(name.len() as u8);
    command.extend_from_slice(name);
    command
}
