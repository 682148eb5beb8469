//! 快速装载协议
//!
//! 主机通过M-E命令上传自己的传输例程后，驱动器改用私有的帧格式
//! 把整个文件一口气送上总线，期间不响应标准协议。

pub mod turbodisk;

use bus_dev::{BusDevice, Preemption};
use vfs::Error;

use crate::control::Dos;
use crate::fileops::FileOps;

/// 已识别的快速装载协议
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastLoader {
    Turbodisk,
}

impl FastLoader {
    /// 按协议执行一次装载，`command`是触发它的M-E命令
    pub fn load<F, B>(self, dos: &mut Dos<F>, bus: &mut B, command: &[u8]) -> Result<(), Error>
    where
        F: FileOps,
        B: BusDevice + Preemption,
    {
        match self {
            Self::Turbodisk => turbodisk::load(dos, bus, command),
        }
    }
}
