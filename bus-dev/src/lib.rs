//! # 总线接口层
//!
//! 串行总线按**位**收发数据，时序以微秒计，由底层的位收发例程负责；
//! [`BusDevice`] 是对这些例程的抽象，实现了此特质的类型称为**总线驱动**。
//!
//! 快速传输协议的帧格式对本层透明，驱动只管把字节按协议送上总线。

#![no_std]

/// 总线的时钟线握手模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusMode {
    /// 标准协议，时钟线参与握手
    #[default]
    Normal,
    /// 快速传输协议私有的信号模式，不握手
    Fast,
}

/// 总线驱动特质
pub trait BusDevice {
    fn mode(&self) -> BusMode;

    fn set_mode(&mut self, mode: BusMode);

    fn send_byte(&mut self, byte: u8);

    /// 块传输原语，协议可以有自己的块帧格式
    fn send_block(&mut self, data: &[u8]) {
        for &byte in data {
            self.send_byte(byte);
        }
    }
}

/// 中断（抢占）的屏蔽与启用
pub trait Preemption {
    /// 屏蔽中断，返回屏蔽之前是否启用
    fn disable(&mut self) -> bool;

    fn enable(&mut self);
}
