//! # 驱动器核心
//!
//! 缓冲池、后端分派、虚拟目录与快速装载协议。
//! 不使用堆，所有状态都归一个[`Dos`]所有。

#![cfg_attr(not(test), no_std)]

mod buffers;
mod command;
pub mod config;
mod control;
pub mod dir;
pub mod fastloader;
mod fileops;
#[cfg(test)]
mod mock;
mod sync;

pub use self::{
    buffers::{Buffer, BufferId, BufferPool, Private},
    command::{Command, DirectoryRequest, OpenRequest, parse_open},
    control::Dos,
    dir::{DirState, Pattern, TypeFilter},
    fastloader::FastLoader,
    fileops::{FileOps, OpenMode},
    sync::CriticalSection,
};
