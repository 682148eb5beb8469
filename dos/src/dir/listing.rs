//! 目录列表的记录格式
//!
//! 列表是一段BASIC程序：两字节装载地址之后，每个目录项是一行，
//! 每行恰好32字节，以`0`结尾；最后一行报告空闲块数，随后是`0,0`程序结尾。

use vfs::{CBM_NAME_LENGTH, CbmName, DirEntry, EntryFlag, NAME_PAD};

/// 每条记录（包括表头、表尾）的字节数
pub const RECORD_SIZE: usize = 32;

/// 表头中卷标的偏移
pub const HEADER_OFFSET_NAME: usize = 8;

/// 表头中盘片ID的偏移
pub const HEADER_OFFSET_ID: usize = 26;

#[rustfmt::skip]
pub const HEADER: [u8; RECORD_SIZE] = [
    0x01, 0x04,                                     // BASIC起始地址
    0x01, 0x01,                                     // 下一行指针
    0x00, 0x00,                                     // 行号0
    0x12, 0x22,                                     // 反显开、引号
    b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ', // 16个空格的卷标
    b' ', b' ', b' ', b' ', b' ', b' ', b' ', b' ',
    0x22, 0x20,                                     // 引号、空格
    b'I', b'K', b' ', b'2', b'A',                   // ID、shift-space、DOS标记
    0x00,                                           // 行尾
];

#[rustfmt::skip]
pub const FOOTER: [u8; RECORD_SIZE] = [
    0x01, 0x01,                                     // 下一行指针
    0x00, 0x00,                                     // 空闲块数，稍后填入
    b'B', b'L', b'O', b'C', b'K', b'S', b' ',
    b'F', b'R', b'E', b'E', b'.',
    0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, // 填充
    0x20, 0x20, 0x20, 0x20, 0x20,
    0x00,                                           // 行尾
    0x00, 0x00,                                     // 程序结尾
];

pub fn header(label: &CbmName, id: &[u8; 5]) -> [u8; RECORD_SIZE] {
    let mut line = HEADER;
    line[HEADER_OFFSET_NAME..HEADER_OFFSET_NAME + CBM_NAME_LENGTH].copy_from_slice(label.as_bytes());
    line[HEADER_OFFSET_ID..HEADER_OFFSET_ID + id.len()].copy_from_slice(id);
    line
}

pub fn footer(free_blocks: u16) -> [u8; RECORD_SIZE] {
    let mut line = FOOTER;
    line[2..4].copy_from_slice(&free_blocks.to_le_bytes());
    line
}

/// 把一个目录项排成一行
pub fn entry(dent: &DirEntry) -> [u8; RECORD_SIZE] {
    let mut line = [b' '; RECORD_SIZE];
    line[RECORD_SIZE - 1] = 0;

    // 下一行指针，与1571一致
    line[0] = 1;
    line[1] = 1;
    line[2..4].copy_from_slice(&dent.blocks.to_le_bytes());

    // 块数不足四位时补空格，让引号对齐
    let mut p = 4 + [1000, 100, 10]
        .into_iter()
        .filter(|&n| dent.blocks < n)
        .count();
    line[p] = b'"';
    p += 1;

    // 名称加上结尾引号的位置
    let name = &mut line[p..=p + CBM_NAME_LENGTH];
    name[..CBM_NAME_LENGTH].copy_from_slice(dent.name.as_bytes());
    let end = dent
        .name
        .as_bytes()
        .iter()
        .position(|&b| b == b'"' || b == NAME_PAD)
        .unwrap_or(CBM_NAME_LENGTH);
    name[end] = b'"';
    name[end..].iter_mut().for_each(|b| *b &= 0x7F);
    p += CBM_NAME_LENGTH + 1;

    if dent.flags.contains(EntryFlag::Splat) {
        line[p] = b'*';
    }
    line[p + 1..p + 4].copy_from_slice(dent.ty.code());
    if dent.flags.contains(EntryFlag::ReadOnly) {
        line[p + 4] = b'<';
    }
    if dent.flags.contains(EntryFlag::Hidden) {
        line[p + 5] = b'H';
    }

    line
}
