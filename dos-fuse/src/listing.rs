//! 把目录列表（一段BASIC程序）还原成文本行

use vfs::NAME_PAD;

/// 反显开
const RVS_ON: u8 = 0x12;

/// 逐行展开，`行号 文本`；程序在`0,0`链接处或数据用尽时结束
pub fn render(program: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    // 装载地址
    let mut rest = program.get(2..).unwrap_or_default();

    while let [l0, l1, n0, n1, body @ ..] = rest {
        if *l0 == 0 && *l1 == 0 {
            break;
        }
        let number = u16::from_le_bytes([*n0, *n1]);
        let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());

        let text: String = body[..end]
            .iter()
            .filter(|&&b| b != RVS_ON)
            .map(|&b| match b {
                NAME_PAD => ' ',
                0x20..=0x7E => char::from(b),
                _ => '?',
            })
            .collect();
        lines.push(format!("{number} {text}"));

        rest = body.get(end + 1..).unwrap_or_default();
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_program_end() {
        let mut program = vec![0x01, 0x04];
        program.extend_from_slice(&[1, 1, 3, 0]);
        program.extend_from_slice(b"  \"A\" PRG\0");
        program.extend_from_slice(&[1, 1, 0x98, 0x02]);
        program.extend_from_slice(b"BLOCKS FREE.\0");
        program.extend_from_slice(&[0, 0]);

        assert_eq!(vec!["3   \"A\" PRG", "664 BLOCKS FREE."], render(&program));
    }

    #[test]
    fn truncated_program() {
        assert!(render(&[0x01]).is_empty());
        assert_eq!(vec!["0 AB"], render(&[1, 4, 1, 1, 0, 0, 0x12, b'A', b'B']));
    }
}
