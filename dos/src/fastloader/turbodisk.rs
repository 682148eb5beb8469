//! Turbodisk
//!
//! 每个扇区以一个状态字节开头。第一个扇区先单独发出两字节装载地址；
//! 中间扇区整块发送；最后一个扇区先发“剩余字节数+1”，再逐字节发送。
//! 出错时发出[`SENTINEL_ERROR`]，主机据此放弃装载。

use bus_dev::{BusDevice, Preemption};
use vfs::Error;

use crate::buffers::BufferId;
use crate::config::TURBODISK_NAME_LENGTH_OFFSET;
use crate::control::Dos;
use crate::fileops::FileOps;
use crate::sync::CriticalSection;

/// 后面还有扇区
pub const STATUS_MORE: u8 = 1;
/// 这是最后一个扇区
pub const STATUS_LAST: u8 = 0;
/// 打开或补充失败
pub const SENTINEL_ERROR: u8 = 0xFF;

/// 最后扇区的长度字节是剩余字节数加一
const MAX_FINAL_LENGTH: usize = u8::MAX as usize;

/// 从M-E命令中取出文件名
pub fn filename(command: &[u8]) -> Result<&[u8], Error> {
    let start = TURBODISK_NAME_LENGTH_OFFSET + 1;
    let len = *command
        .get(TURBODISK_NAME_LENGTH_OFFSET)
        .ok_or(Error::SyntaxNoName)?;
    command
        .get(start..start + usize::from(len))
        .filter(|name| !name.is_empty())
        .ok_or(Error::SyntaxNoName)
}

/// 打开文件并把它整个送上总线。
///
/// 无论成功与否，返回时总线已回到原来的模式、中断已恢复，
/// 打开的缓冲区已清理。
pub fn load<F, B>(dos: &mut Dos<F>, bus: &mut B, command: &[u8]) -> Result<(), Error>
where
    F: FileOps,
    B: BusDevice + Preemption,
{
    let opened = filename(command).and_then(|name| dos.open(name, 0));
    let id = match opened {
        Ok(id) => id,
        Err(e) => {
            log::error!("turbodisk: open failed ({e:?})");
            CriticalSection::enter(bus).send_byte(SENTINEL_ERROR);
            return dos.record(Err(e));
        }
    };

    let res = stream(dos, &mut CriticalSection::enter(bus), id);
    if let Err(e) = res {
        log::error!("turbodisk: aborted ({e:?})");
    }

    let cleanup = dos.cleanup(id);
    dos.record(res.and(cleanup))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FirstSector,
    Sector,
    Done,
    Abort(Error),
}

fn stream<F, B>(dos: &mut Dos<F>, bus: &mut CriticalSection<'_, B>, id: BufferId) -> Result<(), Error>
where
    F: FileOps,
    B: BusDevice + Preemption,
{
    let mut phase = Phase::FirstSector;

    loop {
        phase = match phase {
            Phase::Done => return Ok(()),
            Phase::Abort(e) => return Err(e),
            Phase::FirstSector | Phase::Sector => {
                let buf = dos.buffer_mut(id);
                let payload = match phase {
                    Phase::FirstSector => buf.len().saturating_sub(2),
                    _ => buf.len(),
                };
                // 长度字节放不下时，这一块照常整块发送，随后补一个空的最后扇区
                let last = buf.send_eoi && payload < MAX_FINAL_LENGTH;
                bus.send_byte(if last { STATUS_LAST } else { STATUS_MORE });

                if phase == Phase::FirstSector {
                    // 装载地址
                    bus.send_byte(buf.pop().unwrap_or(0));
                    bus.send_byte(buf.pop().unwrap_or(0));
                }

                if last {
                    bus.send_byte((buf.len() + 1) as u8);
                    while let Some(byte) = buf.pop() {
                        bus.send_byte(byte);
                    }
                    Phase::Done
                } else {
                    bus.send_block(buf.remaining());
                    let n = buf.len();
                    buf.skip(n);

                    if buf.send_eoi {
                        Phase::Sector
                    } else {
                        match dos.refill(id) {
                            Ok(()) => Phase::Sector,
                            Err(e) => {
                                bus.send_byte(SENTINEL_ERROR);
                                Phase::Abort(e)
                            }
                        }
                    }
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use bus_dev::BusMode;
    use vfs::{CbmName, FileType};

    use super::*;
    use crate::config::BUFFER_SIZE;
    use crate::dir::listing;
    use crate::fastloader::FastLoader;
    use crate::mock::{Event, MemFs, RecordingBus};

    /// 构造M-E命令，前九个字节是传输例程的地址之类，这里不关心
    fn command(name: &[u8]) -> Vec<u8> {
        let mut command = b"M-E\x00\x05\x00\x00\x00\x00".to_vec();
        command.push(name.len() as u8);
        command.extend_from_slice(name);
        command
    }

    fn payload(events: &[Event]) -> &[Event] {
        assert_eq!([Event::Disable, Event::Mode(BusMode::Fast)].as_slice(), &events[..2]);
        let n = events.len();
        assert_eq!([Event::Mode(BusMode::Normal), Event::Enable].as_slice(), &events[n - 2..]);
        &events[2..n - 2]
    }

    fn setup(data: &[u8]) -> (Dos<MemFs>, RecordingBus) {
        let mut fs = MemFs::default();
        fs.add(b"GAME", FileType::Prg, data);
        (Dos::new(fs), RecordingBus::default())
    }

    #[test]
    fn filename_offsets() {
        assert_eq!(Ok(b"GAME".as_slice()), filename(&command(b"GAME")));
        assert_eq!(Err(Error::SyntaxNoName), filename(&command(b"")));
        assert_eq!(Err(Error::SyntaxNoName), filename(b"M-E"));

        // 长度超出命令本身
        let mut truncated = command(b"GAME");
        truncated.pop();
        assert_eq!(Err(Error::SyntaxNoName), filename(&truncated));
    }

    #[test]
    fn multi_sector_framing() {
        let data: Vec<u8> = (0..600).map(|i| (i % 251) as u8).collect();
        let (mut dos, mut bus) = setup(&data);

        FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"GAME")).unwrap();

        let expected = [
            Event::Byte(STATUS_MORE),
            Event::Byte(data[0]),
            Event::Byte(data[1]),
            Event::Block(data[2..BUFFER_SIZE].to_vec()),
            Event::Byte(STATUS_MORE),
            Event::Block(data[BUFFER_SIZE..2 * BUFFER_SIZE].to_vec()),
            Event::Byte(STATUS_LAST),
            Event::Byte((600 - 2 * BUFFER_SIZE + 1) as u8),
        ]
        .into_iter()
        .chain(data[2 * BUFFER_SIZE..].iter().map(|&b| Event::Byte(b)))
        .collect::<Vec<_>>();

        assert_eq!(expected.as_slice(), payload(&bus.events));
        assert_eq!(2, dos.ops().refills);
        assert_eq!(1, dos.ops().cleanups);
        assert_eq!(0, dos.buffers().allocated());
        assert_eq!(None, dos.status());
    }

    #[test]
    fn single_sector() {
        let (mut dos, mut bus) = setup(b"\x01\x08\xaa\xbb\xcc");
        FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"G*")).unwrap();

        let expected = [STATUS_LAST, 0x01, 0x08, 4, 0xaa, 0xbb, 0xcc].map(Event::Byte);
        assert_eq!(expected.as_slice(), payload(&bus.events));
        assert_eq!(0, dos.ops().refills);
        assert_eq!(1, dos.ops().cleanups);
    }

    #[test]
    fn short_first_sector() {
        let (mut dos, mut bus) = setup(b"\x01");
        FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"GAME")).unwrap();

        let expected = [STATUS_LAST, 0x01, 0x00, 1].map(Event::Byte);
        assert_eq!(expected.as_slice(), payload(&bus.events));
    }

    #[test]
    fn full_final_sector() {
        let data = vec![0x5A; 2 * BUFFER_SIZE];
        let (mut dos, mut bus) = setup(&data);
        FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"GAME")).unwrap();

        let expected = [
            Event::Byte(STATUS_MORE),
            Event::Byte(0x5A),
            Event::Byte(0x5A),
            Event::Block(data[2..BUFFER_SIZE].to_vec()),
            Event::Byte(STATUS_MORE),
            Event::Block(data[BUFFER_SIZE..].to_vec()),
            Event::Byte(STATUS_LAST),
            Event::Byte(1),
        ];
        assert_eq!(expected.as_slice(), payload(&bus.events));
        assert_eq!(1, dos.ops().refills);
    }

    #[test]
    fn refill_failure_aborts() {
        let data = vec![0x11; 3 * BUFFER_SIZE];
        let (mut dos, mut bus) = setup(&data);
        dos.ops_mut().fail_refill_at = Some(1);

        let res = FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"GAME"));
        assert_eq!(Err(Error::ReadError), res);
        assert_eq!(Some(Error::ReadError), dos.status());

        let events = payload(&bus.events);
        assert_eq!(Some(&Event::Byte(SENTINEL_ERROR)), events.last());
        // 哨兵之前恰好两个扇区
        let blocks = events.iter().filter(|e| matches!(e, Event::Block(_))).count();
        assert_eq!(2, blocks);

        assert_eq!(1, dos.ops().cleanups);
        assert_eq!(0, dos.buffers().allocated());
        assert!(bus.interrupts);
        assert_eq!(BusMode::Normal, bus.mode);
    }

    #[test]
    fn open_failure_sends_sentinel() {
        let (mut dos, mut bus) = setup(b"xx");
        let res = FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"MISSING"));
        assert_eq!(Err(Error::FileNotFound), res);

        assert_eq!([Event::Byte(SENTINEL_ERROR)].as_slice(), payload(&bus.events));
        assert_eq!(0, dos.ops().cleanups);
        assert_eq!(0, dos.buffers().allocated());
    }

    #[test]
    fn no_free_buffer() {
        let (mut dos, mut bus) = setup(b"xx");
        let held: Vec<_> = (0..crate::config::BUFFER_COUNT)
            .map(|i| dos.open(b"GAME", 2 + i as u8).unwrap())
            .collect();

        let res = FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"GAME"));
        assert_eq!(Err(Error::NoChannel), res);
        assert_eq!([Event::Byte(SENTINEL_ERROR)].as_slice(), payload(&bus.events));

        for id in held {
            dos.close(id).unwrap();
        }
    }

    #[test]
    fn directory_as_a_program() {
        let (mut dos, mut bus) = setup(b"xx");
        dos.ops_mut().label = CbmName::new(b"DEMO");
        FastLoader::Turbodisk.load(&mut dos, &mut bus, &command(b"$")).unwrap();

        let events = payload(&bus.events);
        // 表头是第一个扇区，装载地址即BASIC起始地址
        assert_eq!(
            [STATUS_MORE, 0x01, 0x04].map(Event::Byte).as_slice(),
            &events[..3]
        );
        let header = listing::header(&CbmName::new(b"DEMO"), b"IK 2A");
        assert_eq!(Event::Block(header[2..].to_vec()), events[3]);
        // 一个目录项，随后是表尾
        assert_eq!(Event::Byte(STATUS_MORE), events[4]);
        assert_eq!(Event::Byte(STATUS_LAST), events[6]);
        assert_eq!(Event::Byte(listing::RECORD_SIZE as u8 + 1), events[7]);
        assert_eq!(8 + listing::RECORD_SIZE, events.len());
    }
}
