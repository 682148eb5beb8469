mod cli;

use std::fs;
use std::io;

use clap::Parser;
use dos::{Dos, FastLoader};
use dos_fuse::{HostFs, TraceBus, listing};

use self::cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut id = [b' '; 5];
    id.iter_mut()
        .zip(cli.id.bytes())
        .for_each(|(b1, b2)| *b1 = b2);

    let mut dos = Dos::new(HostFs::new(&cli.dir, cli.label.as_bytes(), id, cli.capacity));
    log::info!("disk={:?}", dos.ops().root());

    match cli.command {
        Command::Dir { pattern } => {
            let command = match pattern {
                Some(pattern) => format!("$:{pattern}"),
                None => "$".to_owned(),
            };

            let chan = dos.open(command.as_bytes(), 0).map_err(dos_error)?;
            let mut program = Vec::new();
            let res = loop {
                match dos.next_byte(chan) {
                    Ok(Some(byte)) => program.push(byte),
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                }
            };
            dos.close(chan).and(res).map_err(dos_error)?;

            for line in listing::render(&program) {
                println!("{line}");
            }
        }
        Command::Load { name, output } => {
            let mut bus = TraceBus::default();
            let command = dos_fuse::turbodisk_command(name.as_bytes());
            let res = FastLoader::Turbodisk.load(&mut dos, &mut bus, &command);

            fs::write(&output, bus.bytes())?;
            log::info!(
                "{} bytes in {} blocks written to {:?}",
                bus.bytes().len(),
                bus.blocks(),
                output
            );
            res.map_err(dos_error)?;
        }
    }

    Ok(())
}

fn dos_error(e: vfs::Error) -> io::Error {
    io::Error::other(format!("{:02}, {e:?}", e.code()))
}
