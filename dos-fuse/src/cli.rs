use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Host directory served as the disk
    #[arg(long, short, default_value = ".")]
    pub dir: PathBuf,

    /// Disk label shown in the listing header
    #[arg(long, short, default_value = "HOST DISK")]
    pub label: String,

    /// Disk ID and DOS type, five characters
    #[arg(long, default_value = "IK 2A")]
    pub id: String,

    /// Disk capacity in blocks
    #[arg(long, short, default_value_t = 664)]
    pub capacity: u16,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the directory listing
    Dir {
        /// Name pattern, optionally followed by `=X` type filter
        pattern: Option<String>,
    },
    /// Run a Turbodisk transfer and save the bytes sent on the bus
    Load {
        name: String,

        /// Trace output file
        #[arg(long, short)]
        output: PathBuf,
    },
}
