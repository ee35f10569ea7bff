use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Disk image backing the file system, created when missing
    #[arg(default_value = "disk.img")]
    pub disk: PathBuf,

    /// Read commands from this file instead of stdin
    #[arg(long, short)]
    pub script: Option<PathBuf>,

    /// Don't print the prompt
    #[arg(long, short)]
    pub quiet: bool,
}
