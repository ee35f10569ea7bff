mod cli;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use cli::Cli;
use simfs::{shell, BlockFile, FileSystem};

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> simfs::Result<()> {
    let (disk, existed) = BlockFile::open(&cli.disk)?;
    log::info!("disk={:?} existed={existed}", cli.disk);
    let disk = Arc::new(disk);
    let mut fs = if existed {
        FileSystem::mount_existing(disk)?
    } else {
        FileSystem::mount(disk)?
    };

    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let prompt = !cli.quiet && cli.script.is_none();
    let mut stdout = io::stdout();

    if prompt {
        print!("simfs> ");
        stdout.flush()?;
    }
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        shell::execute(&mut fs, line, &mut stdout)?;
        if prompt {
            print!("simfs> ");
            stdout.flush()?;
        }
    }

    fs.unmount()
}
