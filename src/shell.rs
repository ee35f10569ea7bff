//! Command surface: one line per operation, mapped 1:1 onto `FileSystem` methods.

use std::io::Write;

use log::{error, warn};
use thiserror::Error;

use crate::{BlockDevice, FileSystem, Result};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("error: {0}")]
    Usage(&'static str),
    #[error("error: {0:?} is not a number")]
    InvalidNumber(String),
    #[error("{0}: command not found.")]
    CommandNotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Df,
    Create { name: String, size: i64 },
    Stat { name: String },
    Cat { name: String },
    Read { name: String, offset: i64, size: i64 },
    Rm { name: String },
    Ln { src: String, dest: String },
    Ls,
    Mkdir { name: String },
    Rmdir { name: String },
    Cd { name: String },
}

fn number(arg: &str) -> core::result::Result<i64, ParseError> {
    arg.parse()
        .map_err(|_| ParseError::InvalidNumber(arg.to_string()))
}

impl Command {
    /// Parses one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> core::result::Result<Option<Self>, ParseError> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((&name, args)) = args.split_first() else {
            return Ok(None);
        };
        let arg = |i: usize, usage: &'static str| {
            args.get(i)
                .map(|s| s.to_string())
                .ok_or(ParseError::Usage(usage))
        };

        let command = match name {
            "df" => Command::Df,
            "create" => {
                const USAGE: &str = "create <filename> <size>";
                Command::Create {
                    name: arg(0, USAGE)?,
                    size: number(&arg(1, USAGE)?)?,
                }
            }
            "stat" => Command::Stat {
                name: arg(0, "stat <filename>")?,
            },
            "cat" => Command::Cat {
                name: arg(0, "cat <filename>")?,
            },
            "read" => {
                const USAGE: &str = "read <filename> <offset> <size>";
                Command::Read {
                    name: arg(0, USAGE)?,
                    offset: number(&arg(1, USAGE)?)?,
                    size: number(&arg(2, USAGE)?)?,
                }
            }
            "rm" => Command::Rm {
                name: arg(0, "rm <filename>")?,
            },
            "ln" => {
                const USAGE: &str = "ln <src> <dest>";
                Command::Ln {
                    src: arg(0, USAGE)?,
                    dest: arg(1, USAGE)?,
                }
            }
            "ls" => Command::Ls,
            "mkdir" => Command::Mkdir {
                name: arg(0, "mkdir <dirname>")?,
            },
            "rmdir" => Command::Rmdir {
                name: arg(0, "rmdir <dirname>")?,
            },
            "cd" => Command::Cd {
                name: arg(0, "cd <dirname>")?,
            },
            other => return Err(ParseError::CommandNotFound(other.to_string())),
        };
        Ok(Some(command))
    }
}

/// Runs one command line against `fs`, printing results and diagnostics to `out`.
///
/// Returns the status of the command: 0 on success, -1 on a usage error or a failed
/// operation. Fatal file system errors and output errors are returned as `Err`, after
/// which the session must end.
pub fn execute<D: BlockDevice>(
    fs: &mut FileSystem<D>,
    line: &str,
    out: &mut impl Write,
) -> Result<i32> {
    let command = match Command::parse(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Ok(0),
        Err(e) => {
            writeln!(out, "{e}")?;
            return Ok(-1);
        }
    };

    match run(fs, &command, out) {
        Ok(()) => Ok(0),
        Err(e) if e.is_fatal() => {
            error!("{command:?}: {e}");
            Err(e)
        }
        Err(e) => {
            warn!("{command:?}: {e}");
            writeln!(out, "{} failed: {e}", command.verb())?;
            Ok(-1)
        }
    }
}

impl Command {
    fn verb(&self) -> &'static str {
        match self {
            Command::Df => "df",
            Command::Create { .. } => "create",
            Command::Stat { .. } => "stat",
            Command::Cat { .. } => "cat",
            Command::Read { .. } => "read",
            Command::Rm { .. } => "rm",
            Command::Ln { .. } => "ln",
            Command::Ls => "ls",
            Command::Mkdir { .. } => "mkdir",
            Command::Rmdir { .. } => "rmdir",
            Command::Cd { .. } => "cd",
        }
    }
}

fn run<D: BlockDevice>(fs: &mut FileSystem<D>, command: &Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Df => writeln!(out, "{}", fs.df())?,
        Command::Create { name, size } => {
            let inode_id = fs.create(name, *size)?;
            writeln!(out, "file created: {name}, inode {inode_id}, size {size}")?;
        }
        Command::Stat { name } => writeln!(out, "{}", fs.stat(name)?)?,
        Command::Cat { name } => {
            let data = fs.cat(name)?;
            writeln!(out, "{}", String::from_utf8_lossy(&data))?;
        }
        Command::Read { name, offset, size } => {
            if *offset < 0 {
                return Err(crate::Error::InvalidSize(*offset));
            }
            if *size < 0 {
                return Err(crate::Error::InvalidSize(*size));
            }
            let data = fs.read(name, *offset as usize, *size as usize)?;
            writeln!(out, "{}", String::from_utf8_lossy(&data))?;
        }
        Command::Rm { name } => {
            fs.remove(name)?;
            writeln!(out, "file removed: {name}")?;
        }
        Command::Ln { src, dest } => {
            fs.link(src, dest)?;
            writeln!(out, "link created: {dest} -> {src}")?;
        }
        Command::Ls => {
            for entry in fs.ls()? {
                writeln!(out, "{entry}")?;
            }
        }
        Command::Mkdir { name } => {
            let inode_id = fs.mkdir(name)?;
            writeln!(out, "directory created: {name}, inode {inode_id}")?;
        }
        Command::Rmdir { name } => {
            fs.rmdir(name)?;
            writeln!(out, "directory removed: {name}")?;
        }
        Command::Cd { name } => {
            fs.cd(name)?;
            writeln!(out, "current directory: {name}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("ls").unwrap(), Some(Command::Ls));
        assert_eq!(
            Command::parse("read a.txt 3 10").unwrap(),
            Some(Command::Read {
                name: "a.txt".to_string(),
                offset: 3,
                size: 10,
            })
        );
        assert_eq!(
            Command::parse("create a.txt -1").unwrap(),
            Some(Command::Create {
                name: "a.txt".to_string(),
                size: -1,
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Command::parse("create a.txt"),
            Err(ParseError::Usage("create <filename> <size>"))
        );
        assert_eq!(Command::parse("ln a"), Err(ParseError::Usage("ln <src> <dest>")));
        assert!(matches!(
            Command::parse("create a.txt big"),
            Err(ParseError::InvalidNumber(_))
        ));
        assert_eq!(
            Command::parse("format").unwrap_err().to_string(),
            "format: command not found."
        );
    }
}
