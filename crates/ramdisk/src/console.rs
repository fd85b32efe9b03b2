//! Line console over a [`Ramdisk`].
//!
//! Each line is one command: a verb followed by whitespace-separated
//! arguments. Output is returned as text so the caller decides where it goes.

use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use strum::EnumString;
use thiserror::Error;

use ramdisk_kernel::{FileAttr, Ramdisk, SetAttr, VfsError, VfsOps};

const S_IFREG: u32 = 0o100000;
const S_IFDIR: u32 = 0o040000;
const PERM_MASK: u32 = 0o7777;

const HELP: &str = "\
commands:
  ls [path]                     list a directory
  stat <path>                   show attributes
  touch <path> [mode]           create an empty file
  mkdir <path> [mode]           create a directory
  write <path> <offset> <text>  write text at a byte offset
  append <path> <text>          write text at end of file
  cat <path> [offset] [len]     print file contents
  truncate <path> <len>         shrink a file
  rm <path>                     remove a file
  rmdir <path>                  remove an empty directory
  mv <from> <to>                rename, replacing the target
  chmod <mode> <path>           change permission bits
  df                            show capacity
  help                          this text
  exit                          stop
";

/// Console verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
enum Verb {
    #[strum(serialize = "ls", serialize = "dir")]
    Ls,
    Stat,
    Touch,
    Mkdir,
    Write,
    Append,
    Cat,
    Truncate,
    #[strum(serialize = "rm", serialize = "unlink")]
    Rm,
    Rmdir,
    #[strum(serialize = "mv", serialize = "rename")]
    Mv,
    Chmod,
    Df,
    #[strum(serialize = "help", serialize = "?")]
    Help,
    #[strum(serialize = "exit", serialize = "quit")]
    Exit,
}

/// Why a console line failed.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("{0}: command not found")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error(transparent)]
    Vfs(#[from] VfsError),
}

/// What the caller should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Print this text and read the next line.
    Continue(String),
    /// Stop reading.
    Exit,
}

/// Command dispatcher bound to one filesystem.
pub struct Console<'a> {
    fs: &'a Ramdisk,
}

impl<'a> Console<'a> {
    pub fn new(fs: &'a Ramdisk) -> Self {
        Self { fs }
    }

    /// Run one line. Failures are rendered into the output, never returned.
    pub async fn execute(&self, line: &str) -> Outcome {
        let mut args = line.split_whitespace();
        let Some(word) = args.next() else {
            return Outcome::Continue(String::new());
        };
        let verb = match Verb::from_str(word) {
            Ok(Verb::Exit) => return Outcome::Exit,
            Ok(verb) => verb,
            Err(_) => {
                return Outcome::Continue(render_error(&ConsoleError::UnknownCommand(
                    word.to_string(),
                )));
            }
        };

        let args: Vec<&str> = args.collect();
        match self.dispatch(verb, &args).await {
            Ok(output) => Outcome::Continue(output),
            Err(e) => {
                tracing::debug!(?verb, error = %e, "console command failed");
                Outcome::Continue(render_error(&e))
            }
        }
    }

    async fn dispatch(&self, verb: Verb, args: &[&str]) -> Result<String, ConsoleError> {
        match verb {
            Verb::Ls => self.ls(args.first().copied().unwrap_or("/")).await,
            Verb::Stat => {
                let [path] = args else {
                    return Err(ConsoleError::Usage("stat <path>"));
                };
                let attr = self.fs.getattr(Path::new(path)).await?;
                Ok(format_attr(path, &attr))
            }
            Verb::Touch => {
                let (path, perm) = path_and_mode(args, 0o644, "touch <path> [mode]")?;
                self.fs.create(Path::new(path), S_IFREG | perm).await?;
                Ok(String::new())
            }
            Verb::Mkdir => {
                let (path, perm) = path_and_mode(args, 0o755, "mkdir <path> [mode]")?;
                self.fs.mkdir(Path::new(path), S_IFDIR | perm).await?;
                Ok(String::new())
            }
            Verb::Write => {
                let [path, offset, text @ ..] = args else {
                    return Err(ConsoleError::Usage("write <path> <offset> <text>"));
                };
                let offset = parse_number(offset)?;
                let text = text.join(" ");
                let written = self.fs.write(Path::new(path), offset, text.as_bytes()).await?;
                Ok(format!("{written} bytes written\n"))
            }
            Verb::Append => {
                let [path, text @ ..] = args else {
                    return Err(ConsoleError::Usage("append <path> <text>"));
                };
                let path = Path::new(path);
                let size = self.fs.getattr(path).await?.size;
                let text = text.join(" ");
                let written = self.fs.write(path, size, text.as_bytes()).await?;
                Ok(format!("{written} bytes written\n"))
            }
            Verb::Cat => self.cat(args).await,
            Verb::Truncate => {
                let [path, len] = args else {
                    return Err(ConsoleError::Usage("truncate <path> <len>"));
                };
                self.fs.truncate(Path::new(path), parse_number(len)?).await?;
                Ok(String::new())
            }
            Verb::Rm => {
                let [path] = args else {
                    return Err(ConsoleError::Usage("rm <path>"));
                };
                self.fs.unlink(Path::new(path)).await?;
                Ok(String::new())
            }
            Verb::Rmdir => {
                let [path] = args else {
                    return Err(ConsoleError::Usage("rmdir <path>"));
                };
                self.fs.rmdir(Path::new(path)).await?;
                Ok(String::new())
            }
            Verb::Mv => {
                let [from, to] = args else {
                    return Err(ConsoleError::Usage("mv <from> <to>"));
                };
                self.fs.rename(Path::new(from), Path::new(to)).await?;
                Ok(String::new())
            }
            Verb::Chmod => {
                let [mode, path] = args else {
                    return Err(ConsoleError::Usage("chmod <mode> <path>"));
                };
                let perm = parse_mode(mode)?;
                let path = Path::new(path);
                let current = self.fs.getattr(path).await?;
                let mode = (current.mode & !PERM_MASK) | perm;
                self.fs.setattr(path, SetAttr::new().with_mode(mode)).await?;
                Ok(String::new())
            }
            Verb::Df => self.df().await,
            Verb::Help => Ok(HELP.to_string()),
            Verb::Exit => Ok(String::new()),
        }
    }

    async fn ls(&self, path: &str) -> Result<String, ConsoleError> {
        let entries = self.fs.readdir(Path::new(path)).await?;
        let mut out = String::new();
        for entry in entries {
            if entry.kind.is_dir() {
                let _ = writeln!(out, "  {}/", entry.name);
            } else {
                let _ = writeln!(out, "  {}", entry.name);
            }
        }
        Ok(out)
    }

    async fn cat(&self, args: &[&str]) -> Result<String, ConsoleError> {
        const USAGE: &str = "cat <path> [offset] [len]";
        let (path, offset, len) = match args {
            [path] => (*path, None, None),
            [path, offset] => (*path, Some(parse_number(offset)?), None),
            [path, offset, len] => (
                *path,
                Some(parse_number(offset)?),
                Some(parse_number(len)?),
            ),
            _ => return Err(ConsoleError::Usage(USAGE)),
        };

        let path = Path::new(path);
        let bytes = match (offset, len) {
            (None, _) => self.fs.read_all(path).await?,
            (Some(offset), len) => {
                let len = match len {
                    Some(len) => len,
                    None => self.fs.getattr(path).await?.size.saturating_sub(offset),
                };
                let len = u32::try_from(len)
                    .map_err(|_| ConsoleError::InvalidNumber(len.to_string()))?;
                self.fs.read(path, offset, len).await?
            }
        };

        let mut out = String::from_utf8_lossy(&bytes).into_owned();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    async fn df(&self) -> Result<String, ConsoleError> {
        let stat = self.fs.statfs().await?;
        let usage = self.fs.usage();
        Ok(format!(
            "size {} used {} avail {} ({} blocks of {} bytes, {} free)\n",
            usage.max_size,
            usage.curr_size,
            usage.available(),
            stat.blocks,
            stat.bsize,
            stat.bfree,
        ))
    }
}

fn path_and_mode<'s>(
    args: &[&'s str],
    default: u32,
    usage: &'static str,
) -> Result<(&'s str, u32), ConsoleError> {
    match args {
        [path] => Ok((path, default)),
        [path, mode] => Ok((path, parse_mode(mode)?)),
        _ => Err(ConsoleError::Usage(usage)),
    }
}

fn parse_number(s: &str) -> Result<u64, ConsoleError> {
    s.parse()
        .map_err(|_| ConsoleError::InvalidNumber(s.to_string()))
}

/// Octal permission bits, with or without a `0o` prefix.
fn parse_mode(s: &str) -> Result<u32, ConsoleError> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= PERM_MASK => Ok(mode),
        _ => Err(ConsoleError::InvalidNumber(s.to_string())),
    }
}

fn format_attr(path: &str, attr: &FileAttr) -> String {
    let kind = if attr.is_dir() { "directory" } else { "file" };
    format!(
        "{path}: {kind} size={} mode={:o} perm={:04o} nlink={}\n",
        attr.size,
        attr.mode,
        attr.perm(),
        attr.nlink,
    )
}

fn render_error(err: &ConsoleError) -> String {
    match err {
        #[cfg(unix)]
        ConsoleError::Vfs(e) => format!("error: {e} (errno {})\n", e.errno()),
        other => format!("error: {other}\n"),
    }
}
