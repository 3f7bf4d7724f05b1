//! Built-in commands behind the `>` sigil.
//!
//! Words arrive already split. An empty first word prints [`SHELL_HELP`];
//! `cd`, `pwd`, `dirs`, `pushd`, `popd` and `path` are handled here, as is
//! `ls` on Windows. Anything else is spawned with inherited stdio.

use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, info};

pub const SHELL_HELP: &str = "\
Built-in shell commands:
  pwd              Print current directory
  cd [dir]         Change current directory to 'dir'
                   or print current directory
  dirs             Print directory stack
  pushd [dir]      Push current directory to stack and change to 'dir'
                   or swap current directory with top of stack
  popd             Pop directory from stack and change to it
  ls [dir]         (Windows only) List contents of 'dir'
                   or current directory
  path [=/+= dir]  Print or modify PATH environment variable
                   += prepends 'dir' to PATH
Others:            Call the executable with arguments
                   e.g. > vim file.c
";

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_SEPARATOR: &str = ":";

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}: too many arguments")]
    TooManyArguments(&'static str),
    #[error("pushd: no other directory")]
    NoOtherDirectory,
    #[error("popd: directory stack empty")]
    StackEmpty,
    #[error("path: invalid arguments")]
    InvalidPathArguments,
    #[error("{command}: {}: {source}", path.display())]
    ChangeDirectory {
        command: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("ls: could not read directory {}", path.display())]
    ReadDirectory { path: PathBuf, source: io::Error },
    #[error("{program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("{program} exited with {status}")]
    Exited { program: String, status: ExitStatus },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// `PATH` with `dir` in front.
pub fn prepend_path(dir: &str, old: &str) -> String {
    if old.is_empty() {
        dir.to_string()
    } else {
        format!("{dir}{PATH_SEPARATOR}{old}")
    }
}

/// Sorted entry names of `dir`.
pub fn list_directory(dir: &Path) -> Result<Vec<String>, ShellError> {
    let read_err = |source| ShellError::ReadDirectory {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = std::fs::read_dir(dir)
        .map_err(read_err)?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    names.sort();
    Ok(names)
}

fn set_path(value: &str) {
    // SAFETY: the session thread is the only one touching the environment;
    // the log writer thread never reads it.
    unsafe { env::set_var("PATH", value) };
    info!(target: "shell", len = value.len(), "path_changed");
}

fn current_path() -> String {
    env::var_os("PATH")
        .unwrap_or_else(OsString::new)
        .to_string_lossy()
        .into_owned()
}

/// Shell state that outlives a single command: the `pushd` stack.
#[derive(Debug, Default)]
pub struct Shell {
    stack: Vec<PathBuf>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently pushed last.
    pub fn stack(&self) -> &[PathBuf] {
        &self.stack
    }

    pub fn run(&mut self, words: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
        let Some(first) = words.first().filter(|w| !w.is_empty()) else {
            out.write_all(SHELL_HELP.as_bytes())?;
            return Ok(());
        };
        debug!(target: "shell", command = %first, argc = words.len() - 1, "shell_dispatch");
        let rest = &words[1..];
        match first.as_str() {
            "cd" => self.cd(rest, out),
            "pwd" => pwd(out),
            "dirs" => self.dirs(out),
            "pushd" => self.pushd(rest, out),
            "popd" => self.popd(out),
            "path" => path(rest, out),
            "ls" if cfg!(windows) => ls(rest, out),
            _ => spawn(words, out),
        }
    }

    fn cd(&mut self, args: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
        match args {
            [] => {}
            [dir] => change_dir("cd", Path::new(dir))?,
            _ => return Err(ShellError::TooManyArguments("cd")),
        }
        pwd(out)
    }

    fn dirs(&self, out: &mut dyn Write) -> Result<(), ShellError> {
        pwd(out)?;
        for dir in self.stack.iter().rev() {
            writeln!(out, "{}", dir.display())?;
        }
        Ok(())
    }

    fn pushd(&mut self, args: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
        let cwd = env::current_dir()?;
        match args {
            [] => {
                let Some(top) = self.stack.last_mut() else {
                    return Err(ShellError::NoOtherDirectory);
                };
                change_dir("pushd", top)?;
                *top = cwd;
            }
            [dir] => {
                change_dir("pushd", Path::new(dir))?;
                self.stack.push(cwd);
            }
            _ => return Err(ShellError::TooManyArguments("pushd")),
        }
        self.dirs(out)
    }

    fn popd(&mut self, out: &mut dyn Write) -> Result<(), ShellError> {
        let top = self.stack.pop().ok_or(ShellError::StackEmpty)?;
        change_dir("popd", &top)?;
        self.dirs(out)
    }
}

fn change_dir(command: &'static str, dir: &Path) -> Result<(), ShellError> {
    env::set_current_dir(dir).map_err(|source| ShellError::ChangeDirectory {
        command,
        path: dir.to_path_buf(),
        source,
    })?;
    info!(target: "shell", command, "directory_changed");
    Ok(())
}

fn pwd(out: &mut dyn Write) -> Result<(), ShellError> {
    let cwd = env::current_dir()?;
    writeln!(out, "Current directory: {}", cwd.display())?;
    Ok(())
}

fn path(args: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
    match args {
        [] => {
            writeln!(out, "PATH:\n{}", current_path())?;
            return Ok(());
        }
        [op, dir] if op == "=" => set_path(dir),
        [op, dir] if op == "+=" => set_path(&prepend_path(dir, &current_path())),
        _ => return Err(ShellError::InvalidPathArguments),
    }
    writeln!(out, "New PATH:\n{}", current_path())?;
    Ok(())
}

fn ls(args: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
    let dir = match args {
        [] => env::current_dir()?,
        [dir] => PathBuf::from(dir),
        _ => return Err(ShellError::TooManyArguments("ls")),
    };
    for name in list_directory(&dir)? {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

fn spawn(words: &[String], out: &mut dyn Write) -> Result<(), ShellError> {
    out.flush()?;
    let program = words[0].clone();
    let status = Command::new(&program)
        .args(&words[1..])
        .status()
        .map_err(|source| ShellError::Spawn {
            program: program.clone(),
            source,
        })?;
    debug!(target: "shell", %status, "command_finished");
    if status.success() {
        Ok(())
    } else {
        Err(ShellError::Exited { program, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn run(shell: &mut Shell, v: &[&str]) -> (Result<(), ShellError>, String) {
        let mut out = Vec::new();
        let res = shell.run(&words(v), &mut out);
        (res, String::from_utf8(out).unwrap())
    }

    #[test]
    fn empty_command_prints_help() {
        let (res, out) = run(&mut Shell::new(), &[""]);
        assert!(res.is_ok());
        assert_eq!(out, SHELL_HELP);
        let (_, out) = run(&mut Shell::new(), &[]);
        assert_eq!(out, SHELL_HELP);
    }

    #[test]
    fn argument_errors_use_builtin_messages() {
        let mut shell = Shell::new();
        let (res, _) = run(&mut shell, &["cd", "a", "b"]);
        assert_eq!(res.unwrap_err().to_string(), "cd: too many arguments");
        let (res, _) = run(&mut shell, &["pushd"]);
        assert_eq!(res.unwrap_err().to_string(), "pushd: no other directory");
        let (res, _) = run(&mut shell, &["pushd", "a", "b"]);
        assert_eq!(res.unwrap_err().to_string(), "pushd: too many arguments");
        let (res, _) = run(&mut shell, &["popd"]);
        assert_eq!(res.unwrap_err().to_string(), "popd: directory stack empty");
        let (res, _) = run(&mut shell, &["path", "-", "x"]);
        assert_eq!(res.unwrap_err().to_string(), "path: invalid arguments");
    }

    #[test]
    fn path_prepends_with_platform_separator() {
        assert_eq!(prepend_path("/opt/bin", ""), "/opt/bin");
        assert_eq!(
            prepend_path("/opt/bin", "/usr/bin"),
            format!("/opt/bin{PATH_SEPARATOR}/usr/bin")
        );
    }

    #[test]
    fn path_without_arguments_prints_it() {
        let (res, out) = run(&mut Shell::new(), &["path"]);
        assert!(res.is_ok());
        assert!(out.starts_with("PATH:\n"));
    }

    #[test]
    fn listing_is_sorted_and_missing_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.c"), b"").unwrap();
        std::fs::write(dir.path().join("a.h"), b"").unwrap();
        assert_eq!(list_directory(dir.path()).unwrap(), vec!["a.h", "b.c"]);
        let missing = dir.path().join("nope");
        let err = list_directory(&missing).unwrap_err();
        assert!(err.to_string().starts_with("ls: could not read directory"));
    }

    #[test]
    fn unknown_program_fails_to_spawn() {
        let (res, _) = run(&mut Shell::new(), &["ic-definitely-not-a-program"]);
        assert!(matches!(res, Err(ShellError::Spawn { .. })));
    }
}
