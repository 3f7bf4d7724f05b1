//! `;`-prefixed session commands.

use crate::words::split_words;
use core_state::RunMode;

/// What `;rc=...` does to the compiler override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerChange {
    Keep,
    /// `;rc=` with nothing after it: back to `CC` / the default.
    Reset,
    Set(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// `;h`, or the sigil followed by whitespace.
    Help,
    /// `;q`
    Quit,
    /// `;l`
    List,
    /// `;c`
    Clear,
    /// `;o [opts]`: append options (possibly none), then show them.
    Options(Vec<String>),
    /// `;O`
    ClearOptions,
    /// `;a [args]`
    Arguments(Vec<String>),
    /// `;A`
    ClearArguments,
    /// `;p expr`
    DumpObject(String),
    /// `;P ptr,size`
    DumpMemory(String),
    /// `;m expr`
    MacroExpansion(String),
    /// `;t` or `;t:n`; the next unit is timed.
    Time { reps: Option<String> },
    /// `;f`: the next unit is a top-level statement.
    TopLevel,
    /// `;;`
    Rerun,
    /// `;r[m|d|c][=cc]`
    RunMode {
        mode: Option<RunMode>,
        compiler: CompilerChange,
    },
    /// `;w` (on) / `;W` (off)
    Werror(bool),
    /// A command that needs an argument was given none.
    MissingArgument(char),
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
;h      -- show this help message
;q      -- quit
;l      -- list recorded code
;c      -- clear recorded code
;o      -- list current compiler options
;o[...] -- append new compiler options
;O      -- clear compiler options
;a      -- list current arguments
;a[...] -- append new arguments
;A      -- clear arguments
;p expr -- print a struct or array
;P x,sz -- print memory x with size sz
;t[:n]  -- time the following statement
;f      -- start a top level statement
;m expr -- print out expanded macros
;;      -- rerun the recorded code
;r[mdc] -- run as memory (m), dll (d) or use cc (c)
;w      -- warnings as errors (default)
;W      -- warnings not as errors
>[...]  -- execute shell command
#[...]  -- C preprocessor
Macros:
  ONCE_LINE  -- true only the first time on the line
  ONCE       -- execute the following statement only once
  PRINT(X)   -- print the value of X
  WPRINT(X)  -- print the value of X (wchar_t related)
  BIN(X)     -- get binary representation of integer X
";

fn word_list(arg: &str) -> Vec<String> {
    if arg.is_empty() {
        return Vec::new();
    }
    split_words(arg)
        .into_iter()
        .filter(|w| !w.is_empty())
        .collect()
}

fn required(letter: char, arg: &str, build: fn(String) -> ReplCommand) -> ReplCommand {
    let arg = arg.trim();
    if arg.is_empty() {
        ReplCommand::MissingArgument(letter)
    } else {
        build(arg.to_string())
    }
}

fn parse_run_mode(arg: &str) -> ReplCommand {
    let mut chars = arg.chars();
    let (mode, compiler) = match chars.next() {
        Some('c') => {
            let rest = chars.as_str();
            let compiler = match rest.strip_prefix('=') {
                Some(cc) if cc.trim().is_empty() => CompilerChange::Reset,
                Some(cc) => CompilerChange::Set(cc.trim().to_string()),
                None => CompilerChange::Keep,
            };
            (Some(RunMode::Toolchain), compiler)
        }
        Some('d') => (Some(RunMode::Library), CompilerChange::Keep),
        Some('m') => (Some(RunMode::Memory), CompilerChange::Keep),
        _ => (None, CompilerChange::Keep),
    };
    ReplCommand::RunMode { mode, compiler }
}

/// Parse a command unit (`;` plus the rest of the line, terminator optional).
pub fn parse_command(text: &str) -> ReplCommand {
    let line = text.strip_suffix('\n').unwrap_or(text);
    let body = line.strip_prefix(';').unwrap_or(line);
    let mut chars = body.chars();
    let Some(letter) = chars.next() else {
        return ReplCommand::Help;
    };
    let arg = chars.as_str();
    match letter {
        c if c.is_whitespace() => ReplCommand::Help,
        'h' => ReplCommand::Help,
        'q' => ReplCommand::Quit,
        'l' => ReplCommand::List,
        'c' => ReplCommand::Clear,
        'o' => ReplCommand::Options(word_list(arg)),
        'O' => ReplCommand::ClearOptions,
        'a' => ReplCommand::Arguments(word_list(arg)),
        'A' => ReplCommand::ClearArguments,
        'p' => required('p', arg, ReplCommand::DumpObject),
        'P' => required('P', arg, ReplCommand::DumpMemory),
        'm' => required('m', arg, ReplCommand::MacroExpansion),
        't' => match arg.strip_prefix(':') {
            Some(n) if n.trim().is_empty() => ReplCommand::MissingArgument('t'),
            Some(n) => ReplCommand::Time {
                reps: Some(n.trim().to_string()),
            },
            None => ReplCommand::Time { reps: None },
        },
        'f' => ReplCommand::TopLevel,
        ';' => ReplCommand::Rerun,
        'r' => parse_run_mode(arg),
        'w' => ReplCommand::Werror(true),
        'W' => ReplCommand::Werror(false),
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_letter_commands() {
        assert_eq!(parse_command(";h\n"), ReplCommand::Help);
        assert_eq!(parse_command(";q\n"), ReplCommand::Quit);
        assert_eq!(parse_command(";l\n"), ReplCommand::List);
        assert_eq!(parse_command(";c\n"), ReplCommand::Clear);
        assert_eq!(parse_command(";f\n"), ReplCommand::TopLevel);
        assert_eq!(parse_command(";;\n"), ReplCommand::Rerun);
        assert_eq!(parse_command(";W\n"), ReplCommand::Werror(false));
    }

    #[test]
    fn sigil_with_whitespace_is_help() {
        assert_eq!(parse_command(";\n"), ReplCommand::Help);
        assert_eq!(parse_command("; anything\n"), ReplCommand::Help);
    }

    #[test]
    fn options_and_arguments_split_like_shell() {
        assert_eq!(
            parse_command(";o -O2  '-DNAME=a b'\n"),
            ReplCommand::Options(vec!["-O2".into(), "-DNAME=a b".into()])
        );
        assert_eq!(parse_command(";o\n"), ReplCommand::Options(vec![]));
        assert_eq!(parse_command(";a  \n"), ReplCommand::Arguments(vec![]));
        assert_eq!(parse_command(";A\n"), ReplCommand::ClearArguments);
    }

    #[test]
    fn dumps_need_an_argument() {
        assert_eq!(
            parse_command(";p arr\n"),
            ReplCommand::DumpObject("arr".into())
        );
        assert_eq!(
            parse_command(";P p, 8\n"),
            ReplCommand::DumpMemory("p, 8".into())
        );
        assert_eq!(parse_command(";m\n"), ReplCommand::MissingArgument('m'));
    }

    #[test]
    fn timing_variants() {
        assert_eq!(parse_command(";t\n"), ReplCommand::Time { reps: None });
        assert_eq!(
            parse_command(";t:1000\n"),
            ReplCommand::Time {
                reps: Some("1000".into())
            }
        );
        assert_eq!(parse_command(";t:\n"), ReplCommand::MissingArgument('t'));
    }

    #[test]
    fn run_mode_variants() {
        assert_eq!(
            parse_command(";rd\n"),
            ReplCommand::RunMode {
                mode: Some(RunMode::Library),
                compiler: CompilerChange::Keep
            }
        );
        assert_eq!(
            parse_command(";rc=clang -m32 \n"),
            ReplCommand::RunMode {
                mode: Some(RunMode::Toolchain),
                compiler: CompilerChange::Set("clang -m32".into())
            }
        );
        assert_eq!(
            parse_command(";rc=\n"),
            ReplCommand::RunMode {
                mode: Some(RunMode::Toolchain),
                compiler: CompilerChange::Reset
            }
        );
        assert_eq!(
            parse_command(";r\n"),
            ReplCommand::RunMode {
                mode: None,
                compiler: CompilerChange::Keep
            }
        );
    }

    #[test]
    fn unknown_keeps_full_text() {
        assert_eq!(
            parse_command(";xyz\n"),
            ReplCommand::Unknown(";xyz".into())
        );
    }

    #[test]
    fn help_lists_every_command_letter() {
        for letter in "hqlcoOaApPtfm;rwW".chars() {
            assert!(HELP.contains(&format!(";{letter}")), "missing ;{letter}");
        }
    }
}
