//! Command line flags and how they layer over `ic.toml`.

use clap::Parser;
use core_config::{Config, EofSetting};
use core_editor::EofPolicy;
use core_state::{ProgramState, RunMode};
use std::path::PathBuf;
use tracing::warn;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "ic",
    version,
    about = "Interactive C",
    override_usage = "ic [dll | cc[=...]] [compiler options...] [-- program argv...]"
)]
pub struct Args {
    /// Configuration file (overrides discovery of `ic.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Run mode: memory, library (dll) or toolchain (cc).
    #[arg(long = "mode")]
    pub mode: Option<RunMode>,
    /// C compiler to invoke instead of `CC` or the platform default.
    #[arg(long = "cc")]
    pub cc: Option<String>,
    /// Do not treat warnings as errors.
    #[arg(short = 'W', long = "no-werror")]
    pub no_werror: bool,
    /// Compiler options. The words `dll`, `cc` and `cc=<compiler>` pick the run mode.
    #[arg(allow_hyphen_values = true)]
    pub options: Vec<String>,
    /// Arguments passed to the program as argv[1..].
    #[arg(last = true)]
    pub program_args: Vec<String>,
}

/// Run mode and compiler selected by bare words among the options.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ModeWords {
    pub mode: Option<RunMode>,
    pub compiler: Option<String>,
    pub options: Vec<String>,
}

pub fn split_mode_words(words: &[String]) -> ModeWords {
    let mut out = ModeWords::default();
    for word in words {
        match word.as_str() {
            "dll" => out.mode = Some(RunMode::Library),
            "cc" => out.mode = Some(RunMode::Toolchain),
            w => match w.strip_prefix("cc=") {
                Some(cc) => {
                    out.mode = Some(RunMode::Toolchain);
                    out.compiler = Some(cc.to_string()).filter(|c| !c.is_empty());
                }
                None => out.options.push(word.clone()),
            },
        }
    }
    out
}

/// Initial program state: defaults, then the config file, then flags.
pub fn initial_state(args: &Args, config: &Config) -> ProgramState {
    let mut state = ProgramState::new();
    let compiler_cfg = &config.file.compiler;

    state.werror = compiler_cfg.werror;
    state.compiler = compiler_cfg.cc.clone();
    state.options = config.compiler_options();
    if let Some(name) = &compiler_cfg.run_mode {
        match name.parse::<RunMode>() {
            Ok(mode) => state.run_mode = mode,
            Err(e) => warn!(target: "config", error = %e, "run_mode_ignored"),
        }
    }

    let words = split_mode_words(&args.options);
    state.options.extend(words.options);
    if let Some(mode) = words.mode {
        state.run_mode = mode;
    }
    if let Some(mode) = args.mode {
        state.run_mode = mode;
    }
    if words.compiler.is_some() {
        state.compiler = words.compiler;
    }
    if args.cc.is_some() {
        state.compiler = args.cc.clone();
    }
    if args.no_werror {
        state.werror = false;
    }
    state.args = args.program_args.clone();
    state
}

pub fn eof_policy(config: &Config) -> EofPolicy {
    match config.file.editor.eof_policy {
        EofSetting::End => EofPolicy::End,
        EofSetting::Commit => EofPolicy::Commit,
    }
}
