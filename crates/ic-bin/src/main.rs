//! `ic` entrypoint.
use anyhow::Result;
use clap::Parser;
use core_backend::ToolchainBackend;
use core_editor::{LineEditor, LineReader, PlainLineReader};
use core_input::terminal_source;
use core_repl::CCompleter;
use core_terminal::{CrosstermBackend, TerminalCapabilities};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

mod cli;
mod session;

use cli::Args;
use session::Session;

const LOG_FILE: &str = "ic.log";

/// Log to `<dir>/ic.log`, replacing the previous run's file. The terminal
/// itself never receives log output.
fn configure_logging(log_dir: &Path) -> Option<WorkerGuard> {
    if fs::create_dir_all(log_dir).is_err() {
        return None;
    }
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn line_reader(config: &core_config::Config, interactive: bool) -> Result<Box<dyn LineReader>> {
    if !interactive {
        return Ok(Box::new(PlainLineReader::new(io::stdin().lock(), io::stdout())));
    }
    let mut editor = LineEditor::new(CrosstermBackend::new(), terminal_source()?, io::stdout())
        .with_eof_policy(cli::eof_policy(config));
    if config.file.editor.completion {
        editor = editor.with_completer(Box::new(CCompleter));
    }
    Ok(Box::new(editor))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;
    let work_dir = config.work_dir();
    let _log_guard = configure_logging(&work_dir);
    install_panic_hook();

    let state = cli::initial_state(&args, &config);
    let capabilities = TerminalCapabilities::detect();
    info!(
        target: "runtime.startup",
        config = ?config.source,
        work_dir = %work_dir.display(),
        mode = state.run_mode.as_str(),
        werror = state.werror,
        options = state.options.len(),
        interactive = capabilities.interactive,
        "bootstrap_complete"
    );

    let backend = ToolchainBackend::new(work_dir).with_compiler(state.compiler.clone());
    let reader = line_reader(&config, capabilities.interactive)?;
    let mut session = Session::new(reader, backend, io::stdout(), state);
    let result = session.run();
    info!(target: "runtime", ok = result.is_ok(), "shutdown");
    result
}
