//! Turning a synthesized translation unit into a running program, plus the
//! `>` shell built-ins.

pub mod diagnostics;
pub mod import;
pub mod shell;
pub mod toolchain;

use core_state::RunMode;
use std::io;
use thiserror::Error;

pub use diagnostics::remap_diagnostics;
pub use import::{ImportReport, LibrarySpec, import_libraries, parse_library_options};
pub use shell::{SHELL_HELP, Shell, ShellError};
pub use toolchain::{Artifact, CompilerKind, ToolchainBackend, detect_kind};

/// One compile-and-run request.
#[derive(Debug, Clone, Copy)]
pub struct RunRequest<'a> {
    pub source: &'a str,
    pub options: &'a [String],
    /// Program arguments, not including argv[0].
    pub args: &'a [String],
    pub werror: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Value returned by the entry point (or the child's exit code).
    pub status: i32,
    /// Remapped compiler output for a successful build, typically warnings.
    pub diagnostics: String,
}

impl RunOutcome {
    /// A negative entry point result counts as a failed run.
    pub fn succeeded(&self) -> bool {
        self.status >= 0
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("compilation failed")]
    Compile { diagnostics: String },
    #[error("could not load compiled code: {0}")]
    Load(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("run mode `{0}` is not available in this build")]
    Unsupported(RunMode),
}

pub trait Backend {
    fn run(&mut self, mode: RunMode, request: &RunRequest<'_>) -> Result<RunOutcome, BackendError>;

    /// Compiler command line prefix as shown by `;r`.
    fn compiler(&self) -> String;

    /// `None` falls back to `CC` or the platform default.
    fn set_compiler(&mut self, compiler: Option<String>);

    fn supports(&self, mode: RunMode) -> bool;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn run(&mut self, mode: RunMode, request: &RunRequest<'_>) -> Result<RunOutcome, BackendError> {
        (**self).run(mode, request)
    }

    fn compiler(&self) -> String {
        (**self).compiler()
    }

    fn set_compiler(&mut self, compiler: Option<String>) {
        (**self).set_compiler(compiler)
    }

    fn supports(&self, mode: RunMode) -> bool {
        (**self).supports(mode)
    }
}
