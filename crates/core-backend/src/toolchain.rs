//! The system C toolchain backend.
//!
//! Each run writes the unit to `<work_dir>/_ic.c` and invokes the compiler
//! (`--cc`/`;rc=`, else `CC`, else the platform default). In library mode
//! the result is `<work_dir>/ic.so` (`ic.dll`), loaded in-process and
//! entered through `ic_main(argc, argv)`; in toolchain mode a `main` wrapper
//! is appended and the executable is spawned.

use crate::diagnostics::remap_diagnostics;
use crate::import::import_libraries;
use crate::{Backend, BackendError, RunOutcome, RunRequest};
use core_state::RunMode;
use libloading::{Library, Symbol};
use std::env::consts::{DLL_SUFFIX, EXE_SUFFIX};
use std::ffi::{CString, OsString, c_char, c_int};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::{env, fs};
use tracing::{debug, info, warn};

const MSVC_BANNER: &str = "Microsoft (R) C/C++ Optimizing Compiler";
const SOURCE_FILE: &str = "_ic.c";
const LIBRARY_STEM: &str = "ic";
const EXECUTABLE_STEM: &str = "ic_run";

const LIBRARY_SHIM: &str = "\n#line 1 \"ic-shim\"\n#include <stdio.h>\n\
#ifdef _WIN32\n__declspec(dllexport)\n#endif\n\
void ic_flush(void) { fflush(NULL); }\n";
/// Exit code the executable shim reserves for a negative `ic_main` result.
const FAILED_EXIT: i32 = 255;
const EXECUTABLE_SHIM: &str = "\n#line 1 \"ic-shim\"\n\
int main(int argc, char **argv) {\n\
    int r = ic_main(argc, argv);\n\
    return r < 0 ? 255 : r > 254 ? 254 : r;\n\
}\n";

type EntryFn = unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int;
type FlushFn = unsafe extern "C" fn();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerKind {
    /// `cl.exe` style switches.
    Msvc,
    /// gcc, clang, tcc and friends.
    Gnu,
}

/// Classify a compiler from the stderr of `<compiler> --version`.
pub fn detect_kind(version_stderr: &str) -> CompilerKind {
    if version_stderr.trim_start().starts_with(MSVC_BANNER) {
        CompilerKind::Msvc
    } else {
        CompilerKind::Gnu
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Library,
    Executable,
}

fn default_compiler() -> &'static str {
    if cfg!(target_env = "msvc") { "cl" } else { "cc" }
}

#[derive(Debug)]
pub struct ToolchainBackend {
    work_dir: PathBuf,
    compiler: Option<String>,
    /// Detection result for the compiler string it was computed for.
    detected: Option<(String, CompilerKind)>,
}

impl ToolchainBackend {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            compiler: None,
            detected: None,
        }
    }

    pub fn with_compiler(mut self, compiler: Option<String>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn source_path(&self) -> PathBuf {
        self.work_dir.join(SOURCE_FILE)
    }

    fn stem(&self, artifact: Artifact) -> PathBuf {
        match artifact {
            Artifact::Library => self.work_dir.join(LIBRARY_STEM),
            Artifact::Executable => self.work_dir.join(EXECUTABLE_STEM),
        }
    }

    pub fn artifact_path(&self, artifact: Artifact) -> PathBuf {
        let suffix = match artifact {
            Artifact::Library => DLL_SUFFIX,
            Artifact::Executable => EXE_SUFFIX,
        };
        let mut name = OsString::from(self.stem(artifact));
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Compiler string after applying the override and `CC`.
    pub fn resolved_compiler(&self) -> String {
        self.compiler
            .clone()
            .or_else(|| env::var("CC").ok())
            .filter(|cc| !cc.trim().is_empty())
            .unwrap_or_else(|| default_compiler().to_string())
    }

    fn kind_of(&mut self, compiler: &str) -> CompilerKind {
        if let Some((seen, kind)) = &self.detected {
            if seen == compiler {
                return *kind;
            }
        }
        let mut words = compiler.split_whitespace();
        let kind = match words.next() {
            Some(program) => match Command::new(program).args(words).arg("--version").output() {
                Ok(out) => detect_kind(&String::from_utf8_lossy(&out.stderr)),
                Err(e) => {
                    debug!(target: "backend.toolchain", error = %e, "compiler_probe_failed");
                    CompilerKind::Gnu
                }
            },
            None => CompilerKind::Gnu,
        };
        info!(target: "backend.toolchain", compiler, ?kind, "compiler_detected");
        self.detected = Some((compiler.to_string(), kind));
        kind
    }

    /// Full compiler argv for building `artifact` from the source file.
    pub fn command_line(
        &self,
        kind: CompilerKind,
        compiler: &str,
        artifact: Artifact,
        request: &RunRequest<'_>,
    ) -> Vec<String> {
        let mut argv: Vec<String> = compiler.split_whitespace().map(String::from).collect();
        if argv.is_empty() {
            argv.push(default_compiler().to_string());
        }
        let source = self.source_path().to_string_lossy().into_owned();
        match kind {
            CompilerKind::Msvc => {
                argv.extend(["/nologo".into(), "/std:c17".into()]);
                if request.werror {
                    argv.push("/WX".into());
                }
                if artifact == Artifact::Library {
                    argv.push("/LD".into());
                }
                let stem = self.stem(artifact).to_string_lossy().into_owned();
                argv.push(format!("/Fo:{stem}"));
                argv.push(format!("/Fe:{stem}"));
                argv.push(source);
                argv.extend(request.options.iter().cloned());
            }
            CompilerKind::Gnu => {
                if request.werror {
                    argv.push("-Werror".into());
                }
                if artifact == Artifact::Library {
                    argv.push("-shared".into());
                    if !cfg!(windows) {
                        argv.push("-fPIC".into());
                    }
                }
                argv.push("-o".into());
                argv.push(self.artifact_path(artifact).to_string_lossy().into_owned());
                argv.push(source);
                argv.extend(request.options.iter().cloned());
                if cfg!(unix) {
                    argv.push("-lm".into());
                }
            }
        }
        argv
    }

    /// Write and compile the unit; returns remapped compiler output.
    fn compile(&mut self, artifact: Artifact, request: &RunRequest<'_>) -> Result<String, BackendError> {
        fs::create_dir_all(&self.work_dir)?;
        let shim = match artifact {
            Artifact::Library => LIBRARY_SHIM,
            Artifact::Executable => EXECUTABLE_SHIM,
        };
        fs::write(self.source_path(), format!("{}{shim}", request.source))?;

        let compiler = self.resolved_compiler();
        let kind = self.kind_of(&compiler);
        let argv = self.command_line(kind, &compiler, artifact, request);
        info!(target: "backend.toolchain", program = %argv[0], argc = argv.len(), ?artifact, "compile_start");

        let output = match Command::new(&argv[0]).args(&argv[1..]).output() {
            Ok(output) => output,
            Err(e) => {
                warn!(target: "backend.toolchain", program = %argv[0], error = %e, "compiler_spawn_failed");
                return Err(BackendError::Compile {
                    diagnostics: format!("could not run compiler `{}`: {e}\n", argv[0]),
                });
            }
        };
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if kind == CompilerKind::Msvc {
            // cl echoes the source file name before anything else.
            text = text
                .lines()
                .filter(|l| l.trim() != SOURCE_FILE)
                .map(|l| format!("{l}\n"))
                .collect();
        }
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let diagnostics = remap_diagnostics(&text);
        debug!(target: "backend.toolchain", status = ?output.status.code(), diagnostics_len = diagnostics.len(), "compile_finished");
        if output.status.success() {
            Ok(diagnostics)
        } else {
            Err(BackendError::Compile { diagnostics })
        }
    }

    /// Import problems are appended to `notes`; they never stop the run.
    fn run_library(&self, request: &RunRequest<'_>, notes: &mut String) -> Result<i32, BackendError> {
        let imports = import_libraries(request.options);
        for problem in &imports.problems {
            notes.push_str(problem);
            notes.push('\n');
        }

        let path = self.artifact_path(Artifact::Library);
        let library = unsafe {
            Library::new(&path).map_err(|e| BackendError::Load(format!("{}: {e}", path.display())))?
        };
        let args = program_arguments(request.args)?;
        let mut argv: Vec<*mut c_char> = args.iter().map(|a| a.as_ptr().cast_mut()).collect();
        let argc = c_int::try_from(args.len())
            .map_err(|_| BackendError::Load("too many program arguments".into()))?;
        argv.push(std::ptr::null_mut());

        io::stdout().flush()?;
        // SAFETY: `ic_main` is defined by the synthesized unit with exactly
        // this signature; `argv` is null-terminated and outlives the call.
        let status = unsafe {
            let entry: Symbol<EntryFn> = library
                .get(b"ic_main")
                .map_err(|e| BackendError::Load(e.to_string()))?;
            let status = entry(argc, argv.as_mut_ptr());
            if let Ok(flush) = library.get::<FlushFn>(b"ic_flush") {
                flush();
            }
            status
        };
        info!(target: "backend.toolchain", status, "library_run_finished");
        drop(library);
        drop(imports);
        Ok(status)
    }

    fn run_executable(&self, request: &RunRequest<'_>) -> Result<i32, BackendError> {
        io::stdout().flush()?;
        let path = self.artifact_path(Artifact::Executable);
        let status = Command::new(&path).args(request.args).status()?;
        info!(target: "backend.toolchain", %status, "executable_run_finished");
        Ok(executable_status(status.code()))
    }
}

/// Entry-point status from the executable's exit code; the reserved code and
/// death by signal both count as failure.
fn executable_status(code: Option<i32>) -> i32 {
    match code {
        Some(FAILED_EXIT) | None => -1,
        Some(code) => code,
    }
}

/// argv for the entry point: this executable's path, then `args`.
fn program_arguments(args: &[String]) -> Result<Vec<CString>, BackendError> {
    let argv0 = env::current_exe()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "ic".to_string());
    std::iter::once(argv0)
        .chain(args.iter().cloned())
        .map(|a| {
            CString::new(a).map_err(|_| {
                BackendError::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "program argument contains a NUL byte",
                ))
            })
        })
        .collect()
}

impl Backend for ToolchainBackend {
    fn run(&mut self, mode: RunMode, request: &RunRequest<'_>) -> Result<RunOutcome, BackendError> {
        let (diagnostics, status) = match mode {
            RunMode::Memory => return Err(BackendError::Unsupported(mode)),
            RunMode::Library => {
                let mut diagnostics = self.compile(Artifact::Library, request)?;
                let status = self.run_library(request, &mut diagnostics)?;
                (diagnostics, status)
            }
            RunMode::Toolchain => {
                let diagnostics = self.compile(Artifact::Executable, request)?;
                (diagnostics, self.run_executable(request)?)
            }
        };
        Ok(RunOutcome { status, diagnostics })
    }

    fn compiler(&self) -> String {
        self.resolved_compiler()
    }

    fn set_compiler(&mut self, compiler: Option<String>) {
        self.compiler = compiler;
    }

    fn supports(&self, mode: RunMode) -> bool {
        mode != RunMode::Memory
    }
}
