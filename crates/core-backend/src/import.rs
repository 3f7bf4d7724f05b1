//! Pre-loading libraries named by `-L` / `-l` compiler options.
//!
//! Libraries are opened with global symbol visibility before an in-process
//! run, so the compiled unit's undefined symbols resolve against them even
//! when their directory is not on the loader's search path.

use libloading::Library;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibrarySpec {
    /// `-lname`: platform prefix and suffix are added.
    Name(String),
    /// `-l:file`: used verbatim.
    File(String),
}

impl LibrarySpec {
    fn file_name(&self) -> String {
        match self {
            LibrarySpec::Name(name) => format!("{DLL_PREFIX}{name}{DLL_SUFFIX}"),
            LibrarySpec::File(file) => file.clone(),
        }
    }
}

/// Search directories and libraries named by `options`, in order.
/// Unrelated options are skipped.
pub fn parse_library_options(options: &[String]) -> (Vec<PathBuf>, Vec<LibrarySpec>) {
    let mut dirs = Vec::new();
    let mut libs = Vec::new();
    let mut iter = options.iter();
    while let Some(opt) = iter.next() {
        if let Some(dir) = opt.strip_prefix("-L") {
            let dir = if dir.is_empty() { iter.next().map(String::as_str) } else { Some(dir) };
            if let Some(dir) = dir {
                dirs.push(PathBuf::from(dir));
            }
        } else if let Some(lib) = opt.strip_prefix("-l") {
            let lib = if lib.is_empty() { iter.next().map(String::as_str) } else { Some(lib) };
            match lib {
                Some(file) if file.starts_with(':') => {
                    libs.push(LibrarySpec::File(file[1..].to_string()))
                }
                Some(name) if !name.is_empty() => libs.push(LibrarySpec::Name(name.to_string())),
                _ => {}
            }
        }
    }
    (dirs, libs)
}

fn system_dirs() -> Vec<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("SystemRoot")
            .map(|root| vec![Path::new(&root).join("system32")])
            .unwrap_or_default()
    } else {
        Vec::new()
    }
}

/// First existing file for `spec` under `dirs` then the system directories.
pub(crate) fn resolve(spec: &LibrarySpec, dirs: &[PathBuf]) -> Option<PathBuf> {
    let name = spec.file_name();
    dirs.iter()
        .cloned()
        .chain(system_dirs())
        .map(|dir| dir.join(&name))
        .find(|p| p.is_file())
}

#[cfg(unix)]
fn open_global(path: &OsStr) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_NOW};
    // SAFETY: opening runs the library's initializers; the library was
    // named explicitly by the user's compiler options.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_GLOBAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open_global(path: &OsStr) -> Result<Library, libloading::Error> {
    // SAFETY: see the unix variant.
    unsafe { Library::new(path) }
}

/// Libraries kept open for the duration of one run, plus what went wrong.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub libraries: Vec<Library>,
    pub problems: Vec<String>,
}

pub fn import_libraries(options: &[String]) -> ImportReport {
    let (dirs, specs) = parse_library_options(options);
    let mut report = ImportReport::default();
    for spec in &specs {
        let target = match resolve(spec, &dirs) {
            Some(path) => path.into_os_string(),
            // Unix loaders have their own search path; Windows needs a hit.
            None if cfg!(unix) => spec.file_name().into(),
            None => {
                let msg = format!("could not find DLL '{}'", spec.file_name());
                warn!(target: "backend.import", library = %spec.file_name(), "library_not_found");
                report.problems.push(msg);
                continue;
            }
        };
        match open_global(&target) {
            Ok(lib) => {
                debug!(target: "backend.import", library = ?target, "library_loaded");
                report.libraries.push(lib);
            }
            Err(e) => {
                warn!(target: "backend.import", library = ?target, error = %e, "library_load_failed");
                report.problems.push(format!("could not load '{}': {e}", target.to_string_lossy()));
            }
        }
    }
    report
}
