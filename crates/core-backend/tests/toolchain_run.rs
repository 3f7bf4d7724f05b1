//! End-to-end runs through the host C compiler. Skipped when none is found.

use core_backend::{Backend, BackendError, RunRequest, ToolchainBackend};
use core_state::RunMode;
use std::process::Command;

const UNIT: &str = "\
#include <string.h>
#ifdef _WIN32
__declspec(dllexport)
#endif
int ic_main(int argc, char **argv) {
    if (argc == 3 && strcmp(argv[2], \"neg\") == 0) return -1;
    return argc * 10 + (int)strlen(argv[argc - 1]);
}
";

fn backend(dir: &tempfile::TempDir) -> Option<ToolchainBackend> {
    let b = ToolchainBackend::new(dir.path());
    let cc = b.resolved_compiler();
    let program = cc.split_whitespace().next()?.to_string();
    Command::new(program).arg("--version").output().ok()?;
    Some(b)
}

fn args(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn library_mode_calls_entry_point_with_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let Some(mut b) = backend(&dir) else {
        return;
    };
    let program_args = args(&["a", "xyz"]);
    let request = RunRequest {
        source: UNIT,
        options: &[],
        args: &program_args,
        werror: false,
    };
    let outcome = b.run(RunMode::Library, &request).unwrap();
    assert_eq!(outcome.status, 33);
    assert!(outcome.succeeded());

    let neg = args(&["a", "neg"]);
    let request = RunRequest { args: &neg, ..request };
    let outcome = b.run(RunMode::Library, &request).unwrap();
    assert!(!outcome.succeeded());
}

#[test]
fn toolchain_mode_spawns_an_executable() {
    let dir = tempfile::tempdir().unwrap();
    let Some(mut b) = backend(&dir) else {
        return;
    };
    let program_args = args(&["abcd"]);
    let request = RunRequest {
        source: UNIT,
        options: &[],
        args: &program_args,
        werror: false,
    };
    let outcome = b.run(RunMode::Toolchain, &request).unwrap();
    // argv[0] is the spawned executable, so argc is 2.
    assert_eq!(outcome.status, 24);
    assert!(outcome.succeeded());

    let neg = args(&["a", "neg"]);
    let request = RunRequest { args: &neg, ..request };
    let outcome = b.run(RunMode::Toolchain, &request).unwrap();
    assert!(!outcome.succeeded());
}

#[test]
fn compile_errors_point_at_repl_lines() {
    let dir = tempfile::tempdir().unwrap();
    let Some(mut b) = backend(&dir) else {
        return;
    };
    let source = "int ic_main(int argc, char **argv) {\n#line 5 \"<string>\"\nreturn undeclared_name;\n}\n";
    let request = RunRequest {
        source,
        options: &[],
        args: &[],
        werror: true,
    };
    match b.run(RunMode::Library, &request) {
        Err(BackendError::Compile { diagnostics }) => {
            assert!(diagnostics.contains("line 5"), "{diagnostics}");
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}
