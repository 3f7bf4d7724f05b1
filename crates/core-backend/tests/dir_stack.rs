//! Directory stack behaviour. The working directory is process-wide, so
//! every step lives in one test.

use core_backend::{Shell, ShellError};
use pretty_assertions::assert_eq;
use std::env;

fn run(shell: &mut Shell, v: &[&str]) -> Result<String, ShellError> {
    let words: Vec<String> = v.iter().map(|s| s.to_string()).collect();
    let mut out = Vec::new();
    shell.run(&words, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn pushd_popd_and_swap() {
    let start = env::current_dir().unwrap();
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let a_path = a.path().canonicalize().unwrap();
    let b_path = b.path().canonicalize().unwrap();
    let mut shell = Shell::new();

    let out = run(&mut shell, &["cd", a_path.to_str().unwrap()]).unwrap();
    assert_eq!(out, format!("Current directory: {}\n", a_path.display()));

    let out = run(&mut shell, &["pushd", b_path.to_str().unwrap()]).unwrap();
    assert_eq!(
        out,
        format!("Current directory: {}\n{}\n", b_path.display(), a_path.display())
    );
    assert_eq!(env::current_dir().unwrap(), b_path);

    // No argument swaps the working directory with the top of the stack.
    run(&mut shell, &["pushd"]).unwrap();
    assert_eq!(env::current_dir().unwrap(), a_path);
    assert_eq!(shell.stack(), &[b_path.clone()]);

    let out = run(&mut shell, &["popd"]).unwrap();
    assert_eq!(out, format!("Current directory: {}\n", b_path.display()));
    assert!(shell.stack().is_empty());

    let err = run(&mut shell, &["cd", "/ic/definitely/missing"]).unwrap_err();
    assert!(matches!(err, ShellError::ChangeDirectory { command: "cd", .. }));

    env::set_current_dir(start).unwrap();
}
