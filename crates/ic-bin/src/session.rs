//! The read / synthesize / run / commit loop.
//!
//! A unit is only appended to the program state after the backend ran it
//! successfully; any failure prints a message and the next prompt shows the
//! same line number again.

use anyhow::Result;
use core_backend::{Backend, BackendError, RunRequest, Shell};
use core_editor::LineReader;
use core_repl::{
    CompilerChange, Fragments, HELP, ReadRequest, ReplCommand, Synthesizer, Target, Unit,
    UnitKind, expand_embeds_from_disk, parse_command, read_unit, split_words,
};
use core_state::{ProgramState, RunMode};
use std::io::Write;
use tracing::{debug, info, warn};

pub const GREETING: &str = "Type \";h\" for help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Where a successful run's fragment goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Commit {
    Nothing,
    Body,
    Preamble,
}

pub struct Session<R: LineReader, B: Backend, W: Write> {
    reader: R,
    backend: B,
    out: W,
    state: ProgramState,
    synth: Synthesizer,
    shell: Shell,
    /// Fragments of the most recent run that was not committed, for `;;`.
    pending: Fragments,
}

impl<R: LineReader, B: Backend, W: Write> Session<R, B, W> {
    pub fn new(reader: R, backend: B, out: W, state: ProgramState) -> Self {
        Self {
            reader,
            backend,
            out,
            state,
            synth: Synthesizer::new(Target::host()),
            shell: Shell::new(),
            pending: Fragments::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn run(&mut self) -> Result<()> {
        writeln!(self.out, "{GREETING}")?;
        self.settle_run_mode()?;
        while self.step()? == Flow::Continue {}
        self.out.flush()?;
        Ok(())
    }

    /// Read and handle one unit.
    pub fn step(&mut self) -> Result<Flow> {
        let unit = read_unit(&mut self.reader, self.state.line, ReadRequest::default())?;
        debug!(target: "runtime.session", kind = unit.kind.as_str(), len = unit.text.len(), "unit_read");
        self.handle(unit)
    }

    fn handle(&mut self, unit: Unit) -> Result<Flow> {
        if unit.is_invalid() {
            writeln!(self.out, "Invalid input: mismatched brackets")?;
            return Ok(Flow::Continue);
        }
        let line = self.state.line;
        match unit.kind {
            UnitKind::Empty => {}
            UnitKind::EndOfInput => return Ok(Flow::Quit),
            UnitKind::Statement => {
                self.execute(Fragments::statement(line, &unit.text), Commit::Body, unit.line)?;
            }
            UnitKind::Expression => {
                self.execute(Fragments::expression(line, &unit.text), Commit::Nothing, unit.line)?;
            }
            UnitKind::Preprocessor => {
                self.execute(Fragments::top_level(line, &unit.text), Commit::Preamble, unit.line)?;
            }
            UnitKind::Shell => self.shell_line(&unit.text)?,
            UnitKind::Command => return self.command(parse_command(&unit.text)),
        }
        Ok(Flow::Continue)
    }

    fn shell_line(&mut self, text: &str) -> Result<()> {
        let line = text.strip_suffix('\n').unwrap_or(text);
        let words = split_words(line.strip_prefix('>').unwrap_or(line));
        self.out.flush()?;
        if let Err(e) = self.shell.run(&words, &mut self.out) {
            warn!(target: "shell", error = %e, "shell_command_failed");
            writeln!(self.out, "{e}")?;
        }
        Ok(())
    }

    fn command(&mut self, cmd: ReplCommand) -> Result<Flow> {
        let line = self.state.line;
        match cmd {
            ReplCommand::Help => self.out.write_all(HELP.as_bytes())?,
            ReplCommand::Quit => return Ok(Flow::Quit),
            ReplCommand::List => self.out.write_all(self.state.listing().as_bytes())?,
            ReplCommand::Clear => {
                self.state.clear();
                self.pending = Fragments::default();
            }
            ReplCommand::Options(words) => {
                self.state.options.extend(words);
                write_list(&mut self.out, "current options:", &self.state.options)?;
            }
            ReplCommand::ClearOptions => {
                self.state.options.clear();
                writeln!(self.out, "cleared options")?;
            }
            ReplCommand::Arguments(words) => {
                self.state.args.extend(words);
                write_list(&mut self.out, "current arguments:", &self.state.args)?;
            }
            ReplCommand::ClearArguments => {
                self.state.args.clear();
                writeln!(self.out, "cleared arguments")?;
            }
            ReplCommand::DumpObject(expr) => {
                self.execute(Fragments::object_dump(line, &expr), Commit::Nothing, line)?;
            }
            ReplCommand::DumpMemory(args) => {
                self.execute(Fragments::memory_dump(line, &args), Commit::Nothing, line)?;
            }
            ReplCommand::MacroExpansion(expr) => {
                self.execute(Fragments::macro_expansion(line, &expr), Commit::Nothing, line)?;
            }
            ReplCommand::Time { reps } => return self.timed(reps.as_deref()),
            ReplCommand::TopLevel => return self.top_level(),
            ReplCommand::Rerun => {
                let fragments = self.pending.clone();
                self.execute(fragments, Commit::Nothing, line)?;
            }
            ReplCommand::RunMode { mode, compiler } => self.run_mode(mode, compiler)?,
            ReplCommand::Werror(on) => {
                self.state.werror = on;
                writeln!(
                    self.out,
                    "warnings as errors: {}",
                    if on { "on" } else { "off" }
                )?;
            }
            ReplCommand::MissingArgument(letter) => {
                writeln!(self.out, "\";{letter}\" needs an argument")?;
            }
            ReplCommand::Unknown(text) => writeln!(self.out, "Unknown command \"{text}\"")?,
        }
        Ok(Flow::Continue)
    }

    fn timed(&mut self, reps: Option<&str>) -> Result<Flow> {
        let line = self.state.line;
        let unit = read_unit(&mut self.reader, line, ReadRequest::timed())?;
        let statement = match unit.kind {
            UnitKind::EndOfInput => return Ok(Flow::Quit),
            _ if unit.is_invalid() => None,
            UnitKind::Statement => Some(unit.text),
            UnitKind::Expression => Some(format!("{};\n", unit.text)),
            _ => None,
        };
        match statement {
            Some(statement) => {
                let fragments = self.synth.timing(line, reps, &statement);
                self.execute(fragments, Commit::Nothing, line)?;
            }
            None => writeln!(self.out, "Expected statement or expression after \";t\"")?,
        }
        Ok(Flow::Continue)
    }

    fn top_level(&mut self) -> Result<Flow> {
        let line = self.state.line;
        let unit = read_unit(&mut self.reader, line, ReadRequest::top())?;
        match unit.kind {
            UnitKind::EndOfInput => return Ok(Flow::Quit),
            UnitKind::Statement if !unit.is_invalid() => {
                self.execute(Fragments::top_level(line, &unit.text), Commit::Preamble, unit.line)?;
            }
            _ => writeln!(self.out, "Expected statement after \";f\"")?,
        }
        Ok(Flow::Continue)
    }

    fn run_mode(&mut self, mode: Option<RunMode>, compiler: CompilerChange) -> Result<()> {
        match compiler {
            CompilerChange::Keep => {}
            CompilerChange::Reset => self.set_compiler(None),
            CompilerChange::Set(cc) => self.set_compiler(Some(cc)),
        }
        if let Some(mode) = mode {
            if self.backend.supports(mode) {
                self.state.run_mode = mode;
                info!(target: "runtime.session", mode = mode.as_str(), "run_mode_changed");
            } else {
                writeln!(
                    self.out,
                    "run type {mode} needs an embedded compiler, staying on {}",
                    self.state.run_mode
                )?;
            }
        }
        writeln!(
            self.out,
            "run type: {}, compiler: {}",
            self.state.run_mode,
            self.backend.compiler()
        )?;
        Ok(())
    }

    /// A startup mode the backend cannot run falls back to in-process loading.
    fn settle_run_mode(&mut self) -> Result<()> {
        let mode = self.state.run_mode;
        if self.backend.supports(mode) {
            return Ok(());
        }
        self.state.run_mode = RunMode::Library;
        warn!(target: "runtime.session", mode = mode.as_str(), "startup_run_mode_unsupported");
        writeln!(
            self.out,
            "run type {mode} needs an embedded compiler, staying on {}",
            self.state.run_mode
        )?;
        Ok(())
    }

    fn set_compiler(&mut self, compiler: Option<String>) {
        self.state.compiler = compiler.clone();
        self.backend.set_compiler(compiler);
    }

    /// Run `fragments` against the recorded program; on success commit them
    /// as `commit` says and adopt `next_line`. Returns whether the run
    /// succeeded.
    fn execute(&mut self, fragments: Fragments, commit: Commit, next_line: usize) -> Result<bool> {
        let source = match self.source_for(&fragments) {
            Ok(source) => source,
            Err(e) => {
                writeln!(self.out, "{e}")?;
                self.pending = fragments;
                return Ok(false);
            }
        };
        let request = RunRequest {
            source: &source,
            options: &self.state.options,
            args: &self.state.args,
            werror: self.state.werror,
        };
        self.out.flush()?;
        let result = self.backend.run(self.state.run_mode, &request);
        let ok = match result {
            Ok(outcome) => {
                self.out.write_all(outcome.diagnostics.as_bytes())?;
                if !outcome.succeeded() {
                    writeln!(self.out, "program returned {}", outcome.status)?;
                }
                outcome.succeeded()
            }
            Err(BackendError::Compile { diagnostics }) => {
                self.out.write_all(diagnostics.as_bytes())?;
                false
            }
            Err(e) => {
                writeln!(self.out, "{e}")?;
                false
            }
        };
        info!(target: "runtime.session", ok, mode = self.state.run_mode.as_str(), source_len = source.len(), "unit_executed");

        if !ok {
            self.pending = fragments;
            return Ok(false);
        }
        match commit {
            Commit::Nothing => self.pending = fragments,
            Commit::Body => {
                self.state.commit_statement(&fragments.last, next_line);
                self.pending = Fragments::default();
            }
            Commit::Preamble => {
                self.state.commit_preamble(&fragments.first, next_line);
                self.pending = Fragments::default();
            }
        }
        Ok(true)
    }

    fn source_for(&self, fragments: &Fragments) -> Result<String, core_repl::EmbedError> {
        let preamble = expand_embeds_from_disk(&self.state.preamble)?;
        let first = expand_embeds_from_disk(&fragments.first)?;
        let body = expand_embeds_from_disk(&self.state.body)?;
        let last = expand_embeds_from_disk(&fragments.last)?;
        Ok(self
            .synth
            .synthesize(self.state.line, &preamble, &first, &body, &last))
    }
}

fn write_list<W: Write>(out: &mut W, title: &str, items: &[String]) -> std::io::Result<()> {
    write!(out, "{title}")?;
    for item in items {
        write!(out, " '{item}'")?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_backend::RunOutcome;
    use core_editor::PlainLineReader;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    /// Records every unit and fails the ones containing `fail_marker`.
    #[derive(Default)]
    struct FakeBackend {
        sources: Vec<String>,
        fail_marker: Option<&'static str>,
        compiler: Option<String>,
    }

    impl Backend for FakeBackend {
        fn run(&mut self, mode: RunMode, request: &RunRequest<'_>) -> Result<RunOutcome, BackendError> {
            if mode == RunMode::Memory {
                return Err(BackendError::Unsupported(mode));
            }
            self.sources.push(request.source.to_string());
            match self.fail_marker {
                Some(marker) if request.source.contains(marker) => Err(BackendError::Compile {
                    diagnostics: "line 1: error: nope\n".into(),
                }),
                _ => Ok(RunOutcome::default()),
            }
        }

        fn compiler(&self) -> String {
            self.compiler.clone().unwrap_or_else(|| "cc".into())
        }

        fn set_compiler(&mut self, compiler: Option<String>) {
            self.compiler = compiler;
        }

        fn supports(&self, mode: RunMode) -> bool {
            mode != RunMode::Memory
        }
    }

    type TestSession = Session<PlainLineReader<Cursor<Vec<u8>>, Vec<u8>>, FakeBackend, Vec<u8>>;

    fn session(input: &str, backend: FakeBackend) -> TestSession {
        let reader = PlainLineReader::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        Session::new(reader, backend, Vec::new(), ProgramState::new())
    }

    fn run(input: &str) -> TestSession {
        let mut s = session(input, FakeBackend::default());
        s.run().unwrap();
        s
    }

    fn output(s: &TestSession) -> String {
        String::from_utf8_lossy(s.output()).into_owned()
    }

    #[test]
    fn statements_commit_and_expressions_do_not() {
        let s = run("int x = 1;\nx + 1\n");
        assert_eq!(s.state().line, 1);
        assert!(s.state().body.ends_with("int x = 1;\n"));
        let sources = &s.backend().sources;
        assert_eq!(sources.len(), 2);
        assert!(sources[1].contains("PRINT((x + 1));"));
        assert!(!s.state().body.contains("PRINT"));
    }

    #[test]
    fn failed_statement_leaves_state_untouched() {
        let mut s = session(
            "int ok = 1;\nint bad = ;\n",
            FakeBackend {
                fail_marker: Some("bad"),
                ..FakeBackend::default()
            },
        );
        s.run().unwrap();
        assert_eq!(s.state().line, 1);
        assert!(!s.state().body.contains("bad"));
        assert!(output(&s).contains("line 1: error: nope"));
    }

    #[test]
    fn clear_command_resets_buffers_and_line() {
        let s = run("#include <math.h>\nint x = 1;\n;c\n");
        assert_eq!(s.state().preamble, "");
        assert_eq!(s.state().body, "");
        assert_eq!(s.state().line, 0);
    }

    #[test]
    fn preprocessor_and_top_level_go_to_preamble() {
        let s = run("#define N 3\n;f\nint twice(int v) { return 2 * v; }\n");
        assert!(s.state().preamble.contains("#define N 3\n"));
        assert!(s.state().preamble.contains("int twice(int v)"));
        assert_eq!(s.state().body, "");
        assert_eq!(s.state().line, 2);
    }

    #[test]
    fn top_level_needs_a_statement() {
        let s = run(";f\n1 + 1\n");
        assert!(output(&s).contains("Expected statement after \";f\""));
        assert!(s.backend().sources.is_empty());
    }

    #[test]
    fn timing_wraps_expression_and_never_commits() {
        let s = run(";t:10\nf()\n");
        let src = &s.backend().sources[0];
        assert!(src.contains("f()\n;\n"));
        assert!(src.contains("__icReps = (10)"));
        assert_eq!(s.state().line, 0);
        assert_eq!(s.state().body, "");
    }

    #[test]
    fn rerun_repeats_uncommitted_fragments_only() {
        let s = run("int a = 1;\n;;\n41 + 1\n;;\n");
        let sources = &s.backend().sources;
        assert_eq!(sources.len(), 4);
        // After a commit the rerun carries no extra fragment.
        assert_eq!(sources[1].matches("int a = 1;").count(), 1);
        assert!(sources[3].contains("PRINT((41 + 1));"));
        assert_eq!(s.state().line, 1);
    }

    #[test]
    fn options_arguments_and_toggles_print_state() {
        let s = run(";o -O2 '-DX=a b'\n;a one\n;A\n;W\n;w\n;O\n;zz\n;q\nint never;\n");
        let out = output(&s);
        assert!(out.starts_with(GREETING));
        assert!(out.contains("current options: '-O2' '-DX=a b'\n"));
        assert!(out.contains("current arguments: 'one'\n"));
        assert!(out.contains("cleared arguments\n"));
        assert!(out.contains("warnings as errors: off\n"));
        assert!(out.contains("warnings as errors: on\n"));
        assert!(out.contains("cleared options\n"));
        assert!(out.contains("Unknown command \";zz\"\n"));
        assert!(s.backend().sources.is_empty());
        assert!(s.state().options.is_empty());
    }

    #[test]
    fn memory_mode_is_refused_and_compiler_override_applies() {
        let s = run(";rm\n;rc=clang\n;rd\n");
        let out = output(&s);
        assert!(out.contains("run type mem needs an embedded compiler, staying on dll\n"));
        assert!(out.contains("run type: cc, compiler: clang\n"));
        assert!(out.contains("run type: dll, compiler: clang\n"));
        assert_eq!(s.state().run_mode, RunMode::Library);
        assert_eq!(s.state().compiler.as_deref(), Some("clang"));
    }

    #[test]
    fn unsupported_startup_mode_falls_back_before_the_first_run() {
        let reader = PlainLineReader::new(Cursor::new(b"int x = 1;\n".to_vec()), Vec::new());
        let mut state = ProgramState::new();
        state.run_mode = RunMode::Memory;
        let mut s = Session::new(reader, FakeBackend::default(), Vec::new(), state);
        s.run().unwrap();
        assert!(output(&s).contains("run type mem needs an embedded compiler, staying on dll\n"));
        assert_eq!(s.state().run_mode, RunMode::Library);
        assert_eq!(s.backend().sources.len(), 1);
        assert!(s.state().body.ends_with("int x = 1;\n"));
    }

    #[test]
    fn invalid_input_is_reported_without_compiling() {
        let s = run("f(]\n");
        assert!(output(&s).contains("Invalid input"));
        assert!(s.backend().sources.is_empty());
    }

    #[test]
    fn listing_shows_recorded_code() {
        let s = run("int y = 2;\n;l\n");
        let out = output(&s);
        assert!(out.contains("/* top */\n/* main */\n#line 1 \"<string>\"\nint y = 2;\n"));
    }

    #[test]
    fn embed_is_expanded_before_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("blob.bin");
        std::fs::write(&file, [1u8, 255]).unwrap();
        let input = format!(
            "unsigned char blob[] = {{\n#embed \"{}\"\n}};\n",
            file.display()
        );
        let s = run(&input);
        let src = &s.backend().sources[0];
        assert!(src.contains("0x01,0xFF"));
        // The recorded body keeps the directive itself.
        assert!(s.state().body.contains("#embed"));
    }
}
