//! Plan and pipeline execution.
//!
//! Pipelines run one after another; each stage runs to completion and its
//! captured lines become the next stage's input. A failing stage does not
//! stop later stages, and a failing pipeline does not stop the plan. Only
//! the final stage's exit code is recorded in `$?`.

use koma_types::error::KomaError;
use koma_types::exit::{ExitCode, FAILURE, NOT_FOUND, SUCCESS};
use koma_vfs::{Vfs, resolve_path};

use crate::io::{Io, StageCapture};
use crate::parser::{CommandPlan, OutputMode, Pipeline, parse_tokens};
use crate::registry::{CommandRegistry, Context};
use crate::state::ShellState;
use crate::tokenizer::lex_expanded;


/// Runs command plans against a registry of commands.
pub struct Executor<'r> {
    registry: &'r CommandRegistry,
}

impl<'r> Executor<'r> {
    pub fn new(registry: &'r CommandRegistry) -> Self {
        Self { registry }
    }

    /// Parse and run one input line. Returns the exit code of the last
    /// pipeline that ran.
    pub fn execute_line(&self, line: &str, state: &mut ShellState, vfs: &mut dyn Vfs, io: &mut dyn Io) -> ExitCode {
        self.execute(&CommandPlan::parse(line), state, vfs, io)
    }

    /// Run every segment of a plan in order.
    ///
    /// Each segment is expanded and parsed just before it runs, so `$?`
    /// reflects the segments before it. A parse error fails only its own
    /// segment with exit code 2. An empty plan leaves `$?` unchanged.
    pub fn execute(&self, plan: &CommandPlan, state: &mut ShellState, vfs: &mut dyn Vfs, io: &mut dyn Io) -> ExitCode {
        for segment in plan.segments() {
            let tokens = lex_expanded(segment, state);
            let code = match parse_tokens(&tokens) {
                Ok(pipeline) => self.run_pipeline(&pipeline, state, vfs, io),
                Err(e) => {
                    io.ewriteln(&format!("koma: {e}"));
                    e.exit_code()
                },
            };
            state.last_exit_code = code;
        }
        state.last_exit_code
    }

    /// Run one pipeline and return its exit code. Does not touch `$?`.
    pub fn run_pipeline(&self, pipeline: &Pipeline, state: &mut ShellState, vfs: &mut dyn Vfs, io: &mut dyn Io) -> ExitCode {
        log::debug!("running pipeline: {pipeline}");

        let mut buffer: Option<Vec<String>> = None;
        if let Some(input) = &pipeline.input_file {
            let path = resolve_path(&state.cwd, input);
            match vfs.read_to_string(&path) {
                Ok(text) => buffer = Some(text.lines().map(str::to_string).collect()),
                Err(e) => {
                    io.ewriteln(&fs_diagnostic(input, &e));
                    return FAILURE;
                },
            }
        }

        let mut code = SUCCESS;
        for stage in &pipeline.stages {
            let Some(cmd) = self.registry.resolve(&stage.command) else {
                io.ewriteln(&format!("koma: {}: command not found", stage.command));
                code = NOT_FOUND;
                buffer = Some(Vec::new());
                continue;
            };
            let args: Vec<&str> = stage.args.iter().map(String::as_str).collect();
            let mut capture = StageCapture::new(&mut *io);
            let mut ctx = Context {
                state: &mut *state,
                vfs: &mut *vfs,
                stdin: buffer.as_deref(),
            };
            code = match cmd.execute(&args, &mut ctx, &mut capture) {
                Ok(code) => code,
                Err(e) => {
                    capture.ewriteln(&format!("{}: {e}", stage.command));
                    FAILURE
                },
            };
            log::debug!("{} exited with {code}", stage.command);
            buffer = Some(capture.lines);
        }

        let lines = buffer.unwrap_or_default();
        match &pipeline.output {
            Some(redirect) => {
                let path = resolve_path(&state.cwd, &redirect.path);
                if let Err(e) = write_output(vfs, &path, &lines, redirect.mode) {
                    io.ewriteln(&fs_diagnostic(&redirect.path, &e));
                    return FAILURE;
                }
            },
            None => lines.iter().for_each(|line| io.writeln(line)),
        }
        code
    }
}

fn fs_diagnostic(path: &str, err: &KomaError) -> String {
    if err.is_not_found() {
        format!("koma: {path}: No such file or directory")
    } else {
        format!("koma: {path}: {err}")
    }
}

/// Write captured lines to a file. Append joins onto existing content with
/// a newline unless the file already ends in one.
fn write_output(vfs: &mut dyn Vfs, path: &str, lines: &[String], mode: OutputMode) -> koma_types::error::Result<()> {
    let text = lines.join("\n");
    let content = match mode {
        OutputMode::Write => text,
        OutputMode::Append => {
            let existing = match vfs.read_to_string(path) {
                Ok(existing) => existing,
                Err(e) if e.is_not_found() => String::new(),
                Err(e) => return Err(e),
            };
            if existing.is_empty() {
                text
            } else if text.is_empty() {
                existing
            } else if existing.ends_with('\n') {
                existing + &text
            } else {
                format!("{existing}\n{text}")
            }
        },
    };
    log::debug!("writing {} bytes to {path}", content.len());
    vfs.write(path, content.as_bytes())
}
