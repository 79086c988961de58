//! Koma shell entry point.
//!
//! Reads command lines from stdin and runs each one against an in-memory
//! filesystem. Usage: `koma [--config PATH] [--tape PATH]`.
//! The config path falls back to the `KOMA_CONFIG` environment variable.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};

use koma_shell::{CommandRegistry, Executor, Io, ShellState};
use koma_types::config::ShellConfig;
use koma_vfs::tape::Tape;
use koma_vfs::{MemoryVfs, Vfs};

/// Writer-backed IO, normally stdout and stderr. After a failed write to
/// `out` the sink is closed and further output is dropped.
struct StdIo<O: Write, E: Write> {
    out: O,
    err: E,
    closed: bool,
}

impl<O: Write, E: Write> StdIo<O, E> {
    fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            closed: false,
        }
    }

    /// Print the prompt without a newline.
    fn prompt(&mut self, prompt: &str) {
        if self.closed {
            return;
        }
        if let Err(e) = write!(self.out, "{prompt}").and_then(|()| self.out.flush()) {
            log::warn!("stdout write failed: {e}");
            self.closed = true;
        }
    }
}

impl<O: Write, E: Write> Io for StdIo<O, E> {
    fn writeln(&mut self, line: &str) {
        if self.closed {
            return;
        }
        if let Err(e) = writeln!(self.out, "{line}") {
            log::warn!("stdout write failed: {e}");
            self.closed = true;
        }
    }

    fn ewriteln(&mut self, line: &str) {
        if let Err(e) = writeln!(self.err, "{line}") {
            log::warn!("stderr write failed: {e}");
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    tape: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                args.config = Some(iter.next().context("--config needs a path")?.into());
            },
            "--tape" => {
                args.tape = Some(iter.next().context("--tape needs a path")?.into());
            },
            other => bail!("unknown argument: {other} (usage: koma [--config PATH] [--tape PATH])"),
        }
    }
    if args.config.is_none() {
        args.config = std::env::var_os("KOMA_CONFIG").map(PathBuf::from);
    }
    Ok(args)
}

fn setup_vfs(tape: Option<&PathBuf>, config: &ShellConfig) -> Result<MemoryVfs> {
    let mut vfs = MemoryVfs::new();
    match tape {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading tape {}", path.display()))?;
            let stats = Tape::from_json(&text)?.restore(&mut vfs)?;
            log::info!(
                "Restored {} files and {} directories from {}",
                stats.files,
                stats.directories,
                path.display()
            );
        },
        None => {
            vfs.mkdir("/home")?;
            vfs.mkdir("/tmp")?;
        },
    }
    if !vfs.is_dir(&config.cwd) {
        vfs.mkdir(&config.cwd)?;
    }
    Ok(vfs)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => ShellConfig::load(path)?,
        None => ShellConfig::default(),
    };
    let mut vfs = setup_vfs(args.tape.as_ref(), &config)?;
    let mut state = ShellState::from_config(&config);

    let registry = CommandRegistry::with_builtins();
    let executor = Executor::new(&registry);
    log::info!("Koma ready ({} commands, cwd {})", registry.len(), state.cwd);

    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut io = StdIo::new(std::io::stdout(), std::io::stderr());
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            io.prompt(&config.prompt);
        }
        if io.closed {
            break;
        }
        let Some(line) = lines.next() else {
            break;
        };
        executor.execute_line(&line?, &mut state, &mut vfs, &mut io);
        if io.closed {
            log::warn!("stdout closed; stopping");
            break;
        }
    }

    std::process::exit(state.last_exit_code);
}
