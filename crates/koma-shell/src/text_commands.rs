//! Text processing commands: grep, wc, head.

use koma_types::error::Result;
use koma_types::exit::{ExitCode, FAILURE, SUCCESS, USAGE};

use crate::io::Io;
use crate::registry::{Command, CommandRegistry, Context};

pub fn register_text_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(GrepCmd));
    reg.register(Box::new(WcCmd));
    reg.register(Box::new(HeadCmd));
}

/// Lines from every named file in order, or from the piped-in buffer when no
/// file is given.
fn read_text_input(files: &[&str], ctx: &Context<'_>) -> Result<Vec<String>> {
    if files.is_empty() {
        return ctx.read_lines(None);
    }
    let mut lines = Vec::new();
    for &file in files {
        lines.extend(ctx.read_lines(Some(file))?);
    }
    Ok(lines)
}

// ---------------------------------------------------------------------------
// grep
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GrepOptions {
    ignore_case: bool,
    invert: bool,
    count: bool,
    line_numbers: bool,
}

struct GrepCmd;
impl Command for GrepCmd {
    fn name(&self) -> &str {
        "grep"
    }
    fn description(&self) -> &str {
        "Print lines containing a pattern"
    }
    fn usage(&self) -> &str {
        "grep [-i] [-v] [-c] [-n] <pattern> [file...]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        let mut opts = GrepOptions::default();
        let mut rest = args;
        while let Some((&flag, tail)) = rest.split_first() {
            if flag.len() < 2 || !flag.starts_with('-') {
                break;
            }
            for c in flag[1..].chars() {
                match c {
                    'i' => opts.ignore_case = true,
                    'v' => opts.invert = true,
                    'c' => opts.count = true,
                    'n' => opts.line_numbers = true,
                    _ => {
                        io.ewriteln(&format!("grep: invalid option -- '{c}'"));
                        io.ewriteln(&format!("usage: {}", self.usage()));
                        return Ok(USAGE);
                    },
                }
            }
            rest = tail;
        }
        let Some((&pattern, files)) = rest.split_first() else {
            io.ewriteln(&format!("usage: {}", self.usage()));
            return Ok(USAGE);
        };

        let needle = if opts.ignore_case {
            pattern.to_lowercase()
        } else {
            pattern.to_string()
        };
        let lines = read_text_input(files, ctx)?;
        let mut matched = 0usize;
        for (i, line) in lines.iter().enumerate() {
            let hit = if opts.ignore_case {
                line.to_lowercase().contains(&needle)
            } else {
                line.contains(&needle)
            };
            if hit == opts.invert {
                continue;
            }
            matched += 1;
            if opts.count {
                continue;
            }
            if opts.line_numbers {
                io.writeln(&format!("{}:{line}", i + 1));
            } else {
                io.writeln(line);
            }
        }
        if opts.count {
            io.writeln(&matched.to_string());
        }
        Ok(if matched > 0 { SUCCESS } else { FAILURE })
    }
}

// ---------------------------------------------------------------------------
// wc
// ---------------------------------------------------------------------------

struct WcCmd;
impl Command for WcCmd {
    fn name(&self) -> &str {
        "wc"
    }
    fn description(&self) -> &str {
        "Count lines, words, and bytes"
    }
    fn usage(&self) -> &str {
        "wc [-l|-w|-c] [file...]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        let mut mode = "all";
        let mut file_args = Vec::new();
        for &arg in args {
            match arg {
                "-l" => mode = "lines",
                "-w" => mode = "words",
                "-c" => mode = "bytes",
                _ => file_args.push(arg),
            }
        }
        let counts = if file_args.is_empty() {
            // Piped lines were each written with a newline.
            let input = ctx.read_lines(None)?;
            let piped: String = input.iter().map(|l| format!("{l}\n")).collect();
            WcCounts::of(&piped)
        } else {
            let mut total = WcCounts::default();
            for &file in &file_args {
                let counts = WcCounts::of(&ctx.vfs.read_to_string(&ctx.resolve(file))?);
                total.lines += counts.lines;
                total.words += counts.words;
                total.bytes += counts.bytes;
            }
            total
        };
        let WcCounts { lines, words, bytes } = counts;
        let text = match mode {
            "lines" => lines.to_string(),
            "words" => words.to_string(),
            "bytes" => bytes.to_string(),
            _ => format!("{lines:>8} {words:>8} {bytes:>8}"),
        };
        io.writeln(&text);
        Ok(SUCCESS)
    }
}

/// Counts as POSIX `wc` reports them: `lines` is the number of newlines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct WcCounts {
    lines: usize,
    words: usize,
    bytes: usize,
}

impl WcCounts {
    fn of(text: &str) -> Self {
        Self {
            lines: text.matches('\n').count(),
            words: text.split_whitespace().count(),
            bytes: text.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// head
// ---------------------------------------------------------------------------

struct HeadCmd;
impl Command for HeadCmd {
    fn name(&self) -> &str {
        "head"
    }
    fn description(&self) -> &str {
        "Show first N lines"
    }
    fn usage(&self) -> &str {
        "head [-n N] [file...]"
    }
    fn category(&self) -> &str {
        "text"
    }
    fn execute(&self, args: &[&str], ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        let (n, files) = match parse_n_flag(args, 10) {
            Some(parsed) => parsed,
            None => {
                io.ewriteln(&format!("usage: {}", self.usage()));
                return Ok(USAGE);
            },
        };
        for line in read_text_input(&files, ctx)?.iter().take(n) {
            io.writeln(line);
        }
        Ok(SUCCESS)
    }
}

/// Split `-n N` (or `-nN`) from the remaining file arguments. `None` when
/// the count is missing or not a number.
fn parse_n_flag<'a>(args: &[&'a str], default: usize) -> Option<(usize, Vec<&'a str>)> {
    let mut n = default;
    let mut files = Vec::new();
    let mut iter = args.iter();
    while let Some(&arg) = iter.next() {
        if arg == "-n" {
            n = iter.next()?.parse().ok()?;
        } else if let Some(count) = arg.strip_prefix("-n") {
            n = count.parse().ok()?;
        } else {
            files.push(arg);
        }
    }
    Some((n, files))
}
