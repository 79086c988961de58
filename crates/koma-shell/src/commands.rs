//! Builtin commands: echo, cat, pwd, cd, export, true, false, test, `[`.

use koma_types::error::{KomaError, Result};
use koma_types::exit::{ExitCode, FAILURE, SUCCESS, USAGE};

use crate::io::Io;
use crate::registry::{Command, CommandRegistry, Context};
use crate::test_expr::{self, Invocation};

/// Register every builtin into a registry.
pub fn register_builtins(reg: &mut CommandRegistry) {
    reg.register(Box::new(EchoCmd));
    reg.register(Box::new(CatCmd));
    reg.register(Box::new(PwdCmd));
    reg.register(Box::new(CdCmd));
    reg.register(Box::new(ExportCmd));
    reg.register(Box::new(TrueCmd));
    reg.register(Box::new(FalseCmd));
    reg.register(Box::new(TestCmd(Invocation::Test)));
    reg.register(Box::new(TestCmd(Invocation::Bracket)));
    crate::text_commands::register_text_commands(reg);
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Print arguments"
    }
    fn usage(&self) -> &str {
        "echo [text...]"
    }
    fn execute(&self, args: &[&str], _ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        io.writeln(&args.join(" "));
        Ok(SUCCESS)
    }
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Print file contents"
    }
    fn usage(&self) -> &str {
        "cat [file...]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        if args.is_empty() {
            for line in ctx.read_lines(None)? {
                io.writeln(&line);
            }
            return Ok(SUCCESS);
        }
        // Keep going after a bad file, like POSIX cat.
        let mut code = SUCCESS;
        for &file in args {
            match ctx.read_lines(Some(file)) {
                Ok(lines) => lines.iter().for_each(|line| io.writeln(line)),
                Err(e) if e.is_not_found() => {
                    io.ewriteln(&format!("cat: {file}: No such file or directory"));
                    code = FAILURE;
                },
                Err(e) => {
                    io.ewriteln(&format!("cat: {file}: {e}"));
                    code = FAILURE;
                },
            }
        }
        Ok(code)
    }
}

// ---------------------------------------------------------------------------
// pwd / cd
// ---------------------------------------------------------------------------

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print working directory"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, _args: &[&str], ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        io.writeln(&ctx.state.cwd);
        Ok(SUCCESS)
    }
}

struct CdCmd;
impl Command for CdCmd {
    fn name(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Change directory"
    }
    fn usage(&self) -> &str {
        "cd [dir]"
    }
    fn category(&self) -> &str {
        "filesystem"
    }
    fn execute(&self, args: &[&str], ctx: &mut Context<'_>, _io: &mut dyn Io) -> Result<ExitCode> {
        let target = match args.first() {
            Some(dir) => ctx.resolve(dir),
            None => ctx.state.get_var("HOME").unwrap_or_else(|| "/".to_string()),
        };
        if !ctx.vfs.is_dir(&target) {
            return Err(KomaError::Command(format!("{target}: not a directory")));
        }
        ctx.state.set_cwd(&target);
        Ok(SUCCESS)
    }
}

// ---------------------------------------------------------------------------
// export
// ---------------------------------------------------------------------------

struct ExportCmd;
impl Command for ExportCmd {
    fn name(&self) -> &str {
        "export"
    }
    fn description(&self) -> &str {
        "Set environment variables"
    }
    fn usage(&self) -> &str {
        "export [NAME=value...]"
    }
    fn category(&self) -> &str {
        "config"
    }
    fn execute(&self, args: &[&str], ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        if args.is_empty() {
            for (name, value) in &ctx.state.env {
                io.writeln(&format!("{name}={value}"));
            }
            return Ok(SUCCESS);
        }
        let mut code = SUCCESS;
        for &arg in args {
            match arg.split_once('=') {
                Some((name, value)) if is_valid_name(name) => ctx.state.set_var(name, value),
                Some(_) => {
                    io.ewriteln(&format!("export: '{arg}': not a valid identifier"));
                    code = USAGE;
                },
                // Bare names are already visible to expansion.
                None => {},
            }
        }
        Ok(code)
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// true / false
// ---------------------------------------------------------------------------

struct TrueCmd;
impl Command for TrueCmd {
    fn name(&self) -> &str {
        "true"
    }
    fn description(&self) -> &str {
        "Exit with status 0"
    }
    fn usage(&self) -> &str {
        "true"
    }
    fn execute(&self, _args: &[&str], _ctx: &mut Context<'_>, _io: &mut dyn Io) -> Result<ExitCode> {
        Ok(SUCCESS)
    }
}

struct FalseCmd;
impl Command for FalseCmd {
    fn name(&self) -> &str {
        "false"
    }
    fn description(&self) -> &str {
        "Exit with status 1"
    }
    fn usage(&self) -> &str {
        "false"
    }
    fn execute(&self, _args: &[&str], _ctx: &mut Context<'_>, _io: &mut dyn Io) -> Result<ExitCode> {
        Ok(FAILURE)
    }
}

// ---------------------------------------------------------------------------
// test / [
// ---------------------------------------------------------------------------

struct TestCmd(Invocation);
impl Command for TestCmd {
    fn name(&self) -> &str {
        self.0.name()
    }
    fn description(&self) -> &str {
        "Evaluate a conditional expression"
    }
    fn usage(&self) -> &str {
        match self.0 {
            Invocation::Test => "test EXPRESSION",
            Invocation::Bracket => "[ EXPRESSION ]",
        }
    }
    fn category(&self) -> &str {
        "scripting"
    }
    fn execute(&self, args: &[&str], _ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
        Ok(test_expr::status(args, self.0, io))
    }
}
