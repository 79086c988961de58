//! Command trait and name-to-handler registry.

use std::collections::HashMap;

use koma_types::error::Result;
use koma_types::exit::ExitCode;
use koma_vfs::{Vfs, resolve_path};

use crate::io::Io;
use crate::state::ShellState;

/// Everything a command may touch while it runs.
pub struct Context<'a> {
    pub state: &'a mut ShellState,
    pub vfs: &'a mut dyn Vfs,
    /// Output of the previous stage, or the `<` file's lines for the first
    /// stage. `None` when nothing was piped in.
    pub stdin: Option<&'a [String]>,
}

impl Context<'_> {
    /// Resolve a user-supplied path against the working directory.
    pub fn resolve(&self, path: &str) -> String {
        resolve_path(&self.state.cwd, path)
    }

    /// Lines of a named file, or the piped-in lines when `file` is `None`.
    pub fn read_lines(&self, file: Option<&str>) -> Result<Vec<String>> {
        match file {
            Some(path) => {
                let text = self.vfs.read_to_string(&self.resolve(path))?;
                Ok(text.lines().map(str::to_string).collect())
            },
            None => Ok(self.stdin.map(<[String]>::to_vec).unwrap_or_default()),
        }
    }
}

/// A single executable command.
pub trait Command {
    /// The name users type. Matched case-insensitively.
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Usage string (e.g. "cat \[file...\]").
    fn usage(&self) -> &str;

    fn category(&self) -> &str {
        "general"
    }

    /// Run the command. Output goes through `io`; the return value is the
    /// exit code. An `Err` is reported by the executor as a diagnostic and
    /// exit code 1.
    fn execute(&self, args: &[&str], ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode>;
}

/// Commands available to a shell, keyed by lowercase name.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Create a registry holding every builtin.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::register_builtins(&mut reg);
        reg
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_ascii_lowercase(), cmd);
    }

    pub fn resolve(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .get(name.to_ascii_lowercase().as_str())
            .map(|cmd| cmd.as_ref())
    }

    /// Sorted (name, description) pairs.
    pub fn list_commands(&self) -> Vec<(&str, &str)> {
        let mut cmds: Vec<(&str, &str)> = self
            .commands
            .values()
            .map(|c| (c.name(), c.description()))
            .collect();
        cmds.sort_by_key(|(name, _)| *name);
        cmds
    }

    /// Sorted command names starting with `partial`.
    pub fn completions(&self, partial: &str) -> Vec<String> {
        let lower = partial.to_ascii_lowercase();
        let mut names: Vec<String> = self
            .commands
            .keys()
            .filter(|name| name.starts_with(&lower))
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::BufferIo;
    use koma_types::exit::SUCCESS;
    use koma_vfs::MemoryVfs;

    struct Hello;
    impl Command for Hello {
        fn name(&self) -> &str {
            "Hello"
        }
        fn description(&self) -> &str {
            "Greet"
        }
        fn usage(&self) -> &str {
            "hello"
        }
        fn execute(&self, _args: &[&str], _ctx: &mut Context<'_>, io: &mut dyn Io) -> Result<ExitCode> {
            io.writeln("hi");
            Ok(SUCCESS)
        }
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(Hello));
        assert!(reg.resolve("hello").is_some());
        assert!(reg.resolve("HELLO").is_some());
        assert!(reg.resolve("bye").is_none());
        assert_eq!(reg.resolve("hello").unwrap().category(), "general");
    }

    #[test]
    fn register_replaces() {
        let mut reg = CommandRegistry::new();
        reg.register(Box::new(Hello));
        reg.register(Box::new(Hello));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn listing_and_completion() {
        let reg = CommandRegistry::with_builtins();
        let names: Vec<&str> = reg.list_commands().iter().map(|(n, _)| *n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"["));
        assert_eq!(reg.completions("ec"), vec!["echo"]);
        assert!(reg.completions("zzz").is_empty());
    }

    #[test]
    fn context_reads_files_and_stdin() {
        let mut vfs = MemoryVfs::new();
        vfs.mkdir("/home").unwrap();
        vfs.write("/home/a.txt", b"one\ntwo").unwrap();
        let mut state = ShellState::new("/home");
        let piped = vec!["p1".to_string()];
        let ctx = Context {
            state: &mut state,
            vfs: &mut vfs,
            stdin: Some(piped.as_slice()),
        };
        assert_eq!(ctx.read_lines(Some("a.txt")).unwrap(), vec!["one", "two"]);
        assert_eq!(ctx.read_lines(None).unwrap(), vec!["p1"]);
        assert!(ctx.read_lines(Some("missing")).is_err());
        let mut io = BufferIo::new();
        let mut ctx = ctx;
        assert_eq!(Hello.execute(&[], &mut ctx, &mut io).unwrap(), 0);
        assert_eq!(io.get_output(), "hi");
    }
}
