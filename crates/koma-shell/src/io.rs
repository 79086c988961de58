//! Terminal output sinks.

/// Line-oriented output surface handed to every command.
pub trait Io {
    /// Write one line of regular output.
    fn writeln(&mut self, line: &str);

    /// Write one line of diagnostics.
    fn ewriteln(&mut self, line: &str);
}

/// In-memory sink that records regular output and diagnostics separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferIo {
    lines: Vec<String>,
    errors: Vec<String>,
}

impl BufferIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// All regular output joined with `\n`.
    pub fn get_output(&self) -> String {
        self.lines.join("\n")
    }

    /// All diagnostics joined with `\n`.
    pub fn get_errors(&self) -> String {
        self.errors.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.errors.clear();
    }
}

impl Io for BufferIo {
    fn writeln(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn ewriteln(&mut self, line: &str) {
        self.errors.push(line.to_string());
    }
}

/// Captures one stage's regular output while forwarding its diagnostics.
pub(crate) struct StageCapture<'a> {
    pub(crate) lines: Vec<String>,
    diagnostics: &'a mut dyn Io,
}

impl<'a> StageCapture<'a> {
    pub(crate) fn new(diagnostics: &'a mut dyn Io) -> Self {
        Self {
            lines: Vec::new(),
            diagnostics,
        }
    }
}

impl Io for StageCapture<'_> {
    fn writeln(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn ewriteln(&mut self, line: &str) {
        self.diagnostics.ewriteln(line);
    }
}
