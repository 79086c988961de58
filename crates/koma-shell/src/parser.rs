//! Command plans and pipelines.
//!
//! A line is first split on top-level `;` into a [`CommandPlan`]. Each
//! segment then parses into a [`Pipeline`]: one or more stages joined by `|`
//! with optional `<`, `>` and `>>` redirection. Redirections may appear
//! anywhere in the segment. When one kind repeats, the last occurrence wins.

use std::fmt;

use koma_types::exit::{ExitCode, USAGE};

use crate::tokenizer::{Token, lex};

/// Errors from parsing one pipeline. All map to exit code 2.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("syntax error: empty command")]
    EmptyCommand,

    #[error("syntax error near unexpected token '|'")]
    EmptyStage,

    #[error("syntax error: missing file name after '{0}'")]
    MissingTarget(&'static str),

    #[error("syntax error near unexpected token ';'")]
    UnexpectedSeparator,
}

impl ParseError {
    pub fn exit_code(&self) -> ExitCode {
        USAGE
    }
}

/// One command and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub command: String,
    pub args: Vec<String>,
}

impl Stage {
    /// First word is the command, the rest are arguments.
    fn from_words(mut words: Vec<String>) -> Option<Self> {
        if words.is_empty() {
            return None;
        }
        let command = words.remove(0);
        Some(Self {
            command,
            args: words,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `>`: create or truncate.
    Write,
    /// `>>`: create or append.
    Append,
}

impl OutputMode {
    pub fn operator(self) -> &'static str {
        match self {
            OutputMode::Write => ">",
            OutputMode::Append => ">>",
        }
    }
}

/// Destination of the last stage's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRedirect {
    pub path: String,
    pub mode: OutputMode,
}

/// Stages connected by `|`, plus redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Never empty.
    pub stages: Vec<Stage>,
    /// Feeds the first stage.
    pub input_file: Option<String>,
    /// Receives the last stage's output.
    pub output: Option<OutputRedirect>,
}

impl Pipeline {
    /// True when there is more than one stage or any redirection.
    pub fn is_pipeline(&self) -> bool {
        self.stages.len() > 1 || self.input_file.is_some() || self.output.is_some()
    }

    pub fn output_file(&self) -> Option<&str> {
        self.output.as_ref().map(|o| o.path.as_str())
    }

    pub fn output_mode(&self) -> Option<OutputMode> {
        self.output.as_ref().map(|o| o.mode)
    }
}

/// Quote a word so that [`lex`] reads it back unchanged.
///
/// Words with no special characters are emitted bare. Everything else is
/// single-quoted; embedded single quotes are spliced in as `"'"`, relying on
/// adjacent fragments joining into one word.
fn quote_word(word: &str) -> String {
    let plain = !word.is_empty()
        && !word
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '|' | '<' | '>' | ';' | '\'' | '"' | '$'));
    if plain {
        return word.to_string();
    }
    let mut out = String::with_capacity(word.len() + 2);
    for (i, piece) in word.split('\'').enumerate() {
        if i > 0 {
            out.push_str("\"'\"");
        }
        if !piece.is_empty() {
            out.push('\'');
            out.push_str(piece);
            out.push('\'');
        }
    }
    if out.is_empty() {
        out.push_str("''");
    }
    out
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_word(&self.command))?;
        for arg in &self.args {
            write!(f, " {}", quote_word(arg))?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{stage}")?;
        }
        if let Some(input) = &self.input_file {
            write!(f, " < {}", quote_word(input))?;
        }
        if let Some(output) = &self.output {
            write!(f, " {} {}", output.mode.operator(), quote_word(&output.path))?;
        }
        Ok(())
    }
}

/// Parse one segment of a command line.
pub fn parse_pipeline(line: &str) -> Result<Pipeline, ParseError> {
    parse_tokens(&lex(line))
}

/// Build a pipeline from already-lexed tokens.
pub fn parse_tokens(tokens: &[Token]) -> Result<Pipeline, ParseError> {
    let mut stages = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut input_file = None;
    let mut output = None;
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        match token {
            Token::Word(word) => words.push(word.clone()),
            Token::Pipe => {
                let stage = Stage::from_words(std::mem::take(&mut words))
                    .ok_or(ParseError::EmptyStage)?;
                stages.push(stage);
            },
            Token::RedirectIn => input_file = Some(redirect_target(iter.next(), "<")?),
            Token::RedirectOut => {
                output = Some(OutputRedirect {
                    path: redirect_target(iter.next(), ">")?,
                    mode: OutputMode::Write,
                });
            },
            Token::RedirectAppend => {
                output = Some(OutputRedirect {
                    path: redirect_target(iter.next(), ">>")?,
                    mode: OutputMode::Append,
                });
            },
            Token::Semicolon => return Err(ParseError::UnexpectedSeparator),
        }
    }

    match Stage::from_words(words) {
        Some(stage) => stages.push(stage),
        None if stages.is_empty() => return Err(ParseError::EmptyCommand),
        None => return Err(ParseError::EmptyStage),
    }

    Ok(Pipeline {
        stages,
        input_file,
        output,
    })
}

fn redirect_target(next: Option<&Token>, operator: &'static str) -> Result<String, ParseError> {
    match next {
        Some(Token::Word(path)) => Ok(path.clone()),
        _ => Err(ParseError::MissingTarget(operator)),
    }
}

/// Split a line on `;` outside quotes. Segments keep their quotes, are
/// trimmed, and empty segments are dropped.
pub fn split_by_semicolon(line: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            },
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                },
                ';' => push_segment(&mut segments, &mut current),
                _ => current.push(ch),
            },
        }
    }
    push_segment(&mut segments, &mut current);
    segments
}

fn push_segment(segments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

/// Ordered `;`-separated segments of one input line.
///
/// Segments are kept as raw text and parsed one at a time during execution,
/// so variable references such as `$?` see the results of earlier segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPlan {
    segments: Vec<String>,
}

impl CommandPlan {
    pub fn parse(line: &str) -> Self {
        Self {
            segments: split_by_semicolon(line),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn single_command() {
        let p = parse_pipeline("ls -la /home").unwrap();
        assert_eq!(p.stages, vec![Stage {
            command: "ls".into(),
            args: vec!["-la".into(), "/home".into()],
        }]);
        assert!(!p.is_pipeline());
        assert_eq!(p.output_file(), None);
        assert_eq!(p.output_mode(), None);
    }

    #[test]
    fn three_stages() {
        let p = parse_pipeline("cmd1 | cmd2 | cmd3").unwrap();
        assert_eq!(p.stages.len(), 3);
        assert!(p.is_pipeline());
        let names: Vec<&str> = p.stages.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(names, vec!["cmd1", "cmd2", "cmd3"]);
    }

    #[test]
    fn redirection_alone_makes_a_pipeline() {
        let p = parse_pipeline("cat < in.txt").unwrap();
        assert_eq!(p.stages.len(), 1);
        assert_eq!(p.input_file.as_deref(), Some("in.txt"));
        assert!(p.is_pipeline());

        let p = parse_pipeline("echo hi >> log.txt").unwrap();
        assert_eq!(p.output_file(), Some("log.txt"));
        assert_eq!(p.output_mode(), Some(OutputMode::Append));
        assert!(p.is_pipeline());
    }

    #[test]
    fn last_output_redirect_wins() {
        let p = parse_pipeline("ls > a.txt > b.txt").unwrap();
        assert_eq!(p.output_file(), Some("b.txt"));
        assert_eq!(p.output_mode(), Some(OutputMode::Write));

        let p = parse_pipeline("ls >> a.txt > b.txt >> c.txt").unwrap();
        assert_eq!(p.output_file(), Some("c.txt"));
        assert_eq!(p.output_mode(), Some(OutputMode::Append));

        let p = parse_pipeline("cat < a < b").unwrap();
        assert_eq!(p.input_file.as_deref(), Some("b"));
    }

    #[test]
    fn redirect_may_precede_arguments() {
        let p = parse_pipeline("grep > out.txt hello file.txt").unwrap();
        assert_eq!(p.stages[0].args, vec!["hello", "file.txt"]);
        assert_eq!(p.output_file(), Some("out.txt"));
    }

    #[test]
    fn quoted_operators_are_arguments() {
        let p = parse_pipeline(r#"echo "a | b" '>' x"#).unwrap();
        assert_eq!(p.stages.len(), 1);
        assert_eq!(p.stages[0].args, vec!["a | b", ">", "x"]);
        assert!(p.output.is_none());
    }

    #[test]
    fn empty_input_is_error() {
        assert_eq!(parse_pipeline(""), Err(ParseError::EmptyCommand));
        assert_eq!(parse_pipeline("   "), Err(ParseError::EmptyCommand));
        assert_eq!(parse_pipeline("> out.txt"), Err(ParseError::EmptyCommand));
    }

    #[test]
    fn dangling_pipes_are_errors() {
        assert_eq!(parse_pipeline("| ls"), Err(ParseError::EmptyStage));
        assert_eq!(parse_pipeline("ls |"), Err(ParseError::EmptyStage));
        assert_eq!(parse_pipeline("ls | | wc"), Err(ParseError::EmptyStage));
    }

    #[test]
    fn missing_redirect_targets() {
        assert_eq!(parse_pipeline("cat <"), Err(ParseError::MissingTarget("<")));
        assert_eq!(parse_pipeline("ls >"), Err(ParseError::MissingTarget(">")));
        assert_eq!(parse_pipeline("ls >> | wc"), Err(ParseError::MissingTarget(">>")));
    }

    #[test]
    fn parse_errors_exit_with_usage() {
        assert_eq!(ParseError::EmptyCommand.exit_code(), 2);
        assert_eq!(ParseError::MissingTarget("<").exit_code(), 2);
    }

    #[test]
    fn semicolon_token_rejected_inside_pipeline() {
        assert_eq!(parse_pipeline("a ; b"), Err(ParseError::UnexpectedSeparator));
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(split_by_semicolon(r#"echo "a;b" ; ls"#), vec![r#"echo "a;b""#, "ls"]);
        assert_eq!(split_by_semicolon("echo 'x;y';pwd"), vec!["echo 'x;y'", "pwd"]);
    }

    #[test]
    fn split_drops_empty_segments() {
        assert_eq!(split_by_semicolon("a;;b;  ;"), vec!["a", "b"]);
        assert!(split_by_semicolon(";;;").is_empty());
        assert!(split_by_semicolon("").is_empty());
    }

    #[test]
    fn plan_segments() {
        let plan = CommandPlan::parse("echo one; echo two ;");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.segments(), ["echo one", "echo two"]);
        assert!(CommandPlan::parse("  ").is_empty());
    }

    #[test]
    fn display_quotes_special_words() {
        let p = parse_pipeline(r#"echo "a b" "" "it's" | wc -l > "out file""#).unwrap();
        assert_eq!(p.to_string(), r#"echo 'a b' '' 'it'"'"'s' | wc -l > 'out file'"#);
    }

    #[test]
    fn display_reparses_equal() {
        let p = parse_pipeline("cat < in.txt | grep 'x;y' >> log").unwrap();
        assert_eq!(parse_pipeline(&p.to_string()).unwrap(), p);
    }

    fn arb_word() -> impl Strategy<Value = String> {
        "[a-z'\" |;<>$.-]{0,6}"
    }

    fn arb_pipeline() -> impl Strategy<Value = Pipeline> {
        let stage = (arb_word(), proptest::collection::vec(arb_word(), 0..4))
            .prop_map(|(command, args)| Stage { command, args });
        let output = proptest::option::of((arb_word(), any::<bool>()).prop_map(|(path, append)| {
            OutputRedirect {
                path,
                mode: if append { OutputMode::Append } else { OutputMode::Write },
            }
        }));
        (
            proptest::collection::vec(stage, 1..4),
            proptest::option::of(arb_word()),
            output,
        )
            .prop_map(|(stages, input_file, output)| Pipeline {
                stages,
                input_file,
                output,
            })
    }

    proptest! {
        #[test]
        fn reserialized_pipeline_reparses_equal(p in arb_pipeline()) {
            let text = p.to_string();
            prop_assert_eq!(parse_pipeline(&text).unwrap(), p);
        }
    }
}
