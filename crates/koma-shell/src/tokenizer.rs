//! Line tokenizer: words, quotes, and the `|` `<` `>` `>>` `;` operators.
//!
//! Quoting rules:
//!
//! - Single and double quotes both delimit literal spans; the quotes are
//!   removed and nothing inside is split, operator characters included.
//! - There is no backslash escape processing.
//! - Quoted and unquoted fragments with no whitespace between them join into
//!   one word: `foo"bar baz"` is the single word `foobar baz`.
//! - `""` yields an empty word.
//! - An unclosed quote runs to the end of the line; the partial span is kept
//!   as the final word.
//!
//! Outside quotes, operator characters end the current word and are emitted
//! as their own tokens whether or not whitespace surrounds them.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::state::ShellState;

/// A lexical token of one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A word with quotes already removed.
    Word(String),
    /// `|`
    Pipe,
    /// `<`
    RedirectIn,
    /// `>`
    RedirectOut,
    /// `>>`
    RedirectAppend,
    /// `;`
    Semicolon,
}

impl Token {
    /// Text of the token as it appears in [`tokenize`] output.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Word(word) => word,
            Token::Pipe => "|",
            Token::RedirectIn => "<",
            Token::RedirectOut => ">",
            Token::RedirectAppend => ">>",
            Token::Semicolon => ";",
        }
    }

    fn into_string(self) -> String {
        match self {
            Token::Word(word) => word,
            op => op.as_str().to_string(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a line into token strings. Operators come out as `"|"`, `">>"`,
/// etc.; no variable expansion takes place.
pub fn tokenize(line: &str) -> Vec<String> {
    lex(line).into_iter().map(Token::into_string).collect()
}

/// Split a line into typed tokens without variable expansion.
pub fn lex(line: &str) -> Vec<Token> {
    Lexer::new(line, None).run()
}

/// Split a line into typed tokens, expanding `$NAME`, `${NAME}` and `$?`
/// outside single quotes. Expanded values are inserted literally: they are
/// never re-scanned for quotes or operators and never split into words.
pub fn lex_expanded(line: &str, state: &ShellState) -> Vec<Token> {
    Lexer::new(line, Some(state)).run()
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    vars: Option<&'a ShellState>,
    tokens: Vec<Token>,
    current: String,
    /// Set once the current word has content or a quoted span, so that
    /// `""` still produces a word.
    in_word: bool,
}

impl<'a> Lexer<'a> {
    fn new(line: &'a str, vars: Option<&'a ShellState>) -> Self {
        Self {
            chars: line.chars().peekable(),
            vars,
            tokens: Vec::new(),
            current: String::new(),
            in_word: false,
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(ch) = self.chars.next() {
            match ch {
                '"' | '\'' => self.quoted(ch),
                '|' => self.operator(Token::Pipe),
                '<' => self.operator(Token::RedirectIn),
                ';' => self.operator(Token::Semicolon),
                '>' => {
                    if self.chars.next_if_eq(&'>').is_some() {
                        self.operator(Token::RedirectAppend);
                    } else {
                        self.operator(Token::RedirectOut);
                    }
                },
                c if c.is_whitespace() => self.flush(),
                '$' if self.vars.is_some() => self.dollar(false),
                c => {
                    self.current.push(c);
                    self.in_word = true;
                },
            }
        }
        self.flush();
        log::trace!("lexed {} tokens", self.tokens.len());
        self.tokens
    }

    fn flush(&mut self) {
        if self.in_word {
            self.tokens.push(Token::Word(std::mem::take(&mut self.current)));
            self.in_word = false;
        }
    }

    fn operator(&mut self, token: Token) {
        self.flush();
        self.tokens.push(token);
    }

    fn quoted(&mut self, quote: char) {
        self.in_word = true;
        while let Some(ch) = self.chars.next() {
            if ch == quote {
                return;
            }
            if ch == '$' && quote == '"' && self.vars.is_some() {
                self.dollar(true);
            } else {
                self.current.push(ch);
            }
        }
        log::warn!("unclosed {quote} quote; keeping text up to end of line");
    }

    /// Expand the variable reference following a `$`.
    fn dollar(&mut self, quoted: bool) {
        let Some(state) = self.vars else {
            self.current.push('$');
            return;
        };
        let value = match self.chars.peek().copied() {
            Some('?') => {
                self.chars.next();
                state.get_var("?")
            },
            Some('{') => {
                self.chars.next();
                let mut name = String::new();
                let mut closed = false;
                for ch in self.chars.by_ref() {
                    if ch == '}' {
                        closed = true;
                        break;
                    }
                    name.push(ch);
                }
                if !closed {
                    self.current.push_str("${");
                    self.current.push_str(&name);
                    self.in_word = true;
                    return;
                }
                state.get_var(&name)
            },
            Some(c) if c.is_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while let Some(c) = self.chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
                    name.push(c);
                }
                state.get_var(&name)
            },
            _ => {
                self.current.push('$');
                self.in_word = true;
                return;
            },
        };
        let value = value.unwrap_or_default();
        // An unquoted reference to an empty value contributes no word.
        if quoted || !value.is_empty() {
            self.in_word = true;
        }
        self.current.push_str(&value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_on_whitespace_runs() {
        assert_eq!(tokenize("ls   -la \t /home"), words(&["ls", "-la", "/home"]));
    }

    #[test]
    fn empty_and_blank_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t  ").is_empty());
    }

    #[test]
    fn operators_without_spaces() {
        assert_eq!(
            tokenize("cat<in.txt|grep a>>out;ls>x"),
            words(&["cat", "<", "in.txt", "|", "grep", "a", ">>", "out", ";", "ls", ">", "x"])
        );
    }

    #[test]
    fn double_gt_before_single() {
        assert_eq!(lex("a >>> b"), vec![
            Token::Word("a".into()),
            Token::RedirectAppend,
            Token::RedirectOut,
            Token::Word("b".into()),
        ]);
    }

    #[test]
    fn quotes_are_stripped_and_protect_operators() {
        assert_eq!(
            tokenize(r#"echo "a | b; c > d" 'x < y'"#),
            words(&["echo", "a | b; c > d", "x < y"])
        );
        assert_eq!(lex("echo '|'"), vec![
            Token::Word("echo".into()),
            Token::Word("|".into()),
        ]);
    }

    #[test]
    fn adjacent_fragments_concatenate() {
        assert_eq!(tokenize(r#"foo"bar baz""#), words(&["foobar baz"]));
        assert_eq!(tokenize(r#"'a'"b"c"#), words(&["abc"]));
    }

    #[test]
    fn other_quote_kind_is_literal_inside() {
        assert_eq!(tokenize(r#""it's""#), words(&["it's"]));
        assert_eq!(tokenize(r#"'say "hi"'"#), words(&["say \"hi\""]));
    }

    #[test]
    fn empty_quotes_yield_empty_word() {
        assert_eq!(tokenize(r#"test """#), words(&["test", ""]));
        assert_eq!(tokenize("''"), words(&[""]));
    }

    #[test]
    fn backslash_is_literal() {
        assert_eq!(tokenize(r"a\ b"), words(&[r"a\", "b"]));
    }

    #[test]
    fn unclosed_quote_runs_to_end() {
        assert_eq!(tokenize(r#"echo "hello | world"#), words(&["echo", "hello | world"]));
        assert_eq!(tokenize("'"), words(&[""]));
    }

    #[test]
    fn tokenize_does_not_expand() {
        assert_eq!(tokenize("echo $HOME $?"), words(&["echo", "$HOME", "$?"]));
    }

    #[test]
    fn expansion_forms() {
        let mut state = ShellState::new("/home");
        state.set_var("NAME", "koma");
        state.last_exit_code = 3;
        let toks = lex_expanded("echo $NAME ${NAME}x $? '$NAME' \"$NAME!\"", &state);
        let strs: Vec<&str> = toks.iter().map(Token::as_str).collect();
        assert_eq!(strs, vec!["echo", "koma", "komax", "3", "$NAME", "koma!"]);
    }

    #[test]
    fn expanded_values_are_not_rescanned() {
        let mut state = ShellState::default();
        state.set_var("OP", "a | b");
        assert_eq!(lex_expanded("echo $OP", &state), vec![
            Token::Word("echo".into()),
            Token::Word("a | b".into()),
        ]);
    }

    #[test]
    fn unset_variables() {
        let state = ShellState::default();
        assert_eq!(lex_expanded("echo $NOPE end", &state).len(), 2);
        assert_eq!(lex_expanded("echo \"$NOPE\"", &state), vec![
            Token::Word("echo".into()),
            Token::Word(String::new()),
        ]);
    }

    #[test]
    fn lone_dollar_stays_literal() {
        let state = ShellState::default();
        let toks = lex_expanded("echo $ a$ ${open", &state);
        let strs: Vec<&str> = toks.iter().map(Token::as_str).collect();
        assert_eq!(strs, vec!["echo", "$", "a$", "${open"]);
    }

    proptest! {
        #[test]
        fn never_panics(line in "\\PC*") {
            let _ = tokenize(&line);
        }

        #[test]
        fn plain_words_round_trip(line in "[a-z0-9 \t-]{0,40}") {
            let tokens = tokenize(&line);
            let collapsed: Vec<&str> = line.split_whitespace().collect();
            prop_assert_eq!(tokens.join(" "), collapsed.join(" "));
        }

        #[test]
        fn quoted_words_lose_their_quotes(parts in proptest::collection::vec("[a-z ]{0,8}", 1..6)) {
            let line: String = parts.iter().map(|p| format!("\"{p}\" ")).collect();
            let tokens = tokenize(&line);
            prop_assert_eq!(&tokens, &parts);
            prop_assert!(tokens.iter().all(|t| !t.contains('"')));
        }
    }
}
