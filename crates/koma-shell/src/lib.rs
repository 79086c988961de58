//! Command interpretation core of the Koma shell.
//!
//! One input line flows through four stages:
//!
//! 1. [`tokenizer`] splits it into words and operators, honoring quotes.
//! 2. [`parser`] splits it on top-level `;` into a [`CommandPlan`] and turns
//!    each segment into a [`Pipeline`] of stages with optional redirection.
//! 3. [`Executor`] runs each pipeline against a [`CommandRegistry`],
//!    handing every stage's captured output to the next stage.
//! 4. Commands signal results through exit codes; [`test_expr`] backs the
//!    `test` / `[` builtins.

mod commands;
pub mod executor;
pub mod io;
pub mod parser;
mod registry;
pub mod state;
pub mod test_expr;
mod text_commands;
pub mod tokenizer;

pub use commands::register_builtins;
pub use executor::Executor;
pub use io::{BufferIo, Io};
pub use parser::{CommandPlan, OutputMode, OutputRedirect, ParseError, Pipeline, Stage};
pub use registry::{Command, CommandRegistry, Context};
pub use state::ShellState;
pub use tokenizer::{Token, tokenize};
