//! Exit-code convention shared by the executor and every command.

/// Integer result of a stage or pipeline.
pub type ExitCode = i32;

/// Success, or a test expression that evaluated to true.
pub const SUCCESS: ExitCode = 0;

/// Failure, or a test expression that evaluated to false.
pub const FAILURE: ExitCode = 1;

/// Syntax or usage error.
pub const USAGE: ExitCode = 2;

/// The command name did not resolve to a registered handler.
pub const NOT_FOUND: ExitCode = 127;

/// Map a boolean result onto `SUCCESS` / `FAILURE`.
pub fn from_bool(value: bool) -> ExitCode {
    if value { SUCCESS } else { FAILURE }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_mapping() {
        assert_eq!(from_bool(true), 0);
        assert_eq!(from_bool(false), 1);
    }
}
