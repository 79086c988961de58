//! Error types for the Koma shell.

use std::io;

/// Errors produced by the Koma crates.
#[derive(Debug, thiserror::Error)]
pub enum KomaError {
    #[error("VFS error: {0}")]
    Vfs(String),

    #[error("{0}")]
    Command(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("tape error: {0}")]
    Tape(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KomaError {
    /// True when the error reports a path that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            KomaError::Vfs(msg) => msg.starts_with("no such"),
            KomaError::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KomaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vfs_error_display() {
        let e = KomaError::Vfs("no such file: /a".into());
        assert_eq!(format!("{e}"), "VFS error: no such file: /a");
    }

    #[test]
    fn command_error_display_is_bare() {
        let e = KomaError::Command("usage: cd <dir>".into());
        assert_eq!(format!("{e}"), "usage: cd <dir>");
    }

    #[test]
    fn config_error_display() {
        let e = KomaError::Config("missing key".into());
        assert_eq!(format!("{e}"), "config error: missing key");
    }

    #[test]
    fn tape_error_display() {
        let e = KomaError::Tape("bad format".into());
        assert_eq!(format!("{e}"), "tape error: bad format");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: KomaError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
        assert!(e.is_not_found());
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: KomaError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let e: KomaError = json_err.into();
        assert!(format!("{e}").contains("JSON error"));
    }

    #[test]
    fn not_found_detection() {
        assert!(KomaError::Vfs("no such path: /x".into()).is_not_found());
        assert!(!KomaError::Vfs("is a directory: /x".into()).is_not_found());
        assert!(!KomaError::Command("nope".into()).is_not_found());
    }
}
