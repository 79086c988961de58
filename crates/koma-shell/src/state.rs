//! Per-session shell state.

use std::collections::BTreeMap;

use koma_types::config::ShellConfig;
use koma_types::exit::{ExitCode, SUCCESS};

/// Mutable state of one shell session. Each session owns its own instance;
/// the executor borrows it for the duration of a line.
#[derive(Debug, Clone)]
pub struct ShellState {
    /// Current working directory (VFS path).
    pub cwd: String,
    pub env: BTreeMap<String, String>,
    /// Exit code of the most recently executed pipeline (`$?`).
    pub last_exit_code: ExitCode,
}

impl ShellState {
    pub fn new(cwd: &str) -> Self {
        let mut state = Self {
            cwd: String::new(),
            env: BTreeMap::new(),
            last_exit_code: SUCCESS,
        };
        state.set_cwd(cwd);
        state
    }

    /// Seed a session from configuration: `HOME`, `USER`, `HOSTNAME`,
    /// `PWD`, then the configured `env` table.
    pub fn from_config(config: &ShellConfig) -> Self {
        let mut state = Self::new(&config.cwd);
        state.set_var("HOME", &config.cwd);
        state.set_var("USER", &config.user);
        state.set_var("HOSTNAME", &config.hostname);
        for (name, value) in &config.env {
            state.set_var(name, value);
        }
        state
    }

    /// Look up a variable. `?` is the last exit code.
    pub fn get_var(&self, name: &str) -> Option<String> {
        match name {
            "?" => Some(self.last_exit_code.to_string()),
            _ => self.env.get(name).cloned(),
        }
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        self.env.insert(name.to_string(), value.to_string());
    }

    pub fn unset_var(&mut self, name: &str) {
        self.env.remove(name);
    }

    /// Change directory and keep `PWD` in sync.
    pub fn set_cwd(&mut self, path: &str) {
        self.cwd = path.to_string();
        self.set_var("PWD", path);
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_variable() {
        let mut state = ShellState::default();
        assert_eq!(state.get_var("?").as_deref(), Some("0"));
        state.last_exit_code = 127;
        assert_eq!(state.get_var("?").as_deref(), Some("127"));
    }

    #[test]
    fn cwd_tracks_pwd() {
        let mut state = ShellState::new("/home");
        assert_eq!(state.get_var("PWD").as_deref(), Some("/home"));
        state.set_cwd("/tmp");
        assert_eq!(state.cwd, "/tmp");
        assert_eq!(state.get_var("PWD").as_deref(), Some("/tmp"));
    }

    #[test]
    fn seeded_from_config() {
        let mut config = ShellConfig::default();
        config.env.insert("EDITOR".into(), "vi".into());
        let state = ShellState::from_config(&config);
        assert_eq!(state.cwd, "/home");
        assert_eq!(state.get_var("HOME").as_deref(), Some("/home"));
        assert_eq!(state.get_var("USER").as_deref(), Some("user"));
        assert_eq!(state.get_var("EDITOR").as_deref(), Some("vi"));
        assert_eq!(state.last_exit_code, 0);
    }

    #[test]
    fn set_and_unset() {
        let mut state = ShellState::default();
        state.set_var("A", "1");
        assert_eq!(state.get_var("A").as_deref(), Some("1"));
        state.unset_var("A");
        assert!(state.get_var("A").is_none());
    }
}
