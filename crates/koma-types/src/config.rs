//! Shell configuration loaded from TOML.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{KomaError, Result};

/// Session configuration for one shell instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellConfig {
    /// Prompt printed before each interactive line.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Initial working directory (VFS path).
    #[serde(default = "default_cwd")]
    pub cwd: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Extra environment variables seeded into the session.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_prompt() -> String {
    "$ ".to_string()
}

fn default_cwd() -> String {
    "/home".to_string()
}

fn default_user() -> String {
    "user".to_string()
}

fn default_hostname() -> String {
    "koma".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            cwd: default_cwd(),
            user: default_user(),
            hostname: default_hostname(),
            env: BTreeMap::new(),
        }
    }
}

impl ShellConfig {
    /// Parse a configuration document.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| KomaError::Config(format!("shell config: {e}")))
    }

    /// Read and parse a configuration file from the host filesystem.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| KomaError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml(&text)?;
        log::info!("Loaded shell config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = ShellConfig::from_toml("").unwrap();
        assert_eq!(cfg.prompt, "$ ");
        assert_eq!(cfg.cwd, "/home");
        assert_eq!(cfg.user, "user");
        assert_eq!(cfg.hostname, "koma");
        assert!(cfg.env.is_empty());
    }

    #[test]
    fn overrides_and_env_table() {
        let cfg = ShellConfig::from_toml(
            r#"
prompt = "koma> "
cwd = "/tmp"

[env]
EDITOR = "vi"
LANG = "C"
"#,
        )
        .unwrap();
        assert_eq!(cfg.prompt, "koma> ");
        assert_eq!(cfg.cwd, "/tmp");
        assert_eq!(cfg.env.get("EDITOR").map(String::as_str), Some("vi"));
        assert_eq!(cfg.env.len(), 2);
    }

    #[test]
    fn invalid_document_is_config_error() {
        let err = ShellConfig::from_toml("prompt = [").unwrap_err();
        assert!(matches!(err, KomaError::Config(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = ShellConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(format!("{err}").contains("config error"));
    }
}
