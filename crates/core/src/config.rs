use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::connections::ConnectionSpec;
use crate::session::SessionOptions;
use crate::surface::{WindowOpener, DEFAULT_WINDOW_HEIGHT};

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowSettings {
    /// Host command that opens the results window; a split when unset.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_window_height")]
    pub height: u16,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            command: None,
            height: DEFAULT_WINDOW_HEIGHT,
        }
    }
}

impl WindowSettings {
    #[must_use]
    pub fn opener(&self) -> WindowOpener {
        match self.command.as_deref().map(str::trim) {
            Some(command) if !command.is_empty() => WindowOpener::Command(command.to_string()),
            _ => WindowOpener::Split {
                height: self.height,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,
}

impl Default for ResultSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuarryConfig {
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default)]
    pub window: WindowSettings,
    #[serde(default)]
    pub results: ResultSettings,
}

impl QuarryConfig {
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            connections: self.connections.clone(),
            window: self.window.opener(),
        }
    }

    fn expand_urls(&mut self) {
        for connection in &mut self.connections {
            if let Some(url) = connection.url.as_mut() {
                *url = expand_env(url);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub fn load_default() -> Result<QuarryConfig, ConfigFileError> {
    load_from_path(default_config_path()?)
}

/// Loads a config file; a missing or blank file yields the defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<QuarryConfig, ConfigFileError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(QuarryConfig::default());
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(QuarryConfig::default());
    }

    let mut config: QuarryConfig = toml::from_str(&raw).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.expand_urls();
    Ok(config)
}

pub fn config_dir() -> Result<PathBuf, ConfigFileError> {
    let base_dir = if let Some(custom) = env::var_os("QUARRY_CONFIG_DIR") {
        return Ok(PathBuf::from(custom));
    } else if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigFileError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigFileError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("quarry"))
}

pub fn default_config_path() -> Result<PathBuf, ConfigFileError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Replaces `${NAME}` with the value of environment variable `NAME`.
/// References to unset variables are kept verbatim.
#[must_use]
pub fn expand_env(raw: &str) -> String {
    expand_with(raw, |name| env::var(name).ok())
}

fn expand_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        expanded.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            expanded.push_str(&rest[start..]);
            return expanded;
        };

        let name = &after[..end];
        match lookup(name) {
            Some(value) if !name.is_empty() => expanded.push_str(&value),
            _ => expanded.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }

    expanded.push_str(rest);
    expanded
}

fn default_window_height() -> u16 {
    DEFAULT_WINDOW_HEIGHT
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_row_limit() -> usize {
    DEFAULT_ROW_LIMIT
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{expand_with, load_from_path, ConfigFileError, QuarryConfig};
    use crate::surface::WindowOpener;

    #[test]
    fn missing_and_blank_files_load_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        assert_eq!(
            load_from_path(&path).expect("missing file should load"),
            QuarryConfig::default()
        );

        fs::write(&path, "   \n").expect("failed to write config");
        assert_eq!(
            load_from_path(&path).expect("blank file should load"),
            QuarryConfig::default()
        );
    }

    #[test]
    fn parses_connections_window_and_results() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[[connections]]
name = "local"
kind = "mysql"
url = "mysql://root@127.0.0.1:3306/app"

[[connections]]
kind = "mysql"

[window]
command = "vsplit"

[results]
page_size = 25
"#,
        )
        .expect("failed to write config");

        let config = load_from_path(&path).expect("config should parse");
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.connections[0].name.as_deref(), Some("local"));
        assert!(config.connections[1].url.is_none());
        assert_eq!(config.results.page_size, 25);
        assert_eq!(config.results.row_limit, super::DEFAULT_ROW_LIMIT);
        assert!(matches!(
            config.window.opener(),
            WindowOpener::Command(command) if command == "vsplit"
        ));
    }

    #[test]
    fn default_window_is_a_split() {
        let config = QuarryConfig::default();
        assert!(matches!(
            config.session_options().window,
            WindowOpener::Split { height: 20 }
        ));
    }

    #[test]
    fn invalid_toml_reports_path() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[[connections]\nname = ").expect("failed to write config");

        let err = load_from_path(&path).expect_err("config should not parse");
        assert!(matches!(err, ConfigFileError::Parse { path: reported, .. } if reported == path));
    }

    #[test]
    fn expands_known_variables_and_keeps_unknown_ones() {
        let lookup = |name: &str| (name == "PASSWORD").then(|| "s3cret".to_string());

        assert_eq!(
            expand_with("mysql://root:${PASSWORD}@db/app", lookup),
            "mysql://root:s3cret@db/app"
        );
        assert_eq!(expand_with("x${MISSING}y", lookup), "x${MISSING}y");
        assert_eq!(expand_with("x${}y", lookup), "x${}y");
        assert_eq!(expand_with("open ${PASSWORD", lookup), "open ${PASSWORD");
    }
}
