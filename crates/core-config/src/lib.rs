//! Startup configuration.
//!
//! Parses `teco.toml` (or an override path provided by the binary):
//! edit-buffer sizing, initial flag register values, and the prompt string.
//! Unknown fields are ignored so the file can grow without breaking older
//! builds. Everything has a default; a missing file is not an error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

pub const CONFIG_FILE: &str = "teco.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BufferConfig {
    /// Initial edit buffer size in bytes.
    pub init: usize,
    /// Ceiling in bytes (0 = pick by paging mode).
    pub max: usize,
    /// Keep prior pages in memory so backward paging works.
    pub paging: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            init: 8 * 1024,
            max: 0,
            paging: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct FlagConfig {
    /// Initial ED register.
    pub ed: Option<i64>,
    /// Initial ET register.
    pub et: Option<i64>,
    /// Initial EH verbosity (0-3).
    pub eh: Option<i64>,
    /// Initial E1 register.
    pub e1: Option<i64>,
    /// Initial E2 register.
    pub e2: Option<i64>,
    /// Initial E3 register.
    pub e3: Option<i64>,
    /// Initial search case mode (-1, 0, 1).
    pub ctrl_x: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub buffer: BufferConfig,
    pub flags: FlagConfig,
    /// Command prompt.
    pub prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer: BufferConfig::default(),
            flags: FlagConfig::default(),
            prompt: "*".to_string(),
        }
    }
}

/// Load configuration from an explicit path, or by discovery of
/// `teco.toml` in the current directory. A missing file yields defaults.
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(p) => p,
        None => {
            let discovered = PathBuf::from(CONFIG_FILE);
            if !discovered.exists() {
                return Ok(Config::default());
            }
            discovered
        }
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: Config = toml::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let c = load_from(None).unwrap();
        assert_eq!(c.prompt, "*");
        assert!(c.buffer.paging);
        assert_eq!(c.flags.ed, None);
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teco.toml");
        fs::write(
            &path,
            r#"
prompt = "teco> "

[buffer]
init = 65536
paging = false

[flags]
eh = 3
ctrl_x = -1
"#,
        )
        .unwrap();
        let c = load_from(Some(path)).unwrap();
        assert_eq!(c.prompt, "teco> ");
        assert_eq!(c.buffer.init, 65536);
        assert!(!c.buffer.paging);
        assert_eq!(c.buffer.max, 0); // untouched default
        assert_eq!(c.flags.eh, Some(3));
        assert_eq!(c.flags.ctrl_x, Some(-1));
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teco.toml");
        fs::write(&path, "[display]\ncolour = true\n").unwrap();
        assert!(load_from(Some(path)).is_ok());
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teco.toml");
        fs::write(&path, "prompt = [").unwrap();
        assert!(load_from(Some(path)).is_err());
    }
}
