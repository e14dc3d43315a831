//! Configuration file support for vi-pipe
//!
//! Loads user or project configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.vi-pipe.json` in the working directory
//! 3. `vi-pipe/config.json` in the per-user config directory
//!
//! All fields are optional. CLI flags take precedence over config file values,
//! and the config file takes precedence over `$EDITOR`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::editor::DEFAULT_TTY;
use crate::patch::DEFAULT_CONTEXT_LINES;
use crate::policy::DEFAULT_FRESHNESS_WINDOW;

/// Project-level config file name
pub const PROJECT_CONFIG_FILE: &str = ".vi-pipe.json";

/// Upper bound for `context_lines`; larger values only bloat the record
const MAX_CONTEXT_LINES: usize = 100;

/// vi-pipe configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViPipeConfig {
    /// Editor program (default: `$EDITOR`)
    #[serde(default)]
    pub editor: Option<String>,

    /// Terminal device the editor is attached to (default: /dev/tty)
    #[serde(default)]
    pub tty: Option<PathBuf>,

    /// Minutes a per-directory record stays fresh (default: 30)
    #[serde(default)]
    pub freshness_minutes: Option<u64>,

    /// Unchanged lines recorded around each edit (default: 3)
    #[serde(default)]
    pub context_lines: Option<usize>,
}

/// Configuration with defaults filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Editor program, if configured; otherwise the caller falls back to `$EDITOR`
    pub editor: Option<String>,
    pub tty: PathBuf,
    pub freshness_window: Duration,
    pub context_lines: usize,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl ViPipeConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref editor) = self.editor {
            if editor.trim().is_empty() {
                anyhow::bail!("editor must not be empty");
            }
        }

        if let Some(ref tty) = self.tty {
            if tty.as_os_str().is_empty() {
                anyhow::bail!("tty must not be empty");
            }
        }

        if let Some(minutes) = self.freshness_minutes {
            if minutes == 0 {
                anyhow::bail!("freshness_minutes must be positive (got 0)");
            }
            if minutes.checked_mul(60).is_none() {
                anyhow::bail!("freshness_minutes is too large (got {})", minutes);
            }
        }

        if let Some(lines) = self.context_lines {
            if lines > MAX_CONTEXT_LINES {
                anyhow::bail!(
                    "context_lines must be at most {} (got {})",
                    MAX_CONTEXT_LINES,
                    lines
                );
            }
        }

        Ok(())
    }

    /// Resolve config into its final form
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let freshness_window = match self.freshness_minutes {
            Some(minutes) => Duration::from_secs(minutes * 60),
            None => DEFAULT_FRESHNESS_WINDOW,
        };

        Ok(ResolvedConfig {
            editor: self.editor.as_ref().map(|e| e.trim().to_string()),
            tty: self
                .tty
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TTY)),
            freshness_window,
            context_lines: self.context_lines.unwrap_or(DEFAULT_CONTEXT_LINES),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        ViPipeConfig::default().resolve()
    }
}

/// Discover and load a config file
///
/// Search order:
/// 1. `.vi-pipe.json` in `work_dir`
/// 2. `vi-pipe/config.json` in `user_config_dir`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(
    work_dir: &Path,
    user_config_dir: Option<&Path>,
) -> Result<Option<(ViPipeConfig, PathBuf)>> {
    let project_path = work_dir.join(PROJECT_CONFIG_FILE);
    if project_path.exists() {
        let config = load_config_file(&project_path)?;
        return Ok(Some((config, project_path)));
    }

    if let Some(dir) = user_config_dir {
        let user_path = dir.join(crate::PROGRAM).join("config.json");
        if user_path.exists() {
            let config = load_config_file(&user_path)?;
            return Ok(Some((config, user_path)));
        }
    }

    Ok(None)
}

/// Read and validate one config file
pub fn load_config_file(path: &Path) -> Result<ViPipeConfig> {
    let raw = std::fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ViPipeConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not a vi-pipe config", path.display()))?;
    config.validate().with_context(|| format!("bad setting in {}", path.display()))?;
    Ok(config)
}

/// Settings for one invocation: `config_path` if given, else whatever
/// [`discover_config`] finds, else built-in defaults
pub fn load_and_resolve(work_dir: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let found = match config_path {
        Some(path) => Some((load_config_file(path)?, path.to_path_buf())),
        None => discover_config(work_dir, dirs::config_dir().as_deref())?,
    };

    let Some((config, path)) = found else {
        return ResolvedConfig::defaults();
    };
    let mut resolved = config.resolve()?;
    resolved.config_path = Some(path);
    Ok(resolved)
}
