//! Interactive editor invocation
//!
//! The pipeline owns stdin and stdout, so the editor is wired to the
//! controlling terminal instead.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Default controlling terminal device
pub const DEFAULT_TTY: &str = "/dev/tty";

/// Something that lets a user (or a test script) edit a file in place
pub trait Editor {
    /// Edit the file at `path`, returning once the edit is finished
    fn edit(&self, path: &Path) -> Result<()>;
}

impl<E: Editor + ?Sized> Editor for &E {
    fn edit(&self, path: &Path) -> Result<()> {
        (**self).edit(path)
    }
}

/// Runs an editor program attached to a terminal device
#[derive(Debug, Clone)]
pub struct TerminalEditor {
    program: String,
    tty: PathBuf,
}

impl TerminalEditor {
    pub fn new(program: impl Into<String>, tty: impl Into<PathBuf>) -> Self {
        TerminalEditor {
            program: program.into(),
            tty: tty.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn tty(&self) -> &Path {
        &self.tty
    }
}

impl Editor for TerminalEditor {
    fn edit(&self, path: &Path) -> Result<()> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.tty)
            .with_context(|| format!("reopen tty: {}", self.tty.display()))?;
        let tty_out = tty
            .try_clone()
            .with_context(|| format!("duplicate tty handle: {}", self.tty.display()))?;

        tracing::debug!("running {} {}", self.program, path.display());
        let status = Command::new(&self.program)
            .arg(path)
            .stdin(Stdio::from(tty))
            .stdout(Stdio::from(tty_out))
            .status()
            .with_context(|| format!("failed to start {:?}", self.program))?;

        if !status.success() {
            anyhow::bail!("running {:?}: {}", self.program, status);
        }
        Ok(())
    }
}

/// Pick the editor program and check that it can be found
///
/// `configured` (flag or config file) wins over `env_editor` (`$EDITOR`).
/// Fails if neither is set or the program is not on `PATH`.
pub fn resolve_editor(configured: Option<&str>, env_editor: Option<&str>) -> Result<String> {
    let editor = configured
        .or(env_editor)
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let Some(editor) = editor else {
        anyhow::bail!("$EDITOR not set");
    };

    if which::which(editor).is_err() {
        anyhow::bail!("$EDITOR {:?} not found in $PATH", editor);
    }

    Ok(editor.to_string())
}
