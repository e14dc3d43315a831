//! Edit session: replay the cached edit, optionally open the editor, record the result
//!
//! Global invariants enforced:
//! - Input is read in full before anything else happens
//! - The recorded patch always diffs the raw input against the final text
//! - Nothing is written to the output unless the whole session succeeds
//! - The working copy is removed on every exit path
//! - A replay-only run leaves the record (and its timestamp) untouched

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use crate::editor::Editor;
use crate::key::KeyDerivation;
use crate::patch::{self, DEFAULT_CONTEXT_LINES};
use crate::policy::{Decision, ReplayPolicy};
use crate::store::{self, PatchRecord};
use crate::PROGRAM;

/// What a completed session did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub decision: Decision,
    /// Path of the patch record consulted for this run
    pub record: PathBuf,
    /// Whether the record was rewritten
    pub recorded: bool,
}

/// One pipeline invocation, parameterised by key strategy, replay policy and editor
pub struct Session<K, P, E> {
    key: K,
    policy: P,
    editor: E,
    context_lines: usize,
}

impl<K, P, E> Session<K, P, E>
where
    K: KeyDerivation,
    P: ReplayPolicy,
    E: Editor,
{
    pub fn new(key: K, policy: P, editor: E) -> Self {
        Session {
            key,
            policy,
            editor,
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }

    /// Number of unchanged lines recorded around each edit
    pub fn with_context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    /// Run the session against the current wall clock
    pub fn run<R: Read, W: Write>(&self, input: R, output: W) -> Result<SessionOutcome> {
        self.run_at(input, output, SystemTime::now())
    }

    /// Run the session as if the current time were `now`
    pub fn run_at<R: Read, W: Write>(
        &self,
        mut input: R,
        mut output: W,
        now: SystemTime,
    ) -> Result<SessionOutcome> {
        let mut raw = Vec::new();
        input.read_to_end(&mut raw).context("read stdin")?;
        let original = String::from_utf8(raw).context("stdin is not valid UTF-8")?;

        let key = self.key.derive()?;
        // Checked before opening, since opening creates the record
        let last_written = store::last_modified(&key)?;
        let mut record = PatchRecord::open(&key).context("open diff file")?;
        let cached = record.read().context("read diff")?;

        let decision = self.policy.decide(last_written, now);
        tracing::debug!("record {}: {:?}", key, decision);

        let candidate = patch::apply_patch(&cached, &original);

        let (edited, recorded) = match decision {
            Decision::Replay => (candidate, false),
            Decision::Edit(reason) => {
                tracing::debug!("opening editor: {reason}");
                let edited = edit_text(&self.editor, &candidate).context("edit input")?;
                let diff = patch::make_patch(&original, &edited, self.context_lines);
                record.overwrite(&diff).context("write diff to file")?;
                (edited, true)
            }
        };

        output
            .write_all(edited.as_bytes())
            .context("write changes")?;
        output.flush().context("write changes")?;

        Ok(SessionOutcome {
            decision,
            record: record.path().to_path_buf(),
            recorded,
        })
    }
}

/// Let `editor` modify `text` through a temporary working copy
///
/// The working copy is deleted when this returns, whether or not the edit succeeded.
pub fn edit_text<E: Editor + ?Sized>(editor: &E, text: &str) -> Result<String> {
    let mut working = tempfile::Builder::new()
        .prefix(PROGRAM)
        .tempfile()
        .context("create temp file")?;
    working
        .write_all(text.as_bytes())
        .context("copy input to temp file")?;
    working.flush().context("copy input to temp file")?;

    editor.edit(working.path())?;

    // Editors often save by replacing the file, so read it back by path
    let bytes = std::fs::read(working.path()).context("read temp file")?;
    String::from_utf8(bytes).context("edited text is not valid UTF-8")
}
