//! Replay policies: decide whether a cached edit is replayed or the editor reopens

use std::fmt;
use std::time::{Duration, SystemTime};

/// Default age after which a per-directory record is considered stale
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Outcome of the replay decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Apply the cached patch and skip the editor
    Replay,
    /// Seed the editor with the replayed text and let the user edit
    Edit(EditReason),
}

/// Why the editor is being opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditReason {
    Forced,
    NoRecord,
    Stale,
    Always,
}

impl fmt::Display for EditReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            EditReason::Forced => "re-open requested",
            EditReason::NoRecord => "no recorded edit",
            EditReason::Stale => "recorded edit is stale",
            EditReason::Always => "keyed sessions always edit",
        };
        f.write_str(reason)
    }
}

pub trait ReplayPolicy {
    /// `last_written` is the record's mtime, `None` if no record existed before this run
    fn decide(&self, last_written: Option<SystemTime>, now: SystemTime) -> Decision;
}

/// Replay silently while the record is younger than `window`, unless forced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    window: Duration,
    force: bool,
}

impl FreshnessWindow {
    pub fn new(window: Duration) -> Self {
        FreshnessWindow {
            window,
            force: false,
        }
    }

    /// Always reopen the editor, even for a fresh record
    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        FreshnessWindow::new(DEFAULT_FRESHNESS_WINDOW)
    }
}

impl ReplayPolicy for FreshnessWindow {
    fn decide(&self, last_written: Option<SystemTime>, now: SystemTime) -> Decision {
        if self.force {
            return Decision::Edit(EditReason::Forced);
        }
        let Some(written) = last_written else {
            return Decision::Edit(EditReason::NoRecord);
        };
        // A record dated in the future (clock skew) counts as just written
        let age = now.duration_since(written).unwrap_or(Duration::ZERO);
        if age > self.window {
            Decision::Edit(EditReason::Stale)
        } else {
            Decision::Replay
        }
    }
}

/// Always open the editor; the cached patch only seeds its starting content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysEdit;

impl ReplayPolicy for AlwaysEdit {
    fn decide(&self, _last_written: Option<SystemTime>, _now: SystemTime) -> Decision {
        Decision::Edit(EditReason::Always)
    }
}
