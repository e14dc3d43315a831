//! vi-pipe core library - edit text mid-pipeline and replay the edit on later runs

// Global invariants enforced in this crate:
// - A cached patch never breaks a pipeline: unreadable patches replay as no-ops
// - The recorded patch always describes raw input -> final output
// - No global lookups below the binaries: editor, terminal and clock are injected
// - Single-threaded, synchronous, one session per process

pub mod config;
pub mod editor;
pub mod key;
pub mod patch;
pub mod policy;
pub mod session;
pub mod store;

pub use config::ResolvedConfig;
pub use editor::{Editor, TerminalEditor};
pub use key::{CacheKey, KeyDerivation, NamedKey, WorkingDirKey};
pub use patch::{apply_patch, make_patch};
pub use policy::{AlwaysEdit, Decision, EditReason, FreshnessWindow, ReplayPolicy};
pub use session::{Session, SessionOutcome};

/// Program name, used for record names and working-copy prefixes
pub const PROGRAM: &str = "vi-pipe";
