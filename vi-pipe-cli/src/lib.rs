//! Shared plumbing for the vi-pipe binaries
//!
//! Everything that touches process-wide state (environment, working directory,
//! stdin/stdout, the logging subscriber) lives here, so the core stays injectable.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vi_pipe_core::{
    config, editor, KeyDerivation, ReplayPolicy, ResolvedConfig, Session, TerminalEditor,
};

/// Flags shared by both binaries
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Editor program (overrides config file and $EDITOR)
    #[arg(long)]
    pub editor: Option<String>,

    /// Terminal device the editor runs on (overrides config file)
    #[arg(long)]
    pub tty: Option<PathBuf>,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log replay decisions to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Install the stderr logger; stdout is reserved for pipeline data
///
/// `RUST_LOG` overrides the level chosen by `verbose`.
pub fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    // A subscriber may already be installed (tests); keep the existing one
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Resolved configuration plus the editor it selects
#[derive(Debug, Clone)]
pub struct Environment {
    pub config: ResolvedConfig,
    pub editor: TerminalEditor,
}

/// Resolve configuration and the editor program before any input is consumed
///
/// Precedence: command-line flags, then the config file, then `env_editor` ($EDITOR).
pub fn prepare(
    args: &CommonArgs,
    work_dir: &Path,
    env_editor: Option<&str>,
) -> Result<Environment> {
    let mut config = config::load_and_resolve(work_dir, args.config.as_deref())?;
    if let Some(path) = &config.config_path {
        tracing::debug!("using config: {}", path.display());
    }

    if let Some(tty) = &args.tty {
        config.tty = tty.clone();
    }

    let configured = args.editor.as_deref().or(config.editor.as_deref());
    let program = editor::resolve_editor(configured, env_editor)?;

    Ok(Environment {
        editor: TerminalEditor::new(program, config.tty.clone()),
        config,
    })
}

/// Process working directory
pub fn work_dir() -> Result<PathBuf> {
    std::env::current_dir().context("failed to resolve working directory")
}

/// Run one session over the process's stdin and stdout
pub fn run_pipeline<K, P>(key: K, policy: P, env: Environment) -> Result<()>
where
    K: KeyDerivation,
    P: ReplayPolicy,
{
    let session =
        Session::new(key, policy, env.editor).with_context_lines(env.config.context_lines);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let outcome = session.run(stdin.lock(), stdout.lock())?;

    tracing::debug!(
        "{:?}; record {} {}",
        outcome.decision,
        outcome.record.display(),
        if outcome.recorded { "updated" } else { "unchanged" }
    );
    Ok(())
}
