//! vi-pipe - edit text mid-pipeline, replay the edit on re-runs from the same directory

// Global invariants enforced:
// - The editor is resolved before stdin is consumed
// - stdout carries only the final text; diagnostics go to stderr

use clap::Parser;
use std::time::Duration;
use vi_pipe_cli::{init_logging, prepare, run_pipeline, work_dir, CommonArgs};
use vi_pipe_core::{FreshnessWindow, WorkingDirKey};

#[derive(Parser)]
#[command(name = "vi-pipe")]
#[command(about = "Edit piped text in $EDITOR, replaying the recorded edit on re-runs")]
#[command(version = env!("VI_PIPE_VERSION"))]
struct Cli {
    /// Re-open the editor, even if your change has already been recorded
    #[arg(long = "re", visible_alias = "reopen")]
    reopen: bool,

    /// Minutes a recorded edit is replayed without asking (overrides config file)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    freshness_minutes: Option<u64>,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    let work_dir = work_dir()?;
    let env_editor = std::env::var("EDITOR").ok();
    let env = prepare(&cli.common, &work_dir, env_editor.as_deref())?;

    let window = cli
        .freshness_minutes
        .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
        .unwrap_or(env.config.freshness_window);
    let policy = FreshnessWindow::new(window).forced(cli.reopen);

    run_pipeline(WorkingDirKey::new(work_dir), policy, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_re_flag() {
        assert!(Cli::try_parse_from(["vi-pipe", "--re"]).unwrap().reopen);
        assert!(Cli::try_parse_from(["vi-pipe", "--reopen"]).unwrap().reopen);
        assert!(!Cli::try_parse_from(["vi-pipe"]).unwrap().reopen);
    }

    #[test]
    fn test_freshness_must_be_positive() {
        assert!(Cli::try_parse_from(["vi-pipe", "--freshness-minutes", "0"]).is_err());
        let cli = Cli::try_parse_from(["vi-pipe", "--freshness-minutes", "5"]).unwrap();
        assert_eq!(cli.freshness_minutes, Some(5));
    }

    #[test]
    fn test_rejects_positional_key() {
        assert!(Cli::try_parse_from(["vi-pipe", "some-key"]).is_err());
    }
}
