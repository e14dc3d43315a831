//! vi-pipe-key - edit text mid-pipeline, seeded with the last edit recorded under a named key

use clap::Parser;
use vi_pipe_cli::{init_logging, prepare, run_pipeline, work_dir, CommonArgs};
use vi_pipe_core::{AlwaysEdit, NamedKey};

#[derive(Parser)]
#[command(name = "vi-pipe-key")]
#[command(about = "Edit piped text in $EDITOR, starting from the last edit saved under KEY")]
#[command(version = env!("VI_PIPE_VERSION"))]
struct Cli {
    /// Name of the cached edit; runs sharing a key share a record
    key: String,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.common.verbose);

    let env_editor = std::env::var("EDITOR").ok();
    let env = prepare(&cli.common, &work_dir()?, env_editor.as_deref())?;

    let key = NamedKey::in_user_cache(cli.key)?;
    tracing::debug!("cache key {:?}", key.name());
    run_pipeline(key, AlwaysEdit, env)
}
