use anyhow::Result;
use clap::Parser;

use chartsync::config::Config;
use chartsync::progress::set_log_only;
use chartsync::sync::{run, Mode};

#[derive(Parser)]
#[command(name = "chartsync")]
#[command(about = "Keep a Spotify playlist mirroring UK Singles Chart number-one history")]
struct Args {
    /// Rebuild the playlist wholesale in canonical chart order
    #[arg(long, conflicts_with = "clear")]
    rebuild: bool,

    /// Empty the playlist and reset local state (no harvesting)
    #[arg(long)]
    clear: bool,

    /// Log playlist mutations instead of performing them
    #[arg(long)]
    dry_run: bool,

    /// Hide progress bars for tail-friendly logs
    #[arg(long)]
    log_only: bool,
}

fn main() -> Result<()> {
    colog::init();
    let args = Args::parse();
    set_log_only(args.log_only);

    let mode = if args.clear {
        Mode::Clear
    } else if args.rebuild {
        Mode::Rebuild
    } else {
        Mode::Auto
    };

    let config = Config::from_env(args.dry_run)?;
    run(mode, &config)
}
