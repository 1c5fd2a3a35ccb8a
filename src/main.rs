use clap::Parser;
use reed::{app, config, logging};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "reed", version, about = "Browse a music folder and play it through mpv")]
struct CliArgs {
    /// Music directory to browse
    root: PathBuf,

    /// mpv executable to launch
    #[arg(long = "mpv", value_name = "PATH")]
    mpv: Option<PathBuf>,

    /// IPC socket the engine listens on
    #[arg(long, value_name = "PATH")]
    socket: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match start(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("reed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn start(args: CliArgs) -> reed::Result<()> {
    let mut settings = config::load_settings()?;
    if let Some(mpv) = args.mpv {
        settings.backend.executable = mpv;
    }
    if let Some(socket) = args.socket {
        settings.backend.socket_path = socket;
    }

    let log_dir = match settings.log_dir.clone() {
        Some(dir) => Some(dir),
        None => config::config_root().ok(),
    };
    if let Some(dir) = log_dir
        && let Err(err) = logging::init(&dir)
    {
        eprintln!("reed: logging disabled ({}): {err}", dir.display());
    }

    app::run(app::RunOptions {
        root: args.root,
        settings,
    })
}
