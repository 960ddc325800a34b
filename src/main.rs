use clap::Parser;
use pt_core::ports::AppDirsPort;
use pt_platform::DirsAppDirsAdapter;

use postit::bootstrap::tracing::init_tracing_subscriber;
use postit::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app_dirs = DirsAppDirsAdapter::new().get_app_dirs()?;

    if let Err(err) = init_tracing_subscriber(&app_dirs.logs_dir(), cli.quiet) {
        eprintln!("Failed to initialize tracing: {err}");
    }

    cli::run(cli, &app_dirs).await
}
