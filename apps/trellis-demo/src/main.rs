mod cli;
mod gui;
mod loader;
mod report;
mod session;

use clap::Parser;
use cli::Cli;
use session::Session;
use std::process::ExitCode;
use tr_core::TrellisResult;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "trellis-demo failed");
            eprintln!("trellis-demo: {error}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("trellis-demo: logging disabled: {error}");
    }
}

fn run(cli: &Cli) -> TrellisResult<()> {
    let markup = loader::load_markup(&cli.file)?;
    let session = Session::open(&markup, cli.session_options()?)?;

    if cli.gui {
        return gui::run(session);
    }

    for selector in &cli.clicks {
        session.click(selector)?;
    }
    print!("{}", report::render_tree(session.menu()));
    Ok(())
}
