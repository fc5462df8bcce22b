mod app;
mod cli;
mod db;
mod error;
mod utils;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = App::new().and_then(|mut app| app.run(cli));
    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
