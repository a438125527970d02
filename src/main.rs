use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Minewire: a TCP tunneling proxy disguised as a Minecraft server.
#[derive(Parser, Debug)]
#[command(name = "minewire", disable_version_flag = true)]
struct Args {
    /// Print the server version and exit.
    #[arg(long, short = 'v')]
    version: bool,
    /// Print the server version and exit (alias of --version).
    #[arg(long)]
    about: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.version || args.about {
        println!("Minewire Server v{}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_filter(EnvFilter::from_default_env()))
        .init();

    let config = match minewire::config::Config::read() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(?err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build the tokio runtime");

    match runtime.block_on(minewire::start(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(?err, "minewire exited with an error");
            ExitCode::FAILURE
        }
    }
}
