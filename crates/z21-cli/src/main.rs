use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod error;
mod output;

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "z21_cli=info,z21_core=info,z21_proto=info",
        2 => "z21_cli=debug,z21_core=debug,z21_proto=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    init_tracing(cli.global.verbose);

    if let Err(err) = commands::run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
