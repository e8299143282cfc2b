//! coupa-sync CLI binary entry point.

use clap::Parser;
use coupa_sync::cli::{commands, Cli};
use coupa_sync::connector::Connector;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    let connector = match Connector::new(&config) {
        Ok(connector) => connector,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    // Ctrl-C cancels whatever request is in flight.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    match commands::run(&connector, cli.command, &cancel).await {
        Ok(output) => match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(hint) = e.recovery_suggestion().hint() {
                eprintln!("Hint: {hint}");
            }
            std::process::exit(1);
        }
    }
}
