use std::env;
use std::error::Error;

use clap::Parser;
use hidtouch::sync::CancelToken;

use crate::cli::{main_cli, Args};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::debug!("Starting hidtouch v{}", VERSION);

    let args = Args::parse();

    // Setup CTRL+C handler. Stopping the command lets it release the device.
    let cancel = CancelToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Unable to listen for CTRL+C: {e}");
            return;
        }
        log::info!("Interrupted, stopping");
        token.cancel();
    });

    // Device I/O blocks, so keep it off the async runtime
    let result = tokio::task::spawn_blocking(move || main_cli(args, &cancel)).await?;
    if let Err(e) = result.as_ref() {
        log::error!("{e}");
    }

    result
}
