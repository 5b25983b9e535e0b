//! RAX Drive Server - Entry Point

use log::{error, info};
use std::process;

use rax_drive_server::Server;
use rax_drive_server::config::ServerConfig;
use rax_drive_server::error::ServerError;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    if let Err(e) = run().await {
        error!("Server startup failed: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;

    info!("Launching RAX Drive server...");

    let server = Server::bind(config).await?;
    server.start().await;
    Ok(())
}
