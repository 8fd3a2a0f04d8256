use std::{env, io};

use berrybox_collab::{CachedResolver, Collab, EngineError, MemoryDatabase, YouTubeResolver};
use berrybox_core::Config;
use berrybox_server::{run_server, ServerContext, DEFAULT_PORT};
use colored::Colorize;
use log::{error, info};
use thiserror::Error;

mod logging;

const PORT_VARIABLE: &str = "BERRYBOX_SERVER_PORT";

#[derive(Debug, Error)]
enum BerryboxError {
    #[error("BERRYBOX_SERVER_PORT must be a port number, got \"{0}\"")]
    InvalidPort(String),

    #[error("Could not restore boxes: {0}")]
    Restore(#[from] EngineError),

    #[error("Server stopped: {0}")]
    Server(#[from] io::Error),
}

impl BerryboxError {
    fn hint(&self) -> String {
        match self {
            BerryboxError::InvalidPort(_) => format!("Set {} to a number between 1 and 65535, or unset it to use {}.", PORT_VARIABLE, DEFAULT_PORT),
            BerryboxError::Restore(_) => "The store could not be read. This should not happen.".to_string(),
            BerryboxError::Server(_) => "Make sure the port is not used by another program, then try again.".to_string(),
        }
    }
}

fn server_port() -> Result<u16, BerryboxError> {
    match env::var(PORT_VARIABLE) {
        Ok(port) => port.trim().parse().map_err(|_| BerryboxError::InvalidPort(port)),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

async fn run() -> Result<(), BerryboxError> {
    let port = server_port()?;

    info!("Starting berrybox...");
    let collab = Collab::new(
        Config::default(),
        MemoryDatabase::new(),
        CachedResolver::new(YouTubeResolver::new()),
    );

    collab.boxes.restore().await?;
    info!("Initialized successfully.");

    run_server(ServerContext::new(collab), port).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    if let Err(error) = run().await {
        error!("{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.", "berrybox failed to start!".bold().red());
        error!("{}", error);
        error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
    }
}
