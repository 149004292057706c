mod config;
mod database;
mod entities;
mod http_server;
mod logging;
mod ports;
mod services;
mod spotify;
#[cfg(test)]
mod test_utils;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{
    Result,
    eyre::{Context, OptionExt},
};

use crate::{
    config::Config,
    database::Database,
    http_server::app::{self, HttpServerConfig},
    http_server::routes::admin::extract_artist_id,
    logging::init_tracing,
    ports::catalog::CatalogApi,
    spotify::SpotifyCatalog,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "MUSIC_ANALYTICS_CONFIG")]
    config: Option<PathBuf>,

    /// Tracing filter, e.g. "info" or "music_analytics=debug"
    #[arg(long, default_value = "info", global = true, env = "TRACING_LEVEL")]
    tracing_level: String,

    /// OTLP endpoint for trace export (export disabled when unset)
    #[arg(long, global = true, env = "OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// The port to run the server on
        #[arg(short, long, env = "MUSIC_ANALYTICS_HTTP_PORT")]
        port: Option<u16>,
    },
    /// Run one artist sync to completion and print its result
    Sync {
        /// Artist share URL, spotify:artist: URI, or raw catalog ID
        artist: String,
    },
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _tracer_provider = init_tracing(
        "music-analytics",
        args.otlp_endpoint.as_deref(),
        &args.tracing_level,
    )?;

    // Config subcommands don't need a database or credentials.
    if let Commands::Config(config_command) = &args.command {
        match config_command {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                println!("{}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        }
        return Ok(());
    }

    let config = {
        if let Some(path) = &args.config {
            Config::from_file(path)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load music-analytics config")?;

    let database = Database::open(&config.database_path()).await?;

    match args.command {
        Commands::Serve { port } => {
            let spotify = config.spotify_config()?;
            let catalog: Arc<dyn CatalogApi> = Arc::new(SpotifyCatalog::new(
                spotify.client_id,
                spotify.client_secret,
            ));
            let port = port.or(config.port()).unwrap_or(3000);
            tracing::info!(port, "starting HTTP server");
            app::start(HttpServerConfig {
                port,
                database,
                catalog,
            })
            .await?;
        }
        Commands::Sync { artist } => {
            let artist_id =
                extract_artist_id(&artist).ok_or_eyre("Invalid Spotify artist URL or ID")?;
            let spotify = config.spotify_config()?;
            let catalog =
                SpotifyCatalog::new(spotify.client_id, spotify.client_secret);

            let db = Arc::new(database);
            let run = services::sync::create_run(&db, &artist_id).await?;
            tracing::info!(run_id = %run.id, %artist_id, "running artist sync");
            let result = services::sync::workflow::execute(&db, &catalog, &run).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Config(_) => unreachable!("handled above"),
    }

    Ok(())
}
