use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plotsearch::{api, config::Config, logging, processing};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "plotsearch",
    about = "Summarize, embed, and search movie plot descriptions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the plot dataset, then summarize, embed, and store a sample of it.
    Ingest {
        /// CSV file to read instead of `DATASET_PATH`.
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Number of rows to sample instead of `DATASET_ROWS`.
        #[arg(long)]
        rows: Option<usize>,
        /// Replace the collection contents once every summary has been embedded.
        #[arg(long)]
        reset: bool,
    },
    /// Print records similar to QUERY as JSON lines, most similar first.
    Search {
        /// Free-text query.
        query: String,
    },
    /// Serve the HTTP API.
    Serve {
        /// Port to bind instead of `SERVER_PORT`.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_tracing();
    if let Err(err) = run(Cli::parse()).await {
        tracing::error!(error = %format!("{err:#}"), "Command failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load().context("invalid configuration")?;
    match cli.command {
        Command::Ingest {
            dataset,
            rows,
            reset,
        } => {
            if let Some(path) = dataset {
                config.dataset.path = path;
            }
            if let Some(rows) = rows {
                config.dataset.rows = rows;
            }
            let documents = processing::load_documents(&config.dataset)?;
            let service = processing::PipelineService::from_config(&config).await?;
            let outcome = if reset {
                service.ingest_replacing(documents).await?
            } else {
                service.ingest(documents).await?
            };
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Command::Search { query } => {
            let service = processing::PipelineService::from_config(&config).await?;
            for result in service.search(&query).await? {
                println!("{}", serde_json::to_string(&result)?);
            }
        }
        Command::Serve { port } => {
            if port.is_some() {
                config.server_port = port;
            }
            let service = processing::PipelineService::from_config(&config).await?;
            let app = api::create_router(Arc::new(service));
            let (listener, port) = bind_listener(config.server_port)
                .await
                .context("failed to bind listener")?;
            tracing::info!("Listening on http://0.0.0.0:{}", port);
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

async fn bind_listener(port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
