use anyhow::Context;
use clap::Parser;
use pdfsum::{api, config, logging, processing};
use std::io;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// PDF upload and summarization server.
#[derive(Debug, Parser)]
#[command(name = "pdfsum", version, about)]
struct Cli {
    /// Port to listen on; overrides `SERVER_PORT`.
    #[arg(long)]
    port: Option<u16>,
    /// Directory for uploaded PDFs; overrides `STORAGE_DIR`.
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::init_config().context("Failed to load configuration")?;

    let mut config = config::get_config().clone();
    if let Some(port) = cli.port {
        config.server_port = Some(port);
    }
    if let Some(storage_dir) = cli.storage_dir {
        config.storage_dir = storage_dir;
    }
    logging::init_tracing(config.log_file.as_deref());

    let service =
        processing::PdfService::from_config(&config).context("Failed to initialize PDF service")?;
    let app = api::create_router(Arc::new(service));

    let listener = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    let address = listener.local_addr().context("Failed to read bound address")?;
    tracing::info!(port = address.port(), "Listening on http://{}", address);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Ports tried in order when no port is configured.
const FALLBACK_PORTS: RangeInclusive<u16> = 4100..=4199;

/// Bind the configured port, or the first free port in [`FALLBACK_PORTS`].
async fn bind_listener(port: Option<u16>) -> io::Result<TcpListener> {
    if let Some(port) = port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await;
    }

    for candidate in FALLBACK_PORTS {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!(port = candidate, "Port in use; trying the next one");
            }
            Err(err) => return Err(err),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        format!(
            "every port in {}-{} is in use",
            FALLBACK_PORTS.start(),
            FALLBACK_PORTS.end()
        ),
    ))
}
