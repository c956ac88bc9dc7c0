use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vidgrab::config::load_config;
use vidgrab::extractor::YtDlp;
use vidgrab::{router, AppState};

// --- Command-Line Argument Parsing ---
#[derive(Parser, Debug)]
#[command(author, version, about = "An HTTP front end for yt-dlp metadata and downloads.", long_about = None)]
struct Cli {
    /// Path to a config.toml. Defaults to the per-user config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured bind host.
    #[arg(long)]
    host: Option<String>,
    /// Overrides the configured bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vidgrab=info,tower_http=info")),
        )
        .init();

    let mut config = load_config(cli.config.as_deref()).await?;
    config.apply_env()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let addr = config.bind_addr();
    let extractor = Arc::new(YtDlp::new(&config.ytdlp_path, &config.cookies_file));
    tracing::info!(
        "Serving frontend from {} (cookies file: {})",
        config.static_dir.display(),
        config.cookies_file.display()
    );

    let app = router(AppState::new(config, extractor)?);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
