use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reaction_capture::{
    create_router, AppState, CaptureConfig, CaptureSession, Config, DeviceBackendFactory,
    DeviceSource, DownloadsHost, StartOutcome, TracingStatus,
};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "reaction-capture")]
#[command(about = "Capture a burst of stills and a short clip, saved locally")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(short, long, default_value = "config/reaction-capture")]
    config: String,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one capture session against the synthetic device
    Run {
        /// Override the downloads directory
        #[arg(short, long)]
        downloads: Option<PathBuf>,

        /// Simulate the user refusing the permission prompt
        #[arg(long)]
        deny_permission: bool,

        /// Simulate a host without recording capability
        #[arg(long)]
        no_recorder: bool,
    },
    /// Serve the control API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let cfg = Config::load(&cli.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run {
            downloads,
            deny_permission,
            no_recorder,
        } => {
            let downloads = match downloads {
                Some(dir) => dir,
                None => cfg.downloads_dir()?,
            };

            let mut device = cfg.synthetic_device();
            device.grant_permission = !deny_permission;
            device.recorder_available = !no_recorder;

            let session = build_session(device, downloads)?;
            run_once(&session).await
        }
        Command::Serve => {
            let session = build_session(cfg.synthetic_device(), cfg.downloads_dir()?)?;
            let app = create_router(AppState::new(session));

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!("Control API listening on http://{}", addr);

            axum::serve(listener, app).await.context("HTTP server failed")?;
            Ok(())
        }
    }
}

fn build_session(
    device: reaction_capture::SyntheticConfig,
    downloads: PathBuf,
) -> Result<CaptureSession> {
    let backend = DeviceBackendFactory::create(DeviceSource::Synthetic(device))
        .context("Failed to create device backend")?;
    let host = DownloadsHost::new(downloads)
        .context("Failed to prepare downloads directory")?;

    CaptureSession::new(
        CaptureConfig::default(),
        backend,
        Arc::new(host),
        Some(Arc::new(TracingStatus)),
    )
    .context("Failed to create capture session")
}

async fn run_once(session: &CaptureSession) -> Result<()> {
    let permission = session.prime_permission().await;
    info!("Permission: {}", permission.label());

    match session.start().await {
        StartOutcome::Started => {
            let schedule = session.schedule();
            info!("Capturing, done in about {:?}", schedule.teardown);
        }
        outcome => {
            warn!("Capture did not start: {:?}", outcome);
        }
    }

    let stats = session.wait_finished().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
