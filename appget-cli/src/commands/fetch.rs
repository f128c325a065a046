//! Fetch command - download, verify and cache an artifact.

use appget::config::TransferConfig;
use appget::transfer::{FileTransferService, TransferEvents};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;
use crate::progress;

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Source address (http(s):// URL, file:// URL or absolute path)
    pub source: String,

    /// Expected SHA-256 of the artifact (hex). Without it the download is
    /// never cached or verified.
    #[arg(long)]
    pub sha256: Option<String>,

    /// Do not show a progress bar
    #[arg(long, short)]
    pub quiet: bool,
}

/// Run the fetch command.
///
/// Prints the path of the verified artifact on success.
pub async fn run(config: &TransferConfig, args: FetchArgs) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling transfer...");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let (events, receiver) = if args.quiet {
        (TransferEvents::disabled(), None)
    } else {
        let (events, rx) = TransferEvents::channel();
        (events, Some(rx))
    };
    let display = receiver.map(|rx| tokio::spawn(progress::render(rx)));

    let service = FileTransferService::from_config(config, events)?;
    let result = service
        .transfer_file_with_cancel(&args.source, args.sha256.as_deref(), &cancel)
        .await;

    // Closes the event channel so the display task finishes.
    drop(service);
    if let Some(display) = display {
        let _ = display.await;
    }

    let path = result?;
    info!(path = %path.display(), "Artifact ready");
    println!("{}", path.display());
    Ok(())
}
