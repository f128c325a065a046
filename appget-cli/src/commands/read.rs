//! Read command - print an artifact's content.

use appget::config::TransferConfig;
use appget::transfer::{FileTransferService, TransferEvents};

use crate::error::CliError;

/// Run the read command.
pub async fn run(config: &TransferConfig, source: &str) -> Result<(), CliError> {
    let service = FileTransferService::from_config(config, TransferEvents::disabled())?;
    let content = service.read_content(source).await?;
    print!("{}", content);
    Ok(())
}
