//! Terminal progress display driven by transfer events.

use appget::transfer::{ProgressUpdate, TransferEvent};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::UnboundedReceiver;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})";

/// Style for a transfer, depending on whether its size is known.
pub fn transfer_style(total_bytes: Option<u64>) -> ProgressStyle {
    let template = if total_bytes.is_some() {
        BAR_TEMPLATE
    } else {
        SPINNER_TEMPLATE
    };
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Render events until the publishing side is dropped.
pub async fn render(mut events: UnboundedReceiver<TransferEvent>) {
    let mut bar: Option<ProgressBar> = None;

    while let Some(event) = events.recv().await {
        match event {
            TransferEvent::Started { location, .. } => {
                eprintln!("Fetching {}", location);
            }
            TransferEvent::Progress(update) => {
                let bar = bar.get_or_insert_with(|| new_bar(&update));
                apply(bar, &update);
            }
            TransferEvent::Completed { .. } => {
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
            }
        }
    }

    if let Some(bar) = bar {
        bar.abandon();
    }
}

fn new_bar(update: &ProgressUpdate) -> ProgressBar {
    let bar = match update.total_bytes {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    bar.set_style(transfer_style(update.total_bytes));
    bar
}

fn apply(bar: &ProgressBar, update: &ProgressUpdate) {
    if let Some(total) = update.total_bytes {
        if bar.length() != Some(total) {
            bar.set_length(total);
        }
    }
    bar.set_position(update.bytes_transferred);
}
