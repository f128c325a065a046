//! Transfer lifecycle and progress events.
//!
//! The transfer service publishes onto an unbounded channel so that a slow
//! subscriber (a progress bar, a log writer) can never stall the download.
//! Publishing is fire-and-forget: if nobody is listening the event is dropped.
//!
//! ```ignore
//! let (events, mut rx) = TransferEvents::channel();
//! let service = FileTransferService::new(clients, cache, events);
//!
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//! ```

use std::path::PathBuf;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Incremental progress of a single download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Source address being transferred.
    pub location: String,
    /// Bytes written so far.
    pub bytes_transferred: u64,
    /// Total expected bytes, when the transport knows it.
    pub total_bytes: Option<u64>,
}

impl ProgressUpdate {
    /// Completion percentage, if the total size is known and non-zero.
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.bytes_transferred as f64 / total as f64) * 100.0)
            }
            _ => None,
        }
    }
}

/// Event published by the transfer service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A transfer request was accepted.
    Started {
        location: String,
        destination_folder: PathBuf,
    },
    /// Bytes were written during a download.
    Progress(ProgressUpdate),
    /// The artifact is available in the destination folder.
    ///
    /// Published for both fresh downloads and cache hits.
    Completed {
        location: String,
        destination_folder: PathBuf,
    },
}

impl TransferEvent {
    /// Source address this event refers to.
    pub fn location(&self) -> &str {
        match self {
            Self::Started { location, .. } | Self::Completed { location, .. } => location,
            Self::Progress(update) => &update.location,
        }
    }
}

/// Publishing handle for transfer events.
///
/// Cloning is cheap; all clones feed the same receiver.
#[derive(Debug, Clone, Default)]
pub struct TransferEvents {
    sender: Option<UnboundedSender<TransferEvent>>,
}

impl TransferEvents {
    /// Create a handle together with the receiving end.
    pub fn channel() -> (Self, UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    /// Create a handle that discards every event.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Publish an event without waiting for subscribers.
    pub fn publish(&self, event: TransferEvent) {
        if let Some(sender) = &self.sender {
            // A closed receiver only means nobody is watching any more
            let _ = sender.send(event);
        }
    }
}
