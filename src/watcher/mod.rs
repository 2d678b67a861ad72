//! Change-event source and the reconciliation loop that consumes it.
//!
//! ```text
//! notify (OS watcher, recursive on project root)
//!   -> notify-debouncer-mini (one delivery per debounce window)
//!   -> std channel -> bridge task -> tokio channel of ChangeBatch
//!   -> ExtensionReloader::run -> ExtensionRegistry::{load, reload}
//! ```

pub mod error;
pub mod event;
pub mod reconcile;

use std::path::Path;
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tokio::sync::mpsc as tokio_mpsc;
use tokio::task::JoinHandle;

pub use error::WatchError;
pub use event::{ChangeBatch, ChangeEvent, ChangeKind};
pub use reconcile::{BatchPolicy, ExtensionReloader, ExtensionReloaderBuilder, Op, Outcome};

/// Default debounce window applied to raw filesystem events.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(75);

/// Receiving end of the change-event source.
pub type BatchReceiver = tokio_mpsc::Receiver<Result<ChangeBatch, WatchError>>;

/// Handle to a running watcher. Keeps the debouncer alive (dropping stops watching).
pub struct WatcherHandle {
    /// Keep alive: dropping the debouncer stops the OS watcher.
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// The bridge task forwarding batches from std channel to tokio channel.
    _bridge_task: JoinHandle<()>,
}

/// Start a debounced recursive watcher on `watch_root`.
///
/// Returns a `WatcherHandle` (must be kept alive) and a tokio receiver that
/// yields one `ChangeBatch` per debounced delivery. A watcher error is
/// forwarded once as `Err` and ends the stream.
///
/// Must be called from within a tokio runtime.
pub fn start_watcher(
    watch_root: &Path,
    debounce: Duration,
) -> Result<(WatcherHandle, BatchReceiver), WatchError> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<DebounceEventResult>();

    let mut debouncer = new_debouncer(debounce, move |res| {
        let _ = std_tx.send(res);
    })?;
    debouncer
        .watcher()
        .watch(watch_root, RecursiveMode::Recursive)
        .map_err(|e| WatchError::PathWatchFailed {
            path: watch_root.to_path_buf(),
            reason: e.to_string(),
        })?;

    let (tokio_tx, tokio_rx) = tokio_mpsc::channel(256);

    let bridge_task = tokio::task::spawn_blocking(move || {
        while let Ok(result) = std_rx.recv() {
            let forwarded = match result {
                Ok(events) => {
                    let batch: ChangeBatch = events.into_iter().map(ChangeEvent::from).collect();
                    if batch.is_empty() {
                        continue;
                    }
                    Ok(batch)
                }
                Err(err) => Err(WatchError::EventError {
                    details: err.to_string(),
                }),
            };

            let fatal = forwarded.is_err();
            if tokio_tx.blocking_send(forwarded).is_err() || fatal {
                return; // receiver dropped, or the source can no longer proceed
            }
        }
    });

    crate::debug_event!("watcher", "watching", "{}", watch_root.display());

    Ok((
        WatcherHandle {
            _debouncer: debouncer,
            _bridge_task: bridge_task,
        },
        tokio_rx,
    ))
}
