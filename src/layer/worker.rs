//! Background tile fetching on the ambient tokio runtime.
//!
//! Requests go out and completions come back over unbounded channels. The
//! layer tree never awaits: it drains finished tiles with
//! [`TileWorker::try_completed`] during its own update pass.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::tile::{TileCoord, TileError, TileSource};
use crate::feature::Feature;
use crate::geometry::Rectangle;

/// The outcome of one tile fetch.
#[derive(Debug)]
pub struct TileCompletion {
    pub coord: TileCoord,
    pub result: Result<Vec<Feature>, TileError>,
}

/// A task that runs a [`TileSource`] off the calling thread.
///
/// Each request is fetched on the blocking pool so slow sources do not stall
/// the runtime. Dropping the worker aborts its dispatch task.
pub struct TileWorker {
    requests: mpsc::UnboundedSender<(TileCoord, Rectangle)>,
    completed: mpsc::UnboundedReceiver<TileCompletion>,
    task: JoinHandle<()>,
}

impl TileWorker {
    /// Start a worker on the current runtime.
    pub fn spawn(source: impl TileSource) -> Result<Self, TileError> {
        Self::spawn_shared(Arc::new(source))
    }

    /// Start a worker for a source that is shared elsewhere.
    pub fn spawn_shared(source: Arc<dyn TileSource>) -> Result<Self, TileError> {
        let handle = Handle::try_current().map_err(|_| TileError::NoRuntime)?;
        let (requests, mut incoming) = mpsc::unbounded_channel::<(TileCoord, Rectangle)>();
        let (done, completed) = mpsc::unbounded_channel::<TileCompletion>();

        let task = handle.spawn(async move {
            while let Some((coord, bounds)) = incoming.recv().await {
                let source = Arc::clone(&source);
                let fetch = tokio::task::spawn_blocking(move || source.fetch(coord, bounds));
                let done = done.clone();
                tokio::spawn(async move {
                    let result = match fetch.await {
                        Ok(result) => result,
                        Err(err) => {
                            warn!(%coord, %err, "tile source panicked");
                            Err(TileError::Fetch {
                                coord,
                                message: err.to_string(),
                            })
                        }
                    };
                    if done.send(TileCompletion { coord, result }).is_err() {
                        debug!(%coord, "tile finished after worker shut down");
                    }
                });
            }
        });

        Ok(Self {
            requests,
            completed,
            task,
        })
    }

    /// Queue a fetch.
    pub fn request(&self, coord: TileCoord, bounds: Rectangle) -> Result<(), TileError> {
        self.requests
            .send((coord, bounds))
            .map_err(|_| TileError::WorkerClosed)
    }

    /// A finished tile, if one is ready. Never blocks.
    pub fn try_completed(&mut self) -> Option<TileCompletion> {
        self.completed.try_recv().ok()
    }

    /// Wait for the next finished tile.
    pub async fn completed(&mut self) -> Option<TileCompletion> {
        self.completed.recv().await
    }

    /// Whether the dispatch task has stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    /// Stop accepting requests. Fetches already running still complete.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for TileWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ===========================================================================
// Tests
// ===========================================================================
