use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::debug;

use crate::client::DataSource;
use crate::error::{Error, Result};
use crate::navigation::{FetchCompletion, FetchOutcome, FetchRequest};

/// Runs fetch requests off the event loop.
///
/// Each request gets its own thread; results come back through a channel
/// drained by [`Fetcher::poll`]. A request yields two completions, the
/// listing and then the summary. Requests are never cancelled.
pub struct Fetcher {
    source: Arc<dyn DataSource>,
    tx: Sender<FetchCompletion>,
    rx: Receiver<FetchCompletion>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            tx,
            rx,
        }
    }

    pub fn dispatch(&self, request: FetchRequest) {
        debug!(seq = request.seq, path = %request.path, "dispatching fetch");
        let source = self.source.clone();
        let tx = self.tx.clone();

        thread::spawn(move || {
            let listing = guarded(|| source.explore(&request.path, request.sort));
            let _ = tx.send(FetchCompletion {
                seq: request.seq,
                path: request.path.clone(),
                outcome: FetchOutcome::Listing(listing),
            });

            let summary = guarded(|| source.summary(&request.path));
            let _ = tx.send(FetchCompletion {
                seq: request.seq,
                path: request.path,
                outcome: FetchOutcome::Summary(summary),
            });
        });
    }

    /// Drain every completion that has arrived so far without blocking.
    pub fn poll(&self) -> Vec<FetchCompletion> {
        let mut done = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(completion) => done.push(completion),
                Err(TryRecvError::Empty) => break,
                // We hold a sender ourselves, so this cannot happen.
                Err(TryRecvError::Disconnected) => break,
            }
        }
        done
    }
}

fn guarded<T>(call: impl FnOnce() -> Result<T>) -> Result<T> {
    catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|_| Err(Error::Worker("fetch thread panicked".to_string())))
}
