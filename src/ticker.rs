use std::ops::ControlFlow;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error};

/// Periodic background job, stopped when dropped.
///
/// The callback runs on a dedicated thread once per `period` until it returns
/// [`ControlFlow::Break`] or the ticker is stopped. Stopping waits for a
/// callback already in progress, so no tick runs after [`Ticker::stop`]
/// returns.
pub struct Ticker {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a ticker thread called `name`.
    ///
    /// Returns `None` if the operating system refused to start the thread.
    pub fn spawn<F>(name: &str, period: Duration, mut on_tick: F) -> Option<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            loop {
                match stop_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        if on_tick().is_break() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        match spawned {
            Ok(handle) => {
                debug!("Started ticker '{}' every {:?}", name, period);
                Some(Self {
                    name: name.to_string(),
                    stop_tx: Some(stop_tx),
                    handle: Some(handle),
                })
            }
            Err(e) => {
                error!("Failed to start ticker '{}': {}", name, e);
                None
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the ticker thread has exited on its own.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Stop ticking and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Ticker '{}' panicked", self.name);
            } else {
                debug!("Stopped ticker '{}'", self.name);
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
