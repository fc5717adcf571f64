//! Interrupt handling
//!
//! Ctrl+C and SIGTERM flip a `watch` channel exactly once; every later signal
//! only prints a notice while the session drains.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Request shutdown; true only for the call that actually triggered it
    pub fn trigger(&self) -> bool {
        let mut first = false;
        self.tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                first = true;
                true
            }
        });
        first
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.rx.clone();
        async move {
            let _ = rx.wait_for(|requested| *requested).await;
        }
    }

    /// Forward Ctrl+C / SIGTERM into this signal until the runtime stops
    pub fn listen(&self) -> Result<JoinHandle<()>> {
        #[cfg(unix)]
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;

        let signal = self.clone();
        Ok(tokio::spawn(async move {
            loop {
                #[cfg(unix)]
                {
                    tokio::select! {
                        res = tokio::signal::ctrl_c() => {
                            if res.is_err() {
                                break;
                            }
                            info!("received SIGINT");
                        }
                        _ = terminate.recv() => info!("received SIGTERM"),
                    }
                }
                #[cfg(not(unix))]
                {
                    if tokio::signal::ctrl_c().await.is_err() {
                        break;
                    }
                    info!("received Ctrl+C");
                }

                if signal.trigger() {
                    println!("\n\n{}", "⏸  Stopping watch mode...".yellow());
                } else {
                    println!(
                        "{}",
                        "Shutdown already in progress, waiting for the current push to finish...".yellow()
                    );
                }
            }
        }))
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
