//! Shutdown coordination for the gateway.
//!
//! The HTTP server and the reply pumps listen on separate coordinators: the
//! server drains first, and only then are the pumps stopped, so requests
//! still waiting on a reply during the drain get it.

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::http::HttpServer;

/// How often [`Shutdown::drain`] re-checks for running tasks.
const DRAIN_POLL: Duration = Duration::from_millis(20);

/// Coordinator for graceful shutdown.
///
/// The HTTP server and every reply pump hold a receiver; a task releases it
/// when it exits, so the receiver count tells how many are still running.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still holding a receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Wait up to `grace` for every subscribed task to exit.
    ///
    /// Returns `false` if some were still running when the grace period ended.
    pub async fn drain(&self, grace: Duration) -> bool {
        let waited = tokio::time::timeout(grace, async {
            while self.receiver_count() > 0 {
                tokio::time::sleep(DRAIN_POLL).await;
            }
        })
        .await;

        match waited {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    remaining = self.receiver_count(),
                    "Tasks still running after shutdown grace period"
                );
                false
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve until `stop` resolves, drain the server, then stop `pumps`.
///
/// The server and the pumps each get up to `grace` to finish.
pub async fn serve_until<F>(
    server: HttpServer,
    listener: TcpListener,
    stop: F,
    pumps: &Shutdown,
    grace: Duration,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()>,
{
    let http = Shutdown::new();
    let mut server_task = tokio::spawn(server.run(listener, http.subscribe()));

    let mut result = Ok(());
    let mut server_done = false;
    tokio::select! {
        joined = &mut server_task => {
            server_done = true;
            tracing::warn!("HTTP server exited before shutdown was requested");
            result = flatten(joined);
        }
        _ = stop => {}
    }

    http.trigger();
    if !server_done {
        match tokio::time::timeout(grace, &mut server_task).await {
            Ok(joined) => result = flatten(joined),
            Err(_) => {
                tracing::warn!("HTTP server did not drain in time");
                server_task.abort();
            }
        }
    }

    // No request is waiting on a reply any more.
    pumps.trigger();
    pumps.drain(grace).await;
    result
}

fn flatten(
    joined: Result<Result<(), std::io::Error>, tokio::task::JoinError>,
) -> Result<(), std::io::Error> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::other(e)),
    }
}
