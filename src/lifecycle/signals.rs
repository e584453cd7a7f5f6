//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown. Uses Tokio's signal
//! handling, so waiting is async-safe.

/// Wait until the process is asked to stop. Returns the signal name.
#[cfg(unix)]
pub async fn wait_for_shutdown() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let name = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            "SIGINT"
        }
        _ = terminate.recv() => "SIGTERM",
    };
    tracing::info!(signal = name, "Shutdown signal received");
    Ok(name)
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = "ctrl-c", "Shutdown signal received");
    Ok("ctrl-c")
}
