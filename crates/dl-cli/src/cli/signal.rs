//! Interrupt signals that cancel a running download.

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::debug!("cannot listen for signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::debug!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Resolves with the signal's name on Ctrl-C (and SIGTERM/SIGQUIT on Unix).
pub async fn interrupted() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::SignalKind;
        tokio::select! {
            _ = ctrl_c() => "SIGINT",
            _ = unix_signal(SignalKind::terminate()) => "SIGTERM",
            _ = unix_signal(SignalKind::quit()) => "SIGQUIT",
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
        "interrupt"
    }
}
