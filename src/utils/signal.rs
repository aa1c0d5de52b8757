use tokio::signal;

pub async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        crate::error::log_error(&e);
        return;
    }

    #[cfg(not(windows))]
    println!();
    tracing::info!("Ctrl+C recieved. Draining in-flight requests, this could take a while.");
}
